// Star placement by noise rejection and the rebuild/retune classification.

use lumo_core::starfield::{
    generate_stars, SkyConfig, StarAppearance, StarLayout, Starfield, StarfieldDelta,
};

fn field() -> Starfield {
    Starfield::new(
        StarLayout::default(),
        StarAppearance::default(),
        SkyConfig::default(),
    )
}

#[test]
fn generation_places_stars_on_the_shell() {
    let layout = StarLayout::default();
    let geo = generate_stars(&layout);
    assert!(geo.placed() > 0);
    // shell half-thickness plus the noise displacement headroom
    let half = layout.thickness * 0.5 + layout.noise_displace * 0.5 + 1e-3;
    for p in &geo.positions {
        let r = p.length();
        assert!(
            (r - layout.radius).abs() <= half,
            "star at radius {r} for shell {} ± {half}",
            layout.radius
        );
    }
}

#[test]
fn zero_noise_strength_accepts_every_candidate() {
    let layout = StarLayout {
        noise_strength: 0.0,
        ..StarLayout::default()
    };
    let geo = generate_stars(&layout);
    assert_eq!(geo.placed(), layout.count as usize);
}

#[test]
fn generation_is_deterministic_per_seed() {
    let layout = StarLayout::default();
    let a = generate_stars(&layout);
    let b = generate_stars(&layout);
    assert_eq!(a.placed(), b.placed());
    assert_eq!(a.positions, b.positions);

    let other = StarLayout {
        seed: layout.seed.wrapping_add(1),
        ..layout
    };
    let c = generate_stars(&other);
    assert_ne!(a.positions, c.positions);
}

#[test]
fn hostile_noise_bias_yields_shortfall_not_hang() {
    // bias pushed far above the noise range rejects nearly every candidate
    let layout = StarLayout {
        noise_bias: 100.0,
        ..StarLayout::default()
    };
    let geo = generate_stars(&layout);
    assert!(geo.placed() < geo.requested as usize);
}

#[test]
fn zero_count_layout_is_fine() {
    let layout = StarLayout {
        count: 0,
        ..StarLayout::default()
    };
    let geo = generate_stars(&layout);
    assert_eq!(geo.placed(), 0);
}

#[test]
fn layout_edit_requires_rebuild() {
    let mut sf = field();
    let v0 = sf.geometry_version();
    let layout = StarLayout {
        count: sf.layout.count + 100,
        ..sf.layout
    };
    let delta = sf.configure(layout, sf.appearance, sf.sky);
    assert!(delta.rebuild);
    assert_eq!(sf.geometry_version(), v0 + 1);
}

#[test]
fn appearance_edit_keeps_geometry() {
    let mut sf = field();
    let v0 = sf.geometry_version();
    let appearance = StarAppearance {
        opacity: sf.appearance.opacity * 0.5,
        twinkle_amount: 1.0,
        ..sf.appearance
    };
    let delta = sf.configure(sf.layout, appearance, sf.sky);
    assert!(!delta.rebuild);
    assert!(delta.appearance);
    assert_eq!(sf.geometry_version(), v0);
}

#[test]
fn sky_edit_is_classified_separately() {
    let mut sf = field();
    let sky = SkyConfig {
        threshold: sf.sky.threshold + 0.1,
        ..sf.sky
    };
    let delta = sf.configure(sf.layout, sf.appearance, sky);
    assert!(!delta.rebuild);
    assert!(delta.sky);
}

#[test]
fn identical_config_is_no_work() {
    let mut sf = field();
    let delta = sf.configure(sf.layout, sf.appearance, sf.sky);
    assert!(delta.is_none());
}

#[test]
fn delta_classify_flags_compose() {
    let base_l = StarLayout::default();
    let base_a = StarAppearance::default();
    let base_s = SkyConfig::default();
    let new_l = StarLayout {
        radius: base_l.radius + 5.0,
        ..base_l
    };
    let new_a = StarAppearance {
        size: base_a.size + 0.5,
        ..base_a
    };
    let d = StarfieldDelta::classify(&base_l, &new_l, &base_a, &new_a, &base_s, &base_s);
    assert!(d.rebuild && d.appearance && !d.sky);
}

#[test]
fn drift_and_twinkle_advance_with_time() {
    let mut sf = field();
    let drift0 = sf.drift_angle;
    sf.update(1.0);
    sf.update(1.0);
    if sf.appearance.drift_speed != 0.0 {
        assert!(sf.drift_angle != drift0);
    }
    assert!(sf.twinkle_time() >= 0.0);
    assert!(sf.twinkle_t >= 2.0);
}
