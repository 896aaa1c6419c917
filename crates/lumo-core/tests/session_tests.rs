// The per-frame tick: time bookkeeping, idle shading, spectrum gating,
// media-driven outputs, and the hover/lock picking state.

use glam::{Mat4, Vec2, Vec3};
use lumo_core::constants::RAINBOW_ROT_PER_SEC;
use lumo_core::media::{ActiveSource, MediaKind};
use lumo_core::params::VisualParams;
use lumo_core::session::{FrameInput, PickLock, Session};

fn session() -> Session {
    Session::new(VisualParams::default(), Some(7))
}

fn input<'a>(dt: f32, bins: Option<&'a [u8]>) -> FrameInput<'a> {
    FrameInput {
        dt,
        pointer: None,
        view_proj: Mat4::IDENTITY,
        viewport: Vec2::new(800.0, 600.0),
        camera_pos: Vec3::new(0.0, 2.2, 6.0),
        camera_target: Vec3::new(0.0, 1.0, 0.0),
        freq_bins: bins,
    }
}

#[test]
fn dt_is_clamped() {
    let mut s = session();
    s.advance(input(5.0, None));
    assert!((s.time() - 0.1).abs() < 1e-6);
    s.advance(input(-1.0, None));
    assert!((s.time() - 0.1).abs() < 1e-6);
}

#[test]
fn time_accumulates_across_ticks() {
    let mut s = session();
    s.advance(input(0.016, None));
    s.advance(input(0.016, None));
    assert!((s.time() - 0.032).abs() < 1e-5);
}

#[test]
fn rainbow_only_advances_while_idle() {
    let mut s = session();
    let out = s.advance(input(0.016, None));
    assert!(out.idle_rainbow);
    assert!((out.rainbow_phase - RAINBOW_ROT_PER_SEC * 0.016).abs() < 1e-5);

    // binding a texture freezes the idle shading
    s.surface.use_texture = true;
    let frozen = s.rainbow_phase();
    let out = s.advance(input(0.016, None));
    assert!(!out.idle_rainbow);
    assert_eq!(out.rainbow_phase, frozen);
}

#[test]
fn rainbow_phase_wraps() {
    let mut s = session();
    for _ in 0..60 {
        s.advance(input(0.1, None));
    }
    let phase = s.rainbow_phase();
    assert!(phase >= 0.0 && phase < 1.0);
}

#[test]
fn ring_follows_the_bins() {
    let mut s = session();
    s.params.auto_show_bands = false;

    let bins = vec![180u8; 256];
    let out = s.advance(input(0.016, Some(&bins)));
    assert!(!s.ring_vertices().is_empty());
    assert!(out.ring_visible);
    assert!(out.audio_level > 0.0);

    // audio goes away, the ring geometry is dropped with it
    let out = s.advance(input(0.016, None));
    assert!(s.ring_vertices().is_empty());
    assert!(!out.ring_visible);
}

#[test]
fn auto_show_gates_the_ring_until_the_level_climbs() {
    let mut s = session();
    s.params.auto_show_bands = true;
    s.params.show_threshold = 0.3;
    s.params.show_smoothing = 0.85;

    let bins = vec![255u8; 256];
    let first = s.advance(input(0.016, Some(&bins)));
    assert!(!first.ring_visible);

    let mut last = first;
    for _ in 0..60 {
        last = s.advance(input(0.016, Some(&bins)));
    }
    assert!(last.ring_visible);
}

#[test]
fn bar_texture_redraw_only_for_audio_sources() {
    let mut s = session();
    let bins = vec![128u8; 256];

    let out = s.advance(input(0.016, Some(&bins)));
    assert!(!out.draw_bar_texture);

    let token = s.media.begin_load();
    s.media.commit(
        token,
        ActiveSource::Loaded {
            kind: MediaKind::Audio,
            url: "/static/media/track.mp3".into(),
            index: 0,
        },
    );
    let out = s.advance(input(0.016, Some(&bins)));
    assert!(out.draw_bar_texture);
    // no analyser data, nothing to rasterize
    let out = s.advance(input(0.016, None));
    assert!(!out.draw_bar_texture);

    let token = s.media.begin_load();
    s.media.commit(
        token,
        ActiveSource::Loaded {
            kind: MediaKind::Video,
            url: "/static/media/clip.webm".into(),
            index: 1,
        },
    );
    let out = s.advance(input(0.016, Some(&bins)));
    assert!(!out.draw_bar_texture);
}

#[test]
fn bound_media_suppresses_idle_rainbow() {
    let mut s = session();
    let token = s.media.begin_load();
    s.media.commit(
        token,
        ActiveSource::Loaded {
            kind: MediaKind::Image,
            url: "/static/media/a.png".into(),
            index: 0,
        },
    );
    let out = s.advance(input(0.016, None));
    assert!(!out.idle_rainbow);
}

#[test]
fn fly_digit_overrides_the_camera() {
    let mut s = session();
    let eye = Vec3::new(0.0, 2.2, 6.0);
    let target = Vec3::new(0.0, 1.0, 0.0);

    let out = s.advance(input(0.016, None));
    assert!(out.camera.is_none());

    s.fly_digit(1, eye, target);
    let out = s.advance(input(0.016, None));
    let (pos, look) = out.camera.unwrap();
    assert!(pos.is_finite() && look.is_finite());

    // out-of-range digits leave the fly untouched
    let mut s2 = session();
    s2.fly_digit(42, eye, target);
    assert!(s2.advance(input(0.016, None)).camera.is_none());
}

#[test]
fn apply_params_reaches_the_surface_and_starfield() {
    let mut s = session();
    let mut p = s.params.clone();
    p.noise_freq = 3.3;
    p.displacement_amp = 0.5;
    p.tex_strength = 0.1;
    p.star_appearance.size *= 2.0;
    let delta = s.apply_params(p.clone());
    assert_eq!(s.surface.noise_freq, 3.3);
    assert_eq!(s.surface.amp, 0.5);
    assert_eq!(s.surface.tex_strength, 0.1);
    assert!(delta.appearance);
    assert!(!delta.rebuild);

    p.star_layout.count += 100;
    let delta = s.apply_params(p);
    assert!(delta.rebuild);
}

#[test]
fn pick_lock_flow() {
    let mut pick = PickLock::default();
    assert_eq!(pick.hovered(), None);
    assert_eq!(pick.locked(), None);

    // pointer-down with nothing hovered is a no-op
    assert!(!pick.pointer_down());

    pick.set_hovered(Some(12));
    assert!(pick.pointer_down());
    assert_eq!(pick.locked(), Some(12));

    // a second press with a lock held changes nothing
    pick.set_hovered(Some(40));
    assert!(!pick.pointer_down());
    assert_eq!(pick.locked(), Some(12));

    // double-click over a different particle keeps the lock
    assert!(!pick.double_click());
    assert_eq!(pick.locked(), Some(12));

    // only over the locked particle does it release
    pick.set_hovered(Some(12));
    assert!(pick.double_click());
    assert_eq!(pick.locked(), None);
}

#[test]
fn smoothed_level_is_shared_between_output_and_accessor() {
    let mut s = session();
    let bins = vec![200u8; 256];
    let out = s.advance(input(0.016, Some(&bins)));
    assert_eq!(out.audio_level, s.audio_level());
    assert!(out.point_size >= s.params.point_size);
}
