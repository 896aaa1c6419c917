// Spectrum ring math, audio level, the auto-show gate, and the bar texture.

use lumo_core::constants::{BAR_TEX_SIZE, BIN_COUNT, SPECTRUM_BASE_Y};
use lumo_core::params::VisualParams;
use lumo_core::spectrum::{
    audio_level, bar_texture, hsl_to_rgb, reactive_point_size, ring_vertices, SpectrumGate,
    RingVertex,
};

#[test]
fn hsl_primaries() {
    let r = hsl_to_rgb(0.0, 1.0, 0.5);
    assert!((r.x - 1.0).abs() < 1e-5 && r.y.abs() < 1e-5 && r.z.abs() < 1e-5);
    let g = hsl_to_rgb(1.0 / 3.0, 1.0, 0.5);
    assert!(g.y > 0.99 && g.x < 0.01 && g.z < 0.01);
    let b = hsl_to_rgb(2.0 / 3.0, 1.0, 0.5);
    assert!(b.z > 0.99 && b.x < 0.01 && b.y < 0.01);
}

#[test]
fn hsl_extremes_and_wraparound() {
    let black = hsl_to_rgb(0.42, 1.0, 0.0);
    assert_eq!(black.to_array(), [0.0, 0.0, 0.0]);
    let white = hsl_to_rgb(0.42, 1.0, 1.0);
    assert_eq!(white.to_array(), [1.0, 1.0, 1.0]);
    // hue is periodic, including negatives
    let a = hsl_to_rgb(0.25, 1.0, 0.5);
    let b = hsl_to_rgb(1.25, 1.0, 0.5);
    let c = hsl_to_rgb(-0.75, 1.0, 0.5);
    assert!((a - b).length() < 1e-5);
    assert!((a - c).length() < 1e-5);
}

#[test]
fn audio_level_averages_the_low_mid_bins() {
    let mut bins = vec![0u8; 256];
    assert_eq!(audio_level(&bins), 0.0);
    for b in bins[8..64].iter_mut() {
        *b = 255;
    }
    assert!((audio_level(&bins) - 1.0).abs() < 1e-6);
    // bins outside 8..64 do not contribute
    let mut edges = vec![0u8; 256];
    edges[0] = 255;
    edges[200] = 255;
    assert_eq!(audio_level(&edges), 0.0);
}

#[test]
fn audio_level_tolerates_short_buffers() {
    assert_eq!(audio_level(&[]), 0.0);
    let short = vec![128u8; 16];
    let l = audio_level(&short);
    assert!(l >= 0.0 && l <= 1.0);
}

#[test]
fn ring_is_closed_and_sized() {
    let params = VisualParams::default();
    let bins = vec![96u8; 256];
    let mut out: Vec<RingVertex> = Vec::new();
    ring_vertices(&bins, &params, &mut out);
    assert_eq!(out.len(), BIN_COUNT + 1);
    assert_eq!(out[0].position, out[BIN_COUNT].position);
    assert_eq!(out[0].color, out[BIN_COUNT].color);
}

#[test]
fn ring_radius_and_height_follow_amplitude() {
    let params = VisualParams::default();
    let quiet = vec![0u8; 256];
    let loud = vec![255u8; 256];
    let mut vq = Vec::new();
    let mut vl = Vec::new();
    ring_vertices(&quiet, &params, &mut vq);
    ring_vertices(&loud, &params, &mut vl);
    let rq = (vq[0].position.x * vq[0].position.x + vq[0].position.z * vq[0].position.z).sqrt();
    let rl = (vl[0].position.x * vl[0].position.x + vl[0].position.z * vl[0].position.z).sqrt();
    assert!(rl > rq);
    assert!((vq[0].position.y - SPECTRUM_BASE_Y).abs() < 1e-5);
    assert!(vl[0].position.y > vq[0].position.y);
}

#[test]
fn gate_smooths_and_thresholds() {
    let mut params = VisualParams::default();
    params.auto_show_bands = true;
    params.show_threshold = 0.05;
    params.show_smoothing = 0.8;

    let mut gate = SpectrumGate::new();
    assert!(!gate.visible(&params));

    // sustained signal climbs through the EMA and crosses the threshold
    for _ in 0..50 {
        gate.feed(0.6, &params);
    }
    assert!(gate.level() > 0.5);
    assert!(gate.visible(&params));

    // silence decays it back below
    for _ in 0..100 {
        gate.feed(0.0, &params);
    }
    assert!(!gate.visible(&params));
}

#[test]
fn gate_disabled_means_always_visible() {
    let mut params = VisualParams::default();
    params.auto_show_bands = false;
    let gate = SpectrumGate::new();
    assert!(gate.visible(&params));
}

#[test]
fn single_feed_moves_by_one_minus_smoothing() {
    let mut params = VisualParams::default();
    params.show_smoothing = 0.72;
    let mut gate = SpectrumGate::new();
    let l = gate.feed(1.0, &params);
    assert!((l - 0.28).abs() < 1e-5);
}

#[test]
fn bar_texture_is_rgba_square_with_louder_taller_bars() {
    let mut bins = vec![0u8; 256];
    bins[0] = 255;
    let mut px = Vec::new();
    bar_texture(&bins, &mut px);
    assert_eq!(px.len(), BAR_TEX_SIZE * BAR_TEX_SIZE * 4);

    // column 0 is a full-height bar; its top-row pixel is lit, and the
    // matching pixel in a silent column is backdrop
    let row0 = 0usize;
    let p_loud = (row0 * BAR_TEX_SIZE) * 4;
    let loud_col = &px[p_loud..p_loud + 4];
    let p_quiet = (row0 * BAR_TEX_SIZE + BAR_TEX_SIZE - 1) * 4;
    let quiet_col = &px[p_quiet..p_quiet + 4];
    assert_ne!(loud_col[..3], quiet_col[..3]);
    assert_eq!(loud_col[3], 255);
}

#[test]
fn point_size_reacts_to_level_when_enabled() {
    let mut params = VisualParams::default();
    params.pc_audio_react = true;
    let base = reactive_point_size(&params, 0.0);
    let loud = reactive_point_size(&params, 1.0);
    assert!(loud > base);

    params.pc_audio_react = false;
    assert_eq!(
        reactive_point_size(&params, 1.0),
        reactive_point_size(&params, 0.0)
    );
}
