// Media probe sampling, the equirect mapping, and the box downsampler.

use glam::Vec3;
use lumo_core::constants::PROBE_SIZE;
use lumo_core::probe::{dir_to_uv, downsample_rgba, MediaProbe};

fn solid(r: u8, g: u8, b: u8) -> Vec<u8> {
    let mut px = vec![0u8; PROBE_SIZE * PROBE_SIZE * 4];
    for p in px.chunks_exact_mut(4) {
        p.copy_from_slice(&[r, g, b, 255]);
    }
    px
}

#[test]
fn empty_probe_yields_nothing() {
    let probe = MediaProbe::new();
    assert!(!probe.has_pixels());
    assert_eq!(probe.luminance_at(0.5, 0.5), None);
}

#[test]
fn wrong_sized_readbacks_are_dropped() {
    let mut probe = MediaProbe::new();
    probe.set_pixels(solid(255, 255, 255));
    assert!(probe.has_pixels());
    // a resize mid-flight hands us a short buffer; it must not stick
    probe.set_pixels(vec![255u8; 16]);
    assert!(!probe.has_pixels());
}

#[test]
fn luminance_is_rec709() {
    let mut probe = MediaProbe::new();
    probe.set_pixels(solid(255, 0, 0));
    let r = probe.luminance_at(0.5, 0.5).unwrap();
    assert!((r - 0.2126).abs() < 1e-3);

    probe.set_pixels(solid(0, 255, 0));
    let g = probe.luminance_at(0.5, 0.5).unwrap();
    assert!((g - 0.7152).abs() < 1e-3);

    probe.set_pixels(solid(255, 255, 255));
    let w = probe.luminance_at(0.5, 0.5).unwrap();
    assert!((w - 1.0).abs() < 1e-3);
}

#[test]
fn uv_is_clamped_to_the_grid() {
    let mut px = solid(0, 0, 0);
    // light up the top-left texel only
    px[0] = 255;
    px[1] = 255;
    px[2] = 255;
    let mut probe = MediaProbe::new();
    probe.set_pixels(px);
    assert!(probe.luminance_at(-3.0, -3.0).unwrap() > 0.9);
    assert!(probe.luminance_at(5.0, 5.0).unwrap() < 0.1);
}

#[test]
fn clear_discards_the_frame() {
    let mut probe = MediaProbe::new();
    probe.set_pixels(solid(10, 10, 10));
    probe.clear();
    assert!(!probe.has_pixels());
    assert_eq!(probe.luminance_at(0.5, 0.5), None);
}

#[test]
fn dir_to_uv_hits_the_poles_and_equator() {
    let (u, v) = dir_to_uv(Vec3::X);
    assert!((u - 0.5).abs() < 1e-6);
    assert!((v - 0.5).abs() < 1e-6);

    let (_, v) = dir_to_uv(Vec3::Y);
    assert!((v - 1.0).abs() < 1e-6);
    let (_, v) = dir_to_uv(Vec3::NEG_Y);
    assert!(v.abs() < 1e-6);

    let (u, _) = dir_to_uv(Vec3::Z);
    assert!((u - 0.75).abs() < 1e-6);
    let (u, _) = dir_to_uv(Vec3::NEG_X);
    assert!((u - 1.0).abs() < 1e-6);
}

#[test]
fn downsample_averages_blocks() {
    // 4x4 -> 2x2, each output texel averages a 2x2 block
    let mut src = vec![0u8; 4 * 4 * 4];
    // top-left block all 100, the rest 0
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let i = (y * 4 + x) * 4;
        src[i..i + 4].copy_from_slice(&[100, 100, 100, 100]);
    }
    let out = downsample_rgba(&src, 4, 2);
    assert_eq!(out.len(), 2 * 2 * 4);
    assert_eq!(&out[0..4], &[100, 100, 100, 100]);
    assert_eq!(&out[4..8], &[0, 0, 0, 0]);
}

#[test]
fn downsample_rejects_bad_shapes() {
    assert_eq!(downsample_rgba(&[], 4, 2), vec![0u8; 2 * 2 * 4]);
    // upscaling is not supported
    let src = vec![255u8; 2 * 2 * 4];
    assert_eq!(downsample_rgba(&src, 2, 4), vec![0u8; 4 * 4 * 4]);
}
