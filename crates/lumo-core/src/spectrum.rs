use glam::Vec3;

use crate::constants::{BAR_TEX_SIZE, BIN_COUNT, SPECTRUM_BASE_Y};
use crate::params::VisualParams;

/// HSL to linear-ish RGB. h/s/l in 0..1, h wraps.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let h = ((h % 1.0) + 1.0) % 1.0;
    let a = s * l.min(1.0 - l);
    let f = |n: f32| {
        let k = (n + h * 12.0) % 12.0;
        l - a * (-1.0f32).max((k - 3.0).min(9.0 - k).min(1.0))
    };
    Vec3::new(f(0.0), f(8.0), f(4.0))
}

/// Mean level of the mid-low bins, normalized to 0..1.
pub fn audio_level(bins: &[u8]) -> f32 {
    let lo = 8.min(bins.len());
    let hi = 64.min(bins.len());
    if hi <= lo {
        return 0.0;
    }
    let sum: u32 = bins[lo..hi].iter().map(|&b| b as u32).sum();
    sum as f32 / (hi - lo) as f32 / 255.0
}

/// One vertex of the spectrum ring. Uploaded to the GPU as-is.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RingVertex {
    pub position: Vec3,
    pub color: Vec3,
}

/// Lay out the ring over the first `BIN_COUNT` analyser bins. The returned
/// slice holds `BIN_COUNT + 1` vertices, the last one a copy of the first so
/// a line-strip closes the loop.
pub fn ring_vertices(bins: &[u8], params: &VisualParams, out: &mut Vec<RingVertex>) {
    out.clear();
    out.reserve(BIN_COUNT + 1);
    for i in 0..BIN_COUNT {
        let amp = bins.get(i).copied().unwrap_or(0) as f32 / 255.0;
        let theta = i as f32 / BIN_COUNT as f32 * std::f32::consts::TAU;
        let r = params.spectrum_radius + amp * 0.5 * params.spectrum_gain;
        let y = SPECTRUM_BASE_Y + amp * params.spectrum_height;
        let hue = (i as f32 / BIN_COUNT as f32 + params.spectrum_hue_shift) % 1.0;
        let l = (0.35 + amp * 0.5).clamp(0.0, 1.0);
        out.push(RingVertex {
            position: Vec3::new(theta.cos() * r, y, theta.sin() * r),
            color: hsl_to_rgb(hue, 1.0, l),
        });
    }
    if let Some(first) = out.first().copied() {
        out.push(first);
    }
}

/// Rasterize the analyser bins into a square RGBA8 bar texture. Bars rise
/// from the bottom edge with a per-row gradient over a dim blue backdrop.
pub fn bar_texture(bins: &[u8], pixels: &mut Vec<u8>) {
    let size = BAR_TEX_SIZE;
    pixels.clear();
    pixels.resize(size * size * 4, 0);
    if bins.is_empty() {
        return;
    }
    let bar_w = size as f32 / bins.len() as f32;
    for (i, &b) in bins.iter().enumerate() {
        let v = b as f32 / 255.0;
        let h = (v * size as f32) as usize;
        let x0 = (i as f32 * bar_w) as usize;
        let x1 = (((i + 1) as f32 * bar_w) as usize).min(size);
        for row in 0..h {
            // row 0 is the bar top, texture row 0 is the image top
            let t = if h > 1 { row as f32 / (h - 1) as f32 } else { 0.0 };
            let top = [255.0 * v, 255.0 * (1.0 - v), 255.0];
            let bot = [80.0, 80.0, 120.0];
            let y = size - h + row;
            for x in x0..x1 {
                let px = (y * size + x) * 4;
                for c in 0..3 {
                    pixels[px + c] = (top[c] + (bot[c] - top[c]) * t) as u8;
                }
                pixels[px + 3] = 255;
            }
        }
    }
}

/// Smoothed audio level with hysteresis-free show/hide gating.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectrumGate {
    level: f32,
}

impl SpectrumGate {
    pub fn new() -> Self {
        Self { level: 0.0 }
    }

    /// Feed one frame's raw level. Returns the smoothed value.
    pub fn feed(&mut self, raw: f32, params: &VisualParams) -> f32 {
        self.level = self.level * params.show_smoothing + raw * (1.0 - params.show_smoothing);
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Whether the ring should be visible under auto-show.
    pub fn visible(&self, params: &VisualParams) -> bool {
        !params.auto_show_bands || self.level > params.show_threshold
    }
}

/// Point-cloud size after audio reaction.
pub fn reactive_point_size(params: &VisualParams, level: f32) -> f32 {
    if params.pc_audio_react {
        params.point_size * (1.0 + params.pc_react_amount * level)
    } else {
        params.point_size
    }
}
