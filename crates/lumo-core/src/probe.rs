use glam::Vec3;
use noise::{NoiseFn, OpenSimplex};

use crate::constants::*;
use crate::particles::ParticleArena;

/// CPU-readable downsample of the current visual media frame. The frontend
/// refills it every frame from whichever source is active; the collision pass
/// samples it for the luminance part of the blob displacement.
pub struct MediaProbe {
    pixels: Option<Vec<u8>>,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaProbe {
    pub fn new() -> Self {
        Self { pixels: None }
    }

    /// Install a fresh RGBA readback. Wrong-sized buffers are rejected so a
    /// stale canvas resize can't smear the sampling grid.
    pub fn set_pixels(&mut self, rgba: Vec<u8>) {
        if rgba.len() == PROBE_SIZE * PROBE_SIZE * 4 {
            self.pixels = Some(rgba);
        } else {
            log::warn!(
                "[probe] dropped readback of {} bytes, expected {}",
                rgba.len(),
                PROBE_SIZE * PROBE_SIZE * 4
            );
            self.pixels = None;
        }
    }

    pub fn clear(&mut self) {
        self.pixels = None;
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    /// Rec. 709 luma at a UV coordinate, with v = 0 at the image top.
    pub fn luminance_at(&self, u: f32, v: f32) -> Option<f32> {
        let px = self.pixels.as_deref()?;
        let x = ((u * PROBE_SIZE as f32) as i32).clamp(0, PROBE_SIZE as i32 - 1) as usize;
        let y = ((v * PROBE_SIZE as f32) as i32).clamp(0, PROBE_SIZE as i32 - 1) as usize;
        let i = (y * PROBE_SIZE + x) * 4;
        let r = px[i] as f32 / 255.0;
        let g = px[i + 1] as f32 / 255.0;
        let b = px[i + 2] as f32 / 255.0;
        Some(0.2126 * r + 0.7152 * g + 0.0722 * b)
    }
}

/// Box-filter an RGBA image down by an integer factor. Used to derive the
/// probe from the rasterized bar texture for audio-only sources.
pub fn downsample_rgba(src: &[u8], src_size: usize, dst_size: usize) -> Vec<u8> {
    let mut out = vec![0u8; dst_size * dst_size * 4];
    if dst_size == 0 || src_size < dst_size || src.len() < src_size * src_size * 4 {
        return out;
    }
    let f = src_size / dst_size;
    let area = (f * f) as u32;
    for y in 0..dst_size {
        for x in 0..dst_size {
            let mut acc = [0u32; 4];
            for sy in 0..f {
                for sx in 0..f {
                    let i = ((y * f + sy) * src_size + x * f + sx) * 4;
                    for c in 0..4 {
                        acc[c] += src[i + c] as u32;
                    }
                }
            }
            let o = (y * dst_size + x) * 4;
            for c in 0..4 {
                out[o + c] = (acc[c] / area) as u8;
            }
        }
    }
    out
}

/// Direction to equirect UV, matching the sphere shader's mapping.
pub fn dir_to_uv(n: Vec3) -> (f32, f32) {
    let u = 0.5 + n.z.atan2(n.x) / std::f32::consts::TAU;
    let v = 0.5 + n.y.clamp(-1.0, 1.0).asin() / std::f32::consts::PI;
    (u, v)
}

/// CPU mirror of the blob surface displacement. Shares the noise parameters
/// with the vertex shader so particles react to the same surface the GPU
/// renders.
pub struct BlobSurface {
    noise: OpenSimplex,
    pub noise_freq: f32,
    pub amp: f32,
    pub tex_strength: f32,
    pub use_texture: bool,
}

impl BlobSurface {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: OpenSimplex::new(seed),
            noise_freq: 1.2,
            amp: 0.22,
            tex_strength: 1.0,
            use_texture: false,
        }
    }

    /// Surface radius along a unit direction at a given time, including the
    /// media-luminance contribution when a texture is bound.
    pub fn displaced_radius(&self, n: Vec3, time: f32, probe: &MediaProbe) -> f32 {
        let nf = self.noise_freq;
        let noise_val = self.noise.get([
            (n.x * nf) as f64,
            (n.y * nf + time * 0.25) as f64,
            (n.z * nf) as f64,
        ]) as f32;
        let noise_disp = noise_val * self.amp * 0.35;

        let mut tex_disp = 0.0;
        if self.use_texture {
            // sphere UVs mirror x
            let (u, v) = dir_to_uv(Vec3::new(-n.x, n.y, n.z));
            if let Some(l) = probe.luminance_at(u, v) {
                tex_disp = (0.5 - l) * self.amp * 1.35 * self.tex_strength;
            }
        }

        let lim = self.amp * 1.35;
        BLOB_RADIUS + (noise_disp + tex_disp).clamp(-lim, lim)
    }

    /// Push particles back outside the deforming surface plus a margin. The
    /// vertical push is reduced so displaced particles skim rather than pop.
    pub fn collision_pass(
        &self,
        arena: &mut ParticleArena,
        dt: f32,
        time: f32,
        probe: &MediaProbe,
        margin: f32,
        push_strength: f32,
    ) {
        for i in 0..arena.len() {
            let rel = arena.positions[i] - BLOB_CENTER;
            let r = rel.length();
            if r <= 1e-4 {
                continue;
            }
            let n = rel / r;
            let surface = self.displaced_radius(n, time, probe);
            let threshold = surface + margin;
            if r < threshold {
                let push = (threshold - r) * push_strength;
                arena.velocities[i].x += n.x * push * dt;
                arena.velocities[i].y += n.y * push * dt * COLLISION_PUSH_Y_FACTOR;
                arena.velocities[i].z += n.z * push * dt;
            }
        }
    }
}
