use glam::Vec3;
use noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};

use crate::rng::SeededRng;

/// Keys that require regenerating star geometry when changed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarLayout {
    pub count: u32,
    pub radius: f32,
    pub thickness: f32,
    /// Base star color, tinted per star by the nebula mask
    pub color: [f32; 3],
    // Clustering (accept/reject by noise + displacement)
    pub noise_scale: f32,
    pub noise_bias: f32,
    pub noise_strength: f32,
    pub noise_displace: f32,
    pub seed: u32,
    // Subtle per-star tinting by large-scale noise
    pub nebula_enabled: bool,
    pub nebula_amount: f32,
    pub nebula_scale: f32,
    pub nebula_bias: f32,
    pub nebula_smooth: f32,
    pub nebula_color_a: [f32; 3],
    pub nebula_color_b: [f32; 3],
}

impl Default for StarLayout {
    fn default() -> Self {
        Self {
            count: 20000,
            radius: 150.0,
            thickness: 50.0,
            color: [0.867, 0.902, 1.0],
            noise_scale: 0.08,
            noise_bias: 0.15,
            noise_strength: 0.85,
            noise_displace: 2.0,
            seed: 42,
            nebula_enabled: true,
            nebula_amount: 0.3,
            nebula_scale: 0.015,
            nebula_bias: 0.5,
            nebula_smooth: 0.2,
            nebula_color_a: [0.624, 0.725, 1.0],
            nebula_color_b: [1.0, 0.651, 0.651],
        }
    }
}

/// Keys that only touch uniforms; the star buffer must keep its identity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarAppearance {
    pub size: f32,
    pub size_jitter: f32,
    pub opacity: f32,
    pub twinkle_speed: f32,
    pub twinkle_amount: f32,
    /// Slow whole-field rotation, rad/s
    pub drift_speed: f32,
}

impl Default for StarAppearance {
    fn default() -> Self {
        Self {
            size: 1.2,
            size_jitter: 0.8,
            opacity: 1.0,
            twinkle_speed: 0.6,
            twinkle_amount: 0.35,
            drift_speed: 0.002,
        }
    }
}

/// Sparse nebula sky dome behind everything; black outside the patches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    pub enabled: bool,
    /// Lower values give larger structures
    pub scale: f32,
    /// Higher values give sparser patches
    pub threshold: f32,
    pub falloff: f32,
    pub power: f32,
    pub vignette: f32,
    pub color_a: [f32; 3],
    pub color_b: [f32; 3],
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scale: 3.0,
            threshold: 0.69,
            falloff: 0.12,
            power: 1.0,
            vignette: 0.5,
            color_a: [0.478, 0.627, 1.0],
            color_b: [1.0, 0.561, 0.627],
        }
    }
}

/// What a configuration edit requires of the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StarfieldDelta {
    pub rebuild: bool,
    pub appearance: bool,
    pub sky: bool,
}

impl StarfieldDelta {
    pub fn classify(
        old_layout: &StarLayout,
        new_layout: &StarLayout,
        old_app: &StarAppearance,
        new_app: &StarAppearance,
        old_sky: &SkyConfig,
        new_sky: &SkyConfig,
    ) -> Self {
        Self {
            rebuild: old_layout != new_layout,
            appearance: old_app != new_app,
            sky: old_sky != new_sky,
        }
    }

    pub fn is_none(&self) -> bool {
        !(self.rebuild || self.appearance || self.sky)
    }
}

/// Generated star geometry. `positions.len()` can fall short of the
/// requested count when the acceptance noise rejects too much.
pub struct StarGeometry {
    pub positions: Vec<Vec3>,
    /// Per-star size jitter in [-1, 1], resolved against the appearance
    /// uniforms in the shader so jitter edits keep buffer identity
    pub jitters: Vec<f32>,
    /// Twinkle phase in [0, 1)
    pub phases: Vec<f32>,
    pub tints: Vec<Vec3>,
    pub requested: u32,
}

impl StarGeometry {
    pub fn placed(&self) -> usize {
        self.positions.len()
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0).max(1e-6)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Place stars on a noisy shell by rejection sampling. Bounded by
/// `count * 20` attempts; a shortfall is reported, never an error.
pub fn generate_stars(layout: &StarLayout) -> StarGeometry {
    let count = layout.count as usize;
    let mut rng = SeededRng::new(Some(layout.seed as u64));
    let field = OpenSimplex::new(layout.seed);
    let nebula = OpenSimplex::new(layout.seed.wrapping_add(1));

    let base = Vec3::from(layout.color);
    let col_a = Vec3::from(layout.nebula_color_a);
    let col_b = Vec3::from(layout.nebula_color_b);

    let mut positions = Vec::with_capacity(count);
    let mut jitters = Vec::with_capacity(count);
    let mut phases = Vec::with_capacity(count);
    let mut tints = Vec::with_capacity(count);

    let max_guard = count.saturating_mul(20);
    let mut guard = 0usize;
    while positions.len() < count && guard < max_guard {
        guard += 1;

        let dir = Vec3::new(
            rng.range(-1.0, 1.0),
            rng.range(-1.0, 1.0),
            rng.range(-1.0, 1.0),
        );
        let len = dir.length();
        if len < 1e-6 {
            continue;
        }
        let dir = dir / len;

        let t = if layout.thickness > 0.0 {
            rng.next_f32()
        } else {
            0.0
        };
        let r = layout.radius + (t - 0.5) * layout.thickness;
        let mut p = dir * r;

        let ns = layout.noise_scale as f64;
        let n = field.get([p.x as f64 * ns, p.y as f64 * ns, p.z as f64 * ns]) as f32;
        let n01 = 0.5 * (n + 1.0);
        let accept = if layout.noise_strength <= 0.0 {
            1.0
        } else {
            (n01 - layout.noise_bias) / (1.0 - layout.noise_bias).max(1e-6)
        };
        if rng.next_f32() > accept.clamp(0.0, 1.0) {
            continue;
        }

        p += dir * (layout.noise_displace * (n01 - 0.5));

        let mut tint = base;
        if layout.nebula_enabled {
            let s = layout.nebula_scale as f64;
            let nn = nebula.get([p.x as f64 * s, p.y as f64 * s, p.z as f64 * s]) as f32;
            let nn01 = 0.5 * (nn + 1.0);
            let k = layout.nebula_smooth;
            let tt = smoothstep(layout.nebula_bias - k, layout.nebula_bias + k, nn01);
            let patch = col_a.lerp(col_b, tt);
            tint = tint.lerp(patch, layout.nebula_amount);
        }

        positions.push(p);
        jitters.push(rng.range(-1.0, 1.0));
        phases.push(rng.next_f32());
        tints.push(tint);
    }

    if positions.len() < count {
        log::warn!(
            "[starfield] placed {} of {} stars (bias {:.2} strength {:.2})",
            positions.len(),
            count,
            layout.noise_bias,
            layout.noise_strength
        );
    }

    StarGeometry {
        positions,
        jitters,
        phases,
        tints,
        requested: layout.count,
    }
}

/// Twinkle clock and slow drift rotation; feeds shader uniforms.
pub struct Starfield {
    pub layout: StarLayout,
    pub appearance: StarAppearance,
    pub sky: SkyConfig,
    pub twinkle_t: f32,
    pub drift_angle: f32,
    geometry_version: u64,
}

impl Starfield {
    pub fn new(layout: StarLayout, appearance: StarAppearance, sky: SkyConfig) -> Self {
        Self {
            layout,
            appearance,
            sky,
            twinkle_t: 0.0,
            drift_angle: 0.0,
            geometry_version: 0,
        }
    }

    /// Bumped whenever a layout edit requires regenerating geometry. The
    /// renderer compares it against the version it last uploaded.
    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    /// Apply a config edit, classifying the work the renderer needs.
    pub fn configure(
        &mut self,
        layout: StarLayout,
        appearance: StarAppearance,
        sky: SkyConfig,
    ) -> StarfieldDelta {
        let delta = StarfieldDelta::classify(
            &self.layout,
            &layout,
            &self.appearance,
            &appearance,
            &self.sky,
            &sky,
        );
        self.layout = layout;
        self.appearance = appearance;
        self.sky = sky;
        if delta.rebuild {
            self.geometry_version += 1;
        }
        delta
    }

    pub fn update(&mut self, dt: f32) {
        self.twinkle_t += dt;
        if self.appearance.drift_speed != 0.0 {
            self.drift_angle += self.appearance.drift_speed * dt;
        }
    }

    pub fn twinkle_time(&self) -> f32 {
        self.twinkle_t * self.appearance.twinkle_speed
    }
}
