use glam::{Mat4, Vec2, Vec3};

use crate::constants::*;
use crate::rng::SeededRng;

/// Emitter orbit path around the stage center.
#[derive(Clone, Copy, Debug)]
pub struct OrbitConfig {
    pub r_base: f32,
    pub r_amp1: f32,
    pub r_freq1: f32,
    pub r_amp2: f32,
    pub r_freq2: f32,
    pub ang_speed: f32,
    pub ang_osc_amp: f32,
    pub ang_osc_freq: f32,
    pub y_base: f32,
    pub y_amp: f32,
    pub y_osc1: f32,
    pub y_osc2: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            r_base: 1.2,
            r_amp1: 0.40,
            r_freq1: 0.50,
            r_amp2: 0.20,
            r_freq2: 0.93,
            ang_speed: 0.70,
            ang_osc_amp: 0.30,
            ang_osc_freq: 0.25,
            y_base: 1.15,
            y_amp: 0.35,
            y_osc1: 0.80,
            y_osc2: 0.30,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FlowConfig {
    /// Particles per second
    pub emit_rate: f32,
    pub life_min: f32,
    pub life_max: f32,
    /// Distance to consider a particle "returned" to the emitter
    pub recycle_radius: f32,
    pub spawn_jitter: f32,
    pub kick_speed: f32,
    pub kick_y: f32,
    pub kick_spread: f32,
    pub orbit: OrbitConfig,
    /// Return-to-source force when lifetime expired
    pub return_gain: f32,
    pub return_gain_y: f32,
    pub swirl_y_factor: f32,
    pub seed: Option<u64>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            emit_rate: 3335.0,
            life_min: 6.0,
            life_max: 20.0,
            recycle_radius: 0.05,
            spawn_jitter: 0.02,
            kick_speed: 0.35,
            kick_y: 0.10,
            kick_spread: 1.0,
            orbit: OrbitConfig::default(),
            return_gain: 22.0,
            return_gain_y: 0.50,
            swirl_y_factor: 0.25,
            seed: None,
        }
    }
}

impl FlowConfig {
    /// Lifetime range with ordering enforced; a swapped pair is tolerated.
    #[inline]
    pub fn life_range(&self) -> (f32, f32) {
        if self.life_min <= self.life_max {
            (self.life_min, self.life_max)
        } else {
            (self.life_max, self.life_min)
        }
    }
}

/// Structure-of-arrays particle storage. Column lengths are all `P_COUNT`
/// and never change after construction.
pub struct ParticleArena {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    /// (orbit radius, angular speed, phase)
    pub seeds: Vec<Vec3>,
    pub sizes: Vec<f32>,
    pub boosts: Vec<f32>,
    pub tints: Vec<Vec3>,
    pub base_tints: Vec<Vec3>,
    pub life: Vec<f32>,
    pub ttl: Vec<f32>,
}

/// Mutable view over every column of one slot, so a respawn can't forget a
/// field or index two different particles by accident.
pub struct SlotMut<'a> {
    pub position: &'a mut Vec3,
    pub velocity: &'a mut Vec3,
    pub seed: &'a mut Vec3,
    pub size: &'a mut f32,
    pub boost: &'a mut f32,
    pub tint: &'a mut Vec3,
    pub base_tint: &'a mut Vec3,
    pub life: &'a mut f32,
    pub ttl: &'a mut f32,
}

impl ParticleArena {
    /// Initial field: a loose ring around the blob. `tint_count` colors the
    /// first N particles by playlist hue, the rest stay white.
    pub fn new(rng: &mut SeededRng, cfg: &FlowConfig, tint_count: usize) -> Self {
        let n = P_COUNT;
        let mut positions = Vec::with_capacity(n);
        let mut seeds = Vec::with_capacity(n);
        let mut base_tints = Vec::with_capacity(n);
        let (life_min, life_max) = cfg.life_range();
        let mut life = Vec::with_capacity(n);
        let mut ttl = Vec::with_capacity(n);
        for i in 0..n {
            let r = 1.8 + rng.next_f32() * 1.2;
            let th = rng.next_f32() * std::f32::consts::TAU;
            let y = 1.15 + (rng.next_f32() * 0.6 - 0.3);
            positions.push(Vec3::new(th.cos() * r, y, th.sin() * r));
            seeds.push(Vec3::new(r, 0.20 + rng.next_f32() * 0.25, th));
            let t = rng.range(life_min, life_max);
            ttl.push(t);
            // stagger initial lifetimes so the field doesn't expire in lockstep
            life.push(rng.range(0.0, t));
            base_tints.push(if i < tint_count {
                hue_tint(i as f32 / tint_count.max(1) as f32)
            } else {
                Vec3::ONE
            });
        }
        Self {
            positions,
            velocities: vec![Vec3::ZERO; n],
            seeds,
            sizes: vec![PARTICLE_SIZE; n],
            boosts: vec![PARTICLE_BOOST_BASE; n],
            tints: base_tints.clone(),
            base_tints,
            life,
            ttl,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn slot_mut(&mut self, i: usize) -> SlotMut<'_> {
        SlotMut {
            position: &mut self.positions[i],
            velocity: &mut self.velocities[i],
            seed: &mut self.seeds[i],
            size: &mut self.sizes[i],
            boost: &mut self.boosts[i],
            tint: &mut self.tints[i],
            base_tint: &mut self.base_tints[i],
            life: &mut self.life[i],
            ttl: &mut self.ttl[i],
        }
    }
}

/// HSL(hue, 0.9, 0.6) as RGB, matching the playlist hue wheel.
fn hue_tint(hue: f32) -> Vec3 {
    crate::spectrum::hsl_to_rgb(hue, 0.9, 0.6)
}

/// Pointer state for one frame, in canvas backing pixels.
#[derive(Clone, Copy, Debug)]
pub struct PointerFrame {
    pub screen_px: Vec2,
}

/// Unproject a screen pixel to the world point where its ray crosses the
/// horizontal plane `y = plane_y`. Returns `None` for rays parallel to the
/// plane or a degenerate projection.
pub fn pointer_world_at_y(
    screen_px: Vec2,
    plane_y: f32,
    inv_view_proj: &Mat4,
    viewport: Vec2,
) -> Option<Vec3> {
    // screen_px is top-origin canvas pixels, NDC y points up
    let ndc = Vec2::new(
        screen_px.x / viewport.x.max(1.0) * 2.0 - 1.0,
        -(screen_px.y / viewport.y.max(1.0) * 2.0 - 1.0),
    );
    let near = *inv_view_proj * glam::Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
    let far = *inv_view_proj * glam::Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    if near.w.abs() < 1e-6 || far.w.abs() < 1e-6 {
        return None;
    }
    let p0 = near.truncate() / near.w;
    let p1 = far.truncate() / far.w;
    let dir = p1 - p0;
    if dir.y.abs() < 1e-6 {
        return None;
    }
    let t = (plane_y - p0.y) / dir.y;
    (t >= 0.0).then(|| p0 + dir * t)
}

/// Per-frame tuning sourced from `VisualParams`.
#[derive(Clone, Copy, Debug)]
pub struct FlowTuning {
    pub speed_scale: f32,
    pub swirl: f32,
    pub damping: f32,
}

impl Default for FlowTuning {
    fn default() -> Self {
        Self {
            speed_scale: PARTICLE_SPEED_SCALE,
            swirl: PARTICLE_SWIRL,
            damping: PARTICLE_DAMPING,
        }
    }
}

/// Ambient particle flow: an orbiting emitter feeding the arena, with
/// recycle-on-return lifecycle.
pub struct AmbientFlow {
    pub cfg: FlowConfig,
    rng: SeededRng,
    t: f32,
    spawn_acc: f32,
    spawn_idx: usize,
}

impl AmbientFlow {
    pub fn new(cfg: FlowConfig) -> Self {
        let rng = SeededRng::new(cfg.seed);
        log::info!("[flow] emitter initialized seed={}", rng.seed());
        Self {
            cfg,
            rng,
            t: 0.0,
            spawn_acc: 0.0,
            spawn_idx: 0,
        }
    }

    /// Reset the RNG stream; with `Some(seed)` the flow becomes reproducible.
    pub fn reseed(&mut self, seed: Option<u64>) {
        self.cfg.seed = seed;
        self.rng = SeededRng::new(seed);
    }

    pub fn emitter_position(&self) -> Vec3 {
        let o = &self.cfg.orbit;
        let t = self.t;
        let r = o.r_base + o.r_amp1 * (t * o.r_freq1).sin() + o.r_amp2 * (t * o.r_freq2).sin();
        let ang = t * o.ang_speed + o.ang_osc_amp * (t * o.ang_osc_freq).sin();
        let y = o.y_base + o.y_amp * (t * o.y_osc1).sin() * (t * o.y_osc2).cos();
        Vec3::new(ang.cos() * r, y, ang.sin() * r)
    }

    /// Advance the emitter clock.
    pub fn update_emitter(&mut self, dt: f32) {
        self.t += dt;
    }

    /// Emission loop: recycle expired slots at the emitter. Never steals a
    /// live particle; when no dead slot is found within the probe budget the
    /// emission is dropped.
    pub fn spawn_loop(&mut self, arena: &mut ParticleArena, dt: f32) {
        self.spawn_acc += dt * self.cfg.emit_rate;
        let n = arena.len();
        let max_tries = n.min(64);
        let mut guard = 0usize;
        while self.spawn_acc >= 1.0 && guard < n {
            guard += 1;
            let mut i = self.spawn_idx % n;
            self.spawn_idx += 1;
            let mut tries = 0usize;
            while arena.life[i] > 0.0 && tries < max_tries {
                i = self.spawn_idx % n;
                self.spawn_idx += 1;
                tries += 1;
            }
            if arena.life[i] <= 0.0 {
                self.respawn(arena, i);
            }
            self.spawn_acc -= 1.0;
        }
    }

    fn respawn(&mut self, arena: &mut ParticleArena, i: usize) {
        let emitter = self.emitter_position();
        let j = self.cfg.spawn_jitter;
        let pos = emitter
            + Vec3::new(
                self.rng.range(-j, j),
                self.rng.range(-j, j),
                self.rng.range(-j, j),
            );

        // Planar push outward with spread plus a small vertical kick
        let spread = self.cfg.kick_spread;
        let dir_x = self.rng.range(-spread, spread);
        let dir_z = self.rng.range(-spread, spread);
        let nrm = dir_x.hypot(dir_z).max(1e-4);
        let vel = Vec3::new(
            dir_x / nrm * self.cfg.kick_speed,
            self.cfg.kick_y * self.rng.range(-1.0, 1.0),
            dir_z / nrm * self.cfg.kick_speed,
        );

        let (life_min, life_max) = self.cfg.life_range();
        let ttl = self.rng.range(life_min, life_max);
        let r = pos.x.hypot(pos.z);
        let th = pos.z.atan2(pos.x);
        let seed = Vec3::new(r.max(0.8), 0.20 + self.rng.next_f32() * 0.25, th);

        let slot = arena.slot_mut(i);
        *slot.position = pos;
        *slot.velocity = vel;
        *slot.seed = seed;
        *slot.ttl = ttl;
        *slot.life = ttl;
    }

    /// Full per-frame particle pass: emitter path, spawn, swirl + drift,
    /// pointer interaction, lifecycle, integration.
    pub fn step(
        &mut self,
        arena: &mut ParticleArena,
        dt: f32,
        tuning: FlowTuning,
        pointer: Option<&PointerFrame>,
        view_proj: &Mat4,
        viewport: Vec2,
    ) {
        self.update_emitter(dt);
        self.spawn_loop(arena, dt);

        let center = BLOB_CENTER;
        let swirl_y = self.cfg.swirl_y_factor;

        // baseline orbital + per-particle phase swirl
        for i in 0..arena.len() {
            let ph = arena.seeds[i].z + dt * arena.seeds[i].y * tuning.speed_scale;
            arena.seeds[i].z = ph;

            let rel = arena.positions[i] - center;
            let r = rel.length();
            if r > 1e-4 {
                let n = rel / r;
                let tang = n.cross(Vec3::Y).normalize();
                arena.velocities[i].x += tang.x * tuning.swirl * dt;
                arena.velocities[i].y += tang.y * tuning.swirl * dt * swirl_y;
                arena.velocities[i].z += tang.z * tuning.swirl * dt;

                arena.velocities[i].x += (ph * 1.3).cos() * 0.08 * dt;
                arena.velocities[i].z += (ph * 1.1).sin() * 0.08 * dt;
            }
        }

        match pointer {
            Some(p) => self.pointer_pass(arena, dt, p, view_proj, viewport),
            None => {
                for i in 0..arena.len() {
                    arena.boosts[i] = (arena.boosts[i] - NO_POINTER_DECAY_PER_SEC * dt).max(1.0);
                    let k = (NO_POINTER_DECAY_PER_SEC * dt).min(1.0);
                    let delta = arena.base_tints[i] - arena.tints[i];
                    arena.tints[i] += delta * k;
                }
            }
        }

        // lifetime -> return-to-source -> recycle near emitter
        let src = self.emitter_position();
        let gain = self.cfg.return_gain;
        let gain_y = self.cfg.return_gain_y;
        let rr2 = self.cfg.recycle_radius * self.cfg.recycle_radius;
        for i in 0..arena.len() {
            arena.life[i] = (arena.life[i] - dt).max(0.0);
            if arena.life[i] <= 0.0 {
                let d = src - arena.positions[i];
                arena.velocities[i].x += d.x * gain * dt;
                arena.velocities[i].y += d.y * gain * gain_y * dt;
                arena.velocities[i].z += d.z * gain * dt;
                if d.length_squared() < rr2 {
                    // fully returned; stop steering so the spawn loop can
                    // recycle the slot in place
                    arena.velocities[i] = Vec3::ZERO;
                }
            }
        }

        // integrate + damping
        for i in 0..arena.len() {
            let v = arena.velocities[i];
            arena.positions[i] += v * dt;
            arena.velocities[i] = v * tuning.damping;
        }
    }

    fn pointer_pass(
        &mut self,
        arena: &mut ParticleArena,
        dt: f32,
        pointer: &PointerFrame,
        view_proj: &Mat4,
        viewport: Vec2,
    ) {
        let r2 = POINTER_RADIUS_PX * POINTER_RADIUS_PX;
        let inv = view_proj.inverse();
        for i in 0..arena.len() {
            let w = arena.positions[i];
            let clip = *view_proj * w.extend(1.0);
            if clip.w.abs() < 1e-6 {
                continue;
            }
            let ndc = clip.truncate() / clip.w;
            let sx = (ndc.x * 0.5 + 0.5) * viewport.x;
            let sy = (ndc.y * 0.5 + 0.5) * viewport.y;
            let d = Vec2::new(sx, sy) - pointer.screen_px;
            if d.length_squared() <= r2 {
                arena.boosts[i] =
                    (arena.boosts[i] + POINTER_BOOST_UP_PER_SEC * dt).min(PARTICLE_BOOST_MAX);
                let k = (POINTER_TINT_UP_PER_SEC * dt).min(1.0);
                let delta = POINTER_HI_TINT - arena.tints[i];
                arena.tints[i] += delta * k;

                if let Some(target) = pointer_world_at_y(pointer.screen_px, w.y, &inv, viewport) {
                    let fx = (target.x - w.x) * POINTER_PULL_SPRING
                        - arena.velocities[i].x * POINTER_PULL_DAMP;
                    let fz = (target.z - w.z) * POINTER_PULL_SPRING
                        - arena.velocities[i].z * POINTER_PULL_DAMP;
                    arena.velocities[i].x += fx * dt;
                    arena.velocities[i].z += fz * dt;
                }
            } else {
                arena.boosts[i] = (arena.boosts[i] - POINTER_BOOST_DOWN_PER_SEC * dt).max(1.0);
                let k = (POINTER_TINT_DOWN_PER_SEC * dt).min(1.0);
                let delta = arena.base_tints[i] - arena.tints[i];
                arena.tints[i] += delta * k;
            }
        }
    }
}
