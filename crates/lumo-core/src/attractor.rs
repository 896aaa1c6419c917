use fnv::FnvHashMap;
use glam::Vec3;
use smallvec::SmallVec;

use crate::particles::ParticleArena;
use crate::rng::SeededRng;

/// Stable handle for one attractor; valid until removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttractorId(u32);

#[derive(Clone, Copy, Debug)]
pub struct AttractorConfig {
    pub color: Vec3,
    pub dot_size: f32,
    /// Orbit angular speed, rad/s
    pub speed: f32,
    pub r_x: f32,
    pub r_z: f32,
    pub y_base: f32,
    pub y_amp: f32,
    /// Influence radius
    pub radius: f32,
    pub strength: f32,
    pub damping_toward: f32,
    /// Initial orbit phase; randomized when `None`
    pub phase: Option<f32>,
}

impl Default for AttractorConfig {
    fn default() -> Self {
        Self {
            color: Vec3::new(0x4d as f32 / 255.0, 0xa3 as f32 / 255.0, 0xff as f32 / 255.0),
            dot_size: 0.035,
            speed: 0.55,
            r_x: 2.0,
            r_z: 1.3,
            y_base: 1.15,
            y_amp: 0.35,
            radius: 0.9,
            strength: 9.0,
            damping_toward: 2.5,
            phase: None,
        }
    }
}

struct Attractor {
    cfg: AttractorConfig,
    t: f32,
    position: Vec3,
}

/// Roaming attractors that pull nearby particles toward an orbiting point.
pub struct AttractorSet {
    entries: FnvHashMap<u32, Attractor>,
    order: SmallVec<[u32; 8]>,
    next_id: u32,
}

impl AttractorSet {
    pub fn new() -> Self {
        Self {
            entries: FnvHashMap::default(),
            order: SmallVec::new(),
            next_id: 0,
        }
    }

    /// The stock pair: the blue tracker (camera mode 1 follows it) and a
    /// slow heavy dark one.
    pub fn with_defaults(rng: &mut SeededRng) -> (Self, AttractorId) {
        let mut set = Self::new();
        let blue = set.add(AttractorConfig::default(), rng);
        set.add(
            AttractorConfig {
                color: Vec3::ZERO,
                dot_size: 0.5,
                speed: 0.01,
                r_x: 3.6,
                r_z: 1.0,
                y_amp: 0.25,
                radius: 2.0,
                strength: 20.0,
                ..AttractorConfig::default()
            },
            rng,
        );
        (set, blue)
    }

    pub fn add(&mut self, cfg: AttractorConfig, rng: &mut SeededRng) -> AttractorId {
        let id = self.next_id;
        self.next_id += 1;
        let phase = cfg
            .phase
            .unwrap_or_else(|| rng.next_f32() * std::f32::consts::TAU);
        self.entries.insert(
            id,
            Attractor {
                cfg,
                t: phase,
                position: Vec3::ZERO,
            },
        );
        self.order.push(id);
        AttractorId(id)
    }

    pub fn remove(&mut self, id: AttractorId) -> bool {
        if self.entries.remove(&id.0).is_some() {
            self.order.retain(|x| *x != id.0);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, id: AttractorId) -> Option<Vec3> {
        self.entries.get(&id.0).map(|a| a.position)
    }

    pub fn config(&self, id: AttractorId) -> Option<&AttractorConfig> {
        self.entries.get(&id.0).map(|a| &a.cfg)
    }

    /// Dot positions + colors in insertion order, for the renderer.
    pub fn dots(&self) -> impl Iterator<Item = (Vec3, Vec3, f32)> + '_ {
        self.order.iter().filter_map(|id| {
            self.entries
                .get(id)
                .map(|a| (a.position, a.cfg.color, a.cfg.dot_size))
        })
    }

    /// Animate orbits and pull particles within each influence radius.
    pub fn update(&mut self, arena: &mut ParticleArena, dt: f32) {
        for id in &self.order {
            let Some(a) = self.entries.get_mut(id) else {
                continue;
            };
            let p = &a.cfg;

            a.t += dt * p.speed;
            let x = a.t.cos() * p.r_x;
            let z = (a.t * 0.97).sin() * p.r_z;
            let y = p.y_base + (a.t * 0.63).sin() * p.y_amp;
            a.position = Vec3::new(x, y, z);

            let r2 = p.radius * p.radius;
            for i in 0..arena.len() {
                let d = a.position - arena.positions[i];
                let d2 = d.length_squared();
                if d2 > r2 {
                    continue;
                }
                let fall = 1.0 - d2 / r2;
                let k = p.strength * fall;
                let damp = p.damping_toward;
                let v = arena.velocities[i];
                arena.velocities[i].x += (d.x * k - v.x * damp) * dt;
                // keep the ring feel; vertical pull is softened
                arena.velocities[i].y += (d.y * k - v.y * damp) * dt * 0.40;
                arena.velocities[i].z += (d.z * k - v.z * damp) * dt;
            }
        }
    }
}

impl Default for AttractorSet {
    fn default() -> Self {
        Self::new()
    }
}
