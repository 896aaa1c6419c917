use glam::{Mat4, Vec2, Vec3};

use crate::attractor::{AttractorId, AttractorSet};
use crate::camera_fly::{CameraFly, FlyMode, LookTargets};
use crate::constants::*;
use crate::media::{ActiveSource, MediaKind, MediaSession};
use crate::params::VisualParams;
use crate::particles::{AmbientFlow, FlowConfig, FlowTuning, ParticleArena, PointerFrame};
use crate::playlist::Playlist;
use crate::probe::{BlobSurface, MediaProbe};
use crate::rng::SeededRng;
use crate::spectrum::{self, RingVertex, SpectrumGate};
use crate::starfield::{Starfield, StarfieldDelta};

/// Hover/lock state fed by the picking pass. At most one particle is locked
/// at a time.
#[derive(Debug, Default)]
pub struct PickLock {
    hovered: Option<u32>,
    locked: Option<u32>,
}

impl PickLock {
    pub fn set_hovered(&mut self, id: Option<u32>) {
        self.hovered = id;
    }

    pub fn hovered(&self) -> Option<u32> {
        self.hovered
    }

    pub fn locked(&self) -> Option<u32> {
        self.locked
    }

    /// Pointer-down locks the hovered particle when nothing is locked yet.
    /// Returns true if the lock state changed.
    pub fn pointer_down(&mut self) -> bool {
        match (self.locked, self.hovered) {
            (None, Some(h)) => {
                self.locked = Some(h);
                true
            }
            _ => false,
        }
    }

    /// Double-click releases the lock, but only on the locked particle
    /// itself.
    pub fn double_click(&mut self) -> bool {
        if self.locked.is_some() && self.locked == self.hovered {
            self.locked = None;
            true
        } else {
            false
        }
    }
}

/// Everything the frontend feeds the simulation for one tick.
pub struct FrameInput<'a> {
    pub dt: f32,
    /// Pointer position in canvas backing pixels, if over the canvas
    pub pointer: Option<Vec2>,
    pub view_proj: Mat4,
    pub viewport: Vec2,
    /// Camera pose under manual orbit control, used as the fly blend origin
    pub camera_pos: Vec3,
    pub camera_target: Vec3,
    /// Frequency-domain bytes from the analyser, when audio is wired
    pub freq_bins: Option<&'a [u8]>,
}

/// Per-tick results the renderer consumes.
pub struct FrameOutputs {
    /// Pose override while camera fly is active
    pub camera: Option<(Vec3, Vec3)>,
    pub audio_level: f32,
    pub ring_visible: bool,
    pub point_size: f32,
    /// Idle shading phase; only advances with no media bound
    pub rainbow_phase: f32,
    pub idle_rainbow: bool,
    /// True when the active source is audio-only and the bar texture needs
    /// a redraw this frame
    pub draw_bar_texture: bool,
}

/// The whole scene state apart from GPU resources. One instance per canvas,
/// stepped exactly once per display refresh.
pub struct Session {
    pub params: VisualParams,
    pub arena: ParticleArena,
    pub flow: AmbientFlow,
    pub attractors: AttractorSet,
    pub blue_attractor: AttractorId,
    pub starfield: Starfield,
    pub fly: CameraFly,
    pub media: MediaSession,
    pub playlist: Playlist,
    pub probe: MediaProbe,
    pub surface: BlobSurface,
    pub pick: PickLock,
    gate: SpectrumGate,
    ring: Vec<RingVertex>,
    time: f32,
    rainbow_phase: f32,
}

impl Session {
    pub fn new(params: VisualParams, seed: Option<u64>) -> Self {
        let mut rng = SeededRng::new(seed);
        let cfg = FlowConfig {
            seed: seed.map(|_| rng.derive(1).seed()),
            ..FlowConfig::default()
        };
        let mut flow_rng = rng.derive(2);
        let arena = ParticleArena::new(&mut flow_rng, &cfg, 0);
        let flow = AmbientFlow::new(cfg);
        let (attractors, blue_attractor) = AttractorSet::with_defaults(&mut rng);
        let starfield = Starfield::new(
            params.star_layout,
            params.star_appearance,
            params.sky,
        );
        let mut surface = BlobSurface::new(rng.derive(3).seed() as u32);
        surface.noise_freq = params.noise_freq;
        surface.amp = params.displacement_amp;
        surface.tex_strength = params.tex_strength;
        Self {
            params,
            arena,
            flow,
            attractors,
            blue_attractor,
            starfield,
            fly: CameraFly::new(),
            media: MediaSession::new(),
            playlist: Playlist::default(),
            probe: MediaProbe::new(),
            surface,
            pick: PickLock::default(),
            gate: SpectrumGate::new(),
            ring: Vec::new(),
            time: 0.0,
            rainbow_phase: 0.0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn rainbow_phase(&self) -> f32 {
        self.rainbow_phase
    }

    /// Ring geometry from the last tick, already closed into a loop.
    pub fn ring_vertices(&self) -> &[RingVertex] {
        &self.ring
    }

    pub fn audio_level(&self) -> f32 {
        self.gate.level()
    }

    /// Push fresh visual params into the subsystems that cache them. Returns
    /// the starfield work the edit requires.
    pub fn apply_params(&mut self, params: VisualParams) -> StarfieldDelta {
        self.surface.noise_freq = params.noise_freq;
        self.surface.amp = params.displacement_amp;
        self.surface.tex_strength = params.tex_strength;
        let delta =
            self.starfield
                .configure(params.star_layout, params.star_appearance, params.sky);
        self.params = params;
        delta
    }

    /// Start a camera fly mode from a digit key.
    pub fn fly_digit(&mut self, digit: u32, camera_pos: Vec3, camera_target: Vec3) {
        let Some(mode) = FlyMode::from_digit(digit) else {
            return;
        };
        let targets = self.look_targets();
        self.fly.start(mode, camera_pos, camera_target, &targets);
        log::info!("[fly] mode {:?}", mode);
    }

    fn look_targets(&self) -> LookTargets {
        LookTargets {
            emitter: self.flow.emitter_position(),
            external: self.attractors.position(self.blue_attractor),
        }
    }

    fn idle_rainbow(&self) -> bool {
        matches!(self.media.source(), ActiveSource::None) && !self.surface.use_texture
    }

    /// One scheduler tick. Order is fixed: time, idle shading, particles,
    /// attractors, starfield, audio analysis, collision, spectrum ring,
    /// camera fly. Rendering and I/O stay outside.
    pub fn advance(&mut self, input: FrameInput<'_>) -> FrameOutputs {
        let dt = input.dt.clamp(0.0, 0.1);
        self.time += dt;

        let idle_rainbow = self.idle_rainbow();
        if idle_rainbow {
            self.rainbow_phase = (self.rainbow_phase + RAINBOW_ROT_PER_SEC * dt).rem_euclid(1.0);
        }

        let tuning = FlowTuning {
            speed_scale: self.params.particle_speed_scale,
            swirl: self.params.particle_swirl,
            damping: self.params.particle_damping,
        };
        let pointer = input.pointer.map(|screen_px| PointerFrame { screen_px });
        self.flow.step(
            &mut self.arena,
            dt,
            tuning,
            pointer.as_ref(),
            &input.view_proj,
            input.viewport,
        );
        self.attractors.update(&mut self.arena, dt);
        self.starfield.update(dt);

        let audio_level = input.freq_bins.map(spectrum::audio_level).unwrap_or(0.0);
        let smoothed = self.gate.feed(audio_level, &self.params);

        self.surface.collision_pass(
            &mut self.arena,
            dt,
            self.time,
            &self.probe,
            self.params.particle_margin,
            self.params.particle_push_strength,
        );

        if let Some(bins) = input.freq_bins {
            spectrum::ring_vertices(bins, &self.params, &mut self.ring);
        } else {
            self.ring.clear();
        }

        let camera = {
            let targets = self.look_targets();
            self.fly.update(dt, &targets)
        };

        FrameOutputs {
            camera,
            audio_level: smoothed,
            ring_visible: !self.ring.is_empty() && self.gate.visible(&self.params),
            point_size: spectrum::reactive_point_size(&self.params, smoothed),
            rainbow_phase: self.rainbow_phase,
            idle_rainbow,
            draw_bar_texture: self.media.source().kind() == Some(MediaKind::Audio)
                && input.freq_bins.is_some(),
        }
    }
}
