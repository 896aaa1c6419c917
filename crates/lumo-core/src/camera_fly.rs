use glam::Vec3;

use crate::constants::{
    FLY_BLEND_DUR_SEC, FLY_CENTER, FLY_LOOK_BLEND_DUR_SEC, FLY_LOOK_LERP, FLY_POS_LERP,
};

/// Closed-form camera paths selected by the digit keys 0..9. The match in
/// `position` is exhaustive: a new variant refuses to compile until it has a
/// trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlyMode {
    VerticalSweep,
    LowOval,
    WeaveOval,
    WideRing,
    Pendulum,
    Lissajous,
    BigWeave,
    Riser,
    FarOrbit,
    CloseOrbit,
}

impl FlyMode {
    pub fn from_digit(d: u32) -> Option<Self> {
        Some(match d {
            0 => Self::VerticalSweep,
            1 => Self::LowOval,
            2 => Self::WeaveOval,
            3 => Self::WideRing,
            4 => Self::Pendulum,
            5 => Self::Lissajous,
            6 => Self::BigWeave,
            7 => Self::Riser,
            8 => Self::FarOrbit,
            9 => Self::CloseOrbit,
            _ => return None,
        })
    }

    pub fn position(self, t: f32) -> Vec3 {
        match self {
            Self::VerticalSweep => {
                let y = 1.6 + 0.9 * (t * 0.6).sin();
                Vec3::new(0.0, y, 0.0001)
            }
            Self::LowOval => {
                let ang = t * 0.22 + 0.35 * (t * 0.17).sin();
                let y = 1.6 + 0.25 * (t * 0.27).sin();
                Vec3::new(ang.cos() * 3.6, y, ang.sin() * 4.2)
            }
            Self::WeaveOval => {
                let ang = t * 0.38 + 0.6 * (t * 0.11).sin();
                let y = 1.3 + 0.45 * (t * 0.63).sin() * (t * 0.21).cos();
                Vec3::new(ang.cos() * 2.2, y, ang.sin() * 2.8)
            }
            Self::WideRing => {
                let base_r = 5.2 + 0.6 * (t * 0.20).sin();
                let ang = t * 0.14 + 0.25 * (t * 0.07).sin();
                let y = 2.2 + 0.6 * (t * 0.33).sin();
                Vec3::new(ang.cos() * base_r, y, ang.sin() * base_r)
            }
            Self::Pendulum => {
                let ang = t * 0.28;
                let y = 1.4 + 1.8 * ang.sin();
                let z = 3.2 * ang.cos();
                let x = (0.6 + 0.25 * (t * 0.20).sin()) * (ang * 2.0 + 0.5 * (t * 0.35).sin()).cos();
                Vec3::new(x, y, z)
            }
            Self::Lissajous => {
                let ang = t * 0.42 + 0.2 * (t * 0.5).sin();
                let y = 1.2 + 1.2 * ang.sin();
                let z = 2.2 * ang.cos();
                let x = (0.9 + 0.35 * (t * 0.27 + (t * 0.13).sin()).sin())
                    * (ang * 2.6 + 0.6 * (t * 0.31).sin()).sin();
                Vec3::new(x, y, z)
            }
            Self::BigWeave => {
                let ang = t * 0.20;
                let pre = 0.35 * (t * 0.15).sin();
                let ry = 2.4 + 0.4 * (t * 0.18).sin();
                let rz = 4.0 + 0.6 * (t * 0.11 + 0.3).sin();
                let y = 1.6 + ry * (ang + pre).sin();
                let z = rz * (ang - pre).cos();
                let x = (1.2 + 0.5 * (t * 0.22).sin() + 0.2 * (t * 0.47).sin())
                    * (ang * 1.8 + 0.8 * (t * 0.19).sin()).cos();
                Vec3::new(x, y, z)
            }
            Self::Riser => {
                let y = 1.5 + 1.2 * (t * 0.6).sin();
                let r = 3.4 + 0.4 * (t * 0.21).sin();
                let a = 0.35 * (t * 0.33).sin();
                Vec3::new(a.cos() * r, y, a.sin() * r)
            }
            Self::FarOrbit => {
                let r = 6.4 + 0.7 * (t * 0.18).sin();
                let ang = t * 0.10 + 0.45 * (t * 0.09).sin();
                let y = 1.4 + 0.25 * (t * 0.38).sin();
                Vec3::new(ang.cos() * r, y, ang.sin() * r)
            }
            Self::CloseOrbit => {
                let r = 3.3 + 0.5 * (t * 0.27).sin();
                let ang = t * 0.26 + 0.35 * (t * 0.14).sin();
                let y = 1.2 + 0.5 * (t * 0.52).sin() * (t * 0.19).cos();
                Vec3::new(ang.cos() * r, y, ang.sin() * r)
            }
        }
    }
}

/// Where a mode wants the camera to look.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookTargetKind {
    Center,
    /// Follows the particle emitter (CloseOrbit)
    Emitter,
    /// Follows an externally supplied object, the blue attractor (LowOval)
    External,
}

/// Live positions a fly update can resolve its look target against.
#[derive(Clone, Copy, Debug)]
pub struct LookTargets {
    pub emitter: Vec3,
    pub external: Option<Vec3>,
}

fn target_kind(mode: FlyMode, external: Option<Vec3>) -> LookTargetKind {
    match mode {
        FlyMode::CloseOrbit => LookTargetKind::Emitter,
        FlyMode::LowOval if external.is_some() => LookTargetKind::External,
        _ => LookTargetKind::Center,
    }
}

fn live_target(mode: FlyMode, targets: &LookTargets) -> Vec3 {
    match target_kind(mode, targets.external) {
        LookTargetKind::Emitter => targets.emitter,
        LookTargetKind::External => targets.external.unwrap_or(FLY_CENTER),
        LookTargetKind::Center => FLY_CENTER,
    }
}

#[inline]
fn ease(x: f32) -> f32 {
    // cubic in-out
    let x = x.clamp(0.0, 1.0);
    if x < 0.5 {
        4.0 * x * x * x
    } else {
        1.0 - (-2.0 * x + 2.0).powi(3) / 2.0
    }
}

/// Frame-rate-independent lerp factor for a 60 Hz-calibrated constant.
#[inline]
pub fn lerp_factor(k: f32, dt: f32) -> f32 {
    1.0 - (1.0 - k).powi(((dt * 60.0).round() as i32).max(1))
}

/// Autonomous camera with smooth path and look-target transitions between
/// modes. While active it owns the camera; `stop` hands control back to the
/// orbit controls.
pub struct CameraFly {
    pub active: bool,
    mode: FlyMode,
    prev_mode: FlyMode,
    t: f32,
    pos: Vec3,
    look: Vec3,
    blend: f32,
    look_blend: f32,
}

impl CameraFly {
    pub fn new() -> Self {
        Self {
            active: false,
            mode: FlyMode::VerticalSweep,
            prev_mode: FlyMode::VerticalSweep,
            t: 0.0,
            pos: Vec3::ZERO,
            look: FLY_CENTER,
            blend: 1.0,
            look_blend: 1.0,
        }
    }

    pub fn mode(&self) -> FlyMode {
        self.mode
    }

    /// Begin or switch modes. From rest the camera snaps its state to the
    /// current pose; an active switch cross-blends, and the look ramp resets
    /// only when the destination target kind changes.
    pub fn start(
        &mut self,
        mode: FlyMode,
        camera_pos: Vec3,
        camera_target: Vec3,
        targets: &LookTargets,
    ) {
        if !self.active {
            self.active = true;
            self.mode = mode;
            self.prev_mode = mode;
            self.blend = 1.0;
            self.look_blend = 1.0;
            self.t = 0.0;
            self.pos = camera_pos;
            self.look = camera_target;
            return;
        }
        if mode != self.mode {
            let kind_changed = target_kind(self.mode, targets.external)
                != target_kind(mode, targets.external)
                || (mode == FlyMode::LowOval && targets.external.is_none())
                || (mode != FlyMode::LowOval && self.mode == FlyMode::LowOval);
            self.prev_mode = self.mode;
            self.mode = mode;
            self.blend = 0.0;
            if kind_changed {
                self.look_blend = 0.0;
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.blend = 1.0;
        self.look_blend = 1.0;
    }

    /// Advance and return the camera pose, or `None` while inactive.
    pub fn update(&mut self, dt: f32, targets: &LookTargets) -> Option<(Vec3, Vec3)> {
        if !self.active {
            return None;
        }
        self.t += dt;

        // both paths run on the shared clock so the blend never teleports
        let p_a = self.prev_mode.position(self.t);
        let p_b = self.mode.position(self.t);
        if self.blend < 1.0 {
            self.blend = (self.blend + dt / FLY_BLEND_DUR_SEC.max(1e-4)).min(1.0);
        }
        let target_pos = p_a.lerp(p_b, ease(self.blend));

        if self.look_blend < 1.0 {
            self.look_blend = (self.look_blend + dt / FLY_LOOK_BLEND_DUR_SEC.max(1e-4)).min(1.0);
        }
        let look_ramp = ease(self.look_blend);
        let live = live_target(self.mode, targets);

        let pl = lerp_factor(FLY_POS_LERP, dt);
        // look smoothing starts gentle on a fresh ramp, then locks on
        let ll = lerp_factor(FLY_LOOK_LERP, dt) * (0.35 + 0.65 * look_ramp);

        self.pos = self.pos.lerp(target_pos, pl);
        self.look = self.look.lerp(live, ll);
        Some((self.pos, self.look))
    }
}

impl Default for CameraFly {
    fn default() -> Self {
        Self::new()
    }
}
