use glam::{Mat4, Vec3};

/// Manual orbit navigation around a look-at target. Owns the camera pose
/// whenever camera fly is inactive.
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.35,
            distance: 6.5,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let cp = self.pitch.cos();
        self.target
            + Vec3::new(
                self.yaw.cos() * cp * self.distance,
                self.pitch.sin() * self.distance,
                self.yaw.sin() * cp * self.distance,
            )
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.45, 1.45);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 + delta * 0.001)).clamp(1.5, 40.0);
    }

    /// Adopt a pose handed back by camera fly so manual control resumes
    /// exactly where the fly left off.
    pub fn set_pose(&mut self, eye: Vec3, target: Vec3) {
        self.target = target;
        let rel = eye - target;
        self.distance = rel.length().max(0.5);
        self.pitch = (rel.y / self.distance).clamp(-1.0, 1.0).asin();
        self.yaw = rel.z.atan2(rel.x);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

pub fn projection(width: u32, height: u32) -> Mat4 {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, aspect, 0.1, 500.0)
}

pub fn view_proj(eye: Vec3, target: Vec3, width: u32, height: u32) -> Mat4 {
    projection(width, height) * Mat4::look_at_rh(eye, target, Vec3::Y)
}
