use glam::Vec3;

// Shared scene tuning constants used by both the simulation and the web frontend.

// Particle arena size (fixed for the lifetime of the scene)
pub const P_COUNT: usize = 600;

// Blob sphere
pub const BLOB_RADIUS: f32 = 1.0;
pub const BLOB_CENTER: Vec3 = Vec3::new(0.0, 1.15, 0.0);

// Particle appearance defaults
pub const PARTICLE_SIZE: f32 = 0.010;
pub const PARTICLE_BOOST_BASE: f32 = 10.0;
pub const PARTICLE_BOOST_MAX: f32 = 100.0;
pub const PARTICLE_DAMPING: f32 = 0.9;
pub const PARTICLE_SPEED_SCALE: f32 = 0.9;
pub const PARTICLE_SWIRL: f32 = 0.5;

// Pointer interaction (screen-space)
pub const POINTER_RADIUS_PX: f32 = 80.0;
pub const POINTER_BOOST_UP_PER_SEC: f32 = 6.0;
pub const POINTER_TINT_UP_PER_SEC: f32 = 6.0;
pub const POINTER_BOOST_DOWN_PER_SEC: f32 = 3.0;
pub const POINTER_TINT_DOWN_PER_SEC: f32 = 3.0;
pub const NO_POINTER_DECAY_PER_SEC: f32 = 2.0;
pub const POINTER_PULL_SPRING: f32 = 16.0;
pub const POINTER_PULL_DAMP: f32 = 4.0;
pub const POINTER_HI_TINT: Vec3 = Vec3::new(1.0, 0.95, 0.2);

// Blob collision response (margin and push strength live in VisualParams)
pub const COLLISION_PUSH_Y_FACTOR: f32 = 0.4;

// Spectrum analyser contract
pub const ANALYSER_FFT_SIZE: u32 = 512;
pub const ANALYSER_SMOOTHING: f64 = 0.72;
pub const ANALYSER_BIN_COUNT: usize = 256;
// Ring uses the low half of the analyser bins
pub const BIN_COUNT: usize = 128;
pub const SPECTRUM_BASE_Y: f32 = 1.15;
pub const BAR_TEX_SIZE: usize = 256;

// Idle rainbow (rotates UV hue when no media texture is active)
pub const RAINBOW_ROT_PER_SEC: f32 = 0.35;

// Camera fly
pub const FLY_BLEND_DUR_SEC: f32 = 1.25;
pub const FLY_LOOK_BLEND_DUR_SEC: f32 = 0.8;
pub const FLY_POS_LERP: f32 = 0.18;
pub const FLY_LOOK_LERP: f32 = 0.22;
pub const FLY_CENTER: Vec3 = Vec3::new(0.0, 1.0, 0.0);

// Persistence
pub const STORAGE_KEY: &str = "lumoPlayerState.v1";
pub const PERSIST_DEBOUNCE_MS: i32 = 120;
pub const DEFAULT_PRESET_URL: &str = "/static/presets/default.json";

// Media readiness wait bound (cancelled earlier by a newer load)
pub const MEDIA_READY_TIMEOUT_MS: i32 = 8000;

// Luminance probe resolution
pub const PROBE_SIZE: usize = 128;
