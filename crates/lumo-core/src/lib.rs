pub mod attractor;
pub mod camera_fly;
pub mod constants;
pub mod media;
pub mod params;
pub mod particles;
pub mod persist;
pub mod playlist;
pub mod probe;
pub mod rng;
pub mod session;
pub mod spectrum;
pub mod starfield;

// Shaders bundled as string constants
pub static SKY_WGSL: &str = include_str!("../shaders/sky.wgsl");
pub static STARS_WGSL: &str = include_str!("../shaders/stars.wgsl");
pub static PARTICLES_WGSL: &str = include_str!("../shaders/particles.wgsl");
pub static BLOB_WGSL: &str = include_str!("../shaders/blob.wgsl");
pub static SPECTRUM_WGSL: &str = include_str!("../shaders/spectrum.wgsl");
pub static PICK_WGSL: &str = include_str!("../shaders/pick.wgsl");

pub use attractor::*;
pub use camera_fly::*;
pub use constants::*;
pub use media::*;
pub use params::*;
pub use particles::*;
pub use persist::*;
pub use playlist::*;
pub use probe::*;
pub use rng::*;
pub use session::*;
pub use spectrum::*;
pub use starfield::*;
