use rand::prelude::*;

/// Single RNG type shared by every randomized subsystem (particles, stars,
/// attractor phases). A fixed seed reproduces the exact same scene.
pub struct SeededRng {
    rng: StdRng,
    seed: u64,
}

impl SeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The effective seed, useful for logging and for deriving child streams.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent stream for a subsystem, derived so reseeding one does not
    /// shift the draws of another.
    pub fn derive(&self, stream: u64) -> Self {
        let mix = self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self {
            rng: StdRng::seed_from_u64(mix),
            seed: mix,
        }
    }

    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    #[inline]
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.rng.gen::<f32>()
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.rng.gen()
    }
}
