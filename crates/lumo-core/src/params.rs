use serde::{Deserialize, Serialize};

use crate::starfield::{SkyConfig, StarAppearance, StarLayout};

/// Persisted visual tuning. Everything the user can adjust and expect back
/// on the next visit round-trips through the snapshot in `persist`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualParams {
    // Point cloud
    pub point_size: f32,
    pub pc_audio_react: bool,
    pub pc_react_amount: f32,

    // Blob surface
    pub rotation_speed: f32,
    pub displacement_amp: f32,
    pub noise_freq: f32,
    pub tex_strength: f32,

    // Particle tuning on top of the flow defaults
    pub particle_speed_scale: f32,
    pub particle_push_strength: f32,
    pub particle_margin: f32,
    pub particle_damping: f32,
    pub particle_swirl: f32,

    // Spectrum ring
    pub spectrum_radius: f32,
    pub spectrum_height: f32,
    pub spectrum_gain: f32,
    pub spectrum_hue_shift: f32,
    pub auto_show_bands: bool,
    pub show_threshold: f32,
    pub show_smoothing: f32,

    // Starfield
    pub star_layout: StarLayout,
    pub star_appearance: StarAppearance,
    pub sky: SkyConfig,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            point_size: 2.2,
            pc_audio_react: true,
            pc_react_amount: 0.8,
            rotation_speed: 0.25,
            displacement_amp: 0.22,
            noise_freq: 1.2,
            tex_strength: 1.0,
            particle_speed_scale: 0.9,
            particle_push_strength: 5.0,
            particle_margin: 0.08,
            particle_damping: 0.9,
            particle_swirl: 0.5,
            spectrum_radius: 2.0,
            spectrum_height: 0.9,
            spectrum_gain: 1.0,
            spectrum_hue_shift: 0.0,
            auto_show_bands: true,
            show_threshold: 0.04,
            show_smoothing: 0.85,
            star_layout: StarLayout::default(),
            star_appearance: StarAppearance::default(),
            sky: SkyConfig::default(),
        }
    }
}
