//! Runtime configuration for a mounted scene.
//!
//! Every field has a default, so an empty JSON object (or no config at all)
//! reproduces the stock desk.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::OrbitParams;
use crate::error::SceneError;

/// Allowed particle count range.
pub const MIN_PARTICLES: usize = 50;
pub const MAX_PARTICLES: usize = 100;

/// Thresholds for the adaptive pixel-ratio step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Number of ticks between quality checks.
    pub check_interval_ticks: u32,
    /// Below this FPS the pixel ratio drops to the floor.
    pub low_fps: f32,
    /// Above this FPS the pixel ratio is raised towards the ceiling.
    pub high_fps: f32,
    /// Upper bound for the raised pixel ratio.
    pub ceiling: f32,
    /// Lower bound; the pixel ratio is never set below this.
    pub floor: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            check_interval_ticks: 60,
            low_fps: 30.0,
            high_fps: 50.0,
            ceiling: 1.5,
            floor: 1.0,
        }
    }
}

impl QualityConfig {
    /// Floor raised to at least 1.0, ceiling raised to at least the floor.
    pub fn sanitized(mut self) -> Self {
        self.floor = if self.floor.is_finite() { self.floor.max(1.0) } else { 1.0 };
        self.ceiling = if self.ceiling.is_finite() {
            self.ceiling.max(self.floor)
        } else {
            self.floor
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Fixed seed for prop jitter and textures. `None` derives one from the clock.
    pub seed: Option<u64>,
    pub particle_count: usize,
    /// Requested shadow map edge; the renderer clamps it to the device limit.
    pub shadow_map_size: u32,
    pub quality: QualityConfig,
    /// Pixel-ratio ceiling applied on container resize.
    pub resize_pixel_ratio_ceiling: f32,
    /// Overrides the host-reported device pixel ratio.
    pub device_pixel_ratio: Option<f32>,
    pub camera: OrbitParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: None,
            particle_count: MIN_PARTICLES,
            shadow_map_size: 4096,
            quality: QualityConfig::default(),
            resize_pixel_ratio_ceiling: 2.0,
            device_pixel_ratio: None,
            camera: OrbitParams::default(),
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.quality = config.quality.sanitized();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Particle count clamped to the supported range.
    pub fn particle_count(&self) -> usize {
        self.particle_count.clamp(MIN_PARTICLES, MAX_PARTICLES)
    }

    /// Seed to use for this mount. `entropy` is only consulted without a fixed seed.
    pub fn resolve_seed(&self, entropy: u64) -> u64 {
        self.seed
            .unwrap_or_else(|| crate::rng::seed_from_entropy(entropy))
    }

    /// Device pixel ratio after applying the override, never below 1.0.
    pub fn device_pixel_ratio(&self, reported: f32) -> f32 {
        let ratio = self.device_pixel_ratio.unwrap_or(reported);
        if ratio.is_finite() {
            ratio.max(1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            SceneConfig::from_json(r#"{ "seed": 12, "quality": { "low_fps": 24.0 } }"#).unwrap();
        assert_eq!(config.seed, Some(12));
        assert_eq!(config.quality.low_fps, 24.0);
        assert_eq!(config.quality.high_fps, 50.0);
        assert_eq!(config.particle_count, 50);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = SceneConfig::from_json("{ seed: ").unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn test_quality_bounds_sanitized_on_load() {
        let config = SceneConfig::from_json(r#"{"quality":{"floor":0.25,"ceiling":0.5}}"#).unwrap();
        assert_eq!(config.quality.floor, 1.0);
        assert_eq!(config.quality.ceiling, 1.0);

        let config = SceneConfig::from_json(r#"{"quality":{"floor":1.25}}"#).unwrap();
        assert_eq!(config.quality.floor, 1.25);
        assert_eq!(config.quality.ceiling, 1.5);
    }

    #[test]
    fn test_particle_count_clamped() {
        let mut config = SceneConfig::default();
        config.particle_count = 10;
        assert_eq!(config.particle_count(), 50);
        config.particle_count = 500;
        assert_eq!(config.particle_count(), 100);
        config.particle_count = 75;
        assert_eq!(config.particle_count(), 75);
    }

    #[test]
    fn test_resolve_seed() {
        let mut config = SceneConfig::default();
        config.seed = Some(5);
        assert_eq!(config.resolve_seed(123), 5);
        config.seed = None;
        assert_eq!(config.resolve_seed(123), config.resolve_seed(123));
    }

    #[test]
    fn test_device_pixel_ratio_override() {
        let mut config = SceneConfig::default();
        assert_eq!(config.device_pixel_ratio(2.0), 2.0);
        assert_eq!(config.device_pixel_ratio(0.5), 1.0);
        config.device_pixel_ratio = Some(3.0);
        assert_eq!(config.device_pixel_ratio(1.0), 3.0);
    }
}
