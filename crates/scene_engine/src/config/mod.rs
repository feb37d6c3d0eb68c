//! Configuration system

pub use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;
use crate::scene::Layer;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Scene-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Colour the frame is cleared to while no camera is registered
    pub background_color: Vec3,

    /// Skip renderables whose bounding sphere is outside the camera frustum
    pub frustum_culling: bool,

    /// Layer bits tested by [`crate::scene::Scene::raycast`]
    pub raycast_layers: u32,

    /// Seconds between frames-per-second samples
    pub fps_window: f32,

    /// Initial render target size in pixels
    pub screen_size: (u32, u32),
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background_color: Vec3::new(0.8, 0.1, 0.8),
            frustum_culling: true,
            raycast_layers: (Layer::ALL - Layer::IGNORE_RAYCAST).bits(),
            fps_window: 1.0,
            screen_size: (1280, 720),
        }
    }
}

impl SceneConfig {
    /// Layer mask used by default raycasts
    pub fn raycast_mask(&self) -> Layer {
        Layer::from_bits_retain(self.raycast_layers)
    }
}

impl Config for SceneConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_config_round_trips_through_ron() {
        let config = SceneConfig {
            frustum_culling: false,
            fps_window: 0.5,
            ..SceneConfig::default()
        };
        let text = ron::to_string(&config).expect("serialize");
        let parsed: SceneConfig = ron::from_str(&text).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let parsed: SceneConfig = toml::from_str("frustum_culling = false").expect("parse");
        assert!(!parsed.frustum_culling);
        assert_eq!(parsed.background_color, SceneConfig::default().background_color);
        assert!(!parsed.raycast_mask().contains(Layer::IGNORE_RAYCAST));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = SceneConfig::default().save_to_file("scene.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
