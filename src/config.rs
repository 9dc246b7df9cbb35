// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every section is optional; missing keys fall back to defaults, and a missing
// or broken file falls back to the default configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::api::BackendType;
use crate::gpu_core::PresentMode;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
    pub shaders: ShaderConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hello Triangle".to_string(),
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub backend: String,
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub max_frames_in_flight: usize,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: "vulkan".to_string(),
            present_mode: "mailbox".to_string(),
            clear_color: [0.1, 0.2, 0.8, 1.0],
            max_frames_in_flight: crate::frame::MAX_FRAMES_IN_FLIGHT,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_to_file: bool,
    pub log_file: String,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: cfg!(debug_assertions),
            log_to_file: false,
            log_file: "rhi_debug.log".to_string(),
            show_fps: true,
        }
    }
}

/// SPIR-V shader paths
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    pub vertex: String,
    pub fragment: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex: "shaders/hello_triangle.vert.spv".to_string(),
            fragment: "shaders/hello_triangle.frag.spv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn present_mode(&self) -> PresentMode {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => PresentMode::Immediate,
            "mailbox" => PresentMode::Mailbox,
            "fifo" => PresentMode::Fifo,
            "fifo_relaxed" => PresentMode::FifoRelaxed,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to FIFO",
                    self.graphics.present_mode
                );
                PresentMode::Fifo
            }
        }
    }

    pub fn backend(&self) -> BackendType {
        match self.graphics.backend.to_lowercase().as_str() {
            "vulkan" => BackendType::Vulkan,
            "null" => BackendType::Null,
            _ => {
                log::warn!(
                    "Unknown backend '{}', defaulting to Vulkan",
                    self.graphics.backend
                );
                BackendType::Vulkan
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.graphics.max_frames_in_flight, 2);
        assert_eq!(config.backend(), BackendType::Vulkan);
        assert_eq!(config.present_mode(), PresentMode::Mailbox);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [graphics]
            backend = "null"
            present_mode = "FIFO_RELAXED"

            [shaders]
            vertex = "a.spv"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend(), BackendType::Null);
        assert_eq!(config.present_mode(), PresentMode::FifoRelaxed);
        assert_eq!(config.shaders.vertex, "a.spv");
        assert_eq!(config.shaders.fragment, "shaders/hello_triangle.frag.spv");
        assert_eq!(config.window.title, "Hello Triangle");
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let config = Config::parse(
            r#"
            [graphics]
            backend = "metal"
            present_mode = "vsync"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend(), BackendType::Vulkan);
        assert_eq!(config.present_mode(), PresentMode::Fifo);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(Config::parse("[window\nwidth = ").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.graphics.clear_color, [0.1, 0.2, 0.8, 1.0]);
    }
}
