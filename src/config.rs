//! Configuration management
//!
//! Recording parameters, still-frame export settings, flow options and the
//! output location, persisted as TOML.

use crate::errors::ChunkerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    pub recording: RecordingSection,
    pub still: StillConfig,
    pub flow: FlowConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSection {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    pub fast_start: bool,
    pub title: Option<String>,
    /// Frames buffered ahead of the encoder before appends are refused
    pub queue_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StillConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// How long to wait for the final still frame after finishing
    pub final_frame_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Skip the get-ready screen and go straight to the check
    pub disable_start_view: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub output_directory: String,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            recording: RecordingSection {
                width: 480,
                height: 640,
                fps: 30.0,
                bitrate: 1_000_000,
                fast_start: true,
                title: None,
                queue_depth: 8,
            },
            still: StillConfig {
                jpeg_quality: 90,
                final_frame_timeout_ms: 2000,
            },
            flow: FlowConfig {
                disable_start_view: false,
            },
            storage: StorageConfig {
                output_directory: "./liveness".to_string(),
            },
        }
    }
}

impl LivenessConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ChunkerError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ChunkerError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: LivenessConfig = toml::from_str(&contents).map_err(|e| {
            ChunkerError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ChunkerError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChunkerError::ConfigError(format!(
                        "Failed to create config directory: {}",
                        e
                    ))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            ChunkerError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            ChunkerError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("face-liveness.toml")
    }

    /// Load from the default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        let rec = &self.recording;
        if rec.width == 0 || rec.height == 0 {
            return Err("Invalid recording resolution".to_string());
        }
        if rec.width % 2 != 0 || rec.height % 2 != 0 {
            return Err("Recording resolution must be even for H.264".to_string());
        }
        if !(rec.fps > 0.0 && rec.fps <= 240.0) {
            return Err("Invalid FPS (must be in (0, 240])".to_string());
        }
        if rec.bitrate == 0 {
            return Err("Bitrate must be positive".to_string());
        }
        if rec.queue_depth == 0 {
            return Err("Queue depth must be at least 1".to_string());
        }

        if self.still.jpeg_quality == 0 || self.still.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }
        if self.still.final_frame_timeout_ms == 0 {
            return Err("Final frame timeout must be positive".to_string());
        }

        if self.storage.output_directory.trim().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }

        Ok(())
    }

    #[cfg(feature = "recording")]
    pub fn recording_config(&self) -> crate::recording::RecordingConfig {
        let rec = &self.recording;
        let mut config = crate::recording::RecordingConfig::new(rec.width, rec.height, rec.fps)
            .with_bitrate(rec.bitrate)
            .with_fast_start(rec.fast_start)
            .with_queue_depth(rec.queue_depth);
        if let Some(ref title) = rec.title {
            config = config.with_title(title.clone());
        }
        config
    }

    pub fn final_frame_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.still.final_frame_timeout_ms)
    }
}
