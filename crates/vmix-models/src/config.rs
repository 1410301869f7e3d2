//! Pipeline configuration.
//!
//! Configuration is loaded once by the caller and handed to the
//! orchestrator at construction. No component below the orchestrator
//! performs its own configuration I/O.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plan::OutputCadence;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Master switch for the mixing path. Off means inputs pass
    /// through untouched.
    #[serde(default)]
    pub enabled: bool,

    /// Use hardware (NVENC) encoding when available.
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,

    /// Output cadence for the mixed stream.
    #[serde(default = "default_output_fps")]
    pub output_fps: OutputCadence,

    /// Directory for output files. Defaults to the primary's directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Explicit cover video path, checked before the candidate search.
    #[serde(default)]
    pub cover_video: Option<PathBuf>,

    /// Root the cover candidate paths are resolved against.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
}

fn default_use_gpu() -> bool {
    true
}

fn default_output_fps() -> OutputCadence {
    OutputCadence::Fps60
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            use_gpu: default_use_gpu(),
            output_fps: default_output_fps(),
            output_dir: None,
            cover_video: None,
            project_root: default_project_root(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.enabled);
        assert!(config.use_gpu);
        assert_eq!(config.output_fps, OutputCadence::Fps60);
        assert!(config.cover_video.is_none());
    }

    #[test]
    fn test_parse_minimal_json() {
        let config: PipelineConfig = serde_json::from_str(r#"{"enabled": true}"#).unwrap();
        assert!(config.enabled);
        assert!(config.use_gpu);
        assert_eq!(config.output_fps, OutputCadence::Fps60);
    }

    #[test]
    fn test_parse_full_json() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "enabled": true,
                "use_gpu": false,
                "output_fps": 240,
                "cover_video": "/tmp/cover.mp4",
                "project_root": "/srv/app"
            }"#,
        )
        .unwrap();
        assert!(!config.use_gpu);
        assert_eq!(config.output_fps, OutputCadence::Fps240);
        assert_eq!(config.cover_video.unwrap(), PathBuf::from("/tmp/cover.mp4"));
    }

    #[test]
    fn test_rejects_unsupported_cadence() {
        let result = serde_json::from_str::<PipelineConfig>(r#"{"output_fps": 30}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"enabled": true, "output_fps": 120}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert!(config.enabled);
        assert_eq!(config.output_fps, OutputCadence::Fps120);
    }
}
