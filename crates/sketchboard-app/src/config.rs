//! Host configuration loaded from a JSON file.

use serde::{Deserialize, Serialize};
use sketchboard_core::persistence::DEFAULT_LOGIN_URL;
use sketchboard_core::{ConfigError, EngineConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default remote save endpoint.
pub const DEFAULT_SAVE_ENDPOINT: &str = "http://127.0.0.1:8000/api/save";

/// Errors loading an [`AppConfig`].
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] ConfigError),
    #[error("Invalid save endpoint: {0}")]
    Endpoint(String),
}

/// Application configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Absolute URL the board is POSTed to on save.
    pub save_endpoint: String,
    /// Where to send the user when the endpoint answers 401.
    pub login_url: String,
    /// Directory of the local autosave store. `None` uses the platform data dir.
    pub storage_dir: Option<PathBuf>,
    /// Export size in CSS pixels when no canvas size is known.
    pub export_width: u32,
    pub export_height: u32,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_endpoint: DEFAULT_SAVE_ENDPOINT.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            storage_dir: None,
            export_width: 1280,
            export_height: 800,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, AppConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, AppConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| AppConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppConfigError> {
        self.engine.validate()?;
        url::Url::parse(&self.save_endpoint)
            .map_err(|e| AppConfigError::Endpoint(format!("{}: {}", self.save_endpoint, e)))?;
        if self.export_width == 0 || self.export_height == 0 {
            return Err(AppConfigError::Engine(ConfigError::Invalid(
                "export size must be non-zero".to_string(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.login_url, "/login");
        assert_eq!(config.engine.storage_key, "sb_autosave_v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = AppConfig::from_json(
            r#"{"save_endpoint":"https://boards.example/api/save","engine":{"history_limit":50}}"#,
        )
        .unwrap();
        assert_eq!(config.save_endpoint, "https://boards.example/api/save");
        assert_eq!(config.engine.history_limit, 50);
        assert_eq!(config.engine.autosave_debounce_ms, 500);
        assert_eq!(config.export_width, 1280);
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let err = AppConfig::from_json(r#"{"save_endpoint":"/api/save"}"#).unwrap_err();
        assert!(matches!(err, AppConfigError::Endpoint(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            AppConfig::from_json("{not json"),
            Err(AppConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"export_width":640,"export_height":480}}"#).unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!((config.export_width, config.export_height), (640, 480));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, AppConfigError::Io { .. }));
    }
}
