//! Mirror configuration.

use std::path::Path;
use std::time::Duration;

use eitmirror_core::RendererOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable that overrides [`MirrorConfig::host_address`].
pub const HOST_ENV: &str = "EITMIRROR_HOST";

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid host address: {0}")]
    InvalidHost(#[from] url::ParseError),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Everything needed to mirror one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Base address of the host, e.g. `http://192.168.1.20:8080/eit`.
    pub host_address: String,
    /// Timeout of a single request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Delay between update polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// How the mesh is decoded and drawn.
    pub renderer: RendererOptions,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            host_address: "http://localhost:8080/".to_string(),
            request_timeout_ms: 5_000,
            poll_interval_ms: 100,
            renderer: RendererOptions::default(),
        }
    }
}

impl MirrorConfig {
    /// Parses and validates a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loaded config from {}", path.as_ref().display());
        Self::from_json(&json)
    }

    /// Loads the config from `path` if given (defaults otherwise) and applies the
    /// `EITMIRROR_HOST` override.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_host_override(std::env::var(HOST_ENV).ok())
    }

    /// Replaces the host address if `host` is set and non-empty.
    pub fn with_host_override(mut self, host: Option<String>) -> Result<Self, ConfigError> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            log::info!("host address overridden by {HOST_ENV}: {host}");
            self.host_address = host;
            self.validate()?;
        }
        Ok(self)
    }

    /// Checks the host address, intervals and color value range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.host_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        if !self.renderer.value_range.is_valid() {
            return Err(ConfigError::InvalidValue(format!(
                "value range {:?} must be finite with min < max",
                self.renderer.value_range
            )));
        }
        Ok(())
    }

    /// The parsed host address.
    pub fn host_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(&self.host_address)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eitmirror_core::{ColorSource, ValueRange};

    #[test]
    fn test_default_is_valid() {
        assert!(MirrorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MirrorConfig::from_json(
            r#"{
                "host_address": "http://10.0.0.2:8080/eit",
                "renderer": { "color_source": "Mapped", "color_map": "jet" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.host_url().unwrap().host_str(), Some("10.0.0.2"));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.renderer.color_source, ColorSource::Mapped);
        assert_eq!(config.renderer.color_map, "jet");
        assert_eq!(config.renderer.value_range, ValueRange::Auto);
    }

    #[test]
    fn test_rejects_bad_host() {
        assert!(matches!(
            MirrorConfig::from_json(r#"{ "host_address": "not a url" }"#),
            Err(ConfigError::InvalidHost(_))
        ));
        assert!(matches!(
            MirrorConfig::from_json(r#"{ "host_address": "ftp://host/" }"#),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(matches!(
            MirrorConfig::from_json(r#"{ "poll_interval_ms": 0 }"#),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_rejects_bad_value_range() {
        for range in [
            r#"{ "Fixed": { "min": 1.0, "max": 0.0 } }"#,
            r#"{ "Fixed": { "min": 2.0, "max": 2.0 } }"#,
        ] {
            let json = format!(r#"{{ "renderer": {{ "value_range": {range} }} }}"#);
            assert!(matches!(
                MirrorConfig::from_json(&json),
                Err(ConfigError::InvalidValue(_))
            ));
        }

        let mut config = MirrorConfig::default();
        config.renderer.value_range = ValueRange::Fixed {
            min: f32::NAN,
            max: 1.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));

        let ok = MirrorConfig::from_json(
            r#"{ "renderer": { "value_range": { "Fixed": { "min": -1.0, "max": 1.0 } } } }"#,
        )
        .unwrap();
        assert_eq!(
            ok.renderer.value_range,
            ValueRange::Fixed { min: -1.0, max: 1.0 }
        );
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            MirrorConfig::from_json("{ host_address"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_host_override() {
        let config = MirrorConfig::default()
            .with_host_override(Some("https://mirror.local/eit".to_string()))
            .unwrap();
        assert_eq!(config.host_address, "https://mirror.local/eit");

        let unchanged = MirrorConfig::default()
            .with_host_override(Some("  ".to_string()))
            .unwrap();
        assert_eq!(unchanged, MirrorConfig::default());

        assert!(MirrorConfig::default()
            .with_host_override(Some("::".to_string()))
            .is_err());
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            MirrorConfig::from_file("/nonexistent/eitmirror.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
