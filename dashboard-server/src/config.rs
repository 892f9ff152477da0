//! Configuration module

use std::env;

use skimsim_core::constants;
use skimsim_core::GeminiConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Analysis service settings (API key is required)
    pub gemini: GeminiConfig,

    /// Multiplier applied to every scripted delay (0 to `MAX_DELAY_SCALE`)
    pub delay_scale: f64,

    /// Environment (development, production)
    pub environment: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("model", &self.gemini.model)
            .field("base_url", &self.gemini.base_url)
            .field("timeout_seconds", &self.gemini.timeout_seconds)
            .field("delay_scale", &self.delay_scale)
            .field("environment", &self.environment)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => 3000,
        };

        let timeout_seconds = match lookup("ANALYSIS_TIMEOUT_SECS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "ANALYSIS_TIMEOUT_SECS", value })?,
            None => constants::DEFAULT_ANALYSIS_TIMEOUT_SECS,
        };

        let delay_scale = match lookup("STEP_DELAY_SCALE") {
            Some(value) => match value.parse::<f64>() {
                Ok(scale) if (0.0..=constants::MAX_DELAY_SCALE).contains(&scale) => scale,
                _ => return Err(ConfigError::Invalid { name: "STEP_DELAY_SCALE", value }),
            },
            None => 1.0,
        };

        Ok(Self {
            port,
            gemini: GeminiConfig {
                api_key,
                model: lookup("GEMINI_MODEL")
                    .unwrap_or_else(|| constants::DEFAULT_GEMINI_MODEL.to_string()),
                base_url: lookup("GEMINI_BASE_URL")
                    .unwrap_or_else(|| constants::DEFAULT_GEMINI_BASE_URL.to_string()),
                timeout_seconds,
            },
            delay_scale,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "secret")])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.gemini.api_key, "secret");
        assert_eq!(config.gemini.model, constants::DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini.timeout_seconds, constants::DEFAULT_ANALYSIS_TIMEOUT_SECS);
        assert_eq!(config.delay_scale, 1.0);
        assert!(!config.is_production());
    }

    #[test]
    fn test_api_key_is_required() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("GEMINI_API_KEY")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err(),
            ConfigError::Missing("GEMINI_API_KEY")
        );
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("PORT", "8088"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("STEP_DELAY_SCALE", "0.25"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.delay_scale, 0.25);
        assert!(config.is_production());

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("STEP_DELAY_SCALE", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "STEP_DELAY_SCALE", .. }));
    }

    #[test]
    fn test_delay_scale_upper_bound() {
        for value in ["1e300", "inf", "NaN", "100.5"] {
            let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("STEP_DELAY_SCALE", value)]))
                .unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid { name: "STEP_DELAY_SCALE", value: value.to_string() }
            );
        }

        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("STEP_DELAY_SCALE", "100")])).unwrap();
        assert_eq!(config.delay_scale, constants::MAX_DELAY_SCALE);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "very-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("very-secret"));
    }
}
