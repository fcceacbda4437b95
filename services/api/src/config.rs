//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Every secret the service depends on is
//! required: the process refuses to start rather than run degraded.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials and placement for the Cloudinary object store.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub api_base: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub jwt_secret: String,
    pub completion_api_key: String,
    pub completion_api_base: Option<String>,
    pub completion_model: String,
    pub storage: StorageConfig,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required =
            |name: &str| var(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        // --- Server and Database Settings ---
        let bind_address_str = match var("BIND_ADDRESS") {
            Some(address) => address,
            None => format!("0.0.0.0:{}", var("PORT").unwrap_or_else(|| "8000".to_string())),
        };
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;
        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string(), e.to_string())
            })?,
            None => 5,
        };

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Credentials ---
        let jwt_secret = required("JWT_SECRET")?;

        let completion_api_key = var("COMPLETION_API_KEY")
            .or_else(|| var("OPENAI_API_KEY"))
            .or_else(|| var("GEMINI_API_KEY"))
            .ok_or_else(|| ConfigError::MissingVar("COMPLETION_API_KEY".to_string()))?;
        let completion_api_base = var("COMPLETION_API_BASE");
        let completion_model =
            var("COMPLETION_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        let storage = StorageConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            folder: var("CLOUDINARY_FOLDER").unwrap_or_else(|| "pdfs".to_string()),
            api_base: var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|| "https://api.cloudinary.com".to_string()),
        };

        let cors_origin = var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            jwt_secret,
            completion_api_key,
            completion_api_base,
            completion_model,
            storage,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/pdf_chat"),
        ("JWT_SECRET", "secret"),
        ("COMPLETION_API_KEY", "sk-test"),
        ("CLOUDINARY_CLOUD_NAME", "demo"),
        ("CLOUDINARY_API_KEY", "123"),
        ("CLOUDINARY_API_SECRET", "shh"),
    ];

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = Config::from_lookup(env(MINIMAL)).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.completion_model, "gpt-4o-mini");
        assert!(config.completion_api_base.is_none());
        assert_eq!(config.storage.folder, "pdfs");
        assert_eq!(config.storage.api_base, "https://api.cloudinary.com");
    }

    #[test]
    fn port_is_used_when_no_bind_address_is_given() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("PORT", "9090"));
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.bind_address.port(), 9090);
    }

    #[test]
    fn missing_signing_secret_is_fatal() {
        let pairs: Vec<_> = MINIMAL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "JWT_SECRET")
            .collect();
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "JWT_SECRET"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut pairs = MINIMAL.to_vec();
        pairs.retain(|(k, _)| *k != "CLOUDINARY_API_SECRET");
        pairs.push(("CLOUDINARY_API_SECRET", "  "));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "CLOUDINARY_API_SECRET"));
    }

    #[test]
    fn completion_key_falls_back_to_provider_specific_names() {
        let mut pairs: Vec<_> = MINIMAL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "COMPLETION_API_KEY")
            .collect();
        pairs.push(("GEMINI_API_KEY", "gem"));
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.completion_api_key, "gem");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("RUST_LOG", "chatty"));
        let err = Config::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "RUST_LOG"));
    }
}
