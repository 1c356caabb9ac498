//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint, used when only a Gemini key is configured.
pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` runs the service in memory-only mode.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cors_origin: String,
    pub auth_required: bool,
    pub model_api_key: String,
    /// `None` uses the client library's default (api.openai.com).
    pub model_api_base: Option<String>,
    pub chat_model: String,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Load Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL");

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        let auth_required = match var("AUTH_REQUIRED") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "AUTH_REQUIRED".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
        };
        if auth_required && database_url.is_none() {
            return Err(ConfigError::InvalidValue(
                "AUTH_REQUIRED".to_string(),
                "accounts need a database, set DATABASE_URL as well".to_string(),
            ));
        }

        // --- Load the Model Credential (mandatory) ---
        let (model_api_key, default_base, default_model) =
            match (var("OPENAI_API_KEY"), var("GEMINI_API_KEY")) {
                (Some(key), _) => (key, None, DEFAULT_OPENAI_MODEL),
                (None, Some(key)) => (
                    key,
                    Some(GEMINI_OPENAI_BASE.to_string()),
                    DEFAULT_GEMINI_MODEL,
                ),
                (None, None) => {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY or GEMINI_API_KEY".to_string(),
                    ))
                }
            };
        let model_api_base = var("MODEL_API_BASE").or(default_base);
        let chat_model = var("CHAT_MODEL").unwrap_or_else(|| default_model.to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            auth_required,
            model_api_key,
            model_api_base,
            chat_model,
        })
    }

    pub fn persistence_enabled(&self) -> bool {
        self.database_url.is_some()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
