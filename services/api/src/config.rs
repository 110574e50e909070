//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use aikido_live_core::auth::{DEFAULT_CONFIRM_EMAIL_PATH, DEFAULT_RESET_PASSWORD_PATH};
use aikido_live_core::{ContainerHandle, DocumentIds, WritePolicy};
use std::net::SocketAddr;
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which document store adapter backs the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub store: StoreBackend,
    /// Explicit container; `None` means the first discovered one.
    pub container: Option<ContainerHandle>,
    pub document_ids: DocumentIds,
    pub write_policy: WritePolicy,
    pub require_email_confirmation: bool,
    pub public_base_url: Url,
    /// Paths placed after `public_base_url` in emailed links.
    pub confirm_email_path: String,
    pub reset_password_path: String,
    pub cors_origin: String,
    /// `None` when SMTP settings are incomplete; email is then only logged.
    pub smtp: Option<SmtpConfig>,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not a boolean", other),
        )),
    }
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

        // --- Load Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Document Store Settings ---
        let store = match var_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        let container = match (
            non_empty_var("DOCUMENT_DATABASE"),
            non_empty_var("DOCUMENT_CONTAINER"),
        ) {
            (Some(database), Some(container)) => Some(ContainerHandle::new(database, container)),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "DOCUMENT_DATABASE".to_string(),
                    "DOCUMENT_DATABASE and DOCUMENT_CONTAINER must be set together".to_string(),
                ))
            }
        };

        let defaults = DocumentIds::default();
        let document_ids = DocumentIds {
            users: var_or("USERS_DOCUMENT_ID", &defaults.users),
            library: var_or("LIBRARY_DOCUMENT_ID", &defaults.library),
            playlists: var_or("PLAYLISTS_DOCUMENT_ID", &defaults.playlists),
            blog: var_or("BLOG_DOCUMENT_ID", &defaults.blog),
            tenant_id: var_or("TENANT_ID", &defaults.tenant_id),
        };

        let write_policy = match var_or("WRITE_POLICY", "last-writer-wins")
            .to_lowercase()
            .as_str()
        {
            "last-writer-wins" => WritePolicy::LastWriterWins,
            "optimistic" => WritePolicy::Optimistic,
            other => {
                return Err(ConfigError::InvalidValue(
                    "WRITE_POLICY".to_string(),
                    format!("'{}' is not one of last-writer-wins, optimistic", other),
                ))
            }
        };

        // --- Load Account Settings ---
        let require_email_confirmation = parse_bool(
            "REQUIRE_EMAIL_CONFIRMATION",
            &var_or("REQUIRE_EMAIL_CONFIRMATION", "true"),
        )?;

        let base_url_str = var_or("PUBLIC_BASE_URL", "http://localhost:3000");
        let public_base_url = Url::parse(&base_url_str)
            .map_err(|e| ConfigError::InvalidValue("PUBLIC_BASE_URL".to_string(), e.to_string()))?;
        if !matches!(public_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(
                "PUBLIC_BASE_URL".to_string(),
                "must be an http or https URL".to_string(),
            ));
        }

        let confirm_email_path = var_or("CONFIRM_EMAIL_PATH", DEFAULT_CONFIRM_EMAIL_PATH);
        let reset_password_path = var_or("RESET_PASSWORD_PATH", DEFAULT_RESET_PASSWORD_PATH);

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        // --- Load SMTP Settings (optional) ---
        let smtp = match (
            non_empty_var("SMTP_HOST"),
            non_empty_var("SMTP_USERNAME"),
            non_empty_var("SMTP_FROM"),
        ) {
            (Some(host), Some(username), Some(from_address)) => {
                let port_str = var_or("SMTP_PORT", "587");
                let port = port_str.parse::<u16>().map_err(|e| {
                    ConfigError::InvalidValue("SMTP_PORT".to_string(), e.to_string())
                })?;
                Some(SmtpConfig {
                    host,
                    port,
                    username,
                    password: var_or("SMTP_PASSWORD", ""),
                    from_address,
                })
            }
            _ => None,
        };

        Ok(Self {
            bind_address,
            log_level,
            store,
            container,
            document_ids,
            write_policy,
            require_email_confirmation,
            public_base_url,
            confirm_email_path,
            reset_password_path,
            cors_origin,
            smtp,
        })
    }
}
