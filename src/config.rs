// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider credentials are read once at startup. A provider with no
//! credentials at all is treated as disabled; a provider with only some of
//! them set is rejected by [`Config::validate`].

use std::env;
use std::path::PathBuf;

/// Which backend persists token records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    /// One JSON document per provider, rewritten wholesale.
    JsonFile,
    /// One Firestore document per user per provider.
    Firestore,
}

/// Google OAuth client and API endpoints.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    /// Google Calendar v3 API base
    pub api_base: String,
}

/// Microsoft identity platform client and Graph endpoints.
#[derive(Debug, Clone)]
pub struct OutlookConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Tenant id, or "common" for multi-tenant + personal accounts
    pub tenant_id: String,
    /// Login host, e.g. https://login.microsoftonline.com
    pub authority_host: String,
    /// Microsoft Graph v1.0 base
    pub graph_base: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Time zone attached to every created event
    pub calendar_time_zone: String,
    /// Whole-request timeout for provider calls
    pub http_timeout_secs: u64,
    pub http_connect_timeout_secs: u64,

    pub token_store: TokenStoreKind,
    /// Directory holding the JSON token documents
    pub token_store_dir: PathBuf,
    /// GCP project ID (Firestore backend only)
    pub gcp_project_id: String,

    pub google: GoogleConfig,
    pub outlook: OutlookConfig,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "test_google_client_id".to_string(),
            client_secret: "test_google_secret".to_string(),
            redirect_uri: "http://localhost:8080/api/auth/google/callback".to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
            api_base: GOOGLE_CALENDAR_API.to_string(),
        }
    }
}

impl Default for OutlookConfig {
    fn default() -> Self {
        Self {
            client_id: "test_outlook_client_id".to_string(),
            client_secret: "test_outlook_secret".to_string(),
            redirect_uri: "http://localhost:8080/api/auth/outlook/callback".to_string(),
            tenant_id: "common".to_string(),
            authority_host: MICROSOFT_AUTHORITY_HOST.to_string(),
            graph_base: GRAPH_ENDPOINT.to_string(),
        }
    }
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            calendar_time_zone: DEFAULT_TIME_ZONE.to_string(),
            http_timeout_secs: 10,
            http_connect_timeout_secs: 5,
            token_store: TokenStoreKind::JsonFile,
            token_store_dir: PathBuf::from("data"),
            gcp_project_id: "test-project".to_string(),
            google: GoogleConfig::default(),
            outlook: OutlookConfig::default(),
        }
    }
}

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const MICROSOFT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_TIME_ZONE: &str = "Europe/Paris";

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Credentials default to empty strings; use [`Config::validate`] to
    /// reject half-configured providers.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let token_store = match env::var("TOKEN_STORE")
            .unwrap_or_else(|_| "json".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "json" => TokenStoreKind::JsonFile,
            "firestore" => TokenStoreKind::Firestore,
            other => return Err(ConfigError::Invalid("TOKEN_STORE", other.to_string())),
        };

        let tenant_id = env_trimmed("OUTLOOK_TENANT_ID");

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_or("PORT", 8080)?,
            calendar_time_zone: env::var("CALENDAR_TIME_ZONE")
                .unwrap_or_else(|_| DEFAULT_TIME_ZONE.to_string()),
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 10)?,
            http_connect_timeout_secs: parse_or("HTTP_CONNECT_TIMEOUT_SECS", 5)?,
            token_store,
            token_store_dir: env::var("TOKEN_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            google: GoogleConfig {
                client_id: env_trimmed("GOOGLE_CLIENT_ID"),
                client_secret: env_trimmed("GOOGLE_CLIENT_SECRET"),
                redirect_uri: env_trimmed("GOOGLE_REDIRECT_URI"),
                auth_url: GOOGLE_AUTH_URL.to_string(),
                token_url: GOOGLE_TOKEN_URL.to_string(),
                revoke_url: GOOGLE_REVOKE_URL.to_string(),
                api_base: GOOGLE_CALENDAR_API.to_string(),
            },
            outlook: OutlookConfig {
                client_id: env_trimmed("OUTLOOK_CLIENT_ID"),
                client_secret: env_trimmed("OUTLOOK_CLIENT_SECRET"),
                redirect_uri: env_trimmed("OUTLOOK_REDIRECT_URI"),
                tenant_id: if tenant_id.is_empty() {
                    "common".to_string()
                } else {
                    tenant_id
                },
                authority_host: MICROSOFT_AUTHORITY_HOST.to_string(),
                graph_base: GRAPH_ENDPOINT.to_string(),
            },
        })
    }

    /// Check provider credentials at startup.
    ///
    /// Returns the list of fully configured providers. A provider with some
    /// but not all credentials set is an error.
    pub fn validate(&self) -> Result<Vec<&'static str>, ConfigError> {
        let mut enabled = Vec::new();

        let google = [
            ("GOOGLE_CLIENT_ID", &self.google.client_id),
            ("GOOGLE_CLIENT_SECRET", &self.google.client_secret),
            ("GOOGLE_REDIRECT_URI", &self.google.redirect_uri),
        ];
        if check_provider(&google)? {
            enabled.push("google");
        }

        let outlook = [
            ("OUTLOOK_CLIENT_ID", &self.outlook.client_id),
            ("OUTLOOK_CLIENT_SECRET", &self.outlook.client_secret),
            ("OUTLOOK_REDIRECT_URI", &self.outlook.redirect_uri),
        ];
        if check_provider(&outlook)? {
            enabled.push("outlook");
        }

        Ok(enabled)
    }
}

/// Ok(true) when every credential is set, Ok(false) when none are.
fn check_provider(vars: &[(&'static str, &String)]) -> Result<bool, ConfigError> {
    let set = vars.iter().filter(|(_, v)| !v.is_empty()).count();
    if set == 0 {
        return Ok(false);
    }
    match vars.iter().find(|(_, v)| v.is_empty()) {
        Some((name, _)) => Err(ConfigError::Missing(*name)),
        None => Ok(true),
    }
}

fn env_trimmed(name: &str) -> String {
    env::var(name)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, v)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", " test_secret\n");
        env::set_var("GOOGLE_REDIRECT_URI", "http://localhost:8080/cb");
        env::remove_var("OUTLOOK_TENANT_ID");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google.client_id, "test_id");
        assert_eq!(config.google.client_secret, "test_secret");
        assert_eq!(config.outlook.tenant_id, "common");
        assert_eq!(config.calendar_time_zone, "Europe/Paris");
    }

    #[test]
    fn test_validate_partial_provider_is_error() {
        let mut config = Config::default();
        config.outlook.client_secret = String::new();

        match config.validate() {
            Err(ConfigError::Missing(name)) => assert_eq!(name, "OUTLOOK_CLIENT_SECRET"),
            other => panic!("expected missing secret, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_unconfigured_provider_is_disabled() {
        let mut config = Config::default();
        config.google.client_id = String::new();
        config.google.client_secret = String::new();
        config.google.redirect_uri = String::new();

        let enabled = config.validate().unwrap();
        assert_eq!(enabled, vec!["outlook"]);
    }
}
