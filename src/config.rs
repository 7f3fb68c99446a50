//! Server configuration module
//! Loads runtime parameters for the API server from environment variables

use crate::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS,
};
use crate::error::{NihongoError, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment; decides how much failure detail reaches callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = NihongoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(NihongoError::ConfigError(format!(
                "Unknown environment '{}'; expected development, test or production",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// JWT secret for token signing/validation
    pub jwt_secret: String,
    /// Sliding window for the per-client request limit
    pub rate_limit_window: Duration,
    /// Requests allowed per client within the window
    pub rate_limit_max_requests: u32,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Accounts registered with one of these emails receive the admin role
    pub admin_emails: Vec<String>,
    /// TLS configuration
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// Enable TLS
    pub enable_tls: bool,
}

impl ServerConfig {
    /// Fixed configuration for tests and local tooling - never use in production
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: Environment::Test,
            jwt_secret: "test-jwt-key-only-for-unit-tests-9f8e7d6c5b4a".to_string(),
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_requests: 10_000,
            allowed_origins: default_origins(),
            admin_emails: vec!["admin@nihongo.test".to_string()],
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }

    /// Anything other than production exposes internal failure detail
    pub fn development_mode(&self) -> bool {
        self.environment != Environment::Production
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Validate that the signing secret meets security requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(NihongoError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Values shipped in templates and docs
        let insecure_patterns = [
            "sua_chave_secreta_aqui",
            "your-secret-key",
            "change-this",
            "changeme",
            "default",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.to_lowercase().contains(pattern) {
                return Err(NihongoError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Generate one with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(NihongoError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols)".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("NIHONGO_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup("NIHONGO_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let environment = match lookup("NIHONGO_ENV").or_else(|| lookup("NODE_ENV")) {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };

        let jwt_secret = lookup("NIHONGO_JWT_SECRET")
            .or_else(|| lookup("JWT_SECRET"))
            .ok_or_else(|| {
                NihongoError::ConfigError(
                    "JWT_SECRET environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_jwt_secret(&jwt_secret)?;

        let window_secs = lookup("NIHONGO_RATE_LIMIT_WINDOW_SECS")
            .and_then(|w| w.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        let rate_limit_max_requests = lookup("NIHONGO_RATE_LIMIT_MAX_REQUESTS")
            .and_then(|r| r.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);

        let allowed_origins = lookup("NIHONGO_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(default_origins);
        for origin in &allowed_origins {
            validate_origin(origin)?;
        }

        let admin_emails = lookup("NIHONGO_ADMIN_EMAILS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        // TLS configuration
        let enable_tls = lookup("NIHONGO_ENABLE_TLS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);
        let tls_cert_path = lookup("NIHONGO_TLS_CERT_PATH");
        let tls_key_path = lookup("NIHONGO_TLS_KEY_PATH");

        if enable_tls {
            match (&tls_cert_path, &tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    if !std::path::Path::new(cert_path).exists() {
                        return Err(NihongoError::ConfigError(format!(
                            "TLS certificate file does not exist: {}",
                            cert_path
                        )));
                    }
                    if !std::path::Path::new(key_path).exists() {
                        return Err(NihongoError::ConfigError(format!(
                            "TLS private key file does not exist: {}",
                            key_path
                        )));
                    }
                }
                _ => {
                    return Err(NihongoError::ConfigError(
                        "TLS is enabled but NIHONGO_TLS_CERT_PATH or NIHONGO_TLS_KEY_PATH is not set"
                            .to_string(),
                    ))
                }
            }
        }

        Ok(Self {
            host,
            port,
            environment,
            jwt_secret,
            rate_limit_window: Duration::from_secs(window_secs),
            rate_limit_max_requests,
            allowed_origins,
            admin_emails,
            tls_cert_path,
            tls_key_path,
            enable_tls,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// CORS origins must be a bare scheme://host[:port]
fn validate_origin(origin: &str) -> Result<()> {
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains('/') => Ok(()),
        _ => Err(NihongoError::ConfigError(format!(
            "Invalid allowed origin '{}'; expected scheme://host[:port]",
            origin
        ))),
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://localhost:3001".to_string(),
        "http://127.0.0.1:3001".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const GOOD_SECRET: &str = "k7Qx2-Lw9vR4_mZ8pN3sT6yB1cF5hJ0d";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_for_testing_is_not_production() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.environment, Environment::Test);
        assert!(config.development_mode());
    }

    #[test]
    fn test_requires_jwt_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[]));
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_rejects_template_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[(
            "JWT_SECRET",
            "sua_chave_secreta_aqui_0123456789abcdef",
        )]));
        assert!(result.unwrap_err().to_string().contains("insecure pattern"));
    }

    #[test]
    fn test_rejects_short_secret() {
        let result = ServerConfig::from_lookup(lookup_from(&[("JWT_SECRET", "abc123")]));
        assert!(result.unwrap_err().to_string().contains("32 characters"));
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[("JWT_SECRET", GOOD_SECRET)])).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.rate_limit_max_requests, 100);
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        assert_eq!(config.allowed_origins.len(), 4);
        assert!(config.admin_emails.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("NIHONGO_JWT_SECRET", GOOD_SECRET),
            ("NIHONGO_PORT", "8080"),
            ("NODE_ENV", "production"),
            ("NIHONGO_ADMIN_EMAILS", "a@x.com, B@x.com ,"),
            ("NIHONGO_RATE_LIMIT_MAX_REQUESTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.development_mode());
        assert_eq!(config.admin_emails, vec!["a@x.com", "B@x.com"]);
        assert!(config.is_admin_email("b@x.com"));
        assert_eq!(config.rate_limit_max_requests, 5);
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", GOOD_SECRET),
            ("NIHONGO_ENV", "staging"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed_origin() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", GOOD_SECRET),
            ("NIHONGO_ALLOWED_ORIGINS", "https://app.nihongo.dev, localhost:3000/app"),
        ]));
        assert!(result.unwrap_err().to_string().contains("localhost:3000/app"));
    }

    #[test]
    fn test_tls_requires_paths() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", GOOD_SECRET),
            ("NIHONGO_ENABLE_TLS", "true"),
        ]));
        assert!(result.unwrap_err().to_string().contains("TLS is enabled"));
    }
}
