//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREKEEP_TOKEN_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//! - `STOREKEEP_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; not needed with `STOREKEEP_STORAGE=memory`)
//!
//! ## Optional
//! - `STOREKEEP_STORAGE` - `postgres` (default) or `memory`
//! - `STOREKEEP_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREKEEP_PORT` - Listen port (default: 3000)
//! - `STOREKEEP_TOKEN_KEY_ID` - Key id placed in token headers (default: primary)
//! - `STOREKEEP_TOKEN_PREVIOUS_KEYS` - Retired keys still accepted, as
//!   `kid=secret,kid=secret`
//! - `STOREKEEP_TOKEN_TTL_SECS` - Token lifetime (default: 86400)
//! - `STOREKEEP_HASH_MEMORY_KIB` - Argon2 memory cost (default: 19456)
//! - `STOREKEEP_HASH_ITERATIONS` - Argon2 time cost (default: 2)
//! - `STOREKEEP_HASH_PARALLELISM` - Argon2 lanes (default: 1)
//! - `STOREKEEP_OPERATOR_USERNAME` / `STOREKEEP_OPERATOR_PASSWORD` - Operator
//!   credentials created or reset at startup
//! - `STOREKEEP_RATE_LIMIT` - Rate-limit auth endpoints (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_TTL_SECS: &str = "86400";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Storage backend
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token signing
    pub tokens: TokenConfig,
    /// Password hashing cost
    pub password_hashing: PasswordHashConfig,
    /// Operator credentials to ensure at startup
    pub operator: Option<OperatorBootstrap>,
    /// Whether auth endpoints are rate limited
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., production, staging)
    pub sentry_environment: Option<String>,
}

/// Storage backend selection.
#[derive(Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` with a connection URL (contains password).
    Postgres { database_url: SecretString },
    /// Process-local memory; data is lost on exit.
    Memory,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// A named HMAC signing key.
#[derive(Clone)]
pub struct SigningKey {
    /// Key id written to the token `kid` header
    pub id: String,
    pub secret: SecretString,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Bearer token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Key used to sign new tokens (and to verify them)
    pub signing_key: SigningKey,
    /// Retired keys accepted for verification only
    pub previous_keys: Vec<SigningKey>,
    /// Token lifetime
    pub ttl: Duration,
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Operator credentials applied at startup.
#[derive(Clone)]
pub struct OperatorBootstrap {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for OperatorBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorBootstrap")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage = StorageConfig::from_env()?;
        let host = parse_env("STOREKEEP_HOST", "127.0.0.1")?;
        let port = parse_env("STOREKEEP_PORT", "3000")?;
        let tokens = TokenConfig::from_env()?;
        let password_hashing = PasswordHashConfig::from_env()?;
        let operator = OperatorBootstrap::from_env()?;
        let rate_limit = parse_env("STOREKEEP_RATE_LIMIT", "true")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            storage,
            host,
            port,
            tokens,
            password_hashing,
            operator,
            rate_limit,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("STOREKEEP_STORAGE", "postgres").as_str() {
            "postgres" => Ok(Self::Postgres {
                database_url: get_database_url("STOREKEEP_DATABASE_URL")?,
            }),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "STOREKEEP_STORAGE".to_string(),
                format!("expected postgres or memory, got {other}"),
            )),
        }
    }
}

impl TokenConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("STOREKEEP_TOKEN_SECRET")?;
        validate_secret_length(&secret, "STOREKEEP_TOKEN_SECRET")?;

        let signing_key = SigningKey {
            id: get_env_or_default("STOREKEEP_TOKEN_KEY_ID", "primary"),
            secret,
        };
        let previous_keys = get_optional_env("STOREKEEP_TOKEN_PREVIOUS_KEYS")
            .map(|raw| parse_previous_keys(&raw, "STOREKEEP_TOKEN_PREVIOUS_KEYS"))
            .transpose()?
            .unwrap_or_default();

        if previous_keys.iter().any(|k| k.id == signing_key.id) {
            return Err(ConfigError::InvalidEnvVar(
                "STOREKEEP_TOKEN_PREVIOUS_KEYS".to_string(),
                format!("reuses the active key id {}", signing_key.id),
            ));
        }

        let ttl_secs: u64 = parse_env("STOREKEEP_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREKEEP_TOKEN_TTL_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            signing_key,
            previous_keys,
            ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl PasswordHashConfig {
    /// Load Argon2 costs from `STOREKEEP_HASH_*`, defaulting each one.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            memory_kib: parse_env(
                "STOREKEEP_HASH_MEMORY_KIB",
                &defaults.memory_kib.to_string(),
            )?,
            iterations: parse_env(
                "STOREKEEP_HASH_ITERATIONS",
                &defaults.iterations.to_string(),
            )?,
            parallelism: parse_env(
                "STOREKEEP_HASH_PARALLELISM",
                &defaults.parallelism.to_string(),
            )?,
        })
    }
}

impl OperatorBootstrap {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("STOREKEEP_OPERATOR_USERNAME"),
            get_optional_env("STOREKEEP_OPERATOR_PASSWORD"),
        ) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => {
                validate_secret_strength(&password, "STOREKEEP_OPERATOR_PASSWORD")?;
                Ok(Some(Self {
                    username,
                    password: SecretString::from(password),
                }))
            }
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "STOREKEEP_OPERATOR_PASSWORD".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(
                "STOREKEEP_OPERATOR_USERNAME".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse `kid=secret,kid=secret` into signing keys.
fn parse_previous_keys(raw: &str, var_name: &str) -> Result<Vec<SigningKey>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, secret) = entry
                .split_once('=')
                .filter(|(id, secret)| !id.is_empty() && !secret.is_empty())
                .ok_or_else(|| {
                    ConfigError::InvalidEnvVar(
                        var_name.to_string(),
                        "entries must look like kid=secret".to_string(),
                    )
                })?;
            Ok(SigningKey {
                id: id.to_string(),
                secret: SecretString::from(secret),
            })
        })
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_edges() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_legacy_hardcoded_secret_rejected() {
        let err = validate_secret_strength("secret123", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_placeholder_rejected() {
        assert!(validate_secret_strength("your-signing-key-here", "TEST_VAR").is_err());
        assert!(validate_secret_strength("changeme-please-0123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_low_entropy_rejected() {
        let err = validate_secret_strength(&"ab".repeat(20), "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "TEST_VAR").is_err());
        assert!(validate_secret_length(&SecretString::from("a".repeat(32)), "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_previous_keys() {
        let keys = parse_previous_keys("k1=alpha, k2=beta,", "TEST_VAR").unwrap();
        let ids: Vec<&str> = keys.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, ["k1", "k2"]);
        assert_eq!(keys[1].secret.expose_secret(), "beta");

        assert!(parse_previous_keys("k1", "TEST_VAR").is_err());
        assert!(parse_previous_keys("=alpha", "TEST_VAR").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let key = SigningKey {
            id: "primary".to_string(),
            secret: SecretString::from("super_secret_signing_value"),
        };
        let storage = StorageConfig::Postgres {
            database_url: SecretString::from("postgres://u:hunter2@db/shop"),
        };
        let operator = OperatorBootstrap {
            username: "ops".to_string(),
            password: SecretString::from("super_secret_operator_pw"),
        };

        let output = format!("{key:?} {storage:?} {operator:?}");
        assert!(output.contains("primary"));
        assert!(output.contains("ops"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super_secret"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            storage: StorageConfig::Memory,
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            tokens: TokenConfig {
                signing_key: SigningKey {
                    id: "primary".to_string(),
                    secret: SecretString::from("x".repeat(32)),
                },
                previous_keys: Vec::new(),
                ttl: Duration::from_secs(60),
            },
            password_hashing: PasswordHashConfig::default(),
            operator: None,
            rate_limit: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }
}
