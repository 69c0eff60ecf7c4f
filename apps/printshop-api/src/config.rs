//! API server configuration.
//!
//! Layered with the `config` crate, later sources winning:
//!
//! ```text
//! built-in defaults  →  printshop.toml (optional)  →  PRINTSHOP_* environment
//! ```
//!
//! | Key | Environment | Default |
//! |---|---|---|
//! | `database_path` | `PRINTSHOP_DATABASE_PATH` | `./printshop.db` |
//! | `host` | `PRINTSHOP_HOST` | `0.0.0.0` |
//! | `port` | `PRINTSHOP_PORT` | `8080` |
//! | `jwt_secret` | `PRINTSHOP_JWT_SECRET` | development secret |
//! | `jwt_access_lifetime_secs` | `PRINTSHOP_JWT_ACCESS_LIFETIME_SECS` | `3600` |
//! | `jwt_refresh_lifetime_secs` | `PRINTSHOP_JWT_REFRESH_LIFETIME_SECS` | `604800` |
//! | `log_json` | `PRINTSHOP_LOG_JSON` | `false` |

use serde::{Deserialize, Serialize};

const DEV_JWT_SECRET: &str = "printshop-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// SQLite database file
    pub database_path: String,

    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// JWT secret key for signing access tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            database_path: "./printshop.db".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 3600,     // 1 hour
            jwt_refresh_lifetime_secs: 604_800, // 7 days
            log_json: false,
        }
    }
}

impl ApiConfig {
    /// Loads defaults, then `printshop.toml` if present, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("printshop")
    }

    /// Same as [`ApiConfig::load`] with a different config file base name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config: ApiConfig = config::Config::builder()
            .set_default("database_path", defaults.database_path)?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_access_lifetime_secs", defaults.jwt_access_lifetime_secs)?
            .set_default("jwt_refresh_lifetime_secs", defaults.jwt_refresh_lifetime_secs)?
            .set_default("log_json", defaults.log_json)?
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::with_prefix("PRINTSHOP").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue("jwt_secret".to_string()));
        }
        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_access_lifetime_secs".to_string()));
        }
        if self.jwt_refresh_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_refresh_lifetime_secs".to_string()));
        }
        Ok(())
    }

    /// Whether the signing key is still the built-in development one.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn refresh_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.jwt_refresh_lifetime_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = ApiConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_access_lifetime_secs, 3600);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.refresh_lifetime(), chrono::Duration::days(7));
    }

    #[test]
    fn test_rejects_blank_secret() {
        let config = ApiConfig {
            jwt_secret: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(field)) if field == "jwt_secret"));
    }
}
