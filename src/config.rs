// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, their defaults, and [`AppConfig`], which loads
//! them once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the certificate database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 secret for bearer tokens | Required outside `dev` builds |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |
//! | `KEY_PASSWORD_MIN_LENGTH` | Minimum length of key passwords | `12` |
//! | `DEFAULT_VALIDITY_DAYS` | Validity when a request leaves it at 0 | `365` |
//! | `DEFAULT_RSA_KEY_SIZE` | RSA modulus size when `keySize` is absent | `2048` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::crypto::keys::DEFAULT_RSA_KEY_SIZE;
use crate::crypto::password::DEFAULT_MIN_PASSWORD_LENGTH;
use crate::service::certificates::DEFAULT_VALIDITY_DAYS;
use crate::state::AuthConfig;

/// Directory of the certificate database file.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the database inside [`DATA_DIR_ENV`].
pub const DATABASE_FILE: &str = "ca.redb";

pub const HOST_ENV: &str = "HOST";
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_PORT: u16 = 8080;

/// HS256 secret used to verify bearer tokens.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Expected `iss` claim of bearer tokens.
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";

pub const KEY_PASSWORD_MIN_LENGTH_ENV: &str = "KEY_PASSWORD_MIN_LENGTH";
pub const DEFAULT_VALIDITY_DAYS_ENV: &str = "DEFAULT_VALIDITY_DAYS";
pub const DEFAULT_RSA_KEY_SIZE_ENV: &str = "DEFAULT_RSA_KEY_SIZE";

/// `json` for structured logs, anything else for human-readable output.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid bind address {0}")]
    InvalidAddress(String),
}

/// Settings read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    pub key_password_min_length: usize,
    pub default_validity_days: u32,
    pub default_rsa_key_size: usize,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            data_dir: non_empty(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            host: non_empty(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_number(PORT_ENV, non_empty(PORT_ENV), DEFAULT_PORT)?,
            jwt_secret: non_empty(JWT_SECRET_ENV),
            jwt_issuer: non_empty(JWT_ISSUER_ENV),
            key_password_min_length: parse_number(
                KEY_PASSWORD_MIN_LENGTH_ENV,
                non_empty(KEY_PASSWORD_MIN_LENGTH_ENV),
                DEFAULT_MIN_PASSWORD_LENGTH,
            )?,
            default_validity_days: parse_number(
                DEFAULT_VALIDITY_DAYS_ENV,
                non_empty(DEFAULT_VALIDITY_DAYS_ENV),
                DEFAULT_VALIDITY_DAYS,
            )?,
            default_rsa_key_size: parse_number(
                DEFAULT_RSA_KEY_SIZE_ENV,
                non_empty(DEFAULT_RSA_KEY_SIZE_ENV),
                DEFAULT_RSA_KEY_SIZE,
            )?,
            json_logs: non_empty(LOG_FORMAT_ENV).is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
        }
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.key_password_min_length, 12);
        assert_eq!(config.default_validity_days, 365);
        assert_eq!(config.default_rsa_key_size, 2048);
        assert!(config.jwt_secret.is_none());
        assert!(!config.json_logs);
        assert_eq!(config.bind_address().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn values_are_read_from_environment() {
        let config = config_from(&[
            (DATA_DIR_ENV, "/var/lib/ca"),
            (PORT_ENV, "9443"),
            (JWT_SECRET_ENV, "s3cret"),
            (KEY_PASSWORD_MIN_LENGTH_ENV, "16"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/var/lib/ca/ca.redb"));
        assert_eq!(config.port, 9443);
        assert_eq!(config.auth_config().secret.as_deref(), Some("s3cret"));
        assert_eq!(config.key_password_min_length, 16);
        assert!(config.json_logs);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[(JWT_SECRET_ENV, "  "), (PORT_ENV, "")]).unwrap();
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            config_from(&[(DEFAULT_VALIDITY_DAYS_ENV, "a year")]),
            Err(ConfigError::InvalidNumber { name: "DEFAULT_VALIDITY_DAYS", .. })
        ));
    }
}
