// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATABASE_PATH` | redb database file | unset (in-memory storage) |
//! | `SERVICE_WALLET_KEY` | Hex private key of the service wallet | unset (generated) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Path of the redb database file.
///
/// When unset the server keeps all data in memory and loses it on restart.
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

/// Hex-encoded secp256k1 private key (optional `0x` prefix).
///
/// When unset a fresh key is generated at startup, so the published service
/// address changes on every restart.
pub const SERVICE_WALLET_KEY_ENV: &str = "SERVICE_WALLET_KEY";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    /// Raw service wallet key bytes; `None` means generate one.
    pub service_wallet_key: Option<Vec<u8>>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host
            .parse()
            .map_err(|e| ConfigError::invalid(HOST_ENV, &host, e))?;

        let port = match lookup(PORT_ENV) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, &value, e))?,
            None => DEFAULT_PORT,
        };

        let database_path = lookup(DATABASE_PATH_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let service_wallet_key = match lookup(SERVICE_WALLET_KEY_ENV) {
            Some(value) => {
                let hex = value.trim();
                let hex = hex.strip_prefix("0x").unwrap_or(hex);
                let key = alloy::hex::decode(hex)
                    .map_err(|e| ConfigError::invalid(SERVICE_WALLET_KEY_ENV, "<redacted>", e))?;
                Some(key)
            }
            None => None,
        };

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::invalid(LOG_FORMAT_ENV, other, "expected json or pretty"));
            }
        };

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            database_path,
            service_wallet_key,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.database_path.is_none());
        assert!(config.service_wallet_key.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_all_variables() {
        let config = config(&[
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (DATABASE_PATH_ENV, "/tmp/market.redb"),
            (SERVICE_WALLET_KEY_ENV, "0x0102"),
            (LOG_FORMAT_ENV, "json"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/market.redb")));
        assert_eq!(config.service_wallet_key, Some(vec![1, 2]));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            config(&[(PORT_ENV, "http")]),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
        assert!(matches!(
            config(&[(HOST_ENV, "not a host")]),
            Err(ConfigError::Invalid { name: HOST_ENV, .. })
        ));
        assert!(matches!(
            config(&[(LOG_FORMAT_ENV, "xml")]),
            Err(ConfigError::Invalid { name: LOG_FORMAT_ENV, .. })
        ));
        assert!(matches!(
            config(&[(SERVICE_WALLET_KEY_ENV, "zz")]),
            Err(ConfigError::Invalid { name: SERVICE_WALLET_KEY_ENV, .. })
        ));
    }
}
