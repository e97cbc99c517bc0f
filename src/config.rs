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
//! | `DATA_DIR` | Directory of the redb state file | unset (in-memory state) |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `SUITE_OWNER` | Address granted Owner and Agent on first boot | unset |
//! | `TOKEN_NAME` | Token name | `Tokenized Stock` |
//! | `TOKEN_SYMBOL` | Token symbol | `TSTOCK` |
//! | `TOKEN_DECIMALS` | Token decimals | `0` |
//! | `RESTRICTED_COUNTRIES` | Comma separated ISO-3166 numeric codes | unset |
//! | `MAX_BALANCE` | Per-holder balance cap | unset |
//! | `AUTH_MAX_SKEW_SECS` | Accepted request timestamp skew | `60` |

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use crate::compliance::{ComplianceGate, CountryRestriction, MaxBalance};
use crate::ledger::TokenMetadata;
use crate::types::{Address, Amount, Jurisdiction};

/// Environment variable name for the state directory.
///
/// When unset the suite runs on an in-memory backend and loses all state on
/// exit.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const SUITE_OWNER_ENV: &str = "SUITE_OWNER";
pub const TOKEN_NAME_ENV: &str = "TOKEN_NAME";
pub const TOKEN_SYMBOL_ENV: &str = "TOKEN_SYMBOL";
pub const TOKEN_DECIMALS_ENV: &str = "TOKEN_DECIMALS";
pub const RESTRICTED_COUNTRIES_ENV: &str = "RESTRICTED_COUNTRIES";
pub const MAX_BALANCE_ENV: &str = "MAX_BALANCE";
pub const AUTH_MAX_SKEW_SECS_ENV: &str = "AUTH_MAX_SKEW_SECS";

/// File name of the state database inside `DATA_DIR`.
pub const STATE_DB_FILE: &str = "state.redb";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
pub const DEFAULT_AUTH_MAX_SKEW_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub suite_owner: Option<Address>,
    pub token: TokenMetadata,
    pub restricted_countries: Vec<Jurisdiction>,
    pub max_balance: Option<Amount>,
    pub auth_max_skew_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            suite_owner: None,
            token: TokenMetadata::default(),
            restricted_countries: Vec::new(),
            max_balance: None,
            auth_max_skew_secs: DEFAULT_AUTH_MAX_SKEW_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get(PORT_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(PORT_ENV, e))?,
            None => defaults.port,
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "pretty" => LogFormat::Pretty,
            Some(v) => return Err(invalid(LOG_FORMAT_ENV, format!("unknown format {v}"))),
            None => defaults.log_format,
        };

        let suite_owner = get(SUITE_OWNER_ENV)
            .map(|v| v.trim().parse::<Address>())
            .transpose()
            .map_err(|e| invalid(SUITE_OWNER_ENV, e))?;

        let decimals = match get(TOKEN_DECIMALS_ENV) {
            Some(v) => v.trim().parse().map_err(|e| invalid(TOKEN_DECIMALS_ENV, e))?,
            None => defaults.token.decimals,
        };
        let token = TokenMetadata {
            name: get(TOKEN_NAME_ENV).unwrap_or(defaults.token.name),
            symbol: get(TOKEN_SYMBOL_ENV).unwrap_or(defaults.token.symbol),
            decimals,
        };

        let restricted_countries = match get(RESTRICTED_COUNTRIES_ENV) {
            Some(v) => v
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(|code| code.parse::<Jurisdiction>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid(RESTRICTED_COUNTRIES_ENV, e))?,
            None => Vec::new(),
        };

        let max_balance = get(MAX_BALANCE_ENV)
            .map(|v| v.trim().parse::<Amount>())
            .transpose()
            .map_err(|e| invalid(MAX_BALANCE_ENV, e))?;

        let auth_max_skew_secs = match get(AUTH_MAX_SKEW_SECS_ENV) {
            Some(v) => {
                let secs: i64 = v.trim().parse().map_err(|e| invalid(AUTH_MAX_SKEW_SECS_ENV, e))?;
                if secs < 0 {
                    return Err(invalid(AUTH_MAX_SKEW_SECS_ENV, "must not be negative"));
                }
                secs
            }
            None => defaults.auth_max_skew_secs,
        };

        Ok(Self {
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port,
            log_format,
            suite_owner,
            token,
            restricted_countries,
            max_balance,
            auth_max_skew_secs,
        })
    }

    /// Path of the state database, when persistence is configured.
    pub fn state_db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(STATE_DB_FILE))
    }

    /// Compliance gate with the configured policies installed.
    pub fn compliance_gate(&self) -> ComplianceGate {
        let mut gate = ComplianceGate::new();
        if !self.restricted_countries.is_empty() {
            gate = gate.with_policy(CountryRestriction::new(
                self.restricted_countries.iter().copied(),
            ));
        }
        if let Some(cap) = self.max_balance {
            gate = gate.with_policy(MaxBalance::new(cap));
        }
        gate
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`].
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
