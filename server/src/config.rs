use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} must be greater than 0")]
    Zero { key: &'static str },
}

/// Discrete connection settings used when `DATABASE_URL` is not set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
}

impl DbConfig {
    /// libpq keyword/value connection string.
    pub fn conninfo(&self) -> String {
        let mut parts = vec![
            format!("host={}", quote(&self.host)),
            format!("port={}", self.port),
        ];
        if !self.user.is_empty() {
            parts.push(format!("user={}", quote(&self.user)));
        }
        if !self.password.is_empty() {
            parts.push(format!("password={}", quote(&self.password)));
        }
        parts.push(format!("dbname={}", quote(&self.name)));
        parts.push(format!("sslmode={}", quote(&self.sslmode)));
        parts.join(" ")
    }
}

// Values are single-quoted with backslash escapes for `'` and `\`.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    /// Per-request deadline handed to the store. `None` disables it.
    pub operation_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => url,
            None => {
                debug!("DATABASE_URL not set, assembling connection from DB_* variables");
                DbConfig {
                    host: string_or(&lookup, "DB_HOST", "localhost"),
                    port: parse_or(&lookup, "DB_PORT", 5432)?,
                    user: string_or(&lookup, "DB_USER", ""),
                    password: string_or(&lookup, "DB_PASSWORD", ""),
                    name: string_or(&lookup, "DB_NAME", "recipes_db"),
                    sslmode: string_or(&lookup, "DB_SSLMODE", "disable"),
                }
                .conninfo()
            }
        };

        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let pool_size = parse_or(&lookup, "DB_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::Zero {
                key: "DB_POOL_SIZE",
            });
        }

        let connect_secs = parse_or(
            &lookup,
            "DB_CONNECT_TIMEOUT_SECS",
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;
        if connect_secs == 0 {
            return Err(ConfigError::Zero {
                key: "DB_CONNECT_TIMEOUT_SECS",
            });
        }

        let operation_secs = parse_or(
            &lookup,
            "OPERATION_TIMEOUT_SECS",
            DEFAULT_OPERATION_TIMEOUT_SECS,
        )?;

        Ok(Config {
            database_url,
            bind_addr,
            pool_size,
            connect_timeout: Duration::from_secs(connect_secs),
            operation_timeout: (operation_secs > 0).then(|| Duration::from_secs(operation_secs)),
        })
    }
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
