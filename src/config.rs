// src/config.rs

use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

/// Number of random bytes behind a session token (hex-encoded to 64 chars).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Page size used when a listing request does not specify one.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Upper bound for any listing page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Longest short-answer text accepted from a client.
pub const MAX_ANSWER_TEXT_LEN: u64 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub rust_log: String,
    pub server_addr: SocketAddr,
    /// `None` disables the background expiry sweep.
    pub expiry_sweep_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let server_addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "SERVER_ADDR",
                reason: e.to_string(),
            })?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", &lookup, 5u32)?;

        let sweep_secs = parse_or("EXPIRY_SWEEP_INTERVAL_SECS", &lookup, 60u64)?;
        let expiry_sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        Ok(Self {
            database_url,
            database_max_connections,
            jwt_secret,
            rust_log,
            server_addr,
            expiry_sweep_interval,
        })
    }
}

fn parse_or<F, T>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
