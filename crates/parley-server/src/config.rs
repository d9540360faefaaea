use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use thiserror::Error;

use parley_gateway::connection::HEARTBEAT_INTERVAL;

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "https://chat-app-beta-drab.vercel.app",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is not a valid IP address: '{value}'")]
    InvalidAddress { var: &'static str, value: String },

    #[error("PARLEY_ALLOWED_ORIGINS contains an invalid origin: '{0}'")]
    InvalidOrigin(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Store connection string: a SQLite path or `:memory:`
    pub database_url: String,
    pub allowed_origins: Vec<HeaderValue>,
    pub public_dir: PathBuf,
    /// URL browser clients are expected to connect to
    pub public_url: String,
    pub history_limit: u32,
    /// Ping interval on every WebSocket; two unanswered pings drop the socket
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Read configuration from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("PARLEY_HOST", "0.0.0.0");
        let port = var("PARLEY_PORT", "5000");
        let port: u16 = port.parse().map_err(|_| ConfigError::InvalidNumber {
            var: "PARLEY_PORT",
            value: port.clone(),
        })?;
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::InvalidAddress {
            var: "PARLEY_HOST",
            value: host.clone(),
        })?;
        let addr = SocketAddr::new(ip, port);

        let history_limit = var("PARLEY_HISTORY_LIMIT", "100");
        let history_limit: u32 =
            history_limit
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "PARLEY_HISTORY_LIMIT",
                    value: history_limit.clone(),
                })?;

        let heartbeat_ms = var(
            "PARLEY_HEARTBEAT_MS",
            &HEARTBEAT_INTERVAL.as_millis().to_string(),
        );
        let heartbeat_ms: u64 = heartbeat_ms
            .parse()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| ConfigError::InvalidNumber {
                var: "PARLEY_HEARTBEAT_MS",
                value: heartbeat_ms.clone(),
            })?;

        let allowed_origins = match lookup("PARLEY_ALLOWED_ORIGINS") {
            Some(list) => parse_origins(list.split(','))?,
            None => parse_origins(DEFAULT_ALLOWED_ORIGINS.iter().copied())?,
        };

        Ok(Self {
            addr,
            database_url: var("PARLEY_DATABASE_URL", "parley.db"),
            allowed_origins,
            public_dir: var("PARLEY_PUBLIC_DIR", "public").into(),
            public_url: var("PARLEY_PUBLIC_URL", "http://localhost:5000"),
            history_limit,
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
        })
    }
}

fn parse_origins<'a>(origins: impl Iterator<Item = &'a str>) -> Result<Vec<HeaderValue>, ConfigError> {
    origins
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))
        })
        .collect()
}
