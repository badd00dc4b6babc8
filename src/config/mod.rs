use std::env;
use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use crate::auth::SessionConfig;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for the HTTP layers wrapped around the router.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub production: bool,
    pub allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            production: false,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub allow_registration: bool,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so parsing can be
    /// exercised without the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let secret = get("JWT_SECRET_KEY").ok_or(ConfigError::Missing("JWT_SECRET_KEY"))?;

        let bind_addr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", Some(DEFAULT_MAX_CONNECTIONS))?;
        let ttl_hours: i64 = parse_or(&get, "TOKEN_TTL_HOURS", Some(DEFAULT_TOKEN_TTL_HOURS))?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }
        let password_cost = parse_or(&get, "BCRYPT_COST", Some(bcrypt::DEFAULT_COST))?;
        let allow_registration = parse_or(&get, "ALLOW_OPERATOR_REGISTRATION", Some(false))?;

        let production = get("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);
        let allowed_origins = split_origins(
            &get("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            allow_registration,
            session: SessionConfig {
                secret: secret.into_bytes(),
                token_ttl: Duration::hours(ttl_hours),
                password_cost,
            },
            http: HttpConfig {
                production,
                allowed_origins,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
