use std::{env, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Storage {
    Mongo { uri: String, db_name: String },
    Memory,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub storage: Storage,

    pub jwt_access_ttl_seconds: i64,
    pub jwt_refresh_ttl_seconds: i64,
    pub black_list_retention_days: i64,

    pub smtp: Option<SmtpConfig>,
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Upper bounds keep every derived timestamp inside chrono's range.
const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;
const MAX_RETENTION_DAYS: i64 = 100 * 365;

fn bounded(name: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    let v = parsed(name, default)?;
    if !(0..=max).contains(&v) {
        return Err(ConfigError::Invalid {
            name,
            value: v.to_string(),
        });
    }
    Ok(v)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());

        let storage = match env::var("STORAGE").as_deref() {
            Ok("memory") => Storage::Memory,
            Ok("mongodb") | Err(_) => Storage::Mongo {
                uri: env::var("MONGODB_URI").map_err(|_| ConfigError::Missing("MONGODB_URI"))?,
                db_name: env::var("DB_NAME").unwrap_or_else(|_| "auth_collections".to_string()),
            },
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE",
                    value: other.to_string(),
                })
            }
        };

        let jwt_access_ttl_seconds = bounded("JWT_ACCESS_TTL_SECONDS", 15 * 60, MAX_TTL_SECONDS)?;
        let jwt_refresh_ttl_seconds = bounded(
            "JWT_REFRESH_TTL_SECONDS",
            30 * 24 * 60 * 60,
            MAX_TTL_SECONDS,
        )?;
        let black_list_retention_days = bounded("BLACK_LIST_RETENTION_DAYS", 31, MAX_RETENTION_DAYS)?;

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: parsed("SMTP_PORT", 465)?,
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from: env::var("SMTP_FROM")
                    .or_else(|_| env::var("SMTP_USERNAME"))
                    .map_err(|_| ConfigError::Missing("SMTP_FROM"))?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            bind_addr,
            storage,
            jwt_access_ttl_seconds,
            jwt_refresh_ttl_seconds,
            black_list_retention_days,
            smtp,
        })
    }
}
