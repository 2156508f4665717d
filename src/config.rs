use chrono::{Duration, Utc};
use std::env;
use thiserror::Error;

/// Fallback signing secret used outside production.
pub const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// Holds the application's entire configuration state. The struct is immutable once loaded
/// and is pulled into handlers through `FromRef`, the same way the repository handle is.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Database connection string. `memory://` selects the in-process document store.
    pub db_url: String,
    // TCP port the HTTP server binds on 0.0.0.0.
    pub port: u16,
    // Runtime environment marker. Controls log format and secret fallbacks.
    pub env: Env,
    // Secret used to sign the tokens issued at login.
    pub jwt_secret: String,
    // Lifetime of an issued token.
    pub token_ttl: Duration,
    // bcrypt work factor applied when hashing new passwords.
    pub bcrypt_cost: u32,
    // Mounts the testimonial and comment collections. Disabled for the clothes-only variant.
    pub community_routes: bool,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a non-panicking AppConfig for test setup. The bcrypt cost is the minimum
    /// the library accepts so password hashing stays fast under test.
    fn default() -> Self {
        Self {
            db_url: "memory://".to_string(),
            port: 5000,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl: Duration::days(1),
            bcrypt_cost: 4,
            community_routes: true,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables. Production refuses to start
    /// without an explicit `JWT_SECRET`; every environment needs `DATABASE_URL`.
    pub fn load() -> Result<Self, ConfigError> {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?
            }
            Env::Local => env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let db_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            Err(_) => 5000,
        };

        let token_ttl = match env::var("EXPIRES_IN") {
            Ok(raw) => parse_expiry(&raw).ok_or(ConfigError::Invalid {
                name: "EXPIRES_IN",
                value: raw,
            })?,
            Err(_) => Duration::days(1),
        };

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::Invalid {
                    name: "BCRYPT_COST",
                    value: raw,
                })?,
            Err(_) => 10,
        };

        let community_routes = match env::var("ENABLE_COMMUNITY_ROUTES") {
            Ok(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "ENABLE_COMMUNITY_ROUTES",
                        value: raw,
                    });
                }
            },
            Err(_) => true,
        };

        Ok(Self {
            db_url,
            port,
            env,
            jwt_secret,
            token_ttl,
            bcrypt_cost,
            community_routes,
        })
    }
}

/// parse_expiry
///
/// Accepts either a bare number of seconds (`"3600"`) or a number with a unit suffix
/// (`"90s"`, `"15m"`, `"12h"`, `"7d"`, `"2w"`). Zero and negative lifetimes are rejected, as
/// are lifetimes whose expiry instant would fall outside the representable date range.
pub fn parse_expiry(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;

    let ttl = match unit.trim() {
        "" | "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    }?;

    Utc::now().checked_add_signed(ttl).map(|_| ttl)
}
