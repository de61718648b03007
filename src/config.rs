// ==============================================================================
// config.rs - Gateway Configuration
// ==============================================================================
// Description: Environment-driven settings for CORS, sessions and static files
// Author: Matt Barham
// Created: 2026-10-16
// Modified: 2026-10-16
// Version: 1.0.0
// ==============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::Method;
use axum_extra::extract::cookie::SameSite;

use crate::{
    authenticator::SessionCookie,
    cors::{AllowedHeaders, CorsSettings},
    error::ConfigError,
    identity::UserDirectory,
};

/// Complete gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub cors: CorsSettings,
    pub cookie: SessionCookie,
    pub session_idle_timeout: Duration,
    pub session_sweep_interval: Duration,
    pub static_dir: PathBuf,
    /// email -> Argon2id PHC hash
    pub users: HashMap<String, String>,
}

impl GatewayConfig {
    /// Reads configuration from the process environment
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = CorsSettings::default();

        let port = parse_or(get("GATEWAY_PORT"), "GATEWAY_PORT", 8080u16)?;

        let allowed_origin_patterns = get("CORS_ALLOWED_ORIGIN_PATTERNS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.allowed_origin_patterns);
        let allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.allowed_origins);

        let allowed_methods = match get("CORS_ALLOWED_METHODS") {
            Some(v) => split_list(&v)
                .iter()
                .map(|m| {
                    Method::from_str(&m.to_ascii_uppercase()).map_err(|e| invalid("CORS_ALLOWED_METHODS", e))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.allowed_methods,
        };

        let allowed_headers = match get("CORS_ALLOWED_HEADERS") {
            Some(v) if v == "*" => AllowedHeaders::Any,
            Some(v) => AllowedHeaders::List(
                split_list(&v).iter().map(|h| h.to_ascii_lowercase()).collect(),
            ),
            None => defaults.allowed_headers,
        };

        let allow_credentials = parse_bool(get("CORS_ALLOW_CREDENTIALS"), "CORS_ALLOW_CREDENTIALS", true)?;
        let max_age_secs = parse_or(get("CORS_MAX_AGE_SECS"), "CORS_MAX_AGE_SECS", 1800u64)?;

        let same_site = match get("SESSION_COOKIE_SAME_SITE").map(|v| v.to_ascii_lowercase()) {
            None => SameSite::Lax,
            Some(v) => match v.as_str() {
                "lax" => SameSite::Lax,
                "strict" => SameSite::Strict,
                "none" => SameSite::None,
                other => {
                    return Err(invalid(
                        "SESSION_COOKIE_SAME_SITE",
                        format!("'{}' is not one of lax, strict, none", other),
                    ))
                }
            },
        };
        let secure = parse_bool(get("SESSION_COOKIE_SECURE"), "SESSION_COOKIE_SECURE", false)?;
        if same_site == SameSite::None && !secure {
            return Err(invalid(
                "SESSION_COOKIE_SAME_SITE",
                "SameSite=None requires SESSION_COOKIE_SECURE=true",
            ));
        }

        let cookie = SessionCookie {
            name: get("SESSION_COOKIE_NAME").unwrap_or_else(|| "SESSION".to_string()),
            secure,
            same_site,
        };

        let session_idle_timeout = Duration::from_secs(parse_or(
            get("SESSION_IDLE_TIMEOUT_SECS"),
            "SESSION_IDLE_TIMEOUT_SECS",
            1800u64,
        )?);
        let session_sweep_interval = Duration::from_secs(parse_or(
            get("SESSION_SWEEP_INTERVAL_SECS"),
            "SESSION_SWEEP_INTERVAL_SECS",
            60u64,
        )?);
        if session_sweep_interval.is_zero() {
            return Err(invalid("SESSION_SWEEP_INTERVAL_SECS", "must be greater than zero"));
        }

        let static_dir = PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "./static".to_string()));

        let users = match get("GATEWAY_USERS") {
            Some(v) => UserDirectory::parse_entries(&v)?,
            None => HashMap::new(),
        };

        Ok(Self {
            port,
            cors: CorsSettings {
                allowed_origins,
                allowed_origin_patterns,
                allowed_methods,
                allowed_headers,
                allow_credentials,
                max_age_secs: Some(max_age_secs).filter(|secs| *secs > 0),
            },
            cookie,
            session_idle_timeout,
            session_sweep_interval,
            static_dir,
            users,
        })
    }
}

fn invalid(key: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: reason.to_string(),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match value {
        Some(v) => v.parse().map_err(|e: T::Err| invalid(key, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(invalid(key, format!("'{}' is not a boolean", other))),
        },
    }
}
