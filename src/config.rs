//! Service Configuration
//!
//! Everything is read from the environment once at startup and validated
//! before the server binds. A bad value is a `Configuration` error and the
//! process refuses to start.

use crate::auth::AuthError;
use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::{env, fmt, str::FromStr};

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
pub const MIN_SECRET_LEN: usize = 32;
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Values shipped in sample `.env` files and docs. Never acceptable as a real key.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your_jwt_secret_key_here",
    "your_secret_key_here",
    "changeme",
    "change-me",
    "secret",
    "dev-secret-change-in-production-minimum-32-characters",
    "insecure-dev-secret-change-me",
];

/// Signing parameters shared by issuer and validator.
#[derive(Clone)]
pub struct TokenSettings {
    secret: String,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenSettings {
    pub fn new(
        secret: impl Into<String>,
        algorithm: Algorithm,
        ttl_minutes: i64,
    ) -> Result<Self, AuthError> {
        let secret = secret.into();
        validate_secret(&secret)?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::Configuration(format!(
                "algorithm {:?} needs an asymmetric key pair; only HS256, HS384 and HS512 are supported",
                algorithm
            )));
        }

        if ttl_minutes <= 0 {
            return Err(AuthError::Configuration(format!(
                "token TTL must be a positive number of minutes, got {}",
                ttl_minutes
            )));
        }

        Ok(Self {
            secret,
            algorithm,
            ttl: Duration::minutes(ttl_minutes),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish()
    }
}

fn validate_secret(secret: &str) -> Result<(), AuthError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(AuthError::Configuration(
            "JWT_SECRET_KEY is required".to_string(),
        ));
    }
    if PLACEHOLDER_SECRETS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Err(AuthError::Configuration(
            "JWT_SECRET_KEY is a placeholder value; generate a real key".to_string(),
        ));
    }
    if secret.len() < MIN_SECRET_LEN {
        return Err(AuthError::Configuration(format!(
            "JWT_SECRET_KEY must be at least {} bytes",
            MIN_SECRET_LEN
        )));
    }
    Ok(())
}

/// Initial admin account created when the store has none.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Full auth configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_env: String,
    pub is_debug: bool,
    pub token: TokenSettings,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<AdminBootstrap>,
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = var("APP_ENV").unwrap_or_else(|| "development".to_string());

        let is_debug = match var("APP_DEBUG") {
            Some(raw) => parse_flag("APP_DEBUG", &raw)?,
            None => false,
        };
        if is_debug && app_env.eq_ignore_ascii_case("production") {
            return Err(AuthError::Configuration(
                "APP_DEBUG must be off when APP_ENV=production".to_string(),
            ));
        }

        let algorithm = match var("JWT_ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim()).map_err(|_| {
                AuthError::Configuration(format!("unknown JWT_ALGORITHM: {}", raw))
            })?,
            None => Algorithm::HS256,
        };

        let ttl_minutes = match var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                AuthError::Configuration(format!(
                    "ACCESS_TOKEN_EXPIRE_MINUTES is not an integer: {}",
                    raw
                ))
            })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let token = TokenSettings::new(
            lookup("JWT_SECRET_KEY").unwrap_or_default(),
            algorithm,
            ttl_minutes,
        )?;

        let bcrypt_cost = match var("BCRYPT_COST") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|c| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(c))
                .ok_or_else(|| {
                    AuthError::Configuration(format!(
                        "BCRYPT_COST must be between {} and {}, got {}",
                        MIN_BCRYPT_COST,
                        MAX_BCRYPT_COST,
                        raw
                    ))
                })?,
            None => DEFAULT_BCRYPT_COST,
        };

        let bootstrap_admin = match (
            var("ADMIN_USERNAME"),
            var("ADMIN_EMAIL"),
            var("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(AdminBootstrap {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => {
                return Err(AuthError::Configuration(
                    "ADMIN_USERNAME, ADMIN_EMAIL and ADMIN_PASSWORD must be set together"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            app_env,
            is_debug,
            token,
            bcrypt_cost,
            bootstrap_admin,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_debug {
            "retail_insights_auth=debug,tower_http=debug"
        } else {
            "retail_insights_auth=info,tower_http=info"
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, AuthError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(AuthError::Configuration(format!(
            "{} must be a boolean, got {}",
            key, raw
        ))),
    }
}
