use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use reqwest::Url;
use thiserror::Error;
use tracing::info;

use crate::auth::{identity::IdentityProviderConfig, session::SessionConfig};

pub const DEFAULT_TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How callers prove who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Every request is anonymous and ownership checks are skipped.
    None,
    /// Signed session token in an HttpOnly cookie, issued by `POST /jwt`.
    Cookie,
    /// Bearer id token checked against an external identity provider.
    IdentityProvider,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "disabled" => Ok(AuthMode::None),
            "cookie" | "jwt" => Ok(AuthMode::Cookie),
            "identity_provider" | "identity-provider" | "idp" => Ok(AuthMode::IdentityProvider),
            other => Err(format!("unknown auth mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_mode: AuthMode,
    /// Present only in cookie mode.
    pub session: Option<SessionConfig>,
    pub identity: IdentityProviderConfig,
    pub cors_origins: Vec<String>,
    /// Zero disables the background counter reconciler.
    pub reconcile_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_mode: AuthMode = parse_or(&lookup, "AUTH_MODE", AuthMode::Cookie)?;

        let session = match auth_mode {
            AuthMode::Cookie => {
                let secret = lookup("ACCESS_TOKEN_SECRET")
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;
                let ttl_secs: i64 = parse_or(&lookup, "TOKEN_TTL_SECS", 3600)?;
                if ttl_secs <= 0 {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_TTL_SECS",
                        value: ttl_secs.to_string(),
                        reason: "must be positive".to_string(),
                    });
                }
                Some(SessionConfig {
                    secret,
                    ttl_secs,
                    cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
                })
            }
            _ => None,
        };

        let token_info_url = lookup("IDENTITY_TOKEN_INFO_URL")
            .unwrap_or_else(|| DEFAULT_TOKEN_INFO_URL.to_string());
        if let Err(e) = Url::parse(&token_info_url) {
            return Err(ConfigError::Invalid {
                key: "IDENTITY_TOKEN_INFO_URL",
                value: token_info_url,
                reason: e.to_string(),
            });
        }

        let identity = IdentityProviderConfig {
            token_info_url,
            audience: lookup("IDENTITY_AUDIENCE").filter(|s| !s.is_empty()),
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://edulearn.db?mode=rwc".to_string()),
            auth_mode,
            session,
            identity,
            cors_origins,
            reconcile_interval_secs: parse_or(&lookup, "RECONCILE_INTERVAL_SECS", 300)?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            key: "HOST",
            value: raw.clone(),
            reason: e.to_string(),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|e| ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            })
        }
        None => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}
