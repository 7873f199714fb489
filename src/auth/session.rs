//! Cookie sessions: `POST /jwt` signs an HS256 token for an email and stores
//! it in an HttpOnly cookie; protected routes verify it locally.

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::{TokenSource, TokenVerifier, VerifiedIdentity};
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "token";

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    /// Token lifetime; always positive when loaded from the environment.
    pub ttl_secs: i64,
    /// Production deployments serve over HTTPS from another origin, which
    /// needs `Secure` plus `SameSite=None`.
    pub cookie_secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionTokens {
    config: SessionConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionTokens {
    pub fn new(config: SessionConfig) -> Self {
        let encoding = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding,
            decoding,
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn issue(&self, email: &str) -> Result<String, AppError> {
        self.issue_at(email, Utc::now().timestamp())
    }

    pub fn issue_at(&self, email: &str, issued_at: i64) -> Result<String, AppError> {
        let exp = issued_at.checked_add(self.config.ttl_secs).ok_or_else(|| {
            error!("session lifetime {}s overflows the expiry", self.config.ttl_secs);
            AppError::InternalServerError
        })?;
        let claims = SessionClaims {
            email: email.to_string(),
            iat: issued_at,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            error!("failed to sign session token: {}", e);
            AppError::InternalServerError
        })
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!("rejected session token: {}", e);
                AppError::Unauthorized("unauthorized access".to_string())
            })
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        self.cookie_base(token)
    }

    /// Expired, empty cookie with the same path and flags as the issued one,
    /// which makes browsers drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.cookie_base(String::new());
        cookie.make_removal();
        cookie
    }

    fn cookie_base(&self, value: String) -> Cookie<'static> {
        let same_site = if self.config.cookie_secure {
            SameSite::None
        } else {
            SameSite::Strict
        };

        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.config.cookie_secure)
            .same_site(same_site)
            .build()
    }
}

#[async_trait]
impl TokenVerifier for SessionTokens {
    fn source(&self) -> TokenSource {
        TokenSource::Cookie
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        let claims = self.decode(token)?;
        Ok(VerifiedIdentity {
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(secret: &str) -> SessionTokens {
        SessionTokens::new(SessionConfig {
            secret: secret.to_string(),
            ttl_secs: 3600,
            cookie_secure: false,
        })
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let sessions = tokens("secret");
        let token = sessions.issue("sam@example.com").expect("issue");

        let identity = sessions.verify(&token).await.expect("verify");
        assert_eq!(identity.email, "sam@example.com");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let token = tokens("other-secret").issue("sam@example.com").expect("issue");
        assert!(matches!(
            tokens("secret").decode(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let sessions = tokens("secret");
        let two_hours_ago = Utc::now().timestamp() - 2 * 3600;
        let token = sessions.issue_at("sam@example.com", two_hours_ago).expect("issue");

        assert!(matches!(sessions.decode(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        let sessions = SessionTokens::new(SessionConfig {
            secret: "secret".to_string(),
            ttl_secs: i64::MAX,
            cookie_secure: false,
        });

        assert!(matches!(
            sessions.issue("sam@example.com"),
            Err(AppError::InternalServerError)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(tokens("secret").decode("not-a-token").is_err());
    }

    #[test]
    fn test_cookie_flags() {
        let sessions = SessionTokens::new(SessionConfig {
            secret: "secret".to_string(),
            ttl_secs: 60,
            cookie_secure: true,
        });
        let cookie = sessions.session_cookie("abc".to_string());

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.path(), Some("/"));
    }
}
