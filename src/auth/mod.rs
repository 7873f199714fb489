pub mod identity;
pub mod session;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

pub use identity::{IdentityProviderClient, IdentityProviderConfig};
pub use session::{SESSION_COOKIE, SessionConfig, SessionTokens};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub email: String,
}

/// Where a verifier expects the caller to present its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    Bearer,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    fn source(&self) -> TokenSource;
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// The requester as seen by a handler. `email` is `None` only when the
/// server runs without authentication.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    email: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { email: None }
    }

    pub fn verified(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Rejects with 403 when the verified email differs from `email`.
    /// Anonymous callers pass.
    pub fn ensure_email(&self, email: &str) -> Result<(), AppError> {
        match &self.email {
            Some(own) if own != email => Err(AppError::Forbidden("forbidden access".to_string())),
            _ => Ok(()),
        }
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(verifier) = state.verifier.as_ref() else {
            return Ok(Caller::anonymous());
        };

        let token = match verifier.source() {
            TokenSource::Cookie => cookie_token(&parts.headers),
            TokenSource::Bearer => bearer_token(&parts.headers),
        }
        .ok_or_else(|| AppError::Unauthorized("unauthorized access".to_string()))?;

        let identity = verifier.verify(&token).await?;
        debug!(email = %identity.email, "caller verified");

        Ok(Caller::verified(identity.email))
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
