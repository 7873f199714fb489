use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::{IdentityProviderClient, SessionTokens, TokenVerifier};
use crate::config::{AuthMode, Config};
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// `None` runs the server without authentication.
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    /// Cookie-session issuer; mounts `/jwt` and `/logout` when present.
    pub sessions: Option<Arc<SessionTokens>>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            verifier: None,
            sessions: None,
        }
    }

    pub fn with_sessions(db: SqlitePool, sessions: SessionTokens) -> Self {
        let sessions = Arc::new(sessions);
        let verifier: Arc<dyn TokenVerifier> = sessions.clone();
        Self {
            db,
            verifier: Some(verifier),
            sessions: Some(sessions),
        }
    }

    pub fn with_verifier(db: SqlitePool, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            db,
            verifier: Some(verifier),
            sessions: None,
        }
    }

    pub fn from_config(db: SqlitePool, config: &Config) -> Result<Self, AppError> {
        match config.auth_mode {
            AuthMode::None => Ok(Self::new(db)),
            AuthMode::Cookie => {
                let session = config
                    .session
                    .clone()
                    .ok_or(AppError::InternalServerError)?;
                Ok(Self::with_sessions(db, SessionTokens::new(session)))
            }
            AuthMode::IdentityProvider => {
                let client = IdentityProviderClient::new(config.identity.clone())?;
                Ok(Self::with_verifier(db, Arc::new(client)))
            }
        }
    }
}
