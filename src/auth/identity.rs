use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{TokenSource, TokenVerifier, VerifiedIdentity};
use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct IdentityProviderConfig {
    /// Token-info endpoint; the id token is appended as `id_token=` to any
    /// query it already carries.
    pub token_info_url: String,
    /// Expected `aud` claim. Unchecked when `None`.
    pub audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    /// Providers send either a boolean or the string "true"/"false".
    #[serde(default)]
    email_verified: Option<Value>,
}

/// Verifies bearer id tokens by asking the identity provider about them.
pub struct IdentityProviderClient {
    client: Client,
    token_info_url: Url,
    audience: Option<String>,
}

impl IdentityProviderClient {
    pub fn new(config: IdentityProviderConfig) -> Result<Self, AppError> {
        let token_info_url = Url::parse(&config.token_info_url).map_err(|e| {
            error!("invalid token info url {}: {}", config.token_info_url, e);
            AppError::InternalServerError
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            token_info_url,
            audience: config.audience,
        })
    }

    fn unauthorized() -> AppError {
        AppError::Unauthorized("unauthorized access".to_string())
    }
}

#[async_trait]
impl TokenVerifier for IdentityProviderClient {
    fn source(&self) -> TokenSource {
        TokenSource::Bearer
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        let mut url = self.token_info_url.clone();
        url.query_pairs_mut().append_pair("id_token", token);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status.is_client_error() {
            warn!("identity provider rejected token: {}", status);
            return Err(Self::unauthorized());
        }

        let info: TokenInfo = response.error_for_status()?.json().await?;

        if let Some(expected) = &self.audience {
            if info.aud.as_deref() != Some(expected.as_str()) {
                warn!("token audience mismatch: {:?}", info.aud);
                return Err(Self::unauthorized());
            }
        }

        if matches!(&info.email_verified, Some(Value::Bool(false)))
            || matches!(&info.email_verified, Some(Value::String(s)) if s == "false")
        {
            warn!("token email is not verified");
            return Err(Self::unauthorized());
        }

        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(Self::unauthorized)?;

        debug!(email = %email, "identity provider accepted token");
        Ok(VerifiedIdentity { email })
    }
}
