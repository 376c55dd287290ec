// src/provider/google.rs

use super::{AuthorizationCode, Provider};
use crate::config::{http_client, ProviderConfig};
use crate::error::NilaSsoError;
use crate::exchange::{CodeExchangeRequest, CodeExchanger};
use crate::model::{TokenResponse, UserInfo};
use async_trait::async_trait;
use tracing::{instrument, warn};

/// Google sign-in: code exchange with a static client secret, plus the userinfo lookup.
#[derive(Clone)]
pub struct GoogleProvider {
    config: ProviderConfig,
    client_id: String,
    client_secret: String,
    http_client: reqwest::Client,
    exchanger: CodeExchanger,
}

impl GoogleProvider {
    pub fn new(
        config: ProviderConfig,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, NilaSsoError> {
        let http_client = http_client(config.http_timeout)?;
        Ok(Self {
            exchanger: CodeExchanger::new(http_client.clone()),
            http_client,
            config,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Fetches the signed-in user's profile with the access token from the exchange.
    ///
    /// # Errors
    ///
    /// `MissingConfiguration` when no userinfo URL is configured; otherwise any
    /// failure is the opaque `UserInfoFailed`.
    #[instrument(skip(self, access_token), err)]
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, NilaSsoError> {
        let url = self
            .config
            .userinfo_url
            .clone()
            .ok_or(NilaSsoError::MissingConfiguration("userinfo_url".to_string()))?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("Userinfo request failed: {}", e);
                NilaSsoError::UserInfoFailed
            })?;

        if response.status() != reqwest::StatusCode::OK {
            warn!("Userinfo endpoint returned status {}", response.status());
            return Err(NilaSsoError::UserInfoFailed);
        }

        response.json().await.map_err(|e| {
            warn!("Userinfo response could not be decoded: {}", e);
            NilaSsoError::UserInfoFailed
        })
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn exchange_code(&self, grant: &AuthorizationCode<'_>) -> Result<TokenResponse, NilaSsoError> {
        let request = CodeExchangeRequest {
            code: grant.code,
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            redirect_uri: grant.redirect_uri,
            code_verifier: grant.code_verifier,
        };
        self.exchanger.exchange_code(&self.config.token_url, &request).await
    }
}
