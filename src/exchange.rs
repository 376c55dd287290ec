// src/exchange.rs

use crate::error::NilaSsoError;
use crate::model::TokenResponse;
use tracing::{debug, instrument, warn};
use url::Url;

/// The caller-supplied fields of an authorization-code grant with PKCE.
pub struct CodeExchangeRequest<'a> {
    pub code: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

impl CodeExchangeRequest<'_> {
    /// The `application/x-www-form-urlencoded` body of the grant.
    fn form(&self) -> [(&str, &str); 6] {
        [
            ("code", self.code),
            ("client_id", self.client_id),
            ("client_secret", self.client_secret),
            ("redirect_uri", self.redirect_uri),
            ("grant_type", "authorization_code"),
            ("code_verifier", self.code_verifier),
        ]
    }
}

impl std::fmt::Debug for CodeExchangeRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeExchangeRequest")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Swaps authorization codes for tokens at a provider's token endpoint.
///
/// One attempt per call; the caller decides whether to retry.
#[derive(Clone)]
pub struct CodeExchanger {
    http_client: reqwest::Client,
}

impl CodeExchanger {
    /// Creates an exchanger on top of an HTTP client that already carries the
    /// client-side timeout.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Posts the code and PKCE verifier to `token_url` and decodes the token response.
    ///
    /// # Errors
    ///
    /// Returns `TokenExchangeFailed` for any transport failure, non-200 status or
    /// undecodable body. The provider's response body is never surfaced.
    #[instrument(skip(self, token_url, request), fields(token_url = %token_url, client_id = %request.client_id), err)]
    pub async fn exchange_code(
        &self,
        token_url: &Url,
        request: &CodeExchangeRequest<'_>,
    ) -> Result<TokenResponse, NilaSsoError> {
        let response = self
            .http_client
            .post(token_url.clone())
            .form(&request.form())
            .send()
            .await
            .map_err(|e| {
                warn!("Token exchange request failed: {}", e);
                NilaSsoError::TokenExchangeFailed
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Token endpoint returned status {}", status);
            return Err(NilaSsoError::TokenExchangeFailed);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!("Token response could not be decoded: {}", e);
            NilaSsoError::TokenExchangeFailed
        })?;

        debug!(has_id_token = token.id_token.is_some(), "Token exchange succeeded");
        Ok(token)
    }
}
