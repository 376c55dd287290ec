// src/provider/mod.rs

pub mod apple;
pub mod google;

use crate::error::NilaSsoError;
use crate::model::TokenResponse;
use crate::validator::Claims;
use async_trait::async_trait;

pub use apple::{AppleCredentials, AppleProvider};
pub use google::GoogleProvider;

/// What the caller brings back from the provider redirect.
///
/// The code is single-use; the verifier is the one whose challenge went on the
/// authorization request.
pub struct AuthorizationCode<'a> {
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

/// The capability set shared by identity providers.
///
/// Endpoints and claim rules are per-provider configuration; implementations only
/// differ in how they authenticate to the token endpoint and whether they can
/// verify ID tokens.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A short, stable provider name, e.g. `"google"`.
    fn name(&self) -> &'static str;

    /// Exchanges an authorization code (plus PKCE verifier) for tokens.
    async fn exchange_code(&self, grant: &AuthorizationCode<'_>) -> Result<TokenResponse, NilaSsoError>;

    /// Verifies an ID token issued by this provider for `audience`.
    async fn verify_id_token(&self, id_token: &str, audience: &str) -> Result<Claims, NilaSsoError> {
        let _ = (id_token, audience);
        Err(NilaSsoError::UnsupportedOperation {
            provider: self.name(),
            operation: "verify_id_token",
        })
    }
}
