// src/provider/apple.rs

use super::{AuthorizationCode, Provider};
use crate::clock::{system_clock, unix_seconds, SharedClock};
use crate::config::{http_client, ProviderConfig, APPLE_ISSUER};
use crate::error::NilaSsoError;
use crate::exchange::{CodeExchangeRequest, CodeExchanger};
use crate::model::TokenResponse;
use crate::validator::{Claims, IdTokenVerifier};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::debug;

/// Lifetime of a client-secret assertion, in seconds.
pub const CLIENT_SECRET_TTL_SECS: i64 = 300;

/// The developer-account material Apple's token endpoint authenticates with.
#[derive(Deserialize, Clone)]
pub struct AppleCredentials {
    /// The Apple Developer team ID (`iss` of the assertion).
    pub team_id: String,
    /// The Services ID or bundle ID (`sub` of the assertion, and `client_id` of the grant).
    pub client_id: String,
    /// The ID of the Sign in with Apple private key (`kid` of the assertion).
    pub key_id: String,
    /// The PKCS#8 PEM-encoded P-256 private key.
    pub private_key_pem: String,
}

impl std::fmt::Debug for AppleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppleCredentials")
            .field("team_id", &self.team_id)
            .field("client_id", &self.client_id)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ClientSecretClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl AppleCredentials {
    /// Builds the ES256-signed client secret Apple expects, valid for five minutes from `now`.
    ///
    /// # Errors
    ///
    /// `InvalidKeyFormat` if the PEM is not a PKCS#8 EC key on P-256,
    /// `TokenGenerationError` if signing fails.
    pub fn client_secret(&self, now: SystemTime) -> Result<String, NilaSsoError> {
        self.sign_client_secret(&self.encoding_key()?, now)
    }

    fn encoding_key(&self) -> Result<EncodingKey, NilaSsoError> {
        let key = EncodingKey::from_ec_pem(self.private_key_pem.as_bytes())
            .map_err(|e| NilaSsoError::InvalidKeyFormat(format!("Failed to parse EC private key from PKCS#8 PEM: {e}")))?;
        // The PEM parser accepts any curve; only a P-256 key can sign ES256.
        encode(&Header::new(Algorithm::ES256), &serde_json::json!({}), &key)
            .map_err(|e| NilaSsoError::InvalidKeyFormat(format!("Private key cannot sign ES256: {e}")))?;
        Ok(key)
    }

    fn sign_client_secret(&self, key: &EncodingKey, now: SystemTime) -> Result<String, NilaSsoError> {
        let iat = unix_seconds(now);
        let claims = ClientSecretClaims {
            iss: &self.team_id,
            sub: &self.client_id,
            aud: APPLE_ISSUER,
            iat,
            exp: iat + CLIENT_SECRET_TTL_SECS,
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        encode(&header, &claims, key).map_err(|e| NilaSsoError::TokenGenerationError(e.to_string()))
    }
}

/// Sign in with Apple: code exchange authenticated by a fresh client-secret
/// assertion, and verification of the returned ID token against Apple's JWKS.
#[derive(Clone)]
pub struct AppleProvider {
    config: ProviderConfig,
    credentials: AppleCredentials,
    encoding_key: EncodingKey,
    exchanger: CodeExchanger,
    verifier: IdTokenVerifier,
    clock: SharedClock,
}

impl AppleProvider {
    pub fn new(config: ProviderConfig, credentials: AppleCredentials) -> Result<Self, NilaSsoError> {
        Self::with_clock(config, credentials, system_clock())
    }

    /// Like `new`, with the clock used for assertions, claim checks and cache expiry.
    ///
    /// # Errors
    ///
    /// `MissingConfiguration` if the config has no ID-token rules, `InvalidKeyFormat`
    /// if the private key does not parse as a P-256 key.
    pub fn with_clock(
        config: ProviderConfig,
        credentials: AppleCredentials,
        clock: SharedClock,
    ) -> Result<Self, NilaSsoError> {
        let id_token = config
            .id_token
            .as_ref()
            .ok_or(NilaSsoError::MissingConfiguration("jwks_uri".to_string()))?;
        let encoding_key = credentials.encoding_key()?;
        let http_client = http_client(config.http_timeout)?;
        let verifier = IdTokenVerifier::new(id_token, http_client.clone(), clock.clone());

        Ok(Self {
            exchanger: CodeExchanger::new(http_client),
            verifier,
            encoding_key,
            credentials,
            config,
            clock,
        })
    }

    /// The verifier backing `verify_id_token`, sharing this provider's key cache.
    pub fn verifier(&self) -> &IdTokenVerifier {
        &self.verifier
    }
}

#[async_trait]
impl Provider for AppleProvider {
    fn name(&self) -> &'static str {
        "apple"
    }

    async fn exchange_code(&self, grant: &AuthorizationCode<'_>) -> Result<TokenResponse, NilaSsoError> {
        // A fresh assertion per exchange; never reused.
        let client_secret = self
            .credentials
            .sign_client_secret(&self.encoding_key, self.clock.now())?;
        debug!(key_id = %self.credentials.key_id, "Signed Apple client secret");

        let request = CodeExchangeRequest {
            code: grant.code,
            client_id: &self.credentials.client_id,
            client_secret: &client_secret,
            redirect_uri: grant.redirect_uri,
            code_verifier: grant.code_verifier,
        };
        self.exchanger.exchange_code(&self.config.token_url, &request).await
    }

    async fn verify_id_token(&self, id_token: &str, audience: &str) -> Result<Claims, NilaSsoError> {
        self.verifier.verify(id_token, audience).await
    }
}
