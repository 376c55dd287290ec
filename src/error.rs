// src/error.rs

use thiserror::Error;

/// Errors raised while resolving a signing key from a provider's JWKS endpoint.
#[derive(Debug, Error)]
pub enum JwksError {
    /// The JWKS endpoint could not be reached or answered with a non-200 status.
    #[error("Failed to fetch JWKS: {0}")]
    FetchFailed(String),

    /// The JWKS endpoint answered, but the body was not a valid key set.
    #[error("Failed to decode JWKS: {0}")]
    DecodeFailed(String),

    /// No usable key with the requested 'kid' is present in the cached key set.
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

/// The primary error type for the `nila-sso` library.
#[derive(Debug, Error)]
pub enum NilaSsoError {
    /// The operating system entropy source failed.
    #[error("Random source error: {0}")]
    RandomSource(String),

    /// The authorization code exchange failed.
    ///
    /// Transport errors, non-200 statuses and undecodable bodies all collapse
    /// into this variant; provider response bodies are never carried.
    #[error("token exchange failed")]
    TokenExchangeFailed,

    /// The userinfo request failed. Opaque for the same reason as `TokenExchangeFailed`.
    #[error("userinfo request failed")]
    UserInfoFailed,

    /// The ID token could not be parsed, or its header carries no 'kid'.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The signing key for the token could not be resolved.
    #[error("Key resolution failed: {0}")]
    KeyResolutionFailed(#[from] JwksError),

    /// The token signature did not verify, or its algorithm is not an accepted
    /// elliptic-curve algorithm for the resolved key.
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// A required claim is missing from the token.
    #[error("A required claim is missing from the token: {0}")]
    MissingClaim(String),

    /// The token's `exp` is in the past, beyond the clock skew tolerance.
    #[error("Token has expired")]
    TokenExpired,

    /// The token's `iat` is in the future, beyond the clock skew tolerance.
    #[error("Token issued in the future")]
    TokenNotYetValid,

    /// The token's `aud` does not match the expected audience.
    #[error("Invalid audience")]
    InvalidAudience,

    /// The token's `iss` does not match the provider's issuer.
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A private key (PEM) is malformed or of the wrong type.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Signing a client-secret assertion failed.
    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The provider does not support the requested operation.
    #[error("Unsupported operation for provider {provider}: {operation}")]
    UnsupportedOperation {
        provider: &'static str,
        operation: &'static str,
    },
}
