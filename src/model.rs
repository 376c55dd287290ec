// src/model.rs

use serde::{Deserialize, Serialize};

/// Represents a single JSON Web Key (JWK) as published by a provider's JWKS endpoint.
///
/// Only the elliptic-curve members are modelled; RSA members are ignored on decode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonWebKey {
    #[serde(default)]
    pub kid: String,
    #[serde(default)]
    pub kty: String,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// Represents a JSON Web Key Set (JWKS), which is a collection of JWKs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

/// The reply of a provider's token endpoint after a successful code exchange.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    /// Present for OpenID Connect flows (Apple always, Google when `openid` was requested).
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// The user profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: String,
}
