// src/pkce.rs

use crate::error::NilaSsoError;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};

/// Default number of random bytes behind a state token.
pub const DEFAULT_STATE_BYTES: usize = 32;

/// Default number of random bytes behind a PKCE verifier (43 characters once encoded).
pub const DEFAULT_PKCE_BYTES: usize = 32;

/// A PKCE verifier and its S256 challenge for one authorization attempt.
///
/// The `challenge` goes on the authorization redirect; the `verifier` is held by
/// the caller until the code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceCredential {
    pub verifier: String,
    pub challenge: String,
}

impl PkceCredential {
    /// The PKCE method name to send as `code_challenge_method`.
    pub const METHOD: &'static str = "S256";
}

fn random_bytes(len: usize) -> Result<Vec<u8>, NilaSsoError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| NilaSsoError::RandomSource(e.to_string()))?;
    Ok(bytes)
}

/// Creates an anti-CSRF state token from `byte_length` random bytes,
/// encoded as padded URL-safe base64.
pub fn generate_state(byte_length: usize) -> Result<String, NilaSsoError> {
    Ok(URL_SAFE.encode(random_bytes(byte_length)?))
}

/// Creates a PKCE verifier from `byte_length` random bytes (unpadded base64url)
/// and derives its S256 challenge.
pub fn generate_pkce(byte_length: usize) -> Result<PkceCredential, NilaSsoError> {
    let verifier = URL_SAFE_NO_PAD.encode(random_bytes(byte_length)?);
    let challenge = s256_challenge(&verifier);
    Ok(PkceCredential { verifier, challenge })
}

/// `base64url_nopad(SHA-256(verifier))`.
pub fn s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
