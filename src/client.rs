// src/client.rs

use crate::clock::SharedClock;
use crate::config::IdTokenConfig;
use crate::error::JwksError;
use crate::model::{JsonWebKey, JsonWebKeySet};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// The elliptic curves a provider key may be published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    /// Maps a JWK `crv` value onto a curve.
    pub fn from_jwk(crv: &str) -> Option<Self> {
        match crv {
            "P-256" => Some(Self::P256),
            "P-384" => Some(Self::P384),
            "P-521" => Some(Self::P521),
            _ => None,
        }
    }

    /// Length in bytes of one affine coordinate.
    pub fn coordinate_len(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    /// The JWS algorithm that signs with this curve. P-521 (ES512) has no
    /// verifier available, so tokens can never verify against such a key.
    pub fn algorithm(self) -> Option<Algorithm> {
        match self {
            Self::P256 => Some(Algorithm::ES256),
            Self::P384 => Some(Algorithm::ES384),
            Self::P521 => None,
        }
    }
}

/// One provider public key usable to verify a signature.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub curve: EcCurve,
    pub decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

type KeyMap = HashMap<String, Arc<SigningKey>>;

/// The cached key set and the instant it stops being authoritative.
///
/// The map is only ever replaced whole, never patched.
#[derive(Default)]
struct KeyCache {
    keys: KeyMap,
    expires_at: Option<SystemTime>,
    last_fetch: Option<SystemTime>,
    // Set before every miss refresh, whether or not the fetch succeeds.
    last_miss_refresh: Option<SystemTime>,
}

impl KeyCache {
    fn is_fresh(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now < expires_at)
    }

    fn replace(&mut self, keys: KeyMap, fetched_at: SystemTime, ttl: Duration) {
        self.keys = keys;
        self.expires_at = Some(fetched_at + ttl);
        self.last_fetch = Some(fetched_at);
    }
}

/// A client for fetching and caching a provider's elliptic-curve signing keys.
///
/// Every lookup, and any refresh it triggers, runs under one lock. A refresh
/// holds the lock across the HTTP fetch, so concurrent callers wait for the
/// in-flight fetch instead of issuing their own.
#[derive(Clone)]
pub struct JwksClient {
    // The client is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    http_client: reqwest::Client,
    jwks_uri: Url,
    cache_ttl: Duration,
    miss_refresh_interval: Option<Duration>,
    clock: SharedClock,
    cache: Mutex<KeyCache>,
}

impl JwksClient {
    /// Creates a new `JwksClient` with an empty cache for the given key source.
    /// Nothing is fetched until the first lookup.
    pub fn new(config: &IdTokenConfig, http_client: reqwest::Client, clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(Inner {
                http_client,
                jwks_uri: config.jwks_uri.clone(),
                cache_ttl: config.cache_ttl,
                miss_refresh_interval: config.miss_refresh_interval,
                clock,
                cache: Mutex::new(KeyCache::default()),
            }),
        }
    }

    /// Retrieves the signing key for the given Key ID (`kid`).
    ///
    /// While the cache is fresh it is authoritative: an unknown `kid` fails with
    /// `KeyNotFound` without refetching (unless miss refresh is enabled and due).
    /// Once stale, the whole key set is refetched and replaced before the lookup.
    #[instrument(skip(self), err)]
    pub async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, JwksError> {
        let mut cache = self.inner.cache.lock().await;
        let now = self.inner.clock.now();

        if cache.is_fresh(now) {
            if let Some(key) = cache.keys.get(kid) {
                debug!("JWK cache hit for kid: {}", kid);
                return Ok(key.clone());
            }
            if !self.miss_refresh_due(&cache, now) {
                debug!("kid {} not in fresh JWKS cache; not refetching", kid);
                return Err(JwksError::KeyNotFound(kid.to_string()));
            }
            debug!("kid {} not in fresh JWKS cache; miss refresh is due", kid);
            cache.last_miss_refresh = Some(now);
        } else {
            debug!("JWKS cache stale or empty. Fetching from provider.");
        }

        let keys = self.fetch_keys().await?;
        let fetched_at = self.inner.clock.now();
        cache.replace(keys, fetched_at, self.inner.cache_ttl);

        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    fn miss_refresh_due(&self, cache: &KeyCache, now: SystemTime) -> bool {
        let Some(interval) = self.inner.miss_refresh_interval else {
            return false;
        };
        cache
            .last_fetch
            .max(cache.last_miss_refresh)
            .and_then(|last| now.duration_since(last).ok())
            .is_some_and(|elapsed| elapsed >= interval)
    }

    /// Fetches the JWKS and builds a fresh key map from it.
    #[instrument(skip(self), fields(jwks_uri = %self.inner.jwks_uri), err)]
    async fn fetch_keys(&self) -> Result<KeyMap, JwksError> {
        let response = self
            .inner
            .http_client
            .get(self.inner.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| JwksError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(JwksError::FetchFailed(format!("JWKS endpoint returned status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| JwksError::FetchFailed(e.to_string()))?;
        let jwks: JsonWebKeySet =
            serde_json::from_slice(&body).map_err(|e| JwksError::DecodeFailed(e.to_string()))?;

        let keys = parse_key_set(jwks);
        info!("Successfully fetched {} usable signing keys. Caching with TTL: {:?}", keys.len(), self.inner.cache_ttl);
        Ok(keys)
    }
}

/// Builds the `kid -> key` map, keeping only EC signing keys on a known curve
/// with decodable coordinates. Anything else is skipped.
pub(crate) fn parse_key_set(jwks: JsonWebKeySet) -> KeyMap {
    let mut keys = HashMap::with_capacity(jwks.keys.len());
    for jwk in jwks.keys {
        match signing_key_from_jwk(&jwk) {
            Some(key) => {
                keys.insert(key.kid.clone(), Arc::new(key));
            }
            None => debug!(kid = %jwk.kid, kty = %jwk.kty, "Skipping unusable JWK"),
        }
    }
    keys
}

fn signing_key_from_jwk(jwk: &JsonWebKey) -> Option<SigningKey> {
    if jwk.kty != "EC" || jwk.use_purpose.as_deref() != Some("sig") || jwk.kid.is_empty() {
        return None;
    }
    let curve = EcCurve::from_jwk(jwk.crv.as_deref()?)?;
    let x = decode_coordinate(jwk.x.as_deref()?, curve)?;
    let y = decode_coordinate(jwk.y.as_deref()?, curve)?;

    let decoding_key = match DecodingKey::from_ec_components(&x, &y) {
        Ok(key) => key,
        Err(e) => {
            warn!(kid = %jwk.kid, "Failed to build EC decoding key: {}", e);
            return None;
        }
    };

    Some(SigningKey {
        kid: jwk.kid.clone(),
        curve,
        decoding_key,
    })
}

/// Decodes a big-endian coordinate and re-encodes it left-padded to the curve's
/// coordinate length, which the uncompressed point encoding requires.
fn decode_coordinate(encoded: &str, curve: EcCurve) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let len = curve.coordinate_len();
    if bytes.is_empty() || bytes.len() > len {
        return None;
    }
    let mut padded = vec![0u8; len - bytes.len()];
    padded.extend_from_slice(&bytes);
    Some(URL_SAFE_NO_PAD.encode(padded))
}
