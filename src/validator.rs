// src/validator.rs

use crate::client::JwksClient;
use crate::clock::{unix_seconds, SharedClock};
use crate::config::IdTokenConfig;
use crate::error::NilaSsoError;
use jsonwebtoken::{decode, decode_header, Validation};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// The claims of an ID token that passed verification.
///
/// `extra` holds every other claim the provider sent (`email`, `nonce`,
/// `email_verified`, ...), untouched.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: Option<i64>,
    pub sub: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Verifies ID tokens signed with a provider's elliptic-curve keys.
///
/// The signature is always checked before any claim is looked at. The key
/// resolver is injected, so one cache can back any number of verifiers.
#[derive(Clone)]
pub struct IdTokenVerifier {
    resolver: JwksClient,
    issuer: String,
    leeway: Duration,
    clock: SharedClock,
}

impl IdTokenVerifier {
    /// Creates a verifier with its own key cache for the configured JWKS endpoint.
    pub fn new(config: &IdTokenConfig, http_client: reqwest::Client, clock: SharedClock) -> Self {
        let resolver = JwksClient::new(config, http_client, clock.clone());
        Self::with_resolver(resolver, config.issuer.clone(), config.leeway, clock)
    }

    /// Creates a verifier around an existing key resolver.
    pub fn with_resolver(resolver: JwksClient, issuer: String, leeway: Duration, clock: SharedClock) -> Self {
        Self {
            resolver,
            issuer,
            leeway,
            clock,
        }
    }

    /// Verifies `token` and returns its claims.
    ///
    /// # Errors
    ///
    /// * `MalformedToken` if the header cannot be parsed or carries no `kid`.
    /// * `KeyResolutionFailed` if the signing key cannot be resolved.
    /// * `SignatureInvalid` for a non-EC algorithm, an algorithm that does not
    ///   match the key's curve, or a bad signature.
    /// * `MissingClaim`, `TokenExpired`, `TokenNotYetValid`, `InvalidAudience`,
    ///   `InvalidIssuer` for claim failures.
    #[instrument(skip(self, token), err)]
    pub async fn verify(&self, token: &str, expected_audience: &str) -> Result<Claims, NilaSsoError> {
        // 1. Read the header without trusting it.
        let header = decode_header(token).map_err(|e| NilaSsoError::MalformedToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| NilaSsoError::MalformedToken("missing kid in token header".to_string()))?;

        // 2. Resolve the key.
        let key = self.resolver.get_key(&kid).await?;

        // 3. Only the EC algorithm matching the key's curve is acceptable.
        let algorithm = key
            .curve
            .algorithm()
            .filter(|alg| *alg == header.alg)
            .ok_or_else(|| {
                NilaSsoError::SignatureInvalid(format!(
                    "unexpected signing method {:?} for {:?} key",
                    header.alg, key.curve
                ))
            })?;

        // Time, audience and issuer are checked below against the injected clock.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Map<String, Value>>(token, &key.decoding_key, &validation)
            .map_err(|e| NilaSsoError::SignatureInvalid(e.to_string()))?;
        debug!(kid = %kid, "ID token signature verified");

        // 4. Claims.
        self.validate_claims(token_data.claims, expected_audience)
    }

    fn validate_claims(&self, mut claims: Map<String, Value>, expected_audience: &str) -> Result<Claims, NilaSsoError> {
        let now = unix_seconds(self.clock.now());
        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);

        let exp = claims
            .remove("exp")
            .as_ref()
            .and_then(numeric_date)
            .ok_or_else(|| NilaSsoError::MissingClaim("exp".to_string()))?;
        if now > exp.saturating_add(leeway) {
            return Err(NilaSsoError::TokenExpired);
        }

        let iat = claims.remove("iat").as_ref().and_then(numeric_date);
        if let Some(iat) = iat {
            if iat > now.saturating_add(leeway) {
                return Err(NilaSsoError::TokenNotYetValid);
            }
        }

        let aud = match claims.remove("aud") {
            None | Some(Value::Null) => return Err(NilaSsoError::MissingClaim("aud".to_string())),
            Some(Value::String(aud)) if aud == expected_audience => aud,
            Some(_) => return Err(NilaSsoError::InvalidAudience),
        };

        let iss = match claims.remove("iss") {
            None | Some(Value::Null) => return Err(NilaSsoError::MissingClaim("iss".to_string())),
            Some(Value::String(iss)) if iss == self.issuer => iss,
            Some(_) => return Err(NilaSsoError::InvalidIssuer),
        };

        let sub = match claims.remove("sub") {
            Some(Value::String(sub)) => Some(sub),
            Some(other) => {
                claims.insert("sub".to_string(), other);
                None
            }
            None => None,
        };

        Ok(Claims {
            iss,
            aud,
            exp,
            iat,
            sub,
            extra: claims,
        })
    }
}

/// Reads a JWT NumericDate, which may be sent as an integer or a float.
fn numeric_date(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}
