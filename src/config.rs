// src/config.rs

use crate::error::NilaSsoError;
use std::time::Duration;
use url::Url;

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google's OpenID Connect userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Apple's token endpoint.
pub const APPLE_TOKEN_URL: &str = "https://appleid.apple.com/auth/token";
/// Apple's JWKS endpoint.
pub const APPLE_JWKS_URL: &str = "https://appleid.apple.com/auth/keys";
/// The `iss` of Apple ID tokens, and the `aud` of Apple client-secret assertions.
pub const APPLE_ISSUER: &str = "https://appleid.apple.com";

/// Client-side timeout applied to every outbound HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// How long a fetched JWKS is trusted before it is refetched.
pub const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Tolerance for clock skew when validating `exp` and `iat`.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Validation settings for a provider's ID tokens.
///
/// The issuer and the key source are per-provider data, not code branches.
#[derive(Debug, Clone)]
pub struct IdTokenConfig {
    /// The exact `iss` value a token must carry.
    pub issuer: String,
    /// The endpoint publishing the provider's signing keys.
    pub jwks_uri: Url,
    /// How long a fetched key set is treated as authoritative.
    pub cache_ttl: Duration,
    /// The tolerance for clock skew on `exp` and `iat`.
    pub leeway: Duration,
    /// When set, a `kid` missing from a fresh key set may trigger one refetch,
    /// at most once per this interval. `None` keeps the cache authoritative
    /// until its TTL lapses.
    pub miss_refresh_interval: Option<Duration>,
}

/// The configuration of one identity provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub token_url: Url,
    pub userinfo_url: Option<Url>,
    /// `None` when the provider's ID tokens are not verified by this crate.
    pub id_token: Option<IdTokenConfig>,
    pub http_timeout: Duration,
}

/// A builder for creating a `ProviderConfig` instance.
///
/// Start from a preset (`google()` / `apple()`) and override what you need, or
/// start from `new()` and set every endpoint yourself.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    token_url: Option<String>,
    userinfo_url: Option<String>,
    jwks_uri: Option<String>,
    issuer: Option<String>,
    cache_ttl: Option<Duration>,
    leeway: Option<Duration>,
    miss_refresh_interval: Option<Duration>,
    http_timeout: Option<Duration>,
}

fn parse_url(url: &str) -> Result<Url, NilaSsoError> {
    Url::parse(url).map_err(|e| NilaSsoError::InvalidUrl(format!("{url}: {e}")))
}

impl ConfigBuilder {
    /// Creates an empty `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preset with Google's endpoints. Google ID tokens are not verified here.
    pub fn google() -> Self {
        Self {
            token_url: Some(GOOGLE_TOKEN_URL.to_string()),
            userinfo_url: Some(GOOGLE_USERINFO_URL.to_string()),
            ..Self::default()
        }
    }

    /// A builder preset with Apple's endpoints and issuer.
    pub fn apple() -> Self {
        Self {
            token_url: Some(APPLE_TOKEN_URL.to_string()),
            jwks_uri: Some(APPLE_JWKS_URL.to_string()),
            issuer: Some(APPLE_ISSUER.to_string()),
            ..Self::default()
        }
    }

    /// Sets the token endpoint. This is a required field.
    pub fn token_url(mut self, url: &str) -> Result<Self, NilaSsoError> {
        parse_url(url)?;
        self.token_url = Some(url.to_string());
        Ok(self)
    }

    /// Sets the userinfo endpoint.
    pub fn userinfo_url(mut self, url: &str) -> Result<Self, NilaSsoError> {
        parse_url(url)?;
        self.userinfo_url = Some(url.to_string());
        Ok(self)
    }

    /// Sets the JWKS endpoint. Requires an issuer as well.
    pub fn jwks_uri(mut self, url: &str) -> Result<Self, NilaSsoError> {
        parse_url(url)?;
        self.jwks_uri = Some(url.to_string());
        Ok(self)
    }

    /// Sets the exact issuer ID tokens must carry.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the JWKS cache TTL. Defaults to one hour.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// Enables rate-limited refetching when a `kid` is missing from a fresh key set.
    pub fn miss_refresh_interval(mut self, interval: Duration) -> Self {
        self.miss_refresh_interval = Some(interval);
        self
    }

    /// Sets the client-side HTTP timeout. Defaults to 10 seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Consumes the builder and returns a `ProviderConfig` object.
    ///
    /// # Errors
    ///
    /// Returns an error if the token URL is missing, if only one of JWKS URI and
    /// issuer is set, or if a duration is zero.
    pub fn build(self) -> Result<ProviderConfig, NilaSsoError> {
        let token_url = parse_url(
            &self
                .token_url
                .ok_or(NilaSsoError::MissingConfiguration("token_url".to_string()))?,
        )?;
        let userinfo_url = self.userinfo_url.as_deref().map(parse_url).transpose()?;

        let http_timeout = self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT);
        if http_timeout.is_zero() {
            return Err(NilaSsoError::InvalidConfiguration("http_timeout must be non-zero".to_string()));
        }

        let id_token = match (self.jwks_uri, self.issuer) {
            (Some(jwks_uri), Some(issuer)) => {
                let cache_ttl = self.cache_ttl.unwrap_or(DEFAULT_JWKS_CACHE_TTL);
                if cache_ttl.is_zero() {
                    return Err(NilaSsoError::InvalidConfiguration("cache_ttl must be non-zero".to_string()));
                }
                Some(IdTokenConfig {
                    issuer,
                    jwks_uri: parse_url(&jwks_uri)?,
                    cache_ttl,
                    leeway: self.leeway.unwrap_or(DEFAULT_LEEWAY),
                    miss_refresh_interval: self.miss_refresh_interval,
                })
            }
            (None, None) => None,
            (Some(_), None) => return Err(NilaSsoError::MissingConfiguration("issuer".to_string())),
            (None, Some(_)) => return Err(NilaSsoError::MissingConfiguration("jwks_uri".to_string())),
        };

        Ok(ProviderConfig {
            token_url,
            userinfo_url,
            id_token,
            http_timeout,
        })
    }
}

/// Builds the shared HTTP client with the configured client-side timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, NilaSsoError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
