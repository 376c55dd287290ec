// src/lib.rs

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod exchange;
pub mod model;
pub mod pkce;
pub mod provider;
pub mod validator;

/// The public prelude for the `nila-sso` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::client::{EcCurve, JwksClient, SigningKey};
    pub use crate::clock::{system_clock, Clock, SharedClock, SystemClock};
    pub use crate::config::{ConfigBuilder, IdTokenConfig, ProviderConfig};
    pub use crate::error::{JwksError, NilaSsoError};
    pub use crate::exchange::{CodeExchangeRequest, CodeExchanger};
    pub use crate::model::{TokenResponse, UserInfo};
    pub use crate::pkce::{generate_pkce, generate_state, PkceCredential, DEFAULT_PKCE_BYTES, DEFAULT_STATE_BYTES};
    pub use crate::provider::{AppleCredentials, AppleProvider, AuthorizationCode, GoogleProvider, Provider};
    pub use crate::validator::{Claims, IdTokenVerifier};
}
