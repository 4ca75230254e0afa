//! Inbound bearer token verification.
//!
//! Verifying the caller's token is a separate trust boundary from the vendor
//! accepting the key it carries: this module only proves the token was minted
//! with our secret, the vendor decides whether the key is any good.

use crate::config::{AuthConfig, AuthMode};
use crate::error::RelayError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;

/// Extracts the vendor API key from a verified bearer token.
pub trait AuthProvider: Send + Sync {
    fn vendor_key(&self, token: &str) -> Result<String, RelayError>;
}

/// Build the provider selected by `auth.mode`.
pub fn provider_from_config(config: &AuthConfig) -> Arc<dyn AuthProvider> {
    match config.mode {
        AuthMode::Jwt => Arc::new(JwtAuthProvider::new(&config.secret_key)),
        AuthMode::Passthrough => Arc::new(PassthroughAuthProvider),
    }
}

/// Parse `Authorization: Bearer <token>`.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, RelayError> {
    let header = header
        .ok_or_else(|| RelayError::Authorization("Authorization header is missing".into()))?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(RelayError::Authorization("Wrong authorization type".into())),
    }
}

#[derive(Debug, Deserialize)]
struct RelayClaims {
    key: String,
}

/// HS256 JWT provider; the vendor key travels in the `key` claim.
pub struct JwtAuthProvider {
    secret: Vec<u8>,
    validation: Validation,
}

impl std::fmt::Debug for JwtAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthProvider")
            .field("algorithm", &"HS256")
            .finish_non_exhaustive()
    }
}

impl JwtAuthProvider {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens minted by the orchestrator carry no registered claims;
        // `exp` is still checked when present, `aud` never is.
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_aud = false;

        Self {
            secret: secret.as_bytes().to_vec(),
            validation,
        }
    }
}

impl AuthProvider for JwtAuthProvider {
    fn vendor_key(&self, token: &str) -> Result<String, RelayError> {
        if self.secret.is_empty() {
            return Err(RelayError::Authorization("<SECRET_KEY> is missing".into()));
        }

        let key = DecodingKey::from_secret(&self.secret);
        let data = jsonwebtoken::decode::<RelayClaims>(token, &key, &self.validation).map_err(
            |e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "Failed to decode JWT with provided key",
                    ErrorKind::ExpiredSignature => "Token has expired",
                    ErrorKind::Json(_) => "Wrong JWT payload structure",
                    _ => "Wrong JWT structure",
                };
                RelayError::Authorization(reason.into())
            },
        )?;

        Ok(data.claims.key)
    }
}

/// The bearer token is itself the vendor API key.
#[derive(Debug, Default)]
pub struct PassthroughAuthProvider;

impl AuthProvider for PassthroughAuthProvider {
    fn vendor_key(&self, token: &str) -> Result<String, RelayError> {
        if token.is_empty() {
            return Err(RelayError::Authorization("Token is empty".into()));
        }
        Ok(token.to_string())
    }
}
