//! Relay error taxonomy and its wire representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INVALID_ARGUMENT: &str = "invalid argument";
pub const PERMISSION_DENIED: &str = "permission denied";
pub const UNAUTHORIZED: &str = "unauthorized";
pub const UNKNOWN: &str = "unknown";

/// Errors raised while serving a relay request.
///
/// None of these terminate the process; each is rendered into the response
/// envelope through [`RelayError::to_doc`].
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid JSON payload received. {0}")]
    InvalidArgument(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// The vendor rejected the API key (HTTP 401).
    #[error("Unexpected response from Auth0 Signals: {text}")]
    Unauthorized { text: String },

    /// Any other unexpected vendor status.
    #[error("Unexpected response from Auth0 Signals: {text}")]
    Critical { reason: String, text: String },

    #[error("Unable to verify SSL certificate: {0}")]
    Ssl(String),

    #[error("Unable to reach Auth0 Signals: {0}")]
    Transport(String),

    #[error("Invalid response from Auth0 Signals: {0}")]
    InvalidResponse(String),

    #[error("Unexpected score in Auth0 Signals response: {0}")]
    UnexpectedScore(i64),
}

impl RelayError {
    /// Machine-readable error code placed in the envelope.
    pub fn code(&self) -> String {
        match self {
            Self::InvalidArgument(_) => INVALID_ARGUMENT.to_string(),
            Self::Authorization(_) => PERMISSION_DENIED.to_string(),
            Self::Unauthorized { .. } => UNAUTHORIZED.to_string(),
            Self::Critical { reason, .. } if !reason.is_empty() => reason.to_lowercase(),
            Self::Critical { .. }
            | Self::Ssl(_)
            | Self::Transport(_)
            | Self::InvalidResponse(_)
            | Self::UnexpectedScore(_) => UNKNOWN.to_string(),
        }
    }

    pub fn to_doc(&self) -> ErrorDoc {
        ErrorDoc {
            kind: "fatal".to_string(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(reason) = tls_failure(&e) {
            return RelayError::Ssl(capitalize(&reason));
        }
        if e.is_decode() {
            RelayError::InvalidResponse(e.to_string())
        } else {
            RelayError::Transport(e.to_string())
        }
    }
}

/// Fragments of rustls error messages raised while establishing a session.
const TLS_MARKERS: &[&str] = &[
    "certificate",
    "handshake",
    "tls",
    "ssl",
    "received fatal alert",
    "received corrupt message",
    "peer is incompatible",
    "peer misbehaved",
];

/// Walk the source chain looking for a TLS session failure.
fn tls_failure(e: &reqwest::Error) -> Option<String> {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        let message = err.to_string();
        if is_tls_message(&message) {
            return Some(message);
        }
        source = err.source();
    }
    None
}

fn is_tls_message(message: &str) -> bool {
    let message = message.to_lowercase();
    TLS_MARKERS.iter().any(|marker| message.contains(marker))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `{type, code, message}` entry of the envelope's `errors` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDoc {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
    pub message: String,
}
