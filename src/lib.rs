//! Auth0 Signals relay.
//!
//! Enriches IP observables sent by a threat response platform with Auth0
//! Signals reputation data and answers with CTIM documents.
//!
//! # Routes
//!
//! - **`/deliberate/observables`** - Verdicts derived from the Signals score
//! - **`/observe/observables`** - Verdicts, judgements, and blocklist
//!   sightings with their indicators and relationships
//! - **`/refer/observables`** - Links to the Signals UI report for each IP
//! - **`/health`** - Checks that Signals accepts the caller's API key
//! - **`/version`** - Relay version
//!
//! Every route answers HTTP 200 with `{"data": ..., "errors": [...]}`.
//!
//! # Example Configuration
//!
//! ```yaml
//! auth:
//!   mode: jwt
//!   secret_key: "${SECRET_KEY}"
//!
//! signals:
//!   api_url: "https://signals.api.auth0.com/"
//!   timeout_ms: 5000
//!   entities_limit: 100
//! ```

pub mod auth;
pub mod config;
pub mod ctim;
pub mod envelope;
pub mod error;
pub mod http;
pub mod observable;
pub mod relay;
pub mod signals;

pub use config::Config;
pub use error::RelayError;
pub use relay::Relay;
