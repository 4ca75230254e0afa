//! HTTP surface of the relay.

mod handlers;
mod router;
mod server;

pub use router::build_router;
pub use server::run_http_server;
