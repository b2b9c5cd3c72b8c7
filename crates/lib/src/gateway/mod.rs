//! Gateway: HTTP webhook server.
//!
//! Serves the liveness endpoint and the LINE webhook on one port. Signature
//! verification runs on the raw body before any event handling.

mod server;

pub use server::{run_gateway, AppState};
