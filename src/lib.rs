//! Translate Messages-style LLM requests into Chat Completions requests and
//! the responses back again.
//!
//! The [`translate`] module is the pure conversion layer. [`Bridge`] wires it
//! to a [`ChatTransport`], and [`server`] exposes the whole thing over HTTP.

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod server;
pub mod translate;
pub mod transport;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
pub use transport::{ChatTransport, HttpTransport};
