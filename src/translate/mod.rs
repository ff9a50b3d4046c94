//! API translation between the Messages and Chat Completions conventions.
//!
//! The core of the bridge: converts requests, responses, and tool invocations
//! between the two API formats. All translation functions are pure (no I/O)
//! and share no state, so they are safe to call from any number of tasks.

pub mod anthropic_types;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod tools;

pub use request::{translate_request, translate_request_with};
pub use response::translate_response;
