//! API module for HTTP endpoints
//!
//! This module exposes the message store over REST plus a live SSE stream.

pub mod http;
pub mod rest;
pub mod state;
pub mod stream;

pub use http::create_router;
pub use state::AppState;
