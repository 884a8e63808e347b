//! Axum backend: identity lookup, explanation generation and query history.
//!
//! - Request body size limits (64KB max)
//! - Request timeouts (120s, longer than one generation call)
//! - CORS restricted to configured extension origins

pub mod generation;
mod handlers;
mod server;
pub mod session;
pub mod store;
pub mod validation;

pub use generation::{ExplanationGenerator, GeminiGenerator};
pub use server::{build_app, run_server, run_server_with_listener};
pub use session::{SessionResolver, StaticSessionResolver};
pub use store::{QueryStore, SqliteQueryStore};

use std::sync::Arc;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout; must outlast `generation.timeout_secs`
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QueryStore>,
    pub generator: Arc<dyn ExplanationGenerator>,
    pub sessions: Arc<dyn SessionResolver>,
}
