//! Tonal API crate - axum proxy between the shell and the model provider.
//!
//! Exposes chat completion, transcription and speech synthesis endpoints,
//! builds the personality-conditioned prompt, and forwards each request to
//! the upstream provider with the server-side API key.

pub mod error;
pub mod handlers;
pub mod prompt;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use upstream::{MockUpstream, OpenAiUpstream, Upstream, UpstreamError};
