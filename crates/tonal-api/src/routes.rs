//! Router setup with all API routes and middleware.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Whether a browser origin is served from this machine.
fn is_local_origin(origin: &HeaderValue) -> bool {
    origin.to_str().is_ok_and(|o| {
        ["http://localhost", "http://127.0.0.1", "http://[::1]"]
            .iter()
            .any(|prefix| {
                o.strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
            })
    })
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS: local browser front-ends only.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| is_local_origin(origin)))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    // Multipart framing needs a little room on top of the audio itself.
    let upload_limit = state.max_audio_bytes.saturating_add(64 * 1024);

    let api = Router::new()
        .route("/chat", post(handlers::chat))
        .route(
            "/transcribe",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/tts", post(handlers::tts));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
