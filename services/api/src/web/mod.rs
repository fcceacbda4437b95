pub mod auth;
pub mod chats;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod pdfs;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use pdf_chat_core::workflow::MAX_UPLOAD_BYTES;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use middleware::require_auth;
use state::AppState;

/// Cap for JSON request bodies.
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

/// Cap for the upload form: the file plus room for the text parts and boundaries.
pub const UPLOAD_BODY_LIMIT: usize = 2 * MAX_UPLOAD_BYTES;

/// Builds every `/api` route over the shared state. CORS and the Swagger UI are
/// layered on by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/auth/profile",
            get(auth::profile_handler).put(auth::update_profile_handler),
        )
        .route("/api/pdfs", get(pdfs::list_pdfs_handler))
        .route(
            "/api/pdfs/upload",
            post(pdfs::upload_pdf_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/pdfs/{id}",
            get(pdfs::get_pdf_handler).delete(pdfs::delete_pdf_handler),
        )
        .route("/api/pdfs/{id}/pdfs", get(pdfs::list_user_pdfs_handler))
        .route("/api/pdfs/{id}/ask", post(pdfs::ask_pdf_handler))
        .route("/api/pdfs/{id}/summarize", post(pdfs::summarize_pdf_handler))
        .route("/api/pdfs/{id}/flow", get(pdfs::pdf_flow_handler))
        .route("/api/chats/{pdf_id}/question", post(chats::ask_question_handler))
        .route("/api/chats/{pdf_id}/chats", get(chats::list_chats_handler))
        .route("/api/chats/chats/{chat_id}", delete(chats::delete_chat_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(rest::fallback_handler)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
