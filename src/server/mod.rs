//! HTTP surface: router construction and shared state.

pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::ai::AiProvider;
use crate::config::AppConfig;
use crate::prompts::PromptTemplates;
use crate::store::AppletStore;

/// Global request body cap.
pub const MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Serialized storage payloads above this size are rejected.
pub const MAX_STORAGE_BYTES: usize = 10 * 1024 * 1024;

/// Self-origin policy with inline scripts/styles allowed (generated applets
/// rely on them) and a CDN allowance for icon fonts.
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0-beta3/ 'unsafe-inline'; \
     font-src 'self' https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0-beta3/";

/// Shared application state, generic over the AI provider so tests can
/// substitute a mock.
pub struct AppState<P> {
    pub config: AppConfig,
    pub store: AppletStore,
    pub templates: PromptTemplates,
    pub ai: P,
}

pub fn router<P: AiProvider>(state: Arc<AppState<P>>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .route("/applet", post(handlers::create_applet::<P>))
        .route(
            "/applet/{id}",
            get(handlers::show_applet::<P>).post(handlers::change_applet::<P>),
        )
        .route("/applet/{id}/html", get(handlers::get_applet_html::<P>))
        .route(
            "/applet/{id}/storage",
            get(handlers::get_storage::<P>)
                .put(handlers::put_storage::<P>)
                .delete(handlers::delete_storage::<P>),
        )
        .layer(DefaultBodyLimit::max(MAX_CONTENT_LENGTH))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .with_state(state)
}
