//! HTTP surface: routes, page rendering, and error pages.

pub mod handlers;
pub mod templates;

use crate::app::App;
use crate::Error;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use minijinja::context;
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router serving pages, status polling and assets.
pub fn router(app: App, static_dir: impl AsRef<Path>) -> Router {
    let body_limit = app
        .settings()
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::index))
        .route("/upload_image", post(handlers::upload_image))
        .route("/status", get(handlers::status))
        .route("/context", get(handlers::context_form))
        .route("/generate_caption", post(handlers::generate_caption))
        .route("/feedback", post(handlers::feedback))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::Upload(message) | Error::BadRequest(message) => {
                tracing::warn!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, message.clone())
            }
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our side. Please try again.".to_string(),
                )
            }
        };

        let page = templates::render(
            "error.html",
            context! { status => status.as_u16(), message => &message },
        );
        match page {
            Ok(html) => (status, html).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                (status, Html(message)).into_response()
            }
        }
    }
}
