//! API layer - HTTP handlers and routing
//!
//! JSON endpoints live under `/api/v1`:
//! - Health check
//! - Public post and category endpoints
//! - Login, logout and current user
//! - Staff-only admin endpoints
//!
//! The HTML post list and post detail pages are served from the root,
//! and the theme's static files from `/static`.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod common;
pub mod health;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod views;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::path::Path;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Staff-only routes
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that need a session but no staff flag
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .merge(health::router())
        .nest("/posts", posts::router())
        .nest("/categories", categories::router())
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
///
/// # Errors
/// Fails when `cors_origin` is not a valid header value.
pub fn build_router(
    state: AppState,
    cors_origin: &str,
    static_dir: &Path,
) -> anyhow::Result<Router> {
    // Credentials are allowed so the session cookie works cross-origin
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(views::router())
        .fallback(views::fallback)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests;
