//! Public post API endpoints
//!
//! - GET /api/v1/posts - Page of visible posts, newest first
//! - GET /api/v1/posts/{slug} - A single visible post

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{PaginatedResponse, PostResponse};

/// Build the posts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{slug}", get(get_post))
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    let result = state.post_service.list_visible(&query.params()).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/posts/{slug}
///
/// Drafts and posts without a publication time are reported as missing.
async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_visible_by_slug(&slug).await?;
    Ok(Json(post.into()))
}
