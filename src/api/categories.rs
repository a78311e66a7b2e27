//! Public category API endpoints
//!
//! - GET /api/v1/categories - All categories with visible post counts
//! - GET /api/v1/categories/{slug}/posts - Visible posts in a category

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{CategoryResponse, PaginatedResponse, PostResponse};

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{slug}/posts", get(get_category_posts))
}

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.category_service.list_with_counts().await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/categories/{slug}/posts
async fn get_category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    let category = state.category_service.get_by_slug(&slug).await?;
    let result = state
        .post_service
        .list_visible_in_category(category.id, &query.params())
        .await?;
    Ok(Json(result.into()))
}
