//! Admin API endpoints
//!
//! Staff-only management of categories and posts. Every route sits behind
//! `require_auth` and `require_staff`.
//!
//! Categories:
//! - GET /api/v1/admin/categories?q&page&per_page
//! - POST /api/v1/admin/categories
//! - GET|PUT|DELETE /api/v1/admin/categories/{id}
//!
//! Posts:
//! - GET /api/v1/admin/posts with search, filters, date drill-down and ordering
//! - POST /api/v1/admin/posts
//! - GET|PUT|DELETE /api/v1/admin/posts/{id}
//! - GET /api/v1/admin/posts/dates - Months that have published posts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::api::common::{AdminCategoryQuery, AdminPostQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{CategoryResponse, PaginatedResponse, PostResponse};
use crate::models::{
    CreateCategoryInput, CreatePostInput, PublishedMonth, UpdateCategoryInput, UpdatePostInput,
};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/dates", get(post_dates))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

// ============================================================================
// Categories
// ============================================================================

/// GET /api/v1/admin/categories
async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<AdminCategoryQuery>,
) -> Result<Json<PaginatedResponse<CategoryResponse>>, ApiError> {
    let result = state
        .category_service
        .search(&query.q, &query.params())
        .await?;
    Ok(Json(result.into()))
}

/// POST /api/v1/admin/categories
async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let category = state.category_service.create(body).await?;
    tracing::info!("{} created category '{}'", user.0.username, category.slug);
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// GET /api/v1/admin/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.category_service.get_by_id(id).await?;
    Ok(Json(category.into()))
}

/// PUT /api/v1/admin/categories/{id}
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryInput>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let category = state.category_service.update(id, body).await?;
    Ok(Json(category.into()))
}

/// DELETE /api/v1/admin/categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    tracing::info!("{} deleted category {}", user.0.username, id);
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Posts
// ============================================================================

/// GET /api/v1/admin/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminPostQuery>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    let filter = query.filter()?;
    let result = state
        .post_service
        .admin_list(&filter, &query.params())
        .await?;
    Ok(Json(result.into()))
}

/// POST /api/v1/admin/posts
async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let post = state.post_service.create(body).await?;
    tracing::info!("{} created post '{}'", user.0.username, post.slug);
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// GET /api/v1/admin/posts/{id}
///
/// Drafts are visible here.
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.get_by_id(id).await?;
    Ok(Json(post.into()))
}

/// PUT /api/v1/admin/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.post_service.update(id, body).await?;
    Ok(Json(post.into()))
}

/// DELETE /api/v1/admin/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    tracing::info!("{} deleted post {}", user.0.username, id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/posts/dates
async fn post_dates(
    State(state): State<AppState>,
) -> Result<Json<Vec<PublishedMonth>>, ApiError> {
    Ok(Json(state.post_service.published_dates().await?))
}
