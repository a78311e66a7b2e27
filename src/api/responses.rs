//! Shared API response types
//!
//! Response structures used across endpoints, and the mapping from service
//! errors onto [`ApiError`].

use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::{Category, CategoryWithCount, PagedResult, Post, User};
use crate::services::{CategoryServiceError, PostServiceError};
use crate::theme::ThemeError;

// ============================================================================
// Post Response Types
// ============================================================================

/// Full post response
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub excerpt: Option<String>,
    pub category_id: Option<i64>,
    pub is_published: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub url: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        let url = post.absolute_url();
        Self {
            id: post.id,
            slug: post.slug,
            title: post.title,
            content: post.content,
            content_html: post.content_html,
            excerpt: post.excerpt,
            category_id: post.category_id,
            is_published: post.is_published,
            published_at: post.published_at.map(|dt| dt.to_rfc3339()),
            created_at: post.created_at.to_rfc3339(),
            updated_at: post.updated_at.to_rfc3339(),
            url,
        }
    }
}

// ============================================================================
// Category Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_count: Option<i64>,
}

impl From<Category> for CategoryResponse {
    fn from(cat: Category) -> Self {
        Self {
            id: cat.id,
            slug: cat.slug,
            name: cat.name,
            description: cat.description,
            created_at: cat.created_at.to_rfc3339(),
            post_count: None,
        }
    }
}

impl From<CategoryWithCount> for CategoryResponse {
    fn from(item: CategoryWithCount) -> Self {
        let mut response = Self::from(item.category);
        response.post_count = Some(item.post_count);
        response
    }
}

// ============================================================================
// User Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
            last_login: user.last_login.map(|dt| dt.to_rfc3339()),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Pagination Response Types
// ============================================================================

/// One page of items plus paging totals
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T, U: From<T>> From<PagedResult<T>> for PaginatedResponse<U> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
            items: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Error Conversions
// ============================================================================

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            PostServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            PostServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            PostServiceError::InternalError(err) => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            CategoryServiceError::InternalError(err) => ApiError::internal_error(err.to_string()),
        }
    }
}

impl From<ThemeError> for ApiError {
    fn from(e: ThemeError) -> Self {
        ApiError::internal_error(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_post_response_fields() {
        let mut post = Post::new("Hello".into(), "hello".into(), "# Hi".into(), "<h1>Hi</h1>".into());
        post.id = 7;
        let response = PostResponse::from(post);
        assert_eq!(response.url, "/hello/");
        assert_eq!(response.published_at, None);
        assert_eq!(response.id, 7);
    }

    #[test]
    fn test_paginated_response_totals() {
        let params = crate::models::ListParams::new(2, 2);
        let page = PagedResult::new(
            vec![Category::new("A".into(), "a".into(), String::new())],
            3,
            &params,
        );
        let response: PaginatedResponse<CategoryResponse> = page.into();
        assert_eq!(response.total_pages, 2);
        assert_eq!(response.items[0].slug, "a");
        assert!(response.items[0].post_count.is_none());
    }

    #[test]
    fn test_service_errors_map_to_status() {
        let cases = [
            (ApiError::from(PostServiceError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (ApiError::from(PostServiceError::ValidationError("x".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(PostServiceError::DuplicateSlug("x".into())), StatusCode::CONFLICT),
            (ApiError::from(CategoryServiceError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (ApiError::from(CategoryServiceError::DuplicateSlug("x".into())), StatusCode::CONFLICT),
            (
                ApiError::from(PostServiceError::InternalError(anyhow::anyhow!("boom"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
    }
}
