//! Server-rendered HTML pages
//!
//! - GET / - Post list, `?page=N` or `?page=last`
//! - GET /{slug}/ - Post detail
//!
//! Anything that cannot be shown renders `404.html` with status 404.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::middleware::{ApiError, AppState};
use crate::models::ListParams;
use crate::services::PostServiceError;
use crate::theme::NOT_FOUND_TEMPLATE;

const POST_LIST_TEMPLATE: &str = "posts/post_list.html";
const POST_DETAIL_TEMPLATE: &str = "posts/post_detail.html";

/// Build the HTML router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(post_list))
        .route("/{slug}/", get(post_detail))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Requested page of the post list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRequest {
    Number(u32),
    Last,
}

impl PageRequest {
    /// `None` for anything that is not a positive integer or `last`
    fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(Self::Number(1)),
            Some("last") => Some(Self::Last),
            Some(s) => s.parse::<u32>().ok().filter(|n| *n >= 1).map(Self::Number),
        }
    }
}

/// Pagination state handed to the list template
#[derive(Debug, Serialize, PartialEq, Eq)]
struct PageObj {
    number: u32,
    num_pages: u32,
    has_next: bool,
    has_previous: bool,
    next_page_number: Option<u32>,
    previous_page_number: Option<u32>,
}

impl PageObj {
    /// An empty list still has one (empty) page
    fn new(number: u32, total: i64, per_page: u32) -> Self {
        let num_pages = num_pages(total, per_page);
        Self {
            number,
            num_pages,
            has_next: number < num_pages,
            has_previous: number > 1,
            next_page_number: (number < num_pages).then_some(number + 1),
            previous_page_number: (number > 1).then(|| number - 1),
        }
    }
}

fn num_pages(total: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let pages = (total.max(0) + per_page - 1) / per_page;
    u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
}

/// GET /
async fn post_list(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Response {
    match render_post_list(&state, query.page.as_deref()).await {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => not_found(&state),
        Err(e) => e.into_response(),
    }
}

async fn render_post_list(state: &AppState, page: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(request) = PageRequest::parse(page) else {
        return Ok(None);
    };
    let per_page = state.posts_per_page;

    let first = match request {
        PageRequest::Number(n) => n,
        PageRequest::Last => 1,
    };
    let mut result = state
        .post_service
        .list_visible(&ListParams::new(first, per_page))
        .await?;

    let last = num_pages(result.total, per_page);
    let number = match request {
        PageRequest::Number(n) if n > last => return Ok(None),
        PageRequest::Number(n) => n,
        PageRequest::Last => {
            if last > 1 {
                result = state
                    .post_service
                    .list_visible(&ListParams::new(last, per_page))
                    .await?;
            }
            last
        }
    };

    let page_obj = PageObj::new(number, result.total, per_page);
    let categories = state.category_service.list_with_counts().await?;

    let mut context = TeraContext::new();
    context.insert("posts", &result.items);
    context.insert("is_paginated", &(page_obj.num_pages > 1));
    context.insert("page_obj", &page_obj);
    context.insert("categories", &categories);

    Ok(Some(state.theme_engine.render(POST_LIST_TEMPLATE, &context)?))
}

/// GET /{slug}/
async fn post_detail(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let post = match state.post_service.get_visible_by_slug(&slug).await {
        Ok(post) => post,
        Err(PostServiceError::NotFound(_)) => return not_found(&state),
        Err(e) => return ApiError::from(e).into_response(),
    };

    let category = match post.category_id {
        Some(id) => match state.category_service.get_by_id(id).await {
            Ok(category) => Some(category),
            Err(e) => {
                tracing::warn!("Failed to load category {} for post '{}': {}", id, post.slug, e);
                None
            }
        },
        None => None,
    };

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("category", &category);

    match state.theme_engine.render(POST_DETAIL_TEMPLATE, &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Fallback for unmatched paths
pub async fn fallback(State(state): State<AppState>) -> Response {
    not_found(&state)
}

fn not_found(state: &AppState) -> Response {
    match state.theme_engine.render(NOT_FOUND_TEMPLATE, &TeraContext::new()) {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render 404 page: {}", e);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}
