//! Post service
//!
//! Business rules for posts:
//! - titles are trimmed, required and at most 200 characters
//! - slugs are unique and derived from the title unless given explicitly
//! - `content_html` is rendered from the markdown on every content write
//! - publishing without a publication time stamps the current time
//! - the public side only ever sees visible posts
//!
//! Single posts and list pages are cached for at most ten minutes; every
//! write drops both.

use crate::cache::{Cache, CacheLayer};
use crate::db::is_unique_violation;
use crate::db::repositories::{CategoryRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, PublishedMonth, UpdatePostInput,
};
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::generate_slug;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Maximum post title length, in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum slug length, in characters
const MAX_SLUG_LEN: usize = 200;

/// Upper bound on how long a public read stays cached
const READ_CACHE_TTL: Duration = Duration::from_secs(600);

const CACHE_KEY_POST_BY_SLUG: &str = "post:slug:";
const CACHE_KEY_VISIBLE_PAGE: &str = "posts:visible:";
const CACHE_KEY_CATEGORY_PAGE: &str = "posts:category:";
const CACHE_PATTERN_POSTS: &str = "posts:*";
const CACHE_PATTERN_POST: &str = "post:*";

/// Drop every cached post and post list
pub(crate) async fn invalidate_post_cache(cache: &Cache) {
    let _ = cache.delete_pattern(CACHE_PATTERN_POSTS).await;
    let _ = cache.delete_pattern(CACHE_PATTERN_POST).await;
}

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Duplicate slug
    #[error("Post slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for managing blog posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    markdown_renderer: MarkdownRenderer,
    read_cache_ttl: Duration,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        cache: Arc<Cache>,
        markdown_renderer: MarkdownRenderer,
    ) -> Self {
        let read_cache_ttl = cache.default_ttl().min(READ_CACHE_TTL);
        Self {
            repo,
            category_repo,
            cache,
            markdown_renderer,
            read_cache_ttl,
        }
    }

    /// Create a new post
    ///
    /// # Errors
    /// - `ValidationError` for a blank or oversized title, an unusable slug,
    ///   or a category that doesn't exist
    /// - `DuplicateSlug` if another post already uses the slug
    pub async fn create(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        let title = validate_title(&input.title)?;
        let slug = resolve_slug(input.slug.as_deref(), &title)?;

        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(PostServiceError::DuplicateSlug(slug));
        }

        if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        let content_html = self.markdown_renderer.render(&input.content);
        let mut post = Post::new(title, slug, input.content, content_html);
        post.excerpt = normalize_excerpt(input.excerpt);
        post.category_id = input.category_id;
        post.is_published = input.is_published;
        post.published_at = input.published_at;
        stamp_publication(&mut post);

        let created = self
            .repo
            .create(&post)
            .await
            .map_err(|e| write_error(e, &post.slug, "Failed to create post"))?;

        tracing::info!(
            "Created post '{}' (published: {})",
            created.slug,
            created.is_published
        );
        invalidate_post_cache(&self.cache).await;
        Ok(created)
    }

    /// Get any post by ID, published or not
    pub async fn get_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post by ID")?
            .ok_or_else(|| PostServiceError::NotFound(format!("id={}", id)))
    }

    /// Get a visible post by slug (cached). Drafts are `NotFound`.
    pub async fn get_visible_by_slug(&self, slug: &str) -> Result<Post, PostServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_POST_BY_SLUG, slug);
        if let Some(post) = self.cache.get::<Post>(&cache_key).await.ok().flatten() {
            return Ok(post);
        }

        let post = self
            .repo
            .get_visible_by_slug(slug)
            .await
            .context("Failed to get post by slug")?
            .ok_or_else(|| PostServiceError::NotFound(slug.to_string()))?;

        let _ = self.cache.set(&cache_key, &post, self.read_cache_ttl).await;
        Ok(post)
    }

    /// A page of visible posts, newest publication first (cached per page)
    pub async fn list_visible(&self, params: &ListParams) -> Result<PagedResult<Post>, PostServiceError> {
        let cache_key = format!("{}{}:{}", CACHE_KEY_VISIBLE_PAGE, params.page, params.per_page);
        if let Some(page) = self.cache.get::<PagedResult<Post>>(&cache_key).await.ok().flatten() {
            return Ok(page);
        }

        let total = self.repo.count_visible().await.context("Failed to count posts")?;
        let items = self
            .repo
            .list_visible(params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        let page = PagedResult::new(items, total, params);

        let _ = self.cache.set(&cache_key, &page, self.read_cache_ttl).await;
        Ok(page)
    }

    /// A page of visible posts in one category (cached per page)
    pub async fn list_visible_in_category(
        &self,
        category_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let cache_key = format!(
            "{}{}:{}:{}",
            CACHE_KEY_CATEGORY_PAGE, category_id, params.page, params.per_page
        );
        if let Some(page) = self.cache.get::<PagedResult<Post>>(&cache_key).await.ok().flatten() {
            return Ok(page);
        }

        let total = self
            .repo
            .count_visible_in_category(category_id)
            .await
            .context("Failed to count posts in category")?;
        let items = self
            .repo
            .list_visible_in_category(category_id, params.offset(), params.limit())
            .await
            .context("Failed to list posts in category")?;
        let page = PagedResult::new(items, total, params);

        let _ = self.cache.set(&cache_key, &page, self.read_cache_ttl).await;
        Ok(page)
    }

    /// Filtered, ordered page of all posts for the admin. Never cached.
    pub async fn admin_list(
        &self,
        filter: &PostFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Post>, PostServiceError> {
        let total = self
            .repo
            .count_admin(filter)
            .await
            .context("Failed to count posts")?;
        let items = self
            .repo
            .admin_list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list posts")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Year/month buckets for the admin date hierarchy, newest first
    pub async fn published_dates(&self) -> Result<Vec<PublishedMonth>, PostServiceError> {
        Ok(self
            .repo
            .published_dates()
            .await
            .context("Failed to load publication dates")?)
    }

    /// Update a post. Unset fields are left alone.
    ///
    /// # Errors
    /// - `NotFound` if the post doesn't exist
    /// - `ValidationError` as for `create`
    /// - `DuplicateSlug` if another post already uses the new slug
    pub async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, PostServiceError> {
        let mut post = self.get_by_id(id).await?;
        if !input.has_changes() {
            return Ok(post);
        }

        if let Some(title) = input.title.as_deref() {
            post.title = validate_title(title)?;
        }

        if let Some(slug) = input.slug.as_deref() {
            let slug = resolve_slug(Some(slug), &post.title)?;
            if slug != post.slug {
                if self
                    .repo
                    .exists_by_slug(&slug)
                    .await
                    .context("Failed to check slug uniqueness")?
                {
                    return Err(PostServiceError::DuplicateSlug(slug));
                }
                post.slug = slug;
            }
        }

        if let Some(content) = input.content {
            post.content_html = self.markdown_renderer.render(&content);
            post.content = content;
        }

        if input.excerpt.is_some() {
            post.excerpt = normalize_excerpt(input.excerpt);
        }

        if input.clear_category {
            post.category_id = None;
        } else if let Some(category_id) = input.category_id {
            self.ensure_category_exists(category_id).await?;
            post.category_id = Some(category_id);
        }

        if let Some(is_published) = input.is_published {
            post.is_published = is_published;
        }
        if let Some(published_at) = input.published_at {
            post.published_at = Some(published_at);
        }
        stamp_publication(&mut post);

        let updated = self
            .repo
            .update(&post)
            .await
            .map_err(|e| write_error(e, &post.slug, "Failed to update post"))?;

        invalidate_post_cache(&self.cache).await;
        Ok(updated)
    }

    /// Delete a post
    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self.get_by_id(id).await?;

        self.repo.delete(id).await.context("Failed to delete post")?;

        tracing::info!("Deleted post '{}'", post.slug);
        invalidate_post_cache(&self.cache).await;
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: i64) -> Result<(), PostServiceError> {
        let found = self
            .category_repo
            .get_by_id(category_id)
            .await
            .context("Failed to check category")?;
        if found.is_none() {
            return Err(PostServiceError::ValidationError(format!(
                "Category {} does not exist",
                category_id
            )));
        }
        Ok(())
    }
}

/// A slug taken between the uniqueness check and the write is still a conflict
fn write_error(err: anyhow::Error, slug: &str, action: &'static str) -> PostServiceError {
    if is_unique_violation(&err) {
        PostServiceError::DuplicateSlug(slug.to_string())
    } else {
        PostServiceError::InternalError(err.context(action))
    }
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn resolve_slug(explicit: Option<&str>, title: &str) -> Result<String, PostServiceError> {
    let slug = match explicit.filter(|s| !s.trim().is_empty()) {
        Some(s) => generate_slug(s),
        None => generate_slug(title),
    };
    if slug.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Slug cannot be empty".to_string(),
        ));
    }
    if slug.chars().count() > MAX_SLUG_LEN {
        return Err(PostServiceError::ValidationError(format!(
            "Slug cannot exceed {} characters",
            MAX_SLUG_LEN
        )));
    }
    Ok(slug)
}

fn normalize_excerpt(excerpt: Option<String>) -> Option<String> {
    excerpt
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

/// A published post always has a publication time
fn stamp_publication(post: &mut Post) {
    if post.is_published && post.published_at.is_none() {
        post.published_at = Some(Utc::now());
    }
}
