//! Category service
//!
//! Business rules for categories:
//! - names are trimmed, required and at most 100 characters
//! - slugs are unique and derived from the name unless given explicitly
//! - renaming keeps the slug stable unless a new slug is supplied
//! - deleting a category leaves its posts uncategorized

use crate::cache::{Cache, CacheLayer};
use crate::db::is_unique_violation;
use crate::db::repositories::CategoryRepository;
use crate::models::{
    like_pattern, Category, CategoryWithCount, CreateCategoryInput, ListParams, PagedResult,
    UpdateCategoryInput,
};
use crate::services::post::invalidate_post_cache;
use crate::services::slug::generate_slug;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Maximum category name length, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Maximum slug length, in characters
const MAX_SLUG_LEN: usize = 100;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:list";
const CACHE_KEY_CATEGORY_BY_SLUG: &str = "categories:slug:";
const CACHE_PATTERN_CATEGORIES: &str = "categories:*";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for managing blog categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    /// Create a new category service. Entries use the cache's default TTL.
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self {
            repo,
            cache,
            cache_ttl,
        }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` if the name is blank or too long, or has no usable slug
    /// - `DuplicateSlug` if another category already uses the slug
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        let name = validate_name(&input.name)?;
        let slug = resolve_slug(input.slug.as_deref(), &name)?;

        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let category = Category::new(name, slug, input.description.unwrap_or_default());
        let created = self
            .repo
            .create(&category)
            .await
            .map_err(|e| write_error(e, &category.slug, "Failed to create category"))?;

        tracing::info!("Created category '{}' ({})", created.name, created.slug);
        self.invalidate_cache().await;
        Ok(created)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("id={}", id)))
    }

    /// Get category by slug (cached)
    pub async fn get_by_slug(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_CATEGORY_BY_SLUG, slug);
        if let Some(category) = self.cache.get::<Category>(&cache_key).await.ok().flatten() {
            return Ok(category);
        }

        let category = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))?;

        let _ = self.cache.set(&cache_key, &category, self.cache_ttl).await;
        Ok(category)
    }

    /// List all categories ordered by name (cached)
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(list) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list categories")?;
        let _ = self.cache.set(CACHE_KEY_CATEGORY_LIST, &list, self.cache_ttl).await;
        Ok(list)
    }

    /// List all categories with their visible post counts
    pub async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>, CategoryServiceError> {
        Ok(self
            .repo
            .list_with_counts()
            .await
            .context("Failed to list categories with counts")?)
    }

    /// Admin search over name and description. A blank query lists everything.
    pub async fn search(
        &self,
        query: &str,
        params: &ListParams,
    ) -> Result<PagedResult<Category>, CategoryServiceError> {
        let pattern = (!query.trim().is_empty()).then(|| like_pattern(query));

        let total = self
            .repo
            .count_search(pattern.as_deref())
            .await
            .context("Failed to count categories")?;
        let items = self
            .repo
            .search(pattern.as_deref(), params.offset(), params.limit())
            .await
            .context("Failed to search categories")?;

        Ok(PagedResult::new(items, total, params))
    }

    /// Update a category. Unset fields are left alone.
    ///
    /// # Errors
    /// - `NotFound` if the category doesn't exist
    /// - `ValidationError` for a blank or oversized name or an unusable slug
    /// - `DuplicateSlug` if another category already uses the new slug
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_id(id).await?;

        if let Some(name) = input.name.as_deref() {
            category.name = validate_name(name)?;
        }

        if let Some(slug) = input.slug.as_deref() {
            let slug = resolve_slug(Some(slug), &category.name)?;
            if slug != category.slug {
                if self
                    .repo
                    .exists_by_slug(&slug)
                    .await
                    .context("Failed to check slug uniqueness")?
                {
                    return Err(CategoryServiceError::DuplicateSlug(slug));
                }
                category.slug = slug;
            }
        }

        if let Some(description) = input.description {
            category.description = description;
        }

        let updated = self
            .repo
            .update(&category)
            .await
            .map_err(|e| write_error(e, &category.slug, "Failed to update category"))?;

        self.invalidate_cache().await;
        Ok(updated)
    }

    /// Delete a category. Its posts become uncategorized.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.get_by_id(id).await?;

        self.repo
            .delete(id)
            .await
            .context("Failed to delete category")?;

        tracing::info!("Deleted category '{}'", category.slug);
        self.invalidate_cache().await;
        invalidate_post_cache(&self.cache).await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete_pattern(CACHE_PATTERN_CATEGORIES).await;
    }
}

/// A slug taken between the uniqueness check and the write is still a conflict
fn write_error(err: anyhow::Error, slug: &str, action: &'static str) -> CategoryServiceError {
    if is_unique_violation(&err) {
        CategoryServiceError::DuplicateSlug(slug.to_string())
    } else {
        CategoryServiceError::InternalError(err.context(action))
    }
}

fn validate_name(name: &str) -> Result<String, CategoryServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Normalize an explicit slug, or derive one from the name when none is given
fn resolve_slug(explicit: Option<&str>, name: &str) -> Result<String, CategoryServiceError> {
    let slug = match explicit.filter(|s| !s.trim().is_empty()) {
        Some(s) => generate_slug(s),
        None => generate_slug(name),
    };
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category slug cannot be empty".to_string(),
        ));
    }
    if slug.chars().count() > MAX_SLUG_LEN {
        return Err(CategoryServiceError::ValidationError(format!(
            "Category slug cannot exceed {} characters",
            MAX_SLUG_LEN
        )));
    }
    Ok(slug)
}
