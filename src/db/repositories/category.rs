//! Category repository
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Category, CategoryWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// List all categories with the number of visible posts in each
    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>>;

    /// List categories whose name or description matches a `LIKE` pattern.
    /// `None` matches everything.
    async fn search(&self, pattern: Option<&str>, offset: i64, limit: i64) -> Result<Vec<Category>>;

    /// Count categories matching a `LIKE` pattern
    async fn count_search(&self, pattern: Option<&str>) -> Result<i64>;

    /// Update a category
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category. Posts referencing it are left uncategorized.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a category slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(sqlite(&self.pool)?, category).await,
            DatabaseDriver::Mysql => create_category_mysql(mysql(&self.pool)?, category).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_slug_sqlite(sqlite(&self.pool)?, slug).await,
            DatabaseDriver::Mysql => get_category_by_slug_mysql(mysql(&self.pool)?, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_categories_mysql(mysql(&self.pool)?).await,
        }
    }

    async fn list_with_counts(&self) -> Result<Vec<CategoryWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_with_counts_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_with_counts_mysql(mysql(&self.pool)?).await,
        }
    }

    async fn search(&self, pattern: Option<&str>, offset: i64, limit: i64) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                search_categories_sqlite(sqlite(&self.pool)?, pattern, offset, limit).await
            }
            DatabaseDriver::Mysql => {
                search_categories_mysql(mysql(&self.pool)?, pattern, offset, limit).await
            }
        }
    }

    async fn count_search(&self, pattern: Option<&str>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_search_sqlite(sqlite(&self.pool)?, pattern).await,
            DatabaseDriver::Mysql => count_search_mysql(mysql(&self.pool)?, pattern).await,
        }
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_category_sqlite(sqlite(&self.pool)?, category).await,
            DatabaseDriver::Mysql => update_category_mysql(mysql(&self.pool)?, category).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_category_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => exists_by_slug_sqlite(sqlite(&self.pool)?, slug).await,
            DatabaseDriver::Mysql => exists_by_slug_mysql(mysql(&self.pool)?, slug).await,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at";

/// The pattern comes from `like_pattern`
const SEARCH_WHERE: &str =
    "(? IS NULL OR name LIKE ? ESCAPE '!' OR description LIKE ? ESCAPE '!')";

const COUNT_VISIBLE_POSTS: &str = "(SELECT COUNT(*) FROM posts p \
     WHERE p.category_id = c.id AND p.is_published = ? AND p.published_at IS NOT NULL) AS post_count";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories ORDER BY name, id",
        CATEGORY_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn list_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(&format!(
        "SELECT c.id, c.name, c.slug, c.description, c.created_at, {} FROM categories c ORDER BY c.name, c.id",
        COUNT_VISIBLE_POSTS
    ))
    .bind(true)
    .fetch_all(pool)
    .await
    .context("Failed to list categories with post counts")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount {
                category: row_to_category_sqlite(row)?,
                post_count: row.get("post_count"),
            })
        })
        .collect()
}

async fn search_categories_sqlite(
    pool: &SqlitePool,
    pattern: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE {} ORDER BY name, id LIMIT ? OFFSET ?",
        CATEGORY_COLUMNS, SEARCH_WHERE
    ))
    .bind(pattern)
    .bind(pattern)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn count_search_sqlite(pool: &SqlitePool, pattern: Option<&str>) -> Result<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) as count FROM categories WHERE {}",
        SEARCH_WHERE
    ))
    .bind(pattern)
    .bind(pattern)
    .bind(pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count categories")?;

    Ok(row.get("count"))
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query("UPDATE categories SET name = ?, slug = ?, description = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    // Same effect as the FK's ON DELETE SET NULL, without relying on the pragma.
    sqlx::query("UPDATE posts SET category_id = NULL WHERE category_id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to detach posts from category")?;

    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row
            .try_get::<Option<String>, _>("description")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, description, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(&category.description)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_id() as i64,
        created_at: now,
        ..category.clone()
    })
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories ORDER BY name, id",
        CATEGORY_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn list_with_counts_mysql(pool: &MySqlPool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(&format!(
        "SELECT c.id, c.name, c.slug, c.description, c.created_at, {} FROM categories c ORDER BY c.name, c.id",
        COUNT_VISIBLE_POSTS
    ))
    .bind(true)
    .fetch_all(pool)
    .await
    .context("Failed to list categories with post counts")?;

    rows.iter()
        .map(|row| {
            Ok(CategoryWithCount {
                category: row_to_category_mysql(row)?,
                post_count: row.get("post_count"),
            })
        })
        .collect()
}

async fn search_categories_mysql(
    pool: &MySqlPool,
    pattern: Option<&str>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories WHERE {} ORDER BY name, id LIMIT ? OFFSET ?",
        CATEGORY_COLUMNS, SEARCH_WHERE
    ))
    .bind(pattern)
    .bind(pattern)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to search categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn count_search_mysql(pool: &MySqlPool, pattern: Option<&str>) -> Result<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) as count FROM categories WHERE {}",
        SEARCH_WHERE
    ))
    .bind(pattern)
    .bind(pattern)
    .bind(pattern)
    .fetch_one(pool)
    .await
    .context("Failed to count categories")?;

    Ok(row.get("count"))
}

async fn update_category_mysql(pool: &MySqlPool, category: &Category) -> Result<Category> {
    sqlx::query("UPDATE categories SET name = ?, slug = ?, description = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_mysql(pool, category.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Category not found after update"))
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

async fn exists_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await
        .context("Failed to check category slug existence")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row
            .try_get::<Option<String>, _>("description")?
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
    })
}
