//! Post repository
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//!
//! Public queries only ever see visible posts (published with a
//! publication timestamp). The admin queries see everything.

use crate::config::DatabaseDriver;
use crate::db::pool::{mysql, sqlite};
use crate::db::DynDatabasePool;
use crate::models::{Post, PostFilter, PublishedMonth};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get any post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post by slug only if it is visible
    async fn get_visible_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// List visible posts, newest publication first
    async fn list_visible(&self, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count visible posts
    async fn count_visible(&self) -> Result<i64>;

    /// List visible posts in one category, newest publication first
    async fn list_visible_in_category(
        &self,
        category_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>>;

    /// Count visible posts in one category
    async fn count_visible_in_category(&self, category_id: i64) -> Result<i64>;

    /// List posts for the admin, filtered and ordered
    async fn admin_list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>>;

    /// Count posts matching an admin filter
    async fn count_admin(&self, filter: &PostFilter) -> Result<i64>;

    /// Year/month buckets of every non-null `published_at`, newest first
    async fn published_dates(&self) -> Result<Vec<PublishedMonth>>;

    /// Update a post
    async fn update(&self, post: &Post) -> Result<Post>;

    /// Delete a post
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check if a post slug already exists
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(sqlite(&self.pool)?, post).await,
            DatabaseDriver::Mysql => create_post_mysql(mysql(&self.pool)?, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get post by ID")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn get_visible_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE slug = ? AND {}",
            POST_COLUMNS, VISIBLE_WHERE
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .bind(true)
                    .fetch_optional(sqlite(&self.pool)?)
                    .await
                    .context("Failed to get visible post by slug")?;
                row.as_ref().map(row_to_post_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(slug)
                    .bind(true)
                    .fetch_optional(mysql(&self.pool)?)
                    .await
                    .context("Failed to get visible post by slug")?;
                row.as_ref().map(row_to_post_mysql).transpose()
            }
        }
    }

    async fn list_visible(&self, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_visible_sqlite(sqlite(&self.pool)?, None, offset, limit).await
            }
            DatabaseDriver::Mysql => list_visible_mysql(mysql(&self.pool)?, None, offset, limit).await,
        }
    }

    async fn count_visible(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_visible_sqlite(sqlite(&self.pool)?, None).await,
            DatabaseDriver::Mysql => count_visible_mysql(mysql(&self.pool)?, None).await,
        }
    }

    async fn list_visible_in_category(
        &self,
        category_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_visible_sqlite(sqlite(&self.pool)?, Some(category_id), offset, limit).await
            }
            DatabaseDriver::Mysql => {
                list_visible_mysql(mysql(&self.pool)?, Some(category_id), offset, limit).await
            }
        }
    }

    async fn count_visible_in_category(&self, category_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_visible_sqlite(sqlite(&self.pool)?, Some(category_id)).await
            }
            DatabaseDriver::Mysql => count_visible_mysql(mysql(&self.pool)?, Some(category_id)).await,
        }
    }

    async fn admin_list(&self, filter: &PostFilter, offset: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                admin_list_sqlite(sqlite(&self.pool)?, filter, offset, limit).await
            }
            DatabaseDriver::Mysql => admin_list_mysql(mysql(&self.pool)?, filter, offset, limit).await,
        }
    }

    async fn count_admin(&self, filter: &PostFilter) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_admin_sqlite(sqlite(&self.pool)?, filter).await,
            DatabaseDriver::Mysql => count_admin_mysql(mysql(&self.pool)?, filter).await,
        }
    }

    async fn published_dates(&self) -> Result<Vec<PublishedMonth>> {
        let sql = "SELECT published_at FROM posts WHERE published_at IS NOT NULL";
        let dates: Vec<DateTime<Utc>> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .fetch_all(sqlite(&self.pool)?)
                .await
                .context("Failed to load publication dates")?,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .fetch_all(mysql(&self.pool)?)
                .await
                .context("Failed to load publication dates")?,
        };
        Ok(bucket_by_month(&dates))
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(sqlite(&self.pool)?, post).await,
            DatabaseDriver::Mysql => update_post_mysql(mysql(&self.pool)?, post).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM posts WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql).bind(id).execute(sqlite(&self.pool)?).await
                    .context("Failed to delete post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql).bind(id).execute(mysql(&self.pool)?).await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) as count FROM posts WHERE slug = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(slug)
                .fetch_one(sqlite(&self.pool)?)
                .await
                .context("Failed to check post slug existence")?
                .get("count"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(slug)
                .fetch_one(mysql(&self.pool)?)
                .await
                .context("Failed to check post slug existence")?
                .get("count"),
        };
        Ok(count > 0)
    }
}

const POST_COLUMNS: &str = "id, title, slug, content, content_html, excerpt, category_id, \
     is_published, published_at, created_at, updated_at";

/// Bound once with `true`
const VISIBLE_WHERE: &str = "is_published = ? AND published_at IS NOT NULL";

/// Bound once with `true`, then twice with the optional category id
const VISIBLE_IN_CATEGORY_WHERE: &str =
    "is_published = ? AND published_at IS NOT NULL AND (? IS NULL OR category_id = ?)";

const VISIBLE_ORDER: &str = "published_at DESC, id DESC";

/// Every condition is `(? IS NULL OR ...)` so an unset filter matches all rows.
/// Bind order follows `bind_admin_filter!`. The search pattern comes from `like_pattern`.
const ADMIN_WHERE: &str = "(? IS NULL OR title LIKE ? ESCAPE '!' OR content LIKE ? ESCAPE '!') \
     AND (? IS NULL OR is_published = ?) \
     AND (? IS NULL OR category_id = ?) \
     AND (? IS NULL OR published_at >= ?) \
     AND (? IS NULL OR published_at < ?) \
     AND (? IS NULL OR created_at >= ?) \
     AND (? IS NULL OR created_at < ?)";

const INSERT_POST: &str = r#"
    INSERT INTO posts (title, slug, content, content_html, excerpt, category_id,
                       is_published, published_at, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title = ?, slug = ?, content = ?, content_html = ?, excerpt = ?, category_id = ?,
        is_published = ?, published_at = ?, updated_at = ?
    WHERE id = ?
"#;

macro_rules! bind_admin_filter {
    ($query:expr, $filter:expr, $pattern:expr) => {
        $query
            .bind($pattern.clone())
            .bind($pattern.clone())
            .bind($pattern.clone())
            .bind($filter.is_published)
            .bind($filter.is_published)
            .bind($filter.category_id)
            .bind($filter.category_id)
            .bind($filter.published_from)
            .bind($filter.published_from)
            .bind($filter.published_before)
            .bind($filter.published_before)
            .bind($filter.created_from)
            .bind($filter.created_from)
            .bind($filter.created_before)
            .bind($filter.created_before)
    };
}

/// Group timestamps into (year, month) buckets, newest first
fn bucket_by_month(dates: &[DateTime<Utc>]) -> Vec<PublishedMonth> {
    let mut buckets: BTreeMap<(i32, u32), i64> = BTreeMap::new();
    for date in dates {
        *buckets.entry((date.year(), date.month())).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .rev()
        .map(|((year, month), count)| PublishedMonth { year, month, count })
        .collect()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn list_visible_sqlite(
    pool: &SqlitePool,
    category_id: Option<i64>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        POST_COLUMNS, VISIBLE_IN_CATEGORY_WHERE, VISIBLE_ORDER
    ))
    .bind(true)
    .bind(category_id)
    .bind(category_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list visible posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn count_visible_sqlite(pool: &SqlitePool, category_id: Option<i64>) -> Result<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) as count FROM posts WHERE {}",
        VISIBLE_IN_CATEGORY_WHERE
    ))
    .bind(true)
    .bind(category_id)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .context("Failed to count visible posts")?;

    Ok(row.get("count"))
}

async fn admin_list_sqlite(
    pool: &SqlitePool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        POST_COLUMNS,
        ADMIN_WHERE,
        filter.ordering.as_sql()
    );
    let pattern = filter.search_pattern();

    let rows = bind_admin_filter!(sqlx::query(&sql), filter, pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_sqlite).collect()
}

async fn count_admin_sqlite(pool: &SqlitePool, filter: &PostFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM posts WHERE {}", ADMIN_WHERE);
    let pattern = filter.search_pattern();

    let row = bind_admin_filter!(sqlx::query(&sql), filter, pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(Utc::now())
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(post.id)
        .fetch_optional(pool)
        .await
        .context("Failed to reload post")?;

    row.as_ref()
        .map(row_to_post_sqlite)
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        content: row.try_get("content")?,
        content_html: row.try_get("content_html")?,
        excerpt: row.try_get("excerpt")?,
        category_id: row.try_get("category_id")?,
        is_published: row.try_get("is_published")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(INSERT_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..post.clone()
    })
}

async fn list_visible_mysql(
    pool: &MySqlPool,
    category_id: Option<i64>,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM posts WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        POST_COLUMNS, VISIBLE_IN_CATEGORY_WHERE, VISIBLE_ORDER
    ))
    .bind(true)
    .bind(category_id)
    .bind(category_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .context("Failed to list visible posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn count_visible_mysql(pool: &MySqlPool, category_id: Option<i64>) -> Result<i64> {
    let row = sqlx::query(&format!(
        "SELECT COUNT(*) as count FROM posts WHERE {}",
        VISIBLE_IN_CATEGORY_WHERE
    ))
    .bind(true)
    .bind(category_id)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .context("Failed to count visible posts")?;

    Ok(row.get("count"))
}

async fn admin_list_mysql(
    pool: &MySqlPool,
    filter: &PostFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Post>> {
    let sql = format!(
        "SELECT {} FROM posts WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        POST_COLUMNS,
        ADMIN_WHERE,
        filter.ordering.as_sql()
    );
    let pattern = filter.search_pattern();

    let rows = bind_admin_filter!(sqlx::query(&sql), filter, pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_mysql).collect()
}

async fn count_admin_mysql(pool: &MySqlPool, filter: &PostFilter) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) as count FROM posts WHERE {}", ADMIN_WHERE);
    let pattern = filter.search_pattern();

    let row = bind_admin_filter!(sqlx::query(&sql), filter, pattern)
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

async fn update_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    sqlx::query(UPDATE_POST)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.content_html)
        .bind(&post.excerpt)
        .bind(post.category_id)
        .bind(post.is_published)
        .bind(post.published_at)
        .bind(Utc::now())
        .bind(post.id)
        .execute(pool)
        .await
        .context("Failed to update post")?;

    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(post.id)
        .fetch_optional(pool)
        .await
        .context("Failed to reload post")?;

    row.as_ref()
        .map(row_to_post_mysql)
        .transpose()?
        .ok_or_else(|| anyhow::anyhow!("Post not found after update"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        content: row.try_get("content")?,
        content_html: row.try_get("content_html")?,
        excerpt: row.try_get("excerpt")?,
        category_id: row.try_get("category_id")?,
        is_published: row.try_get("is_published")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, PostOrdering};
    use chrono::{Duration, TimeZone};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPostRepository::new(pool.clone());
        (pool, repo)
    }

    fn draft(slug: &str) -> Post {
        Post::new(
            format!("Title {}", slug),
            slug.to_string(),
            format!("Body of {}", slug),
            format!("<p>Body of {}</p>", slug),
        )
    }

    fn published(slug: &str, at: DateTime<Utc>) -> Post {
        let mut post = draft(slug);
        post.is_published = true;
        post.published_at = Some(at);
        post
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let (_pool, repo) = setup_test_repo().await;

        let created = repo.create(&draft("first")).await.expect("Failed to create post");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.title, "Title first");
        assert_eq!(by_id.content_html, "<p>Body of first</p>");
        assert!(!by_id.is_published);
        assert!(by_id.published_at.is_none());
        assert!(by_id.category_id.is_none());

        assert!(repo.exists_by_slug("first").await.unwrap());
        assert!(!repo.exists_by_slug("second").await.unwrap());
    }

    #[tokio::test]
    async fn test_unique_slug_constraint() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&draft("same")).await.unwrap();
        assert!(repo.create(&draft("same")).await.is_err());
    }

    #[tokio::test]
    async fn test_visibility_rules() {
        let (_pool, repo) = setup_test_repo().await;
        let now = Utc::now();

        repo.create(&published("live", now)).await.unwrap();
        repo.create(&draft("draft")).await.unwrap();

        let mut flagged_without_date = draft("no-date");
        flagged_without_date.is_published = true;
        repo.create(&flagged_without_date).await.unwrap();

        let mut dated_draft = draft("dated-draft");
        dated_draft.published_at = Some(now);
        repo.create(&dated_draft).await.unwrap();

        assert!(repo.get_visible_by_slug("live").await.unwrap().is_some());
        assert!(repo.get_visible_by_slug("draft").await.unwrap().is_none());
        assert!(repo.get_visible_by_slug("no-date").await.unwrap().is_none());
        assert!(repo.get_visible_by_slug("dated-draft").await.unwrap().is_none());
        assert!(repo.get_visible_by_slug("missing").await.unwrap().is_none());

        assert_eq!(repo.count_visible().await.unwrap(), 1);
        let visible = repo.list_visible(0, 10).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].slug, "live");
    }

    #[tokio::test]
    async fn test_list_visible_ordered_by_publication_desc() {
        let (_pool, repo) = setup_test_repo().await;
        let now = Utc::now();

        repo.create(&published("oldest", now - Duration::days(3))).await.unwrap();
        repo.create(&published("newest", now)).await.unwrap();
        repo.create(&published("middle", now - Duration::days(1))).await.unwrap();

        let slugs: Vec<String> = repo
            .list_visible(0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["newest", "middle", "oldest"]);

        let second_page = repo.list_visible(2, 2).await.unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].slug, "oldest");
    }

    #[tokio::test]
    async fn test_list_visible_in_category() {
        let (pool, repo) = setup_test_repo().await;
        let categories = SqlxCategoryRepository::new(pool.clone());
        let news = categories
            .create(&Category::new("News".into(), "news".into(), String::new()))
            .await
            .unwrap();

        let mut in_news = published("in-news", Utc::now());
        in_news.category_id = Some(news.id);
        repo.create(&in_news).await.unwrap();

        let mut hidden_in_news = draft("hidden-in-news");
        hidden_in_news.category_id = Some(news.id);
        repo.create(&hidden_in_news).await.unwrap();

        repo.create(&published("elsewhere", Utc::now())).await.unwrap();

        let posts = repo.list_visible_in_category(news.id, 0, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "in-news");
        assert_eq!(repo.count_visible_in_category(news.id).await.unwrap(), 1);
        assert_eq!(repo.count_visible().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_admin_list_filters() {
        let (_pool, repo) = setup_test_repo().await;
        let march = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let april = Utc.with_ymd_and_hms(2024, 4, 2, 8, 30, 0).unwrap();

        let mut rust = published("rust-tips", march);
        rust.content = "All about Rust ownership".into();
        repo.create(&rust).await.unwrap();
        repo.create(&published("gardening", april)).await.unwrap();
        repo.create(&draft("unfinished")).await.unwrap();

        let all = PostFilter::new();
        assert_eq!(repo.count_admin(&all).await.unwrap(), 3);

        let drafts = PostFilter::new().with_published(false);
        let found = repo.admin_list(&drafts, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "unfinished");

        let search = PostFilter::new().with_search("OWNERSHIP");
        let found = repo.admin_list(&search, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "rust-tips");

        let in_april = PostFilter::new().with_published_date(2024, Some(4), None).unwrap();
        let found = repo.admin_list(&in_april, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "gardening");

        let on_day = PostFilter::new().with_published_date(2024, Some(3), Some(15)).unwrap();
        assert_eq!(repo.count_admin(&on_day).await.unwrap(), 1);

        let whole_year = PostFilter::new().with_published_date(2024, None, None).unwrap();
        assert_eq!(repo.count_admin(&whole_year).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_admin_search_wildcards_match_literally() {
        let (_pool, repo) = setup_test_repo().await;

        for (slug, content) in [("sale", "now 50% off"), ("plain", "nothing special"), ("code", "my_var")] {
            let mut post = draft(slug);
            post.content = content.into();
            repo.create(&post).await.unwrap();
        }

        let percent = PostFilter::new().with_search("%");
        let found = repo.admin_list(&percent, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "sale");
        assert_eq!(repo.count_admin(&percent).await.unwrap(), 1);

        let underscore = PostFilter::new().with_search("_");
        let found = repo.admin_list(&underscore, 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slug, "code");
        assert_eq!(repo.count_admin(&underscore).await.unwrap(), 1);

        let bang = PostFilter::new().with_search("!");
        assert_eq!(repo.count_admin(&bang).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_admin_list_ordering() {
        let (_pool, repo) = setup_test_repo().await;

        let mut b = draft("b");
        b.title = "Beta".into();
        repo.create(&b).await.unwrap();
        let mut a = draft("a");
        a.title = "Alpha".into();
        repo.create(&a).await.unwrap();

        let newest_first = repo.admin_list(&PostFilter::new(), 0, 10).await.unwrap();
        assert_eq!(newest_first[0].slug, "a");

        let by_title = PostFilter::new().with_ordering(PostOrdering::TitleAsc);
        let titles: Vec<String> = repo
            .admin_list(&by_title, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[tokio::test]
    async fn test_published_dates_buckets() {
        let (_pool, repo) = setup_test_repo().await;

        repo.create(&published("a", Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap()))
            .await
            .unwrap();
        repo.create(&published("b", Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        repo.create(&published("c", Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        repo.create(&draft("d")).await.unwrap();

        let dates = repo.published_dates().await.unwrap();
        assert_eq!(
            dates,
            vec![
                PublishedMonth { year: 2024, month: 2, count: 2 },
                PublishedMonth { year: 2023, month: 12, count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_post() {
        let (_pool, repo) = setup_test_repo().await;

        let mut post = repo.create(&draft("editable")).await.unwrap();
        let created_updated_at = post.updated_at;
        post.title = "Edited".into();
        post.is_published = true;
        post.published_at = Some(Utc::now());

        let updated = repo.update(&post).await.unwrap();
        assert_eq!(updated.title, "Edited");
        assert!(updated.is_visible());
        assert!(updated.updated_at >= created_updated_at);

        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[test]
    fn test_bucket_by_month_empty() {
        assert!(bucket_by_month(&[]).is_empty());
    }
}
