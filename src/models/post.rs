//! Post model
//!
//! This module provides:
//! - `Post` entity representing a blog post
//! - Input types for creating and updating posts
//! - `PostFilter`/`PostOrdering` for the admin list
//! - Pagination types shared by all list queries

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Post title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Markdown content
    pub content: String,
    /// Rendered HTML content
    pub content_html: String,
    /// Optional short summary
    pub excerpt: Option<String>,
    /// Category ID, `None` when uncategorized
    pub category_id: Option<i64>,
    /// Publication flag
    pub is_published: bool,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new unpublished post.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(title: String, slug: String, content: String, content_html: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            slug,
            content,
            content_html,
            excerpt: None,
            category_id: None,
            is_published: false,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A post is shown publicly only when it is published and has a
    /// publication timestamp.
    pub fn is_visible(&self) -> bool {
        self.is_published && self.published_at.is_some()
    }

    /// Public URL of the post detail page
    pub fn absolute_url(&self) -> String {
        format!("/{}/", self.slug)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    /// Explicit slug; generated from the title when absent or blank
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Mark the post as published, optionally at an explicit time
    pub fn published(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.is_published = true;
        self.published_at = at;
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }
}

/// Input for updating an existing post. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Detach the post from its category
    #[serde(default)]
    pub clear_category: bool,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn without_category(mut self) -> Self {
        self.clear_category = true;
        self
    }

    pub fn with_published(mut self, is_published: bool) -> Self {
        self.is_published = Some(is_published);
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.slug.is_some()
            || self.content.is_some()
            || self.excerpt.is_some()
            || self.category_id.is_some()
            || self.clear_category
            || self.is_published.is_some()
            || self.published_at.is_some()
    }
}

/// Sort order for the admin post list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostOrdering {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
    PublishedAtDesc,
    PublishedAtAsc,
    TitleAsc,
    TitleDesc,
}

impl PostOrdering {
    /// Parse an ordering parameter such as `-created_at` or `title`
    pub fn from_param(s: &str) -> Option<Self> {
        match s.trim() {
            "-created_at" => Some(Self::CreatedAtDesc),
            "created_at" => Some(Self::CreatedAtAsc),
            "-published_at" => Some(Self::PublishedAtDesc),
            "published_at" => Some(Self::PublishedAtAsc),
            "title" => Some(Self::TitleAsc),
            "-title" => Some(Self::TitleDesc),
            _ => None,
        }
    }

    /// ORDER BY clause body. Only these fixed strings ever reach SQL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::CreatedAtDesc => "created_at DESC, id DESC",
            Self::CreatedAtAsc => "created_at ASC, id ASC",
            Self::PublishedAtDesc => "published_at DESC, id DESC",
            Self::PublishedAtAsc => "published_at ASC, id ASC",
            Self::TitleAsc => "title ASC, id ASC",
            Self::TitleDesc => "title DESC, id DESC",
        }
    }
}

/// Filters for the admin post list. `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    /// Case-insensitive substring matched against title or content
    pub search: Option<String>,
    pub is_published: Option<bool>,
    pub category_id: Option<i64>,
    /// Inclusive lower bound on `published_at`
    pub published_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `published_at`
    pub published_before: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `created_at`
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`
    pub created_before: Option<DateTime<Utc>>,
    pub ordering: PostOrdering,
}

impl PostFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        self.search = if q.trim().is_empty() {
            None
        } else {
            Some(q.trim().to_string())
        };
        self
    }

    pub fn with_published(mut self, is_published: bool) -> Self {
        self.is_published = Some(is_published);
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_ordering(mut self, ordering: PostOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Restrict `published_at` to a year, month or day.
    ///
    /// Returns `None` when the date parts don't form a valid date.
    pub fn with_published_date(
        mut self,
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
    ) -> Option<Self> {
        let (from, before) = date_hierarchy_range(year, month, day)?;
        self.published_from = Some(from);
        self.published_before = Some(before);
        Some(self)
    }

    /// The `LIKE` pattern for the search term, if any
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|q| like_pattern(q))
    }
}

/// Escape character used by every search `LIKE` clause
pub const LIKE_ESCAPE: char = '!';

/// Wrap a user-supplied term in `%...%` for a substring `LIKE`.
///
/// `%`, `_` and the escape character itself match literally.
pub fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.trim().chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Half-open UTC range covering a year, a month or a single day.
///
/// A day without a month is rejected.
pub fn date_hierarchy_range(
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = match (month, day) {
        (None, None) => (
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?,
        ),
        (Some(m), None) => {
            let start = NaiveDate::from_ymd_opt(year, m, 1)?;
            let end = if m == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, m + 1, 1)?
            };
            (start, end)
        }
        (Some(m), Some(d)) => {
            let start = NaiveDate::from_ymd_opt(year, m, d)?;
            (start, start.succ_opt()?)
        }
        (None, Some(_)) => return None,
    };
    Some((
        Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0)?),
        Utc.from_utc_datetime(&end.and_hms_opt(0, 0, 0)?),
    ))
}

/// One bucket of the published-date hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedMonth {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        ((self.total + per_page - 1) / per_page) as u32
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Transform the items while keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post(is_published: bool, published_at: Option<DateTime<Utc>>) -> Post {
        let mut p = Post::new(
            "Test Post Title".into(),
            "test-post-title".into(),
            String::new(),
            String::new(),
        );
        p.is_published = is_published;
        p.published_at = published_at;
        p
    }

    #[test]
    fn test_visibility_requires_flag_and_timestamp() {
        assert!(post(true, Some(Utc::now())).is_visible());
        assert!(!post(false, Some(Utc::now())).is_visible());
        assert!(!post(true, None).is_visible());
        assert!(!post(false, None).is_visible());
    }

    #[test]
    fn test_absolute_url_and_display() {
        let p = post(true, Some(Utc::now()));
        assert_eq!(p.absolute_url(), "/test-post-title/");
        assert_eq!(p.to_string(), "Test Post Title");
    }

    #[test]
    fn test_ordering_from_param() {
        assert_eq!(PostOrdering::from_param("-created_at"), Some(PostOrdering::CreatedAtDesc));
        assert_eq!(PostOrdering::from_param("title"), Some(PostOrdering::TitleAsc));
        assert_eq!(PostOrdering::from_param("-published_at"), Some(PostOrdering::PublishedAtDesc));
        assert_eq!(PostOrdering::from_param("id; DROP TABLE posts"), None);
        assert_eq!(PostOrdering::default().as_sql(), "created_at DESC, id DESC");
    }

    #[test]
    fn test_date_hierarchy_ranges() {
        let (from, before) = date_hierarchy_range(2024, None, None).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(before.to_rfc3339(), "2025-01-01T00:00:00+00:00");

        let (from, before) = date_hierarchy_range(2024, Some(12), None).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-12-01T00:00:00+00:00");
        assert_eq!(before.to_rfc3339(), "2025-01-01T00:00:00+00:00");

        let (from, before) = date_hierarchy_range(2024, Some(2), Some(29)).unwrap();
        assert_eq!(from.to_rfc3339(), "2024-02-29T00:00:00+00:00");
        assert_eq!(before.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        assert!(date_hierarchy_range(2023, Some(2), Some(29)).is_none());
        assert!(date_hierarchy_range(2024, Some(13), None).is_none());
        assert!(date_hierarchy_range(2024, None, Some(1)).is_none());
    }

    #[test]
    fn test_filter_search_blank_is_none() {
        assert_eq!(PostFilter::new().with_search("   ").search, None);
        let f = PostFilter::new().with_search(" rust ");
        assert_eq!(f.search_pattern().as_deref(), Some("%rust%"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50!%%");
        assert_eq!(like_pattern("my_var"), "%my!_var%");
        assert_eq!(like_pattern("wow!"), "%wow!!%");
    }

    #[test]
    fn test_paged_result_pages() {
        let params = ListParams::new(2, 10);
        let page: PagedResult<i32> = PagedResult::new(vec![1, 2, 3], 23, &params);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }

    proptest! {
        #[test]
        fn list_params_are_clamped(page in 0u32..10_000, per_page in 0u32..10_000) {
            let params = ListParams::new(page, per_page);
            prop_assert!(params.page >= 1);
            prop_assert!((1..=100).contains(&params.per_page));
            prop_assert_eq!(params.offset(), i64::from(params.page - 1) * i64::from(params.per_page));
        }

        #[test]
        fn total_pages_covers_every_item(total in 0i64..100_000, per_page in 1u32..=100) {
            let page: PagedResult<()> = PagedResult::new(vec![], total, &ListParams::new(1, per_page));
            let pages = i64::from(page.total_pages());
            prop_assert!(pages * i64::from(per_page) >= total);
            prop_assert!((pages - 1).max(0) * i64::from(per_page) < total.max(1));
        }
    }
}
