//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;

use crate::api::middleware::ApiError;
use crate::models::{ListParams, PostFilter, PostOrdering};

// ============================================================================
// Pagination Defaults
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size for public APIs
pub fn default_per_page() -> u32 {
    10
}

/// Default page size for admin APIs
pub fn default_admin_per_page() -> u32 {
    20
}

// ============================================================================
// Pagination Query Types
// ============================================================================

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl PaginationQuery {
    /// Out-of-range values are clamped rather than rejected
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// `GET /admin/categories` query
#[derive(Debug, Deserialize)]
pub struct AdminCategoryQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_admin_per_page")]
    pub per_page: u32,
}

impl AdminCategoryQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }
}

/// `GET /admin/posts` query: search, filters, date drill-down and ordering
#[derive(Debug, Default, Deserialize)]
pub struct AdminPostQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub created_from: Option<String>,
    #[serde(default)]
    pub created_before: Option<String>,
    #[serde(default)]
    pub ordering: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_admin_per_page")]
    pub per_page: u32,
}

impl AdminPostQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(self.page, self.per_page)
    }

    /// Build the repository filter, rejecting unknown orderings and
    /// impossible dates
    pub fn filter(&self) -> Result<PostFilter, ApiError> {
        let mut filter = PostFilter::new();

        if let Some(q) = &self.q {
            filter = filter.with_search(q.as_str());
        }
        if let Some(is_published) = self.is_published {
            filter = filter.with_published(is_published);
        }
        if let Some(category_id) = self.category_id {
            filter = filter.with_category(category_id);
        }

        match (self.year, self.month, self.day) {
            (None, None, None) => {}
            (Some(year), month, day) => {
                filter = filter
                    .with_published_date(year, month, day)
                    .ok_or_else(|| ApiError::validation_error("Invalid year/month/day"))?;
            }
            (None, _, _) => {
                return Err(ApiError::validation_error("month and day require year"));
            }
        }

        if let Some(from) = self.created_from.as_deref() {
            filter.created_from = Some(parse_datetime(from, "created_from")?);
        }
        if let Some(before) = self.created_before.as_deref() {
            filter.created_before = Some(parse_datetime(before, "created_before")?);
        }

        if let Some(ordering) = self.ordering.as_deref() {
            let ordering = PostOrdering::from_param(ordering).ok_or_else(|| {
                invalid_field("ordering", format!("Unknown ordering: {}", ordering))
            })?;
            filter = filter.with_ordering(ordering);
        }

        Ok(filter)
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| invalid_field(field, format!("Invalid {}: {}", field, value)))
}

/// A validation error naming the offending query parameter
fn invalid_field(field: &str, message: String) -> ApiError {
    ApiError::with_details(
        "VALIDATION_ERROR",
        message,
        serde_json::json!({ "field": field }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn query(s: &str) -> AdminPostQuery {
        let uri: axum::http::Uri = format!("/admin/posts?{}", s).parse().unwrap();
        axum::extract::Query::<AdminPostQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_admin_post_query_defaults() {
        let q = query("");
        assert_eq!(q.page, 1);
        assert_eq!(q.per_page, 20);
        assert_eq!(q.filter().unwrap(), PostFilter::new());
    }

    #[test]
    fn test_admin_post_query_filters() {
        let q = query("q=rust&is_published=true&category_id=3&year=2024&month=2&ordering=title");
        let filter = q.filter().unwrap();
        assert_eq!(filter.search.as_deref(), Some("rust"));
        assert_eq!(filter.is_published, Some(true));
        assert_eq!(filter.category_id, Some(3));
        assert_eq!(filter.ordering, PostOrdering::TitleAsc);
        assert_eq!(
            filter.published_from.unwrap().to_rfc3339(),
            "2024-02-01T00:00:00+00:00"
        );
        assert_eq!(
            filter.published_before.unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_admin_post_query_rejects_bad_input() {
        assert!(query("ordering=password").filter().is_err());
        assert!(query("month=2").filter().is_err());
        assert!(query("year=2023&month=2&day=30").filter().is_err());
        assert!(query("created_from=yesterday").filter().is_err());
    }

    #[test]
    fn test_bad_parameters_are_named_in_details() {
        let err = query("ordering=password").filter().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error.details, Some(serde_json::json!({"field": "ordering"})));

        let err = query("created_before=soon").filter().unwrap_err();
        assert_eq!(err.error.details, Some(serde_json::json!({"field": "created_before"})));
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert_eq!(
            parse_datetime("2024-05-01", "f").unwrap().to_rfc3339(),
            "2024-05-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_datetime("2024-05-01T12:30:00+02:00", "f").unwrap().to_rfc3339(),
            "2024-05-01T10:30:00+00:00"
        );
    }

    proptest! {
        #[test]
        fn pagination_query_always_valid(page in 0u32..100_000, per_page in 0u32..100_000) {
            let params = PaginationQuery { page, per_page }.params();
            prop_assert!(params.page >= 1);
            prop_assert!((1..=100).contains(&params.per_page));
        }
    }
}
