//! In-process tests for the HTTP routes

use super::*;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::cache::create_cache;
use crate::config::{CacheConfig, SiteConfig};
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::{create_test_pool, migrations};
use crate::models::{CreateCategoryInput, CreatePostInput, CreateUserInput, Post};
use crate::services::{CategoryService, MarkdownRenderer, PostService, UserService};
use crate::theme::ThemeEngine;

const ORIGIN: &str = "http://localhost:3000";

struct TestApp {
    router: Router,
    state: AppState,
    static_dir: tempfile::TempDir,
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let cache = create_cache(&CacheConfig::default()).unwrap();
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let site = SiteConfig {
        name: "Test Blog".to_string(),
        description: String::new(),
        posts_per_page: 2,
    };

    let state = AppState {
        pool: pool.clone(),
        user_service: Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            7,
        )),
        post_service: Arc::new(PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            category_repo.clone(),
            cache.clone(),
            MarkdownRenderer::new(),
        )),
        category_service: Arc::new(CategoryService::new(category_repo, cache)),
        theme_engine: Arc::new(ThemeEngine::builtin(&site, MarkdownRenderer::new()).unwrap()),
        posts_per_page: site.posts_per_page,
        session_days: 7,
    };

    state
        .user_service
        .create_staff("admin", "admin@example.com", "password123")
        .await
        .unwrap();
    state
        .user_service
        .create_user(CreateUserInput {
            username: "reader".to_string(),
            email: String::new(),
            password: "password123".to_string(),
            is_staff: false,
        })
        .await
        .unwrap();

    let static_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(static_dir.path().join("css")).unwrap();
    std::fs::write(static_dir.path().join("css/site.css"), "body { margin: 0; }").unwrap();

    let router = build_router(state.clone(), ORIGIN, static_dir.path()).unwrap();
    TestApp {
        router,
        state,
        static_dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, String) {
        let (status, _, body) = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, body)
    }

    async fn get_json(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let (status, _, body) = self.send(builder.body(Body::empty()).unwrap()).await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let (status, _, body) = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .send_json(
                "POST",
                "/api/v1/auth/login",
                None,
                json!({"username": username, "password": "password123"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, title: &str, published: bool) -> Post {
        let mut input = CreatePostInput::new(title, format!("Content of **{}**", title));
        if published {
            input = input.published(None);
        }
        self.state.post_service.create(input).await.unwrap()
    }
}

// ============================================================================
// Public JSON API
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let (status, body) = app.get_json("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "sqlite");
}

#[tokio::test]
async fn test_public_post_list_hides_drafts() {
    let app = setup().await;
    app.post("Published Post", true).await;
    app.post("Draft Post", false).await;

    let (status, body) = app.get_json("/api/v1/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["slug"], "published-post");
    assert_eq!(body["items"][0]["url"], "/published-post/");
}

#[tokio::test]
async fn test_public_post_detail() {
    let app = setup().await;
    app.post("Published Post", true).await;
    app.post("Draft Post", false).await;

    let (status, body) = app.get_json("/api/v1/posts/published-post", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content_html"]
        .as_str()
        .unwrap()
        .contains("<strong>Published Post</strong>"));

    let (status, body) = app.get_json("/api/v1/posts/draft-post", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_public_categories() {
    let app = setup().await;
    let news = app
        .state
        .category_service
        .create(CreateCategoryInput::new("News"))
        .await
        .unwrap();
    app.state
        .post_service
        .create(
            CreatePostInput::new("In News", "body")
                .with_category(news.id)
                .published(None),
        )
        .await
        .unwrap();
    app.state
        .post_service
        .create(CreatePostInput::new("Hidden News", "body").with_category(news.id))
        .await
        .unwrap();

    let (status, body) = app.get_json("/api/v1/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["slug"], "news");
    assert_eq!(body[0]["post_count"], 1);

    let (status, body) = app.get_json("/api/v1/categories/news/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["slug"], "in-news");

    let (status, _) = app.get_json("/api/v1/categories/missing/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_returns_token() {
    let app = setup().await;
    let request = Request::post("/api/v1/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"username": "admin", "password": "password123"}).to_string(),
        ))
        .unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_str(&body).unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["username"], "admin");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["expires_at"].is_string());

    let cookie = headers.get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("session={}", token)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains(&format!("Max-Age={}", 7 * 24 * 60 * 60)));
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = setup().await;
    let (status, wrong_password) = app
        .send_json(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({"username": "admin", "password": "nope-nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = app
        .send_json(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({"username": "ghost", "password": "password123"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
}

#[tokio::test]
async fn test_me_with_bearer_and_cookie() {
    let app = setup().await;
    let token = app.login("admin").await;

    let (status, body) = app.get_json("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["is_staff"], true);

    let request = Request::get("/api/v1/auth/me")
        .header("Cookie", format!("session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get_json("/api/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app.get_json("/api/v1/auth/me", Some("not-a-session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let token = app.login("admin").await;

    let request = Request::post("/api/v1/auth/logout")
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let cookie = headers.get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let (status, _) = app.get_json("/api/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Admin
// ============================================================================

#[tokio::test]
async fn test_admin_requires_staff() {
    let app = setup().await;

    let (status, _) = app.get_json("/api/v1/admin/posts", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reader = app.login("reader").await;
    let (status, body) = app.get_json("/api/v1/admin/posts", Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let admin = app.login("admin").await;
    let (status, _) = app.get_json("/api/v1/admin/posts", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_category_crud() {
    let app = setup().await;
    let token = app.login("admin").await;

    let (status, created) = app
        .send_json(
            "POST",
            "/api/v1/admin/categories",
            Some(&token),
            json!({"name": "Test Category", "description": "About tests"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "test-category");
    let id = created["id"].as_i64().unwrap();

    let (status, body) = app
        .send_json(
            "POST",
            "/api/v1/admin/categories",
            Some(&token),
            json!({"name": "Test Category"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, _) = app
        .send_json("POST", "/api/v1/admin/categories", Some(&token), json!({"name": "  "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .get_json("/api/v1/admin/categories?q=tests", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, updated) = app
        .send_json(
            "PUT",
            &format!("/api/v1/admin/categories/{}", id),
            Some(&token),
            json!({"name": "Renamed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["slug"], "test-category");

    let request = Request::delete(format!("/api/v1/admin/categories/{}", id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .get_json(&format!("/api/v1/admin/categories/{}", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_post_lifecycle() {
    let app = setup().await;
    let token = app.login("admin").await;

    let (status, created) = app
        .send_json(
            "POST",
            "/api/v1/admin/posts",
            Some(&token),
            json!({"title": "Test Post Title", "content": "Some **markdown**"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "test-post-title");
    assert_eq!(created["is_published"], false);
    let id = created["id"].as_i64().unwrap();

    // Drafts are reachable by id in admin but not publicly
    let (status, _) = app
        .get_json(&format!("/api/v1/admin/posts/{}", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get_json("/api/v1/posts/test-post-title", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, published) = app
        .send_json(
            "PUT",
            &format!("/api/v1/admin/posts/{}", id),
            Some(&token),
            json!({"is_published": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(published["published_at"].is_string());

    let (status, _) = app.get_json("/api/v1/posts/test-post-title", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send_json(
            "POST",
            "/api/v1/admin/posts",
            Some(&token),
            json!({"title": "Other", "slug": "test-post-title"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let request = Request::delete(format!("/api/v1/admin/posts/{}", id))
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get_json("/api/v1/posts/test-post-title", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_post_filters_and_dates() {
    let app = setup().await;
    let token = app.login("admin").await;
    app.post("Rust Notes", true).await;
    app.post("Draft About Rust", false).await;
    app.post("Cooking", true).await;

    let (status, body) = app
        .get_json("/api/v1/admin/posts?is_published=false", Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["slug"], "draft-about-rust");

    let (_, body) = app
        .get_json("/api/v1/admin/posts?q=rust&ordering=title", Some(&token))
        .await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["title"], "Draft About Rust");

    let (status, _) = app
        .get_json("/api/v1/admin/posts?ordering=password_hash", Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, dates) = app.get_json("/api/v1/admin/posts/dates", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dates.as_array().unwrap().len(), 1);
    assert_eq!(dates[0]["count"], 2);
}

// ============================================================================
// HTML pages
// ============================================================================

#[tokio::test]
async fn test_html_post_list_and_detail() {
    let app = setup().await;
    app.post("Test Post Title", true).await;
    app.post("Secret Draft", false).await;

    let (status, html) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Test Post Title"));
    assert!(html.contains("href=\"/test-post-title/\""));
    assert!(!html.contains("Secret Draft"));

    let (status, html) = app.get("/test-post-title/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<strong>Test Post Title</strong>"));

    let (status, html) = app.get("/secret-draft/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("404"));
}

#[tokio::test]
async fn test_html_detail_survives_category_lookup_failure() {
    let app = setup().await;
    let news = app
        .state
        .category_service
        .create(CreateCategoryInput::new("News"))
        .await
        .unwrap();
    app.state
        .post_service
        .create(CreatePostInput::new("Filed Story", "body").with_category(news.id).published(None))
        .await
        .unwrap();

    let (status, html) = app.get("/filed-story/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("in News"));

    // The post stays cached while the category table becomes unreadable
    sqlx::query("ALTER TABLE categories RENAME TO categories_gone")
        .execute(crate::db::pool::sqlite(&app.state.pool).unwrap())
        .await
        .unwrap();

    let (status, html) = app.get("/filed-story/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Filed Story"));
    assert!(!html.contains("in News"));
}

#[tokio::test]
async fn test_html_empty_list_renders_first_page() {
    let app = setup().await;
    let (status, html) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No posts yet."));

    let (status, _) = app.get("/?page=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_html_pagination() {
    let app = setup().await;
    for title in ["One", "Two", "Three"] {
        app.post(title, true).await;
    }

    let (status, html) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Page 1 of 2"));
    assert!(html.contains("?page=2"));

    let (status, html) = app.get("/?page=last").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Page 2 of 2"));

    for bad in ["/?page=3", "/?page=0", "/?page=abc"] {
        let (status, _) = app.get(bad).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", bad);
    }
}

#[tokio::test]
async fn test_unknown_path_renders_404_page() {
    let app = setup().await;
    let (status, html) = app.get("/no/such/page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("Test Blog"));
}

#[tokio::test]
async fn test_cors_allows_configured_origin_with_credentials() {
    let app = setup().await;
    let request = Request::get("/api/v1/health")
        .header("Origin", ORIGIN)
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = app.send(request).await;
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), ORIGIN);
    assert_eq!(headers.get("access-control-allow-credentials").unwrap(), "true");
}

#[tokio::test]
async fn test_invalid_cors_origin_is_rejected() {
    let app = setup().await;
    assert!(build_router(app.state, "bad\norigin", app.static_dir.path()).is_err());
}

#[tokio::test]
async fn test_static_stylesheet_is_served() {
    let app = setup().await;

    let (status, headers, body) = app
        .send(Request::get("/static/css/site.css").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/css"));
    assert_eq!(body, "body { margin: 0; }");

    let (status, _) = app.get("/static/css/missing.css").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
