//! inkpost - A small markdown blog

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkpost::{
    api::{self, AppState},
    cache::create_cache,
    cli::{Cli, Commands},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxPostRepository, SqlxSessionRepository,
            SqlxUserRepository,
        },
        DynDatabasePool,
    },
    services::{CategoryService, MarkdownRenderer, PostService, UserService},
    theme::ThemeEngine,
};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpost=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load_with_env(&cli.config)?;
    tracing::info!("Configuration loaded from {:?}", cli.config);

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.driver);

    let pending = db::migrations::pending_count(&pool).await?;
    if pending > 0 {
        tracing::info!("{} pending database migration(s)", pending);
    }
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    let result = match cli.command() {
        Commands::Migrate => Ok(()),
        Commands::CreateStaff {
            username,
            email,
            password,
        } => create_staff(&config, pool.clone(), &username, &email, &password).await,
        Commands::Serve => serve(&config, pool.clone()).await,
    };

    pool.close().await;
    result
}

fn user_service(config: &Config, pool: &DynDatabasePool) -> UserService {
    UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool.clone()),
        i64::from(config.auth.session_days),
    )
}

async fn create_staff(
    config: &Config,
    pool: DynDatabasePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let user = user_service(config, &pool)
        .create_staff(username, email, password)
        .await
        .context("Failed to create staff user")?;
    tracing::info!("Staff user '{}' created (id {})", user.username, user.id);
    Ok(())
}

async fn serve(config: &Config, pool: DynDatabasePool) -> Result<()> {
    let cache = create_cache(&config.cache)?;
    let markdown_renderer = MarkdownRenderer::with_theme(&config.markdown.highlight_theme);

    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let user_service = Arc::new(user_service(config, &pool));
    let post_service = Arc::new(PostService::new(
        SqlxPostRepository::boxed(pool.clone()),
        category_repo.clone(),
        cache.clone(),
        markdown_renderer.clone(),
    ));
    let category_service = Arc::new(CategoryService::new(category_repo, cache));

    if user_service.count_staff().await? == 0 {
        tracing::warn!("No staff users yet; create one with `inkpost create-staff`");
    }

    let theme_engine = ThemeEngine::new(&config.theme.path, &config.site, markdown_renderer)?;
    tracing::info!("Theme engine initialized ({} templates)", theme_engine.template_names().len());

    let state = AppState {
        pool,
        user_service: user_service.clone(),
        post_service,
        category_service,
        theme_engine: Arc::new(theme_engine),
        posts_per_page: config.site.posts_per_page,
        session_days: i64::from(config.auth.session_days),
    };

    // Start expired-session cleanup task
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match user_service.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Removed {} expired sessions", n),
                Err(e) => tracing::warn!("Session cleanup failed: {}", e),
            }
        }
    });

    let app = api::build_router(
        state,
        &config.server.cors_origin,
        &config.theme.static_path,
    )?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
