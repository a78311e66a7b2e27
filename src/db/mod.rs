//! Database layer
//!
//! Supports:
//! - SQLite (default, a single file next to the binary)
//! - MySQL
//!
//! The driver is selected by `database.driver` in the configuration. Code
//! above this layer only sees the `DatabasePool` trait object.
//!
//! # Usage
//!
//! ```ignore
//! use inkpost::config::DatabaseConfig;
//! use inkpost::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

/// Whether a repository error was caused by a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
