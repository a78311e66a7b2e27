//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own
//! validation, slug generation, markdown rendering and cache invalidation.

pub mod category;
pub mod markdown;
pub mod password;
pub mod post;
pub mod slug;
pub mod user;

pub use category::{CategoryService, CategoryServiceError};
pub use markdown::MarkdownRenderer;
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use slug::generate_slug;
pub use user::{AuthSession, UserService, UserServiceError};
