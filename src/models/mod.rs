//! Data models
//!
//! Database entities (Post, Category, User, Session), their create/update
//! inputs, and the pagination and filter types shared by list queries.

mod category;
mod post;
mod session;
mod user;

pub use category::{Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput};
pub use post::{
    date_hierarchy_range, like_pattern, CreatePostInput, ListParams, PagedResult, Post,
    PostFilter, PostOrdering, PublishedMonth, UpdatePostInput,
};
pub use session::Session;
pub use user::{CreateUserInput, User};
