//! inkpost - A small markdown blog
//!
//! This library provides the core functionality for the inkpost blog:
//! posts and categories stored in SQLite or MySQL, server-rendered pages,
//! and a JSON API with a staff-only admin section.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
