//! Theme error types

use thiserror::Error;

/// Theme-related errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Requested template is not registered
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Override directory could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
