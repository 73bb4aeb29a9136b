//! Model validation errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid target duration: {0}")]
    InvalidTargetDuration(f64),

    #[error("At least one caption language is required")]
    NoLanguages,

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("Duplicate caption language: {0}")]
    DuplicateLanguage(String),

    #[error("Profile id must not be empty")]
    EmptyProfileId,
}
