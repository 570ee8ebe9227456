//! Error types for the onboard_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for onboard_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error (fatal at startup)
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Content referenced by a mutation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A module was marked complete before all of its lessons were
    #[error("Module '{module_id}' is not eligible for completion: {missing} lesson(s) outstanding")]
    ModuleNotEligible { module_id: String, missing: usize },

    /// A lesson was finished while still gated
    #[error("Lesson '{lesson_id}' in module '{module_id}' is locked")]
    LessonLocked { module_id: String, lesson_id: String },

    /// Invalid action for the current quiz session state
    #[error("Quiz error: {0}")]
    Quiz(String),

    /// Progress storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Progress state error
    #[error("State error: {0}")]
    State(String),
}
