//! Error types for Firefly

use thiserror::Error;

/// The main error type for Firefly operations
///
/// Capacity overflow and degenerate geometry are deliberately absent: they are
/// per-frame numeric conditions handled in place, never reported to callers.
#[derive(Debug, Error)]
pub enum FireflyError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid enum value: {value} is not one of {allowed:?}")]
    InvalidEnumValue {
        value: String,
        allowed: Vec<String>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Result type alias for Firefly operations
pub type Result<T> = std::result::Result<T, FireflyError>;

impl From<toml::de::Error> for FireflyError {
    fn from(err: toml::de::Error) -> Self {
        FireflyError::TomlParseError(err.to_string())
    }
}
