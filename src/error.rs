//! Error types for Wayfare.

use crate::synthesis::SynthesisError;
use thiserror::Error;

/// Library-level error type for Wayfare operations.
#[derive(Error, Debug)]
pub enum TourError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Tour composition failed after {attempts} attempts: {message}")]
    Composition { attempts: u32, message: String },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl TourError {
    /// Whether this error is the fatal composition failure of a pipeline run.
    pub fn is_composition(&self) -> bool {
        matches!(self, TourError::Composition { .. })
    }
}

/// Result type alias for Wayfare operations.
pub type Result<T> = std::result::Result<T, TourError>;
