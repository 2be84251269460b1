//! Text generation capability used by the tour pipeline.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Shape the caller expects the completion to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// Free-form prose.
    #[default]
    Text,
    /// A single JSON object.
    JsonObject,
}

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub shape: ResponseShape,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            shape: ResponseShape::Text,
        }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            shape: ResponseShape::JsonObject,
        }
    }
}

/// Trait for remote text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt and return the generated text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model id requests are sent to.
    fn model(&self) -> &str;
}
