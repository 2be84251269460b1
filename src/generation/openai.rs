//! Chat-completions implementation of [`TextGenerator`].

use super::{CompletionRequest, ResponseShape, TextGenerator};
use crate::config::Settings;
use crate::error::{Result, TourError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Text generator backed by an OpenAI-compatible chat endpoint.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a generator from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.generation.model.clone(),
            temperature: settings.generation.temperature,
        })
    }

    fn build_messages(request: &CompletionRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if !request.system.is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system.clone())
                    .build()
                    .map_err(|e| TourError::Generation(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| TourError::Generation(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(model = %self.model, shape = ?request.shape))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let messages = Self::build_messages(request)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature);

        if request.shape == ResponseShape::JsonObject {
            builder.response_format(ResponseFormat::JsonObject);
        }

        let chat_request = builder
            .build()
            .map_err(|e| TourError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| TourError::OpenAI(format!("Completion failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| TourError::Generation("Empty response from LLM".to_string()))?
            .clone();

        debug!("Completion returned {} chars", content.len());
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_creation() {
        let mut settings = Settings::default();
        settings.api.api_key = Some("test-key".to_string());
        settings.generation.model = "test-model".to_string();

        let generator = OpenAIGenerator::from_settings(&settings).unwrap();
        assert_eq!(generator.model(), "test-model");
    }

    #[test]
    fn test_messages_skip_empty_system() {
        let request = CompletionRequest::text("", "hello");
        let messages = OpenAIGenerator::build_messages(&request).unwrap();
        assert_eq!(messages.len(), 1);

        let request = CompletionRequest::json("be terse", "hello");
        let messages = OpenAIGenerator::build_messages(&request).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_returned_without_internal_retry() {
        let mut server = mockito::Server::new_async().await;
        let completions = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error": {"message": "Rate limit reached", "type": "requests", "param": null, "code": null}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let mut settings = Settings::default();
        settings.api.base_url = server.url();
        settings.api.api_key = Some("test-key".to_string());
        let generator = OpenAIGenerator::from_settings(&settings).unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            generator.complete(&CompletionRequest::text("", "hello")),
        )
        .await
        .expect("rate-limited completion should fail fast");

        assert!(matches!(result, Err(TourError::OpenAI(_))));
        completions.assert_async().await;
    }
}
