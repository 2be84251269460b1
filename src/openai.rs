//! OpenAI-compatible client configuration.

use crate::config::Settings;
use crate::error::{Result, TourError};
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Default timeout for chat completion requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client for the configured inference endpoint.
pub fn create_client(settings: &Settings) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(settings, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client with a custom timeout.
///
/// The client's own rate-limit backoff is disabled: a 429 is returned at
/// once so the caller's retry policy stays the only source of retries.
pub fn create_client_with_timeout(
    settings: &Settings,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let api_key = settings.require_api_key()?;

    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TourError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(settings.api.base_url.trim_end_matches('/'))
        .with_api_key(api_key);

    let no_backoff = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_backoff))
}
