//! Submit-then-download client for the speech endpoint.

use super::progress::{ProgressSink, ProgressTracker};
use super::{SynthesisAttempt, SynthesisError, SynthesisErrorKind};
use crate::config::{Settings, SynthesisSettings};
use crate::error::Result;
use crate::retry::RetryingCaller;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fraction reached once the download URL is known.
const DOWNLOAD_START: f32 = 0.2;
/// Share of the bar covered by the download itself.
const DOWNLOAD_SPAN: f32 = 0.79;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    result_download_url: Option<String>,
}

/// Turns narration text into audio bytes.
pub struct MediaSynthesisClient {
    endpoint: String,
    api_key: String,
    settings: SynthesisSettings,
}

impl MediaSynthesisClient {
    /// Create a client from settings. Fails when no API key is configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            endpoint: format!("{}/audio/speech", settings.api.base_url.trim_end_matches('/')),
            api_key: settings.require_api_key()?,
            settings: settings.synthesis.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Synthesize `text`, retrying whole submit+download attempts.
    ///
    /// Progress fractions never decrease and reach 1.0 only on success.
    #[instrument(skip_all, fields(bytes = text.len(), model = %self.settings.model))]
    pub async fn synthesize(
        &self,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::new(
                SynthesisErrorKind::Generic,
                "No narration text to synthesize",
            ));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(self.settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                SynthesisError::new(
                    SynthesisErrorKind::Generic,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        let tracker = ProgressTracker::new(progress);
        let caller = RetryingCaller::new(self.settings.retry_policy());
        let max_attempts = caller.max_attempts();
        let client = &client;
        let tracker = &tracker;

        let outcome = caller
            .call(
                move |attempt| async move {
                    let mut state = SynthesisAttempt::new(attempt, max_attempts);
                    self.attempt(client, text, &mut state, tracker).await
                },
                |attempt, err: &SynthesisError| {
                    debug!(attempt, kind = %err.kind, "Synthesis attempt failed");
                },
            )
            .await;

        match outcome {
            Ok(audio) => {
                tracker.complete("Audio generation completed");
                info!("Synthesized {} bytes of audio", audio.len());
                Ok(audio)
            }
            Err(err) => {
                warn!("Synthesis failed: {}", err.message);
                Err(err.with_attempts(max_attempts))
            }
        }
    }

    async fn attempt(
        &self,
        client: &Client,
        text: &str,
        state: &mut SynthesisAttempt,
        tracker: &ProgressTracker<'_>,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        let base = (state.attempt_number - 1) as f32 / state.max_attempts as f32 * 0.1;
        tracker.report(
            format!(
                "Speech synthesis attempt {}/{}",
                state.attempt_number, state.max_attempts
            ),
            base,
        );
        tracker.report("Calling speech API...", base + 0.05);

        let response = self.submit(client, text).await?;
        let body = response
            .text()
            .await
            .map_err(|e| SynthesisError::from_reqwest(&e))?;
        let url = extract_download_url(&body)?;
        state.download_url = Some(url.to_string());

        tracker.report("Downloading audio file...", DOWNLOAD_START);
        let result = self.download(client, url, state, tracker).await;
        if let Err(err) = &result {
            state.last_error = Some(err.message.clone());
        }
        result
    }

    /// POST the narration, resending on retryable statuses.
    async fn submit(
        &self,
        client: &Client,
        text: &str,
    ) -> std::result::Result<Response, SynthesisError> {
        let mut backoff = Duration::from_millis(self.settings.transport_backoff_ms);
        let mut resends = 0;

        loop {
            let response = client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .timeout(Duration::from_secs(self.settings.read_timeout_secs))
                .form(&[
                    ("model", self.settings.model.as_str()),
                    ("input", text),
                ])
                .send()
                .await
                .map_err(|e| SynthesisError::from_reqwest(&e))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if is_retryable_status(status) && resends < self.settings.transport_retries {
                resends += 1;
                debug!(%status, resends, "Retryable status, resending");
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                backoff = backoff.saturating_mul(2);
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
    }

    /// Stream the audio, reporting progress when the length is known.
    async fn download(
        &self,
        client: &Client,
        url: Url,
        state: &mut SynthesisAttempt,
        tracker: &ProgressTracker<'_>,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        let response = client
            .get(url)
            .timeout(Duration::from_secs(self.settings.download_timeout_secs))
            .send()
            .await
            .map_err(|e| SynthesisError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SynthesisError::new(
                SynthesisErrorKind::Api,
                format!("Audio download failed: {}", status),
            ));
        }

        state.total_bytes_expected = response.content_length();
        let mut audio = Vec::with_capacity(state.total_bytes_expected.unwrap_or(0) as usize);
        let mut last_reported = 0usize;
        let chunk_bytes = self.settings.progress_chunk_bytes.max(1);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SynthesisError::from_body_stream(&e))?;
            audio.extend_from_slice(&chunk);
            state.bytes_downloaded = audio.len() as u64;

            if audio.len() - last_reported >= chunk_bytes {
                last_reported = audio.len();
                if let Some(fraction) = state.download_fraction() {
                    tracker.report(
                        format!("Downloading audio... {:.0}%", fraction * 100.0),
                        DOWNLOAD_START + DOWNLOAD_SPAN * fraction,
                    );
                }
            }
        }

        if let Some(total) = state.total_bytes_expected {
            if state.bytes_downloaded < total {
                return Err(incomplete(state.bytes_downloaded, total));
            }
        }

        Ok(audio)
    }
}

fn incomplete(received: u64, expected: u64) -> SynthesisError {
    SynthesisError::new(
        SynthesisErrorKind::Api,
        format!(
            "Incomplete download: received {} of {} bytes",
            received, expected
        ),
    )
}

/// 429 and 5xx other than 501/505.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || (status.is_server_error()
            && status != StatusCode::NOT_IMPLEMENTED
            && status != StatusCode::HTTP_VERSION_NOT_SUPPORTED)
}

fn mentions_quota(body: &str) -> bool {
    body.to_lowercase().contains("quota")
}

fn classify_status(status: StatusCode, body: &str) -> SynthesisError {
    let kind = if status == StatusCode::TOO_MANY_REQUESTS || mentions_quota(body) {
        SynthesisErrorKind::Quota
    } else {
        SynthesisErrorKind::Api
    };
    SynthesisError::new(kind, format!("Speech request failed: {} - {}", status, body))
}

fn extract_download_url(body: &str) -> std::result::Result<Url, SynthesisError> {
    let parsed: SubmitResponse = serde_json::from_str(body).map_err(|e| {
        SynthesisError::new(
            SynthesisErrorKind::Api,
            format!("Speech response is not valid JSON: {}", e),
        )
    })?;

    let raw = parsed
        .result_download_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            let kind = if mentions_quota(body) {
                SynthesisErrorKind::Quota
            } else {
                SynthesisErrorKind::Api
            };
            SynthesisError::new(kind, format!("Download URL not found in response: {}", body))
        })?;

    Url::parse(&raw).map_err(|e| {
        SynthesisError::new(
            SynthesisErrorKind::Api,
            format!("Invalid download URL '{}': {}", raw, e),
        )
    })
}
