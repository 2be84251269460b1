//! Speech synthesis for finished narrations.
//!
//! The remote service works in two steps: a submit request returns a JSON
//! body with a `result_download_url`, and the audio is then streamed from
//! that URL. [`MediaSynthesisClient`] wraps both steps in one retried call.

mod client;
mod progress;

pub use client::MediaSynthesisClient;
pub use progress::{NoProgress, ProgressEvent, ProgressSink};

use std::fmt;
use thiserror::Error;

/// Why synthesis failed. Presentation switches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisErrorKind {
    Timeout,
    Connection,
    Quota,
    Api,
    Generic,
}

impl SynthesisErrorKind {
    /// Short headline for the user.
    pub fn title(&self) -> &'static str {
        match self {
            SynthesisErrorKind::Timeout => "Request Timeout",
            SynthesisErrorKind::Connection => "Network Connection Issue",
            SynthesisErrorKind::Quota => "API Quota Exceeded",
            SynthesisErrorKind::Api => "Service Temporarily Unavailable",
            SynthesisErrorKind::Generic => "Audio Generation Failed",
        }
    }

    /// What the user can do about it.
    pub fn hint(&self) -> &'static str {
        match self {
            SynthesisErrorKind::Timeout => {
                "The audio generation is taking longer than expected. This might be due to high server load. Please try again in a few minutes."
            }
            SynthesisErrorKind::Connection => {
                "Unable to connect to the audio generation service. Please check your internet connection and try again."
            }
            SynthesisErrorKind::Quota => {
                "The daily limit for audio generation has been reached. Please try again tomorrow or contact support for increased limits."
            }
            SynthesisErrorKind::Api => {
                "The audio generation service is experiencing technical difficulties. Please try again later."
            }
            SynthesisErrorKind::Generic => {
                "An unexpected error occurred. Please try again or contact support if the issue persists."
            }
        }
    }
}

impl fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SynthesisErrorKind::Timeout => "timeout",
            SynthesisErrorKind::Connection => "connection",
            SynthesisErrorKind::Quota => "quota",
            SynthesisErrorKind::Api => "api",
            SynthesisErrorKind::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// Final synthesis failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Speech synthesis failed ({kind}) after {attempts} attempts: {message}")]
pub struct SynthesisError {
    pub kind: SynthesisErrorKind,
    pub message: String,
    /// Attempts made before giving up; 0 when no request was sent.
    pub attempts: u32,
}

impl SynthesisError {
    pub fn new(kind: SynthesisErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Classify a transport-level failure.
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SynthesisErrorKind::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            SynthesisErrorKind::Connection
        } else if err.is_decode() || err.is_status() {
            SynthesisErrorKind::Api
        } else {
            SynthesisErrorKind::Generic
        };
        Self::new(kind, err.to_string())
    }

    /// Classify a failure while reading a streamed body.
    ///
    /// reqwest reports every body stream error as a decode error, but with no
    /// content encoding enabled the only way the stream fails is the transport.
    pub(crate) fn from_body_stream(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SynthesisErrorKind::Timeout
        } else {
            SynthesisErrorKind::Connection
        };
        Self::new(kind, format!("Audio download interrupted: {}", err))
    }
}

/// Per-attempt state of one `synthesize` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisAttempt {
    pub attempt_number: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub download_url: Option<String>,
    pub bytes_downloaded: u64,
    pub total_bytes_expected: Option<u64>,
}

impl SynthesisAttempt {
    pub fn new(attempt_number: u32, max_attempts: u32) -> Self {
        Self {
            attempt_number,
            max_attempts,
            ..Self::default()
        }
    }

    /// Download fraction when the length is known.
    pub fn download_fraction(&self) -> Option<f32> {
        match self.total_bytes_expected {
            Some(total) if total > 0 => {
                Some((self.bytes_downloaded as f64 / total as f64).min(1.0) as f32)
            }
            _ => None,
        }
    }
}
