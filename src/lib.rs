//! Wayfare - Narrated walking tours
//!
//! Turns a location, a set of interests, and a tour length into a spoken
//! walking tour: generated narration text plus an MP3 rendering of it.
//!
//! # Overview
//!
//! A run has two independent stages:
//! - Content generation: a planner, one section writer per interest, and a
//!   composer that weaves the sections into one narration sized to the
//!   requested duration
//! - Speech synthesis: a submit-then-download call against a TTS endpoint with
//!   bounded retry and streamed download progress
//!
//! Synthesis failure never invalidates the narration.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `retry` - Bounded retry with fixed or jittered exponential delay
//! - `generation` - Text generation capability and its chat-completions backend
//! - `tour` - Request model, word budget, and the generation pipeline
//! - `synthesis` - Speech synthesis client and progress reporting
//! - `cli` - Command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use wayfare::config::Settings;
//! use wayfare::synthesis::{MediaSynthesisClient, NoProgress};
//! use wayfare::tour::{InterestTag, NoStatus, TourPipeline, TourRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let request = TourRequest::new("Lisbon", [InterestTag::History, InterestTag::Culinary], 5)?;
//!
//!     let narration = TourPipeline::from_settings(&settings)?
//!         .run(&request, &NoStatus)
//!         .await?;
//!     let audio = MediaSynthesisClient::new(&settings)?
//!         .synthesize(&narration, &NoProgress)
//!         .await?;
//!     std::fs::write(request.audio_file_name(), audio)?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod openai;
pub mod retry;
pub mod synthesis;
pub mod tour;

pub use error::{Result, TourError};
