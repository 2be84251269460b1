//! Tour content generation.
//!
//! A [`TourRequest`] flows through the [`TourPipeline`]: the planner outlines
//! the tour, one [`SectionGenerator`] per requested interest writes that
//! topic's narration, and the [`TourComposer`] weaves the sections into the
//! final spoken narration.
//!
//! Section failures are absorbed (the section is replaced by a fallback
//! sentence); only composition failure fails a run.

mod composer;
mod pipeline;
mod planner;
mod section;
#[cfg(test)]
pub(crate) mod testing;

pub use composer::{ComposedTour, TourComposer};
pub use pipeline::{TourOutcome, TourPipeline};
pub use planner::TourPlanner;
pub use section::SectionGenerator;

use crate::error::{Result, TourError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaking rate used to turn minutes into words.
pub const WORDS_PER_MINUTE: u32 = 150;

/// Advisory slack above the per-section target, communicated in the prompt.
pub const SECTION_WORD_SLACK: u32 = 20;

/// Topic a visitor can ask the tour to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestTag {
    History,
    Architecture,
    Culinary,
    Culture,
}

impl InterestTag {
    pub const ALL: [InterestTag; 4] = [
        InterestTag::History,
        InterestTag::Architecture,
        InterestTag::Culinary,
        InterestTag::Culture,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InterestTag::History => "History",
            InterestTag::Architecture => "Architecture",
            InterestTag::Culinary => "Culinary",
            InterestTag::Culture => "Culture",
        }
    }

    /// Status line shown while this topic is being written.
    pub fn research_message(&self) -> &'static str {
        match self {
            InterestTag::History => "Researching historical highlights...",
            InterestTag::Architecture => "Exploring architectural wonders...",
            InterestTag::Culinary => "Discovering local flavors...",
            InterestTag::Culture => "Exploring cultural highlights...",
        }
    }

    pub(crate) fn lowercase(&self) -> &'static str {
        match self {
            InterestTag::History => "history",
            InterestTag::Architecture => "architecture",
            InterestTag::Culinary => "culinary",
            InterestTag::Culture => "culture",
        }
    }
}

impl FromStr for InterestTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "history" | "historical" => Ok(InterestTag::History),
            "architecture" | "arch" => Ok(InterestTag::Architecture),
            "culinary" | "food" => Ok(InterestTag::Culinary),
            "culture" | "cultural" => Ok(InterestTag::Culture),
            _ => Err(format!(
                "Unknown interest: {} (expected one of history, architecture, culinary, culture)",
                s
            )),
        }
    }
}

impl fmt::Display for InterestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated request for one tour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourRequest {
    location: String,
    interests: Vec<InterestTag>,
    duration_minutes: u32,
}

impl TourRequest {
    /// Build a request. Duplicate interests collapse onto their first occurrence.
    pub fn new(
        location: impl Into<String>,
        interests: impl IntoIterator<Item = InterestTag>,
        duration_minutes: u32,
    ) -> Result<Self> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(TourError::InvalidInput("Please enter a location".to_string()));
        }

        let mut unique: Vec<InterestTag> = Vec::new();
        for tag in interests {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        if unique.is_empty() {
            return Err(TourError::InvalidInput(
                "Please select at least one interest category".to_string(),
            ));
        }

        if duration_minutes == 0 {
            return Err(TourError::InvalidInput(
                "Tour duration must be at least one minute".to_string(),
            ));
        }

        Ok(Self {
            location,
            interests: unique,
            duration_minutes,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Interests in selection order.
    pub fn interests(&self) -> &[InterestTag] {
        &self.interests
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Interests joined for prompts, e.g. "History, Architecture".
    pub fn interests_label(&self) -> String {
        self.interests
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// File-name stem for this tour's artifacts.
    pub fn slug(&self) -> String {
        self.location
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Audio file name, e.g. `new_york_tour.mp3`.
    pub fn audio_file_name(&self) -> String {
        format!("{}_tour.mp3", self.slug())
    }
}

/// Word targets derived from the requested duration.
///
/// The per-section target uses floor division, so a small total split over
/// several interests loses up to `interests - 1` words overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBudget {
    pub total_words: u32,
    pub per_section_words: u32,
}

impl WordBudget {
    pub fn for_request(request: &TourRequest) -> Self {
        let total_words = request.duration_minutes().saturating_mul(WORDS_PER_MINUTE);
        let per_section_words = total_words / request.interests().len().max(1) as u32;
        Self {
            total_words,
            per_section_words,
        }
    }

    /// Soft upper bound quoted to each section prompt.
    pub fn section_upper_bound(&self) -> u32 {
        self.per_section_words.saturating_add(SECTION_WORD_SLACK)
    }
}

/// Output of one section generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionResult {
    pub tag: InterestTag,
    pub text: String,
    pub succeeded: bool,
}

impl SectionResult {
    /// Deterministic stand-in used when a topic could not be generated.
    pub fn fallback(tag: InterestTag, location: &str) -> Self {
        Self {
            tag,
            text: fallback_text(tag, location),
            succeeded: false,
        }
    }
}

pub(crate) fn fallback_text(tag: InterestTag, location: &str) -> String {
    format!(
        "{} content for {} is currently unavailable. Please try again later.",
        tag.name(),
        location
    )
}

/// Section results keyed by tag, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionResults {
    entries: Vec<SectionResult>,
}

impl SectionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, replacing any earlier result for the same tag in place.
    pub fn insert(&mut self, result: SectionResult) {
        match self.entries.iter_mut().find(|e| e.tag == result.tag) {
            Some(existing) => *existing = result,
            None => self.entries.push(result),
        }
    }

    pub fn get(&self, tag: InterestTag) -> Option<&SectionResult> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags whose generation fell back.
    pub fn failed(&self) -> Vec<InterestTag> {
        self.entries
            .iter()
            .filter(|e| !e.succeeded)
            .map(|e| e.tag)
            .collect()
    }
}

impl FromIterator<SectionResult> for SectionResults {
    fn from_iter<I: IntoIterator<Item = SectionResult>>(iter: I) -> Self {
        let mut results = SectionResults::new();
        for result in iter {
            results.insert(result);
        }
        results
    }
}

/// A pipeline status change, for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub stage: String,
    pub message: String,
    pub is_done: bool,
}

/// Receives pipeline status changes.
pub trait StatusSink: Send + Sync {
    fn update(&self, update: StageUpdate);
}

impl<F> StatusSink for F
where
    F: Fn(StageUpdate) + Send + Sync,
{
    fn update(&self, update: StageUpdate) {
        self(update)
    }
}

/// Status sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn update(&self, _update: StageUpdate) {}
}

pub(crate) fn report(sink: &dyn StatusSink, stage: &str, message: impl Into<String>, is_done: bool) {
    sink.update(StageUpdate {
        stage: stage.to_string(),
        message: message.into(),
        is_done,
    });
}
