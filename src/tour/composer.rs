//! Final tour composition.

use super::{report, InterestTag, SectionResults, StatusSink, TourRequest};
use crate::config::Prompts;
use crate::error::{Result, TourError};
use crate::generation::{CompletionRequest, TextGenerator};
use crate::retry::{RetryPolicy, RetryingCaller};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const STAGE: &str = "Final Tour";

/// The composed tour, before flattening to narration text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedTour {
    pub introduction: String,
    /// One entry per requested interest, in request order.
    pub sections: Vec<(InterestTag, String)>,
    pub conclusion: String,
}

impl ComposedTour {
    /// Introduction, sections, and conclusion separated by blank lines.
    /// Blank parts are left out.
    pub fn narration(&self) -> String {
        std::iter::once(self.introduction.as_str())
            .chain(self.sections.iter().map(|(_, text)| text.as_str()))
            .chain(std::iter::once(self.conclusion.as_str()))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// JSON shape the composition prompt asks for.
#[derive(Debug, Deserialize)]
struct ComposerReply {
    #[serde(default)]
    introduction: String,
    #[serde(default)]
    sections: Vec<ReplySection>,
    #[serde(default)]
    conclusion: String,
}

#[derive(Debug, Deserialize)]
struct ReplySection {
    topic: String,
    content: String,
}

/// Weaves section texts into one narrated walk.
pub struct TourComposer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<Prompts>,
    caller: RetryingCaller,
}

impl TourComposer {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<Prompts>, policy: RetryPolicy) -> Self {
        Self {
            generator,
            prompts,
            caller: RetryingCaller::new(policy),
        }
    }

    fn build_request(
        &self,
        request: &TourRequest,
        sections: &SectionResults,
        total_words: u32,
    ) -> CompletionRequest {
        let section_text = request
            .interests()
            .iter()
            .filter_map(|tag| sections.get(*tag))
            .map(|s| format!("[{}]\n{}", s.tag.name(), s.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut vars = HashMap::new();
        vars.insert("location".to_string(), request.location().to_string());
        vars.insert("interests".to_string(), request.interests_label());
        vars.insert("duration".to_string(), request.duration_minutes().to_string());
        vars.insert("total_words".to_string(), total_words.to_string());
        vars.insert("sections".to_string(), section_text);

        CompletionRequest::json(
            self.prompts.render_with_custom(&self.prompts.composer.system, &vars),
            self.prompts.render_with_custom(&self.prompts.composer.user, &vars),
        )
    }

    /// Parse the model's reply and align it with the request.
    ///
    /// Topics that were not requested are dropped. Requested topics the model
    /// left out are filled with that topic's section text.
    fn assemble(
        response: &str,
        request: &TourRequest,
        sections: &SectionResults,
    ) -> Result<ComposedTour> {
        let json_start = response.find('{');
        let json_end = response.rfind('}');

        let json_str = match (json_start, json_end) {
            (Some(start), Some(end)) if end > start => &response[start..=end],
            _ => response,
        };

        let reply: ComposerReply = serde_json::from_str(json_str).map_err(|e| {
            TourError::Generation(format!(
                "Failed to parse composition response: {}. Response was: {}",
                e,
                response.chars().take(500).collect::<String>()
            ))
        })?;

        let mut by_tag: HashMap<InterestTag, String> = HashMap::new();
        for section in reply.sections {
            match section.topic.parse::<InterestTag>() {
                Ok(tag) if request.interests().contains(&tag) => {
                    by_tag.entry(tag).or_insert(section.content);
                }
                Ok(tag) => debug!("Dropping unrequested topic {} from composition", tag),
                Err(_) => debug!("Dropping unknown topic '{}' from composition", section.topic),
            }
        }

        let mut ordered = Vec::with_capacity(request.interests().len());
        for tag in request.interests() {
            let text = match by_tag.remove(tag).filter(|t| !t.trim().is_empty()) {
                Some(text) => text,
                None => {
                    warn!("Composition omitted {}, using its section text", tag);
                    sections
                        .get(*tag)
                        .map(|s| s.text.clone())
                        .unwrap_or_else(|| super::fallback_text(*tag, request.location()))
                }
            };
            ordered.push((*tag, text));
        }

        Ok(ComposedTour {
            introduction: reply.introduction,
            sections: ordered,
            conclusion: reply.conclusion,
        })
    }

    /// Compose the final narration. Exhaustion is fatal.
    #[instrument(skip_all, fields(location = %request.location(), total_words = total_words))]
    pub async fn compose(
        &self,
        request: &TourRequest,
        sections: &SectionResults,
        total_words: u32,
        status: &dyn StatusSink,
    ) -> Result<String> {
        report(status, STAGE, "Creating your personalized tour...", false);

        let completion = self.build_request(request, sections, total_words);
        let max_attempts = self.caller.max_attempts();
        let generator = &self.generator;
        let completion = &completion;

        let outcome = self
            .caller
            .call(
                move |_| async move {
                    let response = generator.complete(completion).await?;
                    Self::assemble(&response, request, sections)
                },
                |attempt, _: &TourError| {
                    report(
                        status,
                        STAGE,
                        format!(
                            "Connection issue, retrying... (attempt {}/{})",
                            attempt, max_attempts
                        ),
                        false,
                    )
                },
            )
            .await;

        match outcome {
            Ok(tour) => {
                report(status, STAGE, "Completed Final Tour Guide Creation", true);
                let narration = tour.narration();
                info!("Composed tour ({} words)", narration.split_whitespace().count());
                Ok(narration)
            }
            Err(e) => {
                report(
                    status,
                    STAGE,
                    "Failed to generate final tour after multiple attempts",
                    true,
                );
                Err(TourError::Composition {
                    attempts: max_attempts,
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::testing::ScriptedGenerator;
    use crate::tour::{NoStatus, SectionResult};
    use std::time::Duration;

    fn request() -> TourRequest {
        TourRequest::new("Prague", [InterestTag::Culinary, InterestTag::History], 5).unwrap()
    }

    fn sections() -> SectionResults {
        [
            SectionResult {
                tag: InterestTag::Culinary,
                text: "Dumplings and beer.".to_string(),
                succeeded: true,
            },
            SectionResult::fallback(InterestTag::History, "Prague"),
        ]
        .into_iter()
        .collect()
    }

    fn composer(generator: Arc<ScriptedGenerator>) -> TourComposer {
        TourComposer::new(
            generator,
            Arc::new(Prompts::default()),
            RetryPolicy::fixed(3, Duration::ZERO),
        )
    }

    #[test]
    fn test_narration_joins_with_blank_lines() {
        let tour = ComposedTour {
            introduction: "Welcome.".into(),
            sections: vec![
                (InterestTag::History, "Old.".into()),
                (InterestTag::Culture, "  ".into()),
            ],
            conclusion: "Goodbye.".into(),
        };
        assert_eq!(tour.narration(), "Welcome.\n\nOld.\n\nGoodbye.");
    }

    #[test]
    fn test_assemble_reorders_and_drops_unrequested() {
        let reply = r#"{
            "introduction": "Welcome to Prague.",
            "sections": [
                {"topic": "History", "content": "Castle stories."},
                {"topic": "Architecture", "content": "Should not appear."},
                {"topic": "Culinary", "content": "Try the trdelnik."}
            ],
            "conclusion": "Enjoy your evening."
        }"#;

        let tour = TourComposer::assemble(reply, &request(), &sections()).unwrap();
        assert_eq!(
            tour.sections,
            vec![
                (InterestTag::Culinary, "Try the trdelnik.".to_string()),
                (InterestTag::History, "Castle stories.".to_string()),
            ]
        );
        assert!(!tour.narration().contains("Should not appear."));
    }

    #[test]
    fn test_assemble_fills_omitted_topics_from_sections() {
        let reply = "```json\n{\"introduction\": \"Hi.\", \"sections\": [], \"conclusion\": \"Bye.\"}\n```";

        let tour = TourComposer::assemble(reply, &request(), &sections()).unwrap();
        assert_eq!(
            tour.narration(),
            "Hi.\n\nDumplings and beer.\n\nHistory content for Prague is currently unavailable. Please try again later.\n\nBye."
        );
    }

    #[test]
    fn test_assemble_rejects_prose() {
        assert!(TourComposer::assemble("Welcome to the tour!", &request(), &sections()).is_err());
    }

    #[tokio::test]
    async fn test_prompt_lists_sections_in_request_order() {
        let generator = Arc::new(ScriptedGenerator::new(|_| {
            Ok(r#"{"introduction": "Hi.", "sections": [], "conclusion": "Bye."}"#.to_string())
        }));

        composer(generator.clone())
            .compose(&request(), &sections(), 750, &NoStatus)
            .await
            .unwrap();

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        let prompt = &calls[0].user;
        assert!(prompt.contains("Selected Interests: Culinary, History"));
        assert!(prompt.contains("Target Word Count: 750"));
        assert!(prompt.contains("Total Tour Duration (in minutes): 5"));
        let culinary = prompt.find("[Culinary]").unwrap();
        let history = prompt.find("[History]").unwrap();
        assert!(culinary < history);
    }

    #[tokio::test]
    async fn test_exhaustion_is_composition_error() {
        let generator = Arc::new(ScriptedGenerator::new(|_| {
            Err(TourError::Generation("connection reset".to_string()))
        }));

        let err = composer(generator.clone())
            .compose(&request(), &sections(), 750, &NoStatus)
            .await
            .unwrap_err();

        assert!(err.is_composition());
        assert_eq!(generator.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_reply_is_retried() {
        let generator = Arc::new(ScriptedGenerator::new(|_| Ok("not json".to_string())));

        let err = composer(generator.clone())
            .compose(&request(), &sections(), 750, &NoStatus)
            .await
            .unwrap_err();

        assert!(matches!(err, TourError::Composition { attempts: 3, .. }));
        assert_eq!(generator.calls().len(), 3);
    }
}
