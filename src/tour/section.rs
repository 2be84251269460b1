//! Per-topic section generation.

use super::{report, InterestTag, SectionResult, StatusSink, TourRequest, WordBudget};
use crate::config::Prompts;
use crate::error::TourError;
use crate::generation::{CompletionRequest, TextGenerator};
use crate::retry::{RetryPolicy, RetryingCaller};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Writes the narration for one interest tag.
pub struct SectionGenerator {
    tag: InterestTag,
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<Prompts>,
    caller: RetryingCaller,
}

impl SectionGenerator {
    pub fn new(
        tag: InterestTag,
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<Prompts>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            tag,
            generator,
            prompts,
            caller: RetryingCaller::new(policy),
        }
    }

    pub fn tag(&self) -> InterestTag {
        self.tag
    }

    fn build_request(&self, request: &TourRequest, budget: WordBudget) -> CompletionRequest {
        let mut vars = HashMap::new();
        vars.insert("location".to_string(), request.location().to_string());
        vars.insert("interests".to_string(), request.interests_label());
        vars.insert("topic".to_string(), self.tag.name().to_string());
        vars.insert("word_limit".to_string(), budget.per_section_words.to_string());
        vars.insert(
            "word_limit_max".to_string(),
            budget.section_upper_bound().to_string(),
        );

        CompletionRequest::text(
            self.prompts.render_with_custom(&self.prompts.sections.system, &vars),
            self.prompts
                .render_with_custom(self.prompts.sections.for_tag(self.tag), &vars),
        )
    }

    /// Generate this topic's text. Exhaustion yields the fallback sentence
    /// instead of an error.
    #[instrument(skip_all, fields(topic = %self.tag, word_budget = budget.per_section_words))]
    pub async fn generate(
        &self,
        request: &TourRequest,
        budget: WordBudget,
        status: &dyn StatusSink,
    ) -> SectionResult {
        let stage = self.tag.name();
        report(status, stage, self.tag.research_message(), false);

        let completion = self.build_request(request, budget);
        let max_attempts = self.caller.max_attempts();
        let generator = &self.generator;
        let completion = &completion;

        let outcome = self
            .caller
            .call(
                move |_| async move {
                    let text = generator.complete(completion).await?;
                    if text.trim().is_empty() {
                        return Err(TourError::Generation("Empty section text".to_string()));
                    }
                    Ok(text.trim().to_string())
                },
                |attempt, _: &TourError| {
                    report(
                        status,
                        stage,
                        format!(
                            "Retrying {} research... (attempt {}/{})",
                            self.tag.lowercase(),
                            attempt,
                            max_attempts
                        ),
                        false,
                    )
                },
            )
            .await;

        match outcome {
            Ok(text) => {
                info!("Generated {} section ({} words)", stage, text.split_whitespace().count());
                report(
                    status,
                    stage,
                    format!("Completed {} research", self.tag.lowercase()),
                    true,
                );
                SectionResult {
                    tag: self.tag,
                    text,
                    succeeded: true,
                }
            }
            Err(e) => {
                warn!("{} section unavailable, using fallback: {}", stage, e);
                report(
                    status,
                    stage,
                    format!(
                        "Failed to generate {} content after multiple attempts",
                        self.tag.lowercase()
                    ),
                    true,
                );
                SectionResult::fallback(self.tag, request.location())
            }
        }
    }
}
