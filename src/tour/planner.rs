//! Tour planning stage.

use super::{report, StatusSink, TourRequest};
use crate::config::Prompts;
use crate::error::TourError;
use crate::generation::{CompletionRequest, TextGenerator};
use crate::retry::{RetryPolicy, RetryingCaller};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

const STAGE: &str = "Planner";

/// Outlines the tour before the sections are written.
///
/// The plan is not fed into later prompts yet; the pipeline only logs it.
pub struct TourPlanner {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<Prompts>,
    caller: RetryingCaller,
}

impl TourPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>, prompts: Arc<Prompts>, policy: RetryPolicy) -> Self {
        Self {
            generator,
            prompts,
            caller: RetryingCaller::new(policy),
        }
    }

    fn build_request(&self, request: &TourRequest) -> CompletionRequest {
        let mut vars = HashMap::new();
        vars.insert("location".to_string(), request.location().to_string());
        vars.insert("interests".to_string(), request.interests_label());
        vars.insert("duration".to_string(), request.duration_minutes().to_string());

        CompletionRequest::text(
            self.prompts.render_with_custom(&self.prompts.planner.system, &vars),
            self.prompts.render_with_custom(&self.prompts.planner.user, &vars),
        )
    }

    /// Produce the plan text. Never fails: exhaustion yields a placeholder plan.
    #[instrument(skip_all, fields(location = %request.location()))]
    pub async fn plan(&self, request: &TourRequest, status: &dyn StatusSink) -> String {
        report(status, STAGE, "Planning your personalized tour...", false);

        let completion = self.build_request(request);
        let max_attempts = self.caller.max_attempts();
        let generator = &self.generator;
        let completion = &completion;

        self.caller
            .call_or_else(
                move |_| async move {
                    let plan = generator.complete(completion).await?;
                    report(status, STAGE, "Completed planning", true);
                    debug!("Plan: {}", plan);
                    Ok::<_, TourError>(plan)
                },
                |attempt, _: &TourError| {
                    report(
                        status,
                        STAGE,
                        format!("Retrying planning... (attempt {}/{})", attempt, max_attempts),
                        false,
                    )
                },
                |_| {
                    report(status, STAGE, "Failed to generate plan after multiple attempts", true);
                    format!(
                        "Planning for {} is currently unavailable. Please try again later.",
                        request.location()
                    )
                },
            )
            .await
    }
}
