//! End-to-end tour generation.

use super::{
    report, SectionGenerator, SectionResults, StatusSink, TourComposer, TourPlanner, TourRequest,
    WordBudget,
};
use crate::config::{GenerationSettings, Prompts, Settings};
use crate::error::Result;
use crate::generation::{OpenAIGenerator, TextGenerator};
use crate::retry::RetryPolicy;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct TourOutcome {
    pub narration: String,
    pub plan: String,
    pub sections: SectionResults,
}

/// Runs planner, section generators, and composer for one request.
pub struct TourPipeline {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<Prompts>,
    policy: RetryPolicy,
    max_concurrent_sections: usize,
}

impl TourPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Prompts,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            generator,
            prompts: Arc::new(prompts),
            policy: settings.retry_policy(),
            max_concurrent_sections: settings.max_concurrent_sections.max(1),
        }
    }

    /// Build a pipeline backed by the configured chat endpoint.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let generator: Arc<dyn TextGenerator> = Arc::new(OpenAIGenerator::from_settings(settings)?);
        info!("Using model {} for tour text", generator.model());
        Ok(Self::new(generator, prompts, &settings.generation))
    }

    /// Generate the narration for a request.
    pub async fn run(&self, request: &TourRequest, status: &dyn StatusSink) -> Result<String> {
        Ok(self.run_detailed(request, status).await?.narration)
    }

    /// Generate the narration along with the plan and the section texts.
    #[instrument(skip_all, fields(location = %request.location(), interests = %request.interests_label()))]
    pub async fn run_detailed(
        &self,
        request: &TourRequest,
        status: &dyn StatusSink,
    ) -> Result<TourOutcome> {
        report(status, "start", "Starting tour research...", true);

        let budget = WordBudget::for_request(request);
        info!(
            "Word budget: {} total, {} per section",
            budget.total_words, budget.per_section_words
        );

        let planner = TourPlanner::new(
            self.generator.clone(),
            self.prompts.clone(),
            self.policy.clone(),
        );
        let plan = planner.plan(request, status).await;

        let generators: Vec<SectionGenerator> = request
            .interests()
            .iter()
            .map(|tag| {
                SectionGenerator::new(
                    *tag,
                    self.generator.clone(),
                    self.prompts.clone(),
                    self.policy.clone(),
                )
            })
            .collect();

        let mut finished = Vec::with_capacity(generators.len());
        let mut stream = stream::iter(generators.iter().enumerate())
            .map(|(idx, generator)| async move {
                let result = generator.generate(request, budget, status).await;
                (idx, result)
            })
            .buffer_unordered(self.max_concurrent_sections);

        while let Some((idx, result)) = stream.next().await {
            finished.push((idx, result));
        }

        // Narration order follows the request, not completion order.
        finished.sort_by_key(|(idx, _)| *idx);
        let sections: SectionResults = finished.into_iter().map(|(_, result)| result).collect();

        let failed = sections.failed();
        if !failed.is_empty() {
            warn!("Sections using fallback text: {:?}", failed);
        }

        let composer = TourComposer::new(
            self.generator.clone(),
            self.prompts.clone(),
            self.policy.clone(),
        );
        let narration = composer
            .compose(request, &sections, budget.total_words, status)
            .await?;

        report(status, "final_report", "Tour narration ready", true);

        Ok(TourOutcome {
            narration,
            plan,
            sections,
        })
    }
}
