//! Test doubles for the tour stages.

use super::{InterestTag, StageUpdate, StatusSink};
use crate::error::Result;
use crate::generation::{CompletionRequest, ResponseShape, TextGenerator};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Box<dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync>;
type DelayFn = Box<dyn Fn(&CompletionRequest) -> Duration + Send + Sync>;

/// Which stage issued a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Caller {
    Planner,
    Section(InterestTag),
    Composer,
}

/// Identify the stage from the default prompt templates.
pub(crate) fn classify(request: &CompletionRequest) -> Caller {
    if request.shape == ResponseShape::JsonObject {
        return Caller::Composer;
    }
    if !request.user.contains("Word Limit:") {
        return Caller::Planner;
    }
    let tag = if request.user.contains("culinary content") {
        InterestTag::Culinary
    } else if request.user.contains("historical content") {
        InterestTag::History
    } else if request.user.contains("architectural content") {
        InterestTag::Architecture
    } else {
        InterestTag::Culture
    };
    Caller::Section(tag)
}

/// Generator that answers from a closure and records every request.
pub(crate) struct ScriptedGenerator {
    handler: Handler,
    delay: Option<DelayFn>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering, per request.
    pub(crate) fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&CompletionRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    pub(crate) fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_from(&self, caller: Caller) -> usize {
        self.calls()
            .iter()
            .filter(|request| classify(request) == caller)
            .count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = &self.delay {
            let wait = delay(request);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        (self.handler)(request)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Status sink that keeps every update.
pub(crate) fn collecting_status() -> (impl StatusSink, Arc<Mutex<Vec<StageUpdate>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink_updates = updates.clone();
    let sink = move |update: StageUpdate| sink_updates.lock().unwrap().push(update);
    (sink, updates)
}
