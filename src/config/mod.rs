//! Configuration module for Wayfare.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ComposerPrompts, PlannerPrompts, Prompts, SectionPrompts};
pub use settings::{
    ApiSettings, GeneralSettings, GenerationSettings, PromptSettings, Settings,
    SynthesisSettings,
};
