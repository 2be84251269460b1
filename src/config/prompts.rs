//! Prompt templates for Wayfare.
//!
//! Prompts can be customized by placing a `tour.toml` in the custom prompts
//! directory. Templates use `{{variable}}` placeholders.

use crate::tour::InterestTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub planner: PlannerPrompts,
    pub sections: SectionPrompts,
    pub composer: ComposerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the tour planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for PlannerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a tour planner. Given a location, the visitor's interests and the tour length, outline how a walking tour should be paced: which stops to make, in what order, and roughly how much of the time each interest deserves. Keep the outline short and practical."#.to_string(),

            user: "Query: {{location}} Interests: {{interests}} Duration: {{duration}}".to_string(),
        }
    }
}

/// Per-topic prompts for section generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionPrompts {
    pub system: String,
    pub history: String,
    pub architecture: String,
    pub culinary: String,
    pub culture: String,
}

const SECTION_HEADER: &str = "Query: {{location}} Interests: {{interests}} Word Limit: {{word_limit}} - {{word_limit_max}}\n\n";

impl Default for SectionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert local guide writing one part of a spoken audio tour. Write plain flowing prose meant to be read aloud: no headings, no bullet points, no markdown."#.to_string(),

            history: format!(
                "{}{}",
                SECTION_HEADER,
                "Instructions: Create engaging historical content for an audio tour. Focus on interesting stories and personal connections. Make it conversational and include specific details that would be interesting to hear while walking. Include specific locations and landmarks where possible. The content should be approximately {{word_limit}} words when spoken at a natural pace."
            ),

            architecture: format!(
                "{}{}",
                SECTION_HEADER,
                "Instructions: Create engaging architectural content for an audio tour. Focus on visual descriptions and interesting design details. Make it conversational and include specific buildings and their unique features. Describe what visitors should look for and why it matters. The content should be approximately {{word_limit}} words when spoken at a natural pace."
            ),

            culinary: format!(
                "{}{}",
                SECTION_HEADER,
                "Instructions: Create engaging culinary content for an audio tour. Focus on local specialties, food history, and interesting stories about restaurants and dishes. Make it conversational and include specific recommendations. Describe the flavors and cultural significance of the food. The content should be approximately {{word_limit}} words when spoken at a natural pace."
            ),

            culture: format!(
                "{}{}",
                SECTION_HEADER,
                "Instructions: Create engaging cultural content for an audio tour. Focus on local traditions, arts, and community life. Make it conversational and include specific cultural venues and events. Describe the atmosphere and significance of cultural landmarks. The content should be approximately {{word_limit}} words when spoken at a natural pace."
            ),
        }
    }
}

impl SectionPrompts {
    /// Template for one interest tag.
    pub fn for_tag(&self, tag: InterestTag) -> &str {
        match tag {
            InterestTag::History => &self.history,
            InterestTag::Architecture => &self.architecture,
            InterestTag::Culinary => &self.culinary,
            InterestTag::Culture => &self.culture,
        }
    }
}

/// Prompts for final tour composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ComposerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a friendly tour guide turning research notes into one continuous spoken walking tour.

Respond with a single JSON object and nothing else:
{"introduction": "...", "sections": [{"topic": "History", "content": "..."}], "conclusion": "..."}

Rules:
- "sections" has exactly one entry per selected interest, in the order the interests are listed
- "topic" is the interest name exactly as listed
- Every field is prose meant to be read aloud: no headings, no lists, no markdown"#.to_string(),

            user: r#"Query: {{location}}
Selected Interests: {{interests}}
Total Tour Duration (in minutes): {{duration}}
Target Word Count: {{total_words}}

Content Sections:
{{sections}}

Instructions: Create a natural, conversational audio tour that focuses only on the selected interests. Make it feel like a friendly guide walking alongside the visitor, sharing interesting stories and insights. Use natural transitions between topics and maintain an engaging but relaxed pace. Include specific locations and landmarks where possible. Add natural pauses and transitions as if walking between locations. Use phrases like 'as we walk', 'look to your left', 'notice how', etc. Make it interactive and engaging, as if the guide is actually there with the visitor. Start with a warm welcome and end with a natural closing thought. The total content should be approximately {{total_words}} words when spoken at a natural pace of 150 words per minute. This will ensure the tour lasts approximately {{duration}} minutes."#.to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let tour_path = custom_path.join("tour.toml");
            if tour_path.exists() {
                let content = std::fs::read_to_string(&tour_path)?;
                let custom: Prompts = toml::from_str(&content)?;
                prompts.planner = custom.planner;
                prompts.sections = custom.sections;
                prompts.composer = custom.composer;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one left-to-right pass, so substituted
    /// values are never scanned again. Unknown placeholders are kept as is.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let value = after
                .find("}}")
                .and_then(|end| vars.get(&after[..end]).map(|value| (end, value)));

            match value {
                Some((end, value)) => {
                    result.push_str(value);
                    rest = &after[end + 2..];
                }
                None => {
                    // Not a known placeholder; keep one brace and rescan.
                    result.push('{');
                    rest = &rest[start + 1..];
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
