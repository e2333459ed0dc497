//! Prompt construction for kata generation.

use serde_json::Value;

use crate::candidate::kata_json_schema;
use crate::request::ResolvedRequest;

/// The instructions and output schema for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPrompt {
    /// System instruction: difficulty and target time.
    pub system: String,
    /// User instruction: influence and target language.
    pub user: String,
    /// Strict structured-output schema.
    pub schema: Value,
}

impl PreviewPrompt {
    /// Build the prompt for a resolved request.
    #[must_use]
    pub fn build(request: &ResolvedRequest) -> Self {
        let system = [
            "You generate concise, runnable coding katas.".to_string(),
            format!(
                "Respect difficulty={}, target time={} min.",
                request.prompt_difficulty.as_str(),
                request.est_minutes
            ),
            "Keep code minimal; avoid heavy deps. Title ≤ 8 words.".to_string(),
        ]
        .join(" ");

        let mut lines = Vec::with_capacity(3);
        if let Some(influence) = &request.influence {
            lines.push(format!("Influence/focus: {influence}"));
        }
        lines.push(format!(
            "All code/tests in {}.",
            request.language.prompt_label()
        ));
        lines.push("Return ONLY the JSON matching the schema.".to_string());

        Self {
            system,
            user: lines.join("\n"),
            schema: kata_json_schema(),
        }
    }
}
