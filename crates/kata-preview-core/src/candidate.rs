//! Generated kata candidates and the strict output schema.
//!
//! The provider is asked for output conforming to [`kata_json_schema`]. The
//! same bounds are checked again locally so that nothing unvalidated reaches
//! the caller.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::PreviewError;

/// Name of the structured output schema sent to the provider.
pub const SCHEMA_NAME: &str = "kata";

const TITLE_MAX_CHARS: usize = 60;
const STEPS: (usize, usize) = (3, 6);
const TAGS_MAX: usize = 7;
const HINTS: (usize, usize) = (3, 5);
const CRITERIA: (usize, usize) = (3, 8);

/// A kata proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KataCandidate {
    /// Short title.
    pub title: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Full description.
    pub description: String,
    /// Ordered steps (3 to 6).
    pub steps: Vec<String>,
    /// Free-form tags (at most 7).
    pub tags: Vec<String>,
    /// Starter code.
    pub starter_code: String,
    /// Suggested tests.
    pub tests: String,
    /// Reference solution.
    pub solution: String,
    /// Hints (3 to 5).
    pub hints: Vec<String>,
    /// Acceptance criteria (3 to 8).
    pub acceptance_criteria: Vec<String>,
}

impl KataCandidate {
    /// Parse and validate the model's raw structured output.
    ///
    /// # Errors
    ///
    /// Returns `PreviewError::UpstreamMalformedResponse` if the text is not a
    /// JSON object of the expected shape or violates any bound.
    pub fn parse(raw: &str) -> Result<Self, PreviewError> {
        let candidate: Self = serde_json::from_str(raw)
            .map_err(|e| PreviewError::UpstreamMalformedResponse(e.to_string()))?;
        candidate.validate()?;
        Ok(candidate)
    }

    /// Check the bounds declared in the schema.
    ///
    /// # Errors
    ///
    /// Returns `PreviewError::UpstreamMalformedResponse` naming the first
    /// violated bound.
    pub fn validate(&self) -> Result<(), PreviewError> {
        let title_len = self.title.chars().count();
        if self.title.trim().is_empty() || title_len > TITLE_MAX_CHARS {
            return Err(malformed(format!(
                "title must be 1..={TITLE_MAX_CHARS} characters, got {title_len}"
            )));
        }
        check_len("steps", self.steps.len(), STEPS)?;
        check_len("tags", self.tags.len(), (0, TAGS_MAX))?;
        check_len("hints", self.hints.len(), HINTS)?;
        check_len("acceptanceCriteria", self.acceptance_criteria.len(), CRITERIA)?;
        Ok(())
    }
}

fn check_len(field: &str, len: usize, (min, max): (usize, usize)) -> Result<(), PreviewError> {
    if len < min || len > max {
        return Err(malformed(format!(
            "{field} must have {min}..={max} items, got {len}"
        )));
    }
    Ok(())
}

fn malformed(message: String) -> PreviewError {
    PreviewError::UpstreamMalformedResponse(message)
}

/// The strict structured-output schema for [`KataCandidate`].
#[must_use]
pub fn kata_json_schema() -> Value {
    let string_list = |min: Option<usize>, max: usize| {
        let mut schema = json!({ "type": "array", "items": { "type": "string" }, "maxItems": max });
        if let Some(min) = min {
            schema["minItems"] = json!(min);
        }
        schema
    };

    json!({
        "name": SCHEMA_NAME,
        "strict": true,
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "title": { "type": "string", "maxLength": TITLE_MAX_CHARS },
                "summary": { "type": "string" },
                "description": { "type": "string" },
                "steps": string_list(Some(STEPS.0), STEPS.1),
                "tags": string_list(None, TAGS_MAX),
                "starterCode": { "type": "string" },
                "tests": { "type": "string" },
                "solution": { "type": "string" },
                "hints": string_list(Some(HINTS.0), HINTS.1),
                "acceptanceCriteria": string_list(Some(CRITERIA.0), CRITERIA.1),
            },
            "required": [
                "title",
                "summary",
                "description",
                "steps",
                "tags",
                "starterCode",
                "tests",
                "solution",
                "hints",
                "acceptanceCriteria",
            ],
        },
    })
}
