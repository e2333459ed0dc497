//! Kata records built from accepted previews.
//!
//! A caller that accepts a generated candidate turns it into a
//! [`KataRecord`] for its own catalog. The record starts in the backlog and
//! carries the full candidate as a markdown requirements document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::KataCandidate;
use crate::request::{Difficulty, Language};

/// Maximum length of a description derived from the long description.
const DESCRIPTION_FALLBACK_CHARS: usize = 160;

/// Maximum number of tags kept on a record.
const MAX_TAGS: usize = 12;

/// Identifier of a kata record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KataId(uuid::Uuid);

impl KataId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl FromStr for KataId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl TryFrom<String> for KataId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KataId> for String {
    fn from(id: KataId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Debug for KataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KataId({})", self.0)
    }
}

impl fmt::Display for KataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress state of a kata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KataStatus {
    /// Not started.
    #[default]
    Backlog,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
    /// Given up.
    Abandoned,
}

/// A kata in a user's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KataRecord {
    /// Record ID.
    pub id: KataId,
    /// Title.
    pub title: String,
    /// Short blurb.
    pub description: Option<String>,
    /// Requirements as markdown.
    pub requirements: Option<String>,
    /// Languages the kata targets.
    pub languages: Vec<Language>,
    /// Lowercased tags.
    pub tags: Vec<String>,
    /// Progress state.
    pub status: KataStatus,
    /// Difficulty, if known.
    pub difficulty: Option<Difficulty>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl KataRecord {
    /// Build a backlog record from an accepted candidate.
    #[must_use]
    pub fn from_preview(
        candidate: &KataCandidate,
        language: Option<Language>,
        difficulty: Option<Difficulty>,
        now: DateTime<Utc>,
    ) -> Self {
        let language = language.unwrap_or_default();

        let description = if candidate.summary.trim().is_empty() {
            Some(
                candidate
                    .description
                    .chars()
                    .take(DESCRIPTION_FALLBACK_CHARS)
                    .collect::<String>(),
            )
            .filter(|s| !s.is_empty())
        } else {
            Some(candidate.summary.clone())
        };

        Self {
            id: KataId::generate(),
            title: candidate.title.clone(),
            description,
            requirements: Some(requirements_markdown(candidate, language)),
            languages: vec![language],
            tags: normalize_tags(&candidate.tags),
            status: KataStatus::Backlog,
            difficulty,
            created_at: now,
            updated_at: now,
        }
    }
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized.truncate(MAX_TAGS);
    normalized
}

fn requirements_markdown(candidate: &KataCandidate, language: Language) -> String {
    [
        section("Summary", &candidate.summary),
        section("Description", &candidate.description),
        list("Steps", &candidate.steps),
        list("Acceptance Criteria", &candidate.acceptance_criteria),
        list("Hints", &candidate.hints),
        section("Starter Code", &code_block(language, &candidate.starter_code)),
        section("Tests", &code_block(language, &candidate.tests)),
        section("Solution", &code_block(language, &candidate.solution)),
    ]
    .join("\n\n")
}

fn section(heading: &str, body: &str) -> String {
    format!("## {heading}\n\n{body}")
}

fn list(heading: &str, items: &[String]) -> String {
    let body = items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n");
    section(heading, &body)
}

fn code_block(language: Language, code: &str) -> String {
    let code = if code.is_empty() { "// add code" } else { code };
    format!("```{}\n{code}\n```", language.code_fence())
}
