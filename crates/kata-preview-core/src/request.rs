//! Generation request parameters and their normalization.

use serde::{Deserialize, Serialize};

/// Target language or framework for a generated kata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Plain JavaScript.
    Javascript,
    /// TypeScript.
    #[default]
    Typescript,
    /// React with TSX.
    React,
    /// Vue 3.
    Vue,
    /// Angular.
    Angular,
    /// Node.js.
    Node,
    /// CSS.
    Css,
    /// HTML.
    Html,
    /// Python.
    Python,
    /// Go.
    Go,
    /// Anything else.
    Other,
}

impl Language {
    /// Every supported language.
    pub const ALL: [Self; 11] = [
        Self::Javascript,
        Self::Typescript,
        Self::React,
        Self::Vue,
        Self::Angular,
        Self::Node,
        Self::Css,
        Self::Html,
        Self::Python,
        Self::Go,
        Self::Other,
    ];

    /// The wire name of the language.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::React => "react",
            Self::Vue => "vue",
            Self::Angular => "angular",
            Self::Node => "node",
            Self::Css => "css",
            Self::Html => "html",
            Self::Python => "python",
            Self::Go => "go",
            Self::Other => "other",
        }
    }

    /// The language/framework label embedded in the prompt.
    #[must_use]
    pub const fn prompt_label(self) -> &'static str {
        match self {
            Self::React => "React (TSX)",
            Self::Vue => "Vue 3 (Composition API, TypeScript)",
            Self::Angular => "Angular (TypeScript)",
            Self::Node => "Node.js (TypeScript)",
            Self::Css => "CSS (with minimal HTML scaffold if needed)",
            Self::Html => "HTML + CSS (+ tiny JS if needed)",
            Self::Typescript => "TypeScript",
            Self::Python => "Python",
            Self::Go => "Go",
            Self::Javascript | Self::Other => "JavaScript",
        }
    }

    /// Info string used for fenced code blocks.
    #[must_use]
    pub const fn code_fence(self) -> &'static str {
        match self {
            Self::Typescript | Self::Angular | Self::Node => "ts",
            Self::Javascript | Self::Vue => "js",
            Self::React => "tsx",
            Self::Css => "css",
            Self::Html => "html",
            Self::Python => "py",
            Self::Go => "go",
            Self::Other => "txt",
        }
    }
}

/// Difficulty tier as offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Warm-up exercise.
    Warmup,
    /// Easy.
    Easy,
    /// Medium.
    #[default]
    Medium,
    /// Hard.
    Hard,
}

impl Difficulty {
    /// Every user-facing tier.
    pub const ALL: [Self; 4] = [Self::Warmup, Self::Easy, Self::Medium, Self::Hard];

    /// Coarsen to the tier used in the prompt.
    #[must_use]
    pub const fn prompt_tier(self) -> PromptDifficulty {
        match self {
            Self::Warmup | Self::Easy => PromptDifficulty::Beginner,
            Self::Medium => PromptDifficulty::Intermediate,
            Self::Hard => PromptDifficulty::Advanced,
        }
    }
}

/// Difficulty tier as phrased to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptDifficulty {
    /// Beginner.
    Beginner,
    /// Intermediate.
    Intermediate,
    /// Advanced.
    Advanced,
}

impl PromptDifficulty {
    /// The tier name as it appears in the prompt.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

/// Target session length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KataLength {
    /// A quick exercise.
    Snack,
    /// A regular session.
    #[default]
    Standard,
    /// A long session.
    DeepDive,
}

impl KataLength {
    /// Estimated duration in minutes.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        match self {
            Self::Snack => 15,
            Self::Standard => 35,
            Self::DeepDive => 75,
        }
    }
}

/// Parameters supplied by the caller. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Free-text theme or focus for the kata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influence: Option<String>,
    /// Target language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// User-facing difficulty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    /// Target length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<KataLength>,
}

impl GenerationRequest {
    /// Apply defaults and derive prompt-facing parameters.
    #[must_use]
    pub fn resolve(&self) -> ResolvedRequest {
        let influence = self
            .influence
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        let language = self.language.unwrap_or_default();
        let difficulty = self.difficulty.unwrap_or_default();
        let length = self.length.unwrap_or_default();

        ResolvedRequest {
            influence,
            language,
            difficulty,
            length,
            prompt_difficulty: difficulty.prompt_tier(),
            est_minutes: length.minutes(),
        }
    }
}

/// A request with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Trimmed influence, absent when empty.
    pub influence: Option<String>,
    /// Target language.
    pub language: Language,
    /// User-facing difficulty.
    pub difficulty: Difficulty,
    /// Target length.
    pub length: KataLength,
    /// Difficulty tier for the prompt.
    pub prompt_difficulty: PromptDifficulty,
    /// Estimated duration in minutes.
    pub est_minutes: u32,
}
