//! Engine-specific data types: model candidates, outcomes, reports, configuration

use std::env;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Artwork, ProviderFailure, ProviderKind, WorksheetDraft};

/// Default text-model fallback order, best first
pub const DEFAULT_TEXT_MODELS: [&str; 3] = ["gemini-2.5-flash", "gemini-2.0-flash", "gpt-4o-mini"];

/// Default image-model fallback order, best first
pub const DEFAULT_IMAGE_MODELS: [&str; 3] = [
    "gemini-2.0-flash-preview-image-generation",
    "gpt-image-1",
    "dall-e-3",
];

/// One model the fallback resolver may try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub provider: ProviderKind,
    pub model: String,
}

impl ModelCandidate {
    pub fn new(model: &str) -> Self {
        Self {
            provider: ProviderKind::infer(model),
            model: model.to_string(),
        }
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model)
    }
}

/// Ordered, deduplicated list of models to try for one request
///
/// An explicitly requested model goes first; the configured fallback order
/// follows. Resolution never yields an empty list as long as the defaults
/// are non-empty.
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<ModelCandidate>,
}

impl CandidateList {
    pub fn resolve(requested: Option<&str>, defaults: &[String]) -> Self {
        let mut candidates: Vec<ModelCandidate> = Vec::new();
        if let Some(model) = requested {
            let model = model.trim();
            if !model.is_empty() {
                candidates.push(ModelCandidate::new(model));
            }
        }
        for model in defaults {
            let already = candidates.iter().any(|c| c.model.eq_ignore_ascii_case(model));
            if !already {
                candidates.push(ModelCandidate::new(model));
            }
        }
        Self { candidates }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Provider class of the preferred candidate; drives worker budgets.
    pub fn leading_provider(&self) -> ProviderKind {
        self.candidates
            .first()
            .map(|c| c.provider)
            .unwrap_or(ProviderKind::Gemini)
    }

    pub fn model_names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.model.clone()).collect()
    }
}

/// Everything known about an exhausted or aborted fallback walk
#[derive(Debug, Clone)]
pub struct FallbackFailure {
    pub tried_models: Vec<String>,
    pub last_failure: ProviderFailure,
    /// True when the walk stopped on a fatal error instead of running out of models
    pub fatal: bool,
}

impl FallbackFailure {
    /// Human-readable summary naming every model that was tried.
    pub fn message(&self) -> String {
        format!(
            "tried model(s) {}; last error: {}",
            self.tried_models.join(", "),
            self.last_failure
        )
    }

    /// Terminal error for the caller, variant chosen by the final failure's class.
    pub fn into_engine_error(self) -> crate::error::EngineError {
        let message = self.message();
        crate::core::classify::terminal_error(&self.last_failure, message)
    }
}

/// Result of one fallback walk: either a value from exactly one model, or a
/// failure describing every model that was tried. Never both.
#[derive(Debug)]
pub enum GenerationOutcome<T> {
    Success { value: T, used_model: String },
    Failure(FallbackFailure),
}

impl<T> GenerationOutcome<T> {
    /// Collapse into a caller-facing result, keeping the model that delivered.
    pub fn into_result(self) -> crate::error::EngineResult<(T, String)> {
        match self {
            GenerationOutcome::Success { value, used_model } => Ok((value, used_model)),
            GenerationOutcome::Failure(failure) => Err(failure.into_engine_error()),
        }
    }
}

/// Raw image bytes or location as returned by an image adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Base64 { data: String, media_type: String },
    Url(String),
}

/// Successful worksheet generation output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub draft: WorksheetDraft,
    /// True when images are hydrating in the background
    pub deferred: bool,
    /// Hydration run token, present only for deferred generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<u64>,
    /// Text model that actually produced the draft
    pub text_model: String,
    /// Image models that produced at least one accepted image, first-use order
    pub image_models: Vec<String>,
    /// Present when some images failed; the worksheet is still usable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Machine-readable failure detail; not for verbatim end-user display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<ImageDiagnostics>,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Partial image failure detail carried alongside a usable worksheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDiagnostics {
    pub failed_words: Vec<String>,
    pub attempted_models: Vec<String>,
    /// One truncated error string per failed word
    pub samples: Vec<String>,
}

/// Successful single-word refresh output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordRefreshReport {
    pub word: String,
    pub artwork: Artwork,
    /// Set when an alternative word was produced by a text model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    pub image_model: String,
}

/// Tagged engine output for transport callers using the single entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineResponse {
    Worksheet(GenerationReport),
    Word(WordRefreshReport),
    Topic { topic: String },
}

/// Engine tuning knobs, environment-overridable without code changes
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Language used when the request leaves it blank
    pub default_language: String,
    /// Text-model fallback order
    pub text_models: Vec<String>,
    /// Image-model fallback order
    pub image_models: Vec<String>,
    /// Image worker budget when the leading candidate is Gemini-class
    pub image_workers_gemini: usize,
    /// Image worker budget when the leading candidate is OpenAI-class
    pub image_workers_openai: usize,
    /// Attempts per model during image fallback walks
    pub image_attempts_per_model: u32,
    /// Attempts for the whole word-refresh step
    pub word_refresh_attempts: u32,
    /// Cap on honoring a provider's advisory retry delay
    pub max_advisory_wait: Duration,
    /// Cap on the exponential backoff between fallback attempts
    pub max_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_language: "english".to_string(),
            text_models: DEFAULT_TEXT_MODELS.iter().map(|m| m.to_string()).collect(),
            image_models: DEFAULT_IMAGE_MODELS.iter().map(|m| m.to_string()).collect(),
            image_workers_gemini: 3,
            image_workers_openai: 2,
            image_attempts_per_model: 2,
            word_refresh_attempts: 3,
            max_advisory_wait: Duration::from_secs(10),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Defaults merged with `ENGINE_*` environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(models) = env_model_list("ENGINE_TEXT_MODELS") {
            config.text_models = models;
        }
        if let Some(models) = env_model_list("ENGINE_IMAGE_MODELS") {
            config.image_models = models;
        }
        config.image_workers_gemini = env_parse("ENGINE_IMAGE_WORKERS_GEMINI", config.image_workers_gemini);
        config.image_workers_openai = env_parse("ENGINE_IMAGE_WORKERS_OPENAI", config.image_workers_openai);
        config.image_attempts_per_model =
            env_parse("ENGINE_IMAGE_ATTEMPTS", config.image_attempts_per_model);
        config.word_refresh_attempts =
            env_parse("ENGINE_WORD_REFRESH_ATTEMPTS", config.word_refresh_attempts);
        if let Ok(language) = env::var("ENGINE_DEFAULT_LANGUAGE") {
            if !language.trim().is_empty() {
                config.default_language = language.trim().to_string();
            }
        }
        config
    }

    pub fn image_worker_budget(&self, provider: ProviderKind) -> usize {
        let budget = match provider {
            ProviderKind::Gemini => self.image_workers_gemini,
            ProviderKind::OpenAi => self.image_workers_openai,
        };
        budget.max(1)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_model_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let models: Vec<String> = raw
        .split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if models.is_empty() {
        None
    } else {
        Some(models)
    }
}
