//! Core shared types for worksheet generation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SharedError;

/// Number of rhyme pairs on a worksheet
///
/// Validated on construction; the renderer only lays out 3 to 5 pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PairCount(u8);

impl PairCount {
    pub const ALLOWED: [u8; 3] = [3, 4, 5];

    pub fn new(value: u8) -> Result<Self, SharedError> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(SharedError::InvalidPairCount { value })
        }
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl Default for PairCount {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u8> for PairCount {
    type Error = SharedError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PairCount> for u8 {
    fn from(count: PairCount) -> Self {
        count.0
    }
}

impl fmt::Display for PairCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the caller wants generated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Full worksheet: text plus all images before returning
    Full,
    /// Text-first worksheet: return immediately, hydrate images in the background
    DeferredImages,
    /// Replace a single word's illustration (optionally the word itself)
    WordRefresh,
    /// Produce a fresh random topic string
    TopicShuffle,
}

impl Default for GenerationMode {
    fn default() -> Self {
        GenerationMode::Full
    }
}

/// Immutable input for one engine invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Worksheet language as free text; blank resolves to the engine default
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub pairs: PairCount,
    /// Optional theme; blank lets the model choose
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub mode: GenerationMode,
    /// Explicit model requests; these go first in the candidate order
    #[serde(default)]
    pub text_model: Option<String>,
    #[serde(default)]
    pub image_model: Option<String>,
    /// Word refresh only: the word to re-illustrate
    #[serde(default)]
    pub word: Option<String>,
    /// Word refresh only: the rhyme partner the replacement must still rhyme with
    #[serde(default)]
    pub paired_word: Option<String>,
    /// Word refresh only: caller hint pushing the image away from earlier attempts
    #[serde(default)]
    pub variation_hint: Option<String>,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            language: String::new(),
            pairs: PairCount::default(),
            topic: String::new(),
            mode: GenerationMode::Full,
            text_model: None,
            image_model: None,
            word: None,
            paired_word: None,
            variation_hint: None,
        }
    }
}

impl GenerationRequest {
    pub fn worksheet(language: &str, pairs: PairCount, topic: &str) -> Self {
        Self {
            language: language.to_string(),
            pairs,
            topic: topic.to_string(),
            ..Self::default()
        }
    }

    pub fn word_refresh(word: &str, paired_word: Option<&str>) -> Self {
        Self {
            mode: GenerationMode::WordRefresh,
            word: Some(word.to_string()),
            paired_word: paired_word.map(str::to_string),
            ..Self::default()
        }
    }
}

/// Renderable artwork for a single word
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artwork {
    /// Raster image: a data URL or absolute http(s) URL plus its media type
    Bitmap { reference: String, media_type: String },
    /// Sanitized inline SVG markup
    Vector { markup: String },
}

/// One word slot on the worksheet, with its illustration once hydrated
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordIllustration {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<Artwork>,
}

impl WordIllustration {
    pub fn bare(word: &str) -> Self {
        Self {
            word: word.to_string(),
            artwork: None,
        }
    }
}

/// Two words sharing a rhyme sound
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhymePair {
    /// Rhyme sound label, e.g. "-at"
    pub sound: String,
    pub left: WordIllustration,
    pub right: WordIllustration,
}

/// The validated worksheet document the renderer consumes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetDraft {
    pub title: String,
    pub instruction: String,
    pub language: String,
    pub pairs: Vec<RhymePair>,
}

impl WorksheetDraft {
    /// All word slots, left before right within each pair.
    pub fn slots(&self) -> impl Iterator<Item = &WordIllustration> {
        self.pairs.iter().flat_map(|p| [&p.left, &p.right])
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut WordIllustration> {
        self.pairs.iter_mut().flat_map(|p| [&mut p.left, &mut p.right])
    }

    /// Distinct words in first-appearance order. Duplicate words share one
    /// image fetch, so the batch size is the length of this list.
    pub fn unique_words(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for slot in self.slots() {
            if !words.iter().any(|w| w == &slot.word) {
                words.push(slot.word.clone());
            }
        }
        words
    }

    /// Store `artwork` in every slot holding `word`; returns how many slots matched.
    pub fn set_artwork(&mut self, word: &str, artwork: &Artwork) -> usize {
        let mut updated = 0;
        for slot in self.slots_mut() {
            if slot.word == word {
                slot.artwork = Some(artwork.clone());
                updated += 1;
            }
        }
        updated
    }

    /// Words still waiting for artwork, deduplicated.
    pub fn unhydrated_words(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for slot in self.slots() {
            if slot.artwork.is_none() && !words.iter().any(|w| w == &slot.word) {
                words.push(slot.word.clone());
            }
        }
        words
    }
}

/// Identifier for downstream generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Map a model name onto the provider class that serves it.
    pub fn infer(model: &str) -> Self {
        let name = model.to_lowercase();
        if name.starts_with("gpt")
            || name.starts_with("chatgpt")
            || name.starts_with("dall-e")
            || name.starts_with("o1")
            || name.starts_with("o3")
            || name.starts_with("text-")
        {
            ProviderKind::OpenAi
        } else {
            ProviderKind::Gemini
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Some(ProviderKind::Gemini),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw failure from a single provider call, before classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderFailure {
    /// Non-success HTTP status with the provider's own message text
    Http { status: u16, message: String },
    /// Transport error before any response arrived
    Network(String),
    /// Success status but the body could not be parsed into anything usable
    MalformedPayload(String),
    /// Success status but no content of the requested kind
    EmptyPayload(String),
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            ProviderFailure::Network(message) => write!(f, "network error: {message}"),
            ProviderFailure::MalformedPayload(message) => write!(f, "malformed payload: {message}"),
            ProviderFailure::EmptyPayload(message) => write!(f, "empty payload: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_count_accepts_allowed_values_only() {
        assert!(PairCount::new(3).is_ok());
        assert!(PairCount::new(4).is_ok());
        assert!(PairCount::new(5).is_ok());
        assert!(PairCount::new(2).is_err());
        assert!(PairCount::new(6).is_err());
        assert_eq!(PairCount::default().get(), 4);
    }

    #[test]
    fn provider_kind_inferred_from_model_name() {
        assert_eq!(ProviderKind::infer("gemini-2.5-flash"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::infer("imagen-3.0"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::infer("gpt-4o-mini"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::infer("GPT-4o"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::infer("dall-e-3"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::infer("gpt-image-1"), ProviderKind::OpenAi);
    }

    #[test]
    fn set_artwork_updates_every_matching_slot() {
        let mut draft = WorksheetDraft {
            title: "t".to_string(),
            instruction: "i".to_string(),
            language: "english".to_string(),
            pairs: vec![
                RhymePair {
                    sound: "-at".to_string(),
                    left: WordIllustration::bare("cat"),
                    right: WordIllustration::bare("hat"),
                },
                RhymePair {
                    sound: "-at".to_string(),
                    left: WordIllustration::bare("bat"),
                    right: WordIllustration::bare("cat"),
                },
            ],
        };

        let art = Artwork::Bitmap {
            reference: "https://example.com/cat.png".to_string(),
            media_type: "image/png".to_string(),
        };
        assert_eq!(draft.set_artwork("cat", &art), 2);
        assert_eq!(draft.unique_words(), vec!["cat", "hat", "bat"]);
        assert_eq!(draft.unhydrated_words(), vec!["hat", "bat"]);
    }
}
