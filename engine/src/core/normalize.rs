//! Worksheet normalization: the trust boundary for text-provider output
//!
//! Everything downstream of this module may assume the draft invariants
//! hold: exact pair count, non-empty printable words, grammar-valid image
//! references, sanitized vector markup. Field access is deliberately
//! tolerant; models spell keys inconsistently.

use serde_json::Value;

use shared::{Artwork, PairCount, RhymePair, WordIllustration, WorksheetDraft};

use crate::core::sanitize::{clean_label, clean_text, clean_word, media_type_for_reference, sanitize_image_reference};
use crate::core::svg::sanitize_vector_markup;
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_TITLE: &str = "Rhyming Words";
pub const DEFAULT_INSTRUCTION: &str =
    "Draw a line between the words that rhyme. Then say each word out loud.";

/// Turn a raw model payload into a valid [`WorksheetDraft`].
///
/// Fails with [`EngineError::MalformedResponse`] when the payload is not an
/// object or holds fewer than `pair_count` usable pairs; surplus pairs are
/// dropped. `language` is the already-resolved request language, not
/// whatever the model echoed back.
pub fn normalize_worksheet(
    candidate: &Value,
    language: &str,
    pair_count: PairCount,
) -> EngineResult<WorksheetDraft> {
    let Some(object) = candidate.as_object() else {
        return Err(EngineError::malformed("worksheet payload is not a JSON object"));
    };

    let entries = ["pairs", "rhymePairs", "rhyme_pairs"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_array()))
        .ok_or_else(|| EngineError::malformed("worksheet payload has no pairs array"))?;

    let mut pairs: Vec<RhymePair> = entries.iter().filter_map(rhyme_pair).collect();
    if pairs.len() < pair_count.get() {
        return Err(EngineError::MalformedResponse {
            message: format!(
                "expected {} rhyme pairs, found {}",
                pair_count,
                pairs.len()
            ),
        });
    }
    pairs.truncate(pair_count.get());

    let title = object
        .get("title")
        .and_then(|v| v.as_str())
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let instruction = object
        .get("instruction")
        .and_then(|v| v.as_str())
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string());

    Ok(WorksheetDraft {
        title,
        instruction,
        language: language.to_string(),
        pairs,
    })
}

/// One pair entry in any of the shapes models produce: an object with
/// left/right slots, an object with a two-element words array, or a bare
/// two-element array. `None` skips the entry.
fn rhyme_pair(value: &Value) -> Option<RhymePair> {
    if let Some(object) = value.as_object() {
        let sound = ["sound", "rhyme", "rhymeSound", "rhyme_sound"]
            .iter()
            .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
            .map(clean_label)
            .unwrap_or_default();

        if let (Some(left), Some(right)) = (object.get("left"), object.get("right")) {
            return Some(RhymePair {
                sound,
                left: word_slot(left),
                right: word_slot(right),
            });
        }
        if let Some(words) = object.get("words").and_then(|v| v.as_array()) {
            if words.len() >= 2 {
                return Some(RhymePair {
                    sound,
                    left: word_slot(&words[0]),
                    right: word_slot(&words[1]),
                });
            }
        }
        return None;
    }
    if let Some(items) = value.as_array() {
        if items.len() >= 2 {
            return Some(RhymePair {
                sound: String::new(),
                left: word_slot(&items[0]),
                right: word_slot(&items[1]),
            });
        }
    }
    None
}

/// A word slot from either a bare string or an object carrying the word and
/// optionally inline artwork. Non-textual values fall back to the stock word.
fn word_slot(value: &Value) -> WordIllustration {
    if let Some(text) = value.as_str() {
        return WordIllustration {
            word: clean_word(text),
            artwork: None,
        };
    }
    let Some(object) = value.as_object() else {
        return WordIllustration {
            word: clean_word(""),
            artwork: None,
        };
    };

    let word = object
        .get("word")
        .and_then(|v| v.as_str())
        .map(clean_word)
        .unwrap_or_else(|| clean_word(""));

    let bitmap = ["image", "imageUrl", "image_url", "imageReference"]
        .iter()
        .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
        .map(sanitize_image_reference)
        .filter(|reference| !reference.is_empty())
        .map(|reference| {
            let media_type = media_type_for_reference(&reference);
            Artwork::Bitmap { reference, media_type }
        });

    let artwork = bitmap.or_else(|| {
        ["svg", "vector", "markup"]
            .iter()
            .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
            .filter(|markup| !markup.trim().is_empty())
            .map(|markup| Artwork::Vector {
                markup: sanitize_vector_markup(markup),
            })
    });

    WordIllustration { word, artwork }
}
