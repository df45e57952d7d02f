//! Word and image-reference sanitization
//!
//! Pure functions over untrusted model output. They never panic and never
//! error: bad input degrades to a safe default.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

use shared::Artwork;

use crate::types::ImagePayload;

/// Substitute for words that sanitize down to nothing
pub const FALLBACK_WORD: &str = "word";

/// Everything a worksheet word may not contain: anything that is not a
/// letter, combining mark, whitespace, apostrophe or hyphen
static WORD_DISALLOWED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{M}\s'’\-]+").expect("Failed to compile word filter regex")
});

/// Inline image data URL: png/jpeg/webp, base64 body, whitespace tolerated
static DATA_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^data:image/(?:png|jpeg|jpg|webp);base64,[A-Za-z0-9+/=\s]+$")
        .expect("Failed to compile data URL regex")
});

/// Absolute http(s) URL with no embedded whitespace
static HTTP_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://\S+$").expect("Failed to compile http URL regex")
});

static DATA_URL_MEDIA_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^data:(image/[a-z0-9.+-]+);base64,").expect("Failed to compile media type regex")
});

/// Reduce a model-supplied word to something printable on a worksheet.
///
/// Trims, drops digits, underscores, punctuation and control characters,
/// collapses internal whitespace, and substitutes [`FALLBACK_WORD`] when
/// nothing survives. Idempotent, and locale-agnostic: Unicode letters and
/// combining marks pass through untouched.
pub fn clean_word(raw: &str) -> String {
    let cleaned = clean_label(raw);
    if cleaned.is_empty() {
        FALLBACK_WORD.to_string()
    } else {
        cleaned
    }
}

/// [`clean_word`] without the fallback, for labels that may legitimately be
/// absent (rhyme sounds).
pub fn clean_label(raw: &str) -> String {
    let stripped = WORD_DISALLOWED.replace_all(raw, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tidy free text for printing: control characters out, whitespace collapsed.
/// Punctuation stays; titles and instructions are sentences, not words.
pub fn clean_text(raw: &str) -> String {
    let filtered: String = raw.chars().filter(|c| !c.is_control()).collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate an image reference against the accepted grammar.
///
/// Accepts a `data:image/…;base64,…` URL (png, jpeg or webp) or an absolute
/// http(s) URL, case-insensitively. Valid references come back unchanged
/// (modulo surrounding whitespace); everything else, `javascript:` schemes
/// included, becomes the empty string, meaning "no image".
pub fn sanitize_image_reference(raw: &str) -> String {
    let candidate = raw.trim();
    if DATA_URL_PATTERN.is_match(candidate) || HTTP_URL_PATTERN.is_match(candidate) {
        candidate.to_string()
    } else {
        String::new()
    }
}

/// Media type for an already-validated image reference.
///
/// Data URLs carry their declared type; remote URLs are guessed from the
/// path extension. Unknown stays empty and the renderer may sniff.
pub fn media_type_for_reference(reference: &str) -> String {
    if let Some(caps) = DATA_URL_MEDIA_TYPE.captures(reference) {
        let declared = caps[1].to_lowercase();
        return if declared == "image/jpg" {
            "image/jpeg".to_string()
        } else {
            declared
        };
    }
    let path = reference.split(['?', '#']).next().unwrap_or("").to_lowercase();
    for (extension, media_type) in [
        (".png", "image/png"),
        (".jpg", "image/jpeg"),
        (".jpeg", "image/jpeg"),
        (".webp", "image/webp"),
        (".gif", "image/gif"),
    ] {
        if path.ends_with(extension) {
            return media_type.to_string();
        }
    }
    String::new()
}

/// Convert a raw adapter payload into renderable artwork.
///
/// Base64 payloads are decode-checked before acceptance so truncated image
/// data is caught here rather than at render time. `None` means the payload
/// was unusable.
pub fn artwork_from_payload(payload: ImagePayload) -> Option<Artwork> {
    let reference = match payload {
        ImagePayload::Base64 { data, media_type } => {
            let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.is_empty() || BASE64.decode(compact.as_bytes()).is_err() {
                return None;
            }
            let media_type = if media_type.trim().is_empty() {
                "image/png".to_string()
            } else {
                media_type.trim().to_lowercase()
            };
            format!("data:{media_type};base64,{compact}")
        }
        ImagePayload::Url(url) => url,
    };

    let reference = sanitize_image_reference(&reference);
    if reference.is_empty() {
        return None;
    }
    let media_type = media_type_for_reference(&reference);
    Some(Artwork::Bitmap { reference, media_type })
}
