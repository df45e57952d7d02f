//! Prompt assembly for worksheet, image, refresh and topic requests
//!
//! Text prompts pin the JSON contract the normalizer expects; image prompts
//! rotate through a small style pool so regenerated images do not collapse
//! into the same picture.

use rand::seq::SliceRandom;

use shared::PairCount;

const IMAGE_STYLES: [&str; 8] = [
    "watercolor",
    "crayon",
    "soft pastel",
    "flat paper cut-out",
    "colored pencil",
    "gouache",
    "simple cartoon",
    "storybook ink and wash",
];

const VARIATION_ANGLES: [&str; 6] = [
    "a completely different composition",
    "a different color palette",
    "a side view instead of a front view",
    "a different setting around the subject",
    "different lighting, as if at another time of day",
    "a noticeably different art style",
];

const TOPIC_SEEDS: [&str; 8] = [
    "under the sea",
    "space travel",
    "farm animals",
    "a rainy day",
    "a dinosaur picnic",
    "the night sky",
    "a busy kitchen",
    "jungle explorers",
];

/// Prompt for a complete worksheet in one JSON document.
pub fn worksheet_prompt(language: &str, pairs: PairCount, topic: &str) -> String {
    let topic_clause = if topic.trim().is_empty() {
        String::new()
    } else {
        format!(" Theme the words around \"{}\" where possible.", topic.trim())
    };
    format!(
        "You create rhyming worksheets for young children. \
         Produce exactly {pairs} rhyming word pairs in {language}.{topic_clause}\n\
         Respond with ONLY a JSON object, no prose and no code fences, shaped like:\n\
         {{\"title\": \"...\", \"instruction\": \"...\", \"pairs\": [{{\"sound\": \"-at\", \
         \"left\": {{\"word\": \"cat\"}}, \"right\": {{\"word\": \"hat\"}}}}]}}\n\
         Rules: use simple concrete nouns a five-year-old knows and can draw; \
         the two words of a pair must rhyme in {language}; \
         never repeat a word anywhere on the worksheet; keep \"sound\" short, like \"-at\". \
         A word slot may optionally include an \"svg\" field holding a tiny line drawing \
         of that word (viewBox 0 0 100 100, shapes only, no script)."
    )
}

/// Prompt for one word's illustration.
pub fn image_prompt(word: &str, language: &str) -> String {
    let style = pick(&IMAGE_STYLES);
    format!(
        "A friendly {style} illustration of \"{word}\" for a children's rhyming worksheet. \
         \"{word}\" is a {language} word; illustrate what it means. \
         Plain white background, one centered subject, bright and simple. \
         No letters, numbers or text anywhere in the image."
    )
}

/// Image prompt for a refresh attempt: pushes away from earlier renders with
/// the caller's hint plus a freshly drawn angle. Call once per attempt so
/// each retry gets a new nudge.
pub fn refresh_image_prompt(word: &str, language: &str, variation_hint: Option<&str>) -> String {
    let mut prompt = image_prompt(word, language);
    prompt.push_str(&format!(
        " The previous illustration of \"{word}\" was not right; this one must look clearly \
         different. Try {}.",
        pick(&VARIATION_ANGLES)
    ));
    if let Some(hint) = variation_hint {
        let hint = hint.trim();
        if !hint.is_empty() {
            prompt.push_str(&format!(" Also: {hint}."));
        }
    }
    prompt
}

/// Prompt for one replacement word that still rhymes with its partner.
pub fn alternative_word_prompt(word: &str, paired_word: &str, language: &str) -> String {
    format!(
        "Give one {language} word that rhymes with \"{paired_word}\" and is not \"{word}\". \
         It must be a simple concrete noun a five-year-old knows and can draw. \
         Respond with ONLY a JSON object: {{\"word\": \"...\"}}"
    )
}

/// Prompt for a fresh worksheet topic.
pub fn topic_prompt() -> String {
    format!(
        "Suggest one playful topic for a children's rhyming worksheet, in a few words, \
         nothing like \"{}\". Respond with ONLY a JSON object: {{\"topic\": \"...\"}}",
        pick(&TOPIC_SEEDS)
    )
}

fn pick<'a>(pool: &[&'a str]) -> &'a str {
    let mut rng = rand::thread_rng();
    pool.choose(&mut rng).copied().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worksheet_prompt_carries_count_language_and_topic() {
        let pairs = PairCount::new(5).unwrap();
        let prompt = worksheet_prompt("french", pairs, "the ocean");
        assert!(prompt.contains("exactly 5"));
        assert!(prompt.contains("french"));
        assert!(prompt.contains("the ocean"));
        assert!(prompt.contains("ONLY a JSON object"));

        let untopical = worksheet_prompt("english", pairs, "   ");
        assert!(!untopical.contains("Theme the words"));
    }

    #[test]
    fn image_prompt_names_the_word_and_bans_text() {
        let prompt = image_prompt("cat", "english");
        assert!(prompt.contains("\"cat\""));
        assert!(prompt.contains("No letters"));
    }

    #[test]
    fn refresh_prompt_appends_the_caller_hint() {
        let prompt = refresh_image_prompt("cat", "english", Some("no hats this time"));
        assert!(prompt.contains("clearly"));
        assert!(prompt.contains("no hats this time"));

        let plain = refresh_image_prompt("cat", "english", None);
        assert!(plain.contains("different"));
    }

    #[test]
    fn alternative_word_prompt_names_both_words() {
        let prompt = alternative_word_prompt("cat", "hat", "english");
        assert!(prompt.contains("\"hat\""));
        assert!(prompt.contains("not \"cat\""));
    }

    #[test]
    fn topic_prompt_requests_json() {
        assert!(topic_prompt().contains("\"topic\""));
    }
}
