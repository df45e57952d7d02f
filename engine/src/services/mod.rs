//! Provider adapter implementations

pub mod gemini;
pub mod openai;
pub mod router;

pub use gemini::*;
pub use openai::*;
pub use router::*;

use serde_json::Value;

use shared::ProviderFailure;

/// Parse a model's text output as JSON, tolerating markdown code fences.
/// A bare quoted string is valid JSON and comes back as `Value::String`.
pub(crate) fn parse_model_json(text: &str) -> Result<Value, ProviderFailure> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned)
        .map_err(|e| ProviderFailure::MalformedPayload(format!("model output is not JSON: {e}")))
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let rest = match trimmed.strip_prefix("```") {
        Some(rest) => rest,
        None => return trimmed,
    };
    // first fence line may carry a language tag
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    match rest.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim_end(),
        None => rest,
    }
}

/// Distill a non-2xx response body into one message line. Providers nest
/// the useful text under `error.message`; Gemini parks its advisory retry
/// delay in `error.details`, so that is folded back in for the retry
/// classifier to find.
pub(crate) fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str());

    match message {
        Some(message) => {
            if let Some(delay) = retry_delay_detail(parsed.as_ref()) {
                if !message.contains("retryDelay") {
                    return format!("{message} (\"retryDelay\": \"{delay}\")");
                }
            }
            message.to_string()
        }
        None => body.trim().chars().take(300).collect(),
    }
}

fn retry_delay_detail(parsed: Option<&Value>) -> Option<String> {
    parsed
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("details"))
        .and_then(|details| details.as_array())
        .and_then(|details| {
            details
                .iter()
                .find_map(|detail| detail.get("retryDelay").and_then(|delay| delay.as_str()))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_parses() {
        let text = "```json\n{\"title\": \"Rhymes\"}\n```";
        let value = parse_model_json(text).unwrap();
        assert_eq!(value["title"], "Rhymes");
    }

    #[test]
    fn bare_json_and_quoted_strings_parse() {
        assert_eq!(parse_model_json("{\"a\": 1}").unwrap()["a"], 1);
        assert_eq!(
            parse_model_json("\"under the sea\"").unwrap(),
            json!("under the sea")
        );
    }

    #[test]
    fn prose_output_is_malformed() {
        let err = parse_model_json("Sure! Here are your rhymes.").unwrap_err();
        assert!(matches!(err, ProviderFailure::MalformedPayload(_)));
    }

    #[test]
    fn error_message_prefers_the_nested_provider_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
    }

    #[test]
    fn error_message_folds_in_the_advisory_retry_delay() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted",
            "status": "RESOURCE_EXHAUSTED",
            "details": [{"@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "37s"}]}}"#;
        let message = error_message(body);
        assert!(message.contains("Resource has been exhausted"));
        assert!(message.contains("\"retryDelay\": \"37s\""));
    }

    #[test]
    fn error_message_falls_back_to_the_raw_body() {
        assert_eq!(error_message("  upstream timeout  "), "upstream timeout");
    }
}
