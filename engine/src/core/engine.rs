//! Worksheet generation orchestration
//!
//! Composes the fallback resolver, the bounded dispatcher and the
//! sanitizers into the four caller-facing flows: full generation, deferred
//! generation with background image hydration, single-word refresh, and
//! topic randomization.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use shared::{
    Artwork, GenerationMode, GenerationRequest, PairCount, ProviderFailure, SharedError,
    WorksheetDraft,
};

use crate::core::dispatch::run_indexed;
use crate::core::fallback::{run_fallback, run_fallback_with_attempts};
use crate::core::normalize::normalize_worksheet;
use crate::core::prompt;
use crate::core::sanitize::{artwork_from_payload, clean_text, clean_word, FALLBACK_WORD};
use crate::error::{EngineError, EngineResult};
use crate::state::{HydrationRun, HydrationState};
use crate::traits::{ImageGenerator, TextGenerator};
use crate::types::{
    CandidateList, EngineConfig, EngineResponse, FallbackFailure, GenerationOutcome,
    GenerationReport, ImageDiagnostics, WordRefreshReport,
};

/// The generation engine. Generic over its provider seams so flows are
/// testable without HTTP.
pub struct WorksheetEngine<T, G>
where
    T: TextGenerator + 'static,
    G: ImageGenerator + 'static,
{
    text: Arc<T>,
    image: Arc<G>,
    config: EngineConfig,
    hydration: Arc<HydrationState>,
    hydration_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T, G> WorksheetEngine<T, G>
where
    T: TextGenerator + 'static,
    G: ImageGenerator + 'static,
{
    pub fn new(text: T, image: G, config: EngineConfig) -> Self {
        Self {
            text: Arc::new(text),
            image: Arc::new(image),
            config,
            hydration: Arc::new(HydrationState::new()),
            hydration_task: Mutex::new(None),
        }
    }

    /// Single entry point for transport callers: dispatches on the request
    /// mode and wraps the flow-specific result.
    pub async fn execute(&self, request: GenerationRequest) -> EngineResult<EngineResponse> {
        match request.mode {
            GenerationMode::Full | GenerationMode::DeferredImages => {
                Ok(EngineResponse::Worksheet(self.generate(request).await?))
            }
            GenerationMode::WordRefresh => Ok(EngineResponse::Word(self.refresh_word(request).await?)),
            GenerationMode::TopicShuffle => Ok(EngineResponse::Topic {
                topic: self.randomize_topic().await?,
            }),
        }
    }

    /// Generate a worksheet. `Full` mode returns with every image settled;
    /// `DeferredImages` returns the text-only draft immediately and hydrates
    /// images in the background under a fresh run token.
    pub async fn generate(&self, request: GenerationRequest) -> EngineResult<GenerationReport> {
        let started = Instant::now();
        let language = self.resolve_language(&request);
        let topic = request.topic.trim().to_string();
        let deferred = request.mode == GenerationMode::DeferredImages;

        info!(
            "📝 Generating worksheet: {} pairs, language '{}', deferred: {}",
            request.pairs, language, deferred
        );

        let text_candidates =
            CandidateList::resolve(request.text_model.as_deref(), &self.config.text_models);
        let (mut draft, text_model) = self
            .generate_draft(&text_candidates, &language, request.pairs, &topic)
            .await?;

        let image_candidates =
            CandidateList::resolve(request.image_model.as_deref(), &self.config.image_models);

        if deferred {
            let token = self.hydration.begin_run(draft.clone()).await;
            let words = draft.unhydrated_words();
            info!("🚚 Hydration run {} spawned for {} unique words", token, words.len());
            let task = tokio::spawn(hydrate_in_background(
                Arc::clone(&self.image),
                Arc::clone(&self.hydration),
                token,
                words,
                language,
                image_candidates,
                self.config.clone(),
            ));
            *self.hydration_task.lock().await = Some(task);

            return Ok(GenerationReport {
                draft,
                deferred: true,
                run: Some(token),
                text_model,
                image_models: Vec::new(),
                warning: None,
                diagnostics: None,
                generated_at: Utc::now(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let (image_models, warning, diagnostics) =
            self.hydrate_now(&mut draft, &image_candidates, &language).await;

        Ok(GenerationReport {
            draft,
            deferred: false,
            run: None,
            text_model,
            image_models,
            warning,
            diagnostics,
            generated_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Re-illustrate one word. With a `paired_word`, first tries to swap in
    /// a fresh word that still rhymes (best-effort, silent on failure); the
    /// image request carries a uniqueness nudge that is re-drawn on every
    /// attempt.
    pub async fn refresh_word(&self, request: GenerationRequest) -> EngineResult<WordRefreshReport> {
        let requested_word = request
            .word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| SharedError::MissingField {
                field: "word".to_string(),
            })?;

        let language = self.resolve_language(&request);
        let text_candidates =
            CandidateList::resolve(request.text_model.as_deref(), &self.config.text_models);
        let image_candidates =
            CandidateList::resolve(request.image_model.as_deref(), &self.config.image_models);

        let mut word = clean_word(requested_word);
        let mut text_model = None;
        if let Some(paired) = request
            .paired_word
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
        {
            if let Some((alternative, model)) = self
                .alternative_word(&text_candidates, &word, paired, &language)
                .await
            {
                info!("🔄 Replacing '{}' with '{}' (from {})", word, alternative, model);
                word = alternative;
                text_model = Some(model);
            }
        }

        let hint = request.variation_hint.as_deref();
        let mut last_failure: Option<FallbackFailure> = None;
        for attempt in 0..self.config.word_refresh_attempts.max(1) {
            let outcome = run_fallback_with_attempts(
                &image_candidates,
                &self.config,
                self.config.image_attempts_per_model,
                |candidate| {
                    let model = candidate.model.clone();
                    let prompt = prompt::refresh_image_prompt(&word, &language, hint);
                    let image = Arc::clone(&self.image);
                    async move {
                        let payload = image.generate_image(&model, &prompt).await?;
                        artwork_from_payload(payload).ok_or_else(|| {
                            ProviderFailure::EmptyPayload("no usable image in response".to_string())
                        })
                    }
                },
            )
            .await;

            match outcome {
                GenerationOutcome::Success { value, used_model } => {
                    return Ok(WordRefreshReport {
                        word,
                        artwork: value,
                        text_model,
                        image_model: used_model,
                    });
                }
                GenerationOutcome::Failure(failure) => {
                    warn!(
                        "⚠️ Refresh attempt {}/{} for '{}' failed: {}",
                        attempt + 1,
                        self.config.word_refresh_attempts.max(1),
                        word,
                        failure.message()
                    );
                    let fatal = failure.fatal;
                    last_failure = Some(failure);
                    if fatal {
                        break;
                    }
                }
            }
        }

        let failure = last_failure.unwrap_or_else(|| FallbackFailure {
            tried_models: image_candidates.model_names(),
            last_failure: ProviderFailure::EmptyPayload("no image attempts were made".to_string()),
            fatal: false,
        });
        if failure.fatal {
            return Err(failure.into_engine_error());
        }
        Err(EngineError::NoImageProduced {
            message: failure.message(),
        })
    }

    /// One short fresh topic for the next worksheet.
    pub async fn randomize_topic(&self) -> EngineResult<String> {
        let candidates = CandidateList::resolve(None, &self.config.text_models);
        let outcome = run_fallback(&candidates, &self.config, |candidate| {
            let model = candidate.model.clone();
            let prompt = prompt::topic_prompt();
            let text = Arc::clone(&self.text);
            async move {
                let value = text.generate_text(&model, &prompt).await?;
                let topic = value
                    .get("topic")
                    .and_then(|t| t.as_str())
                    .or_else(|| value.as_str())
                    .map(clean_text)
                    .filter(|t| !t.is_empty());
                topic.ok_or_else(|| {
                    ProviderFailure::EmptyPayload("no topic in response".to_string())
                })
            }
        })
        .await;

        let (topic, used_model) = outcome.into_result()?;
        info!("🎲 New topic from {}: {}", used_model, topic);
        Ok(topic)
    }

    /// Wait for the most recently spawned hydration task and return the
    /// merged draft. Used by the standalone binary and by tests; transport
    /// callers poll [`Self::snapshot`] instead.
    pub async fn await_hydration(&self) -> Option<WorksheetDraft> {
        let task = self.hydration_task.lock().await.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("⚠️ Hydration task join failed: {err}");
            }
        }
        self.hydration.snapshot().await
    }

    /// Latest merged draft, however much of it has hydrated.
    pub async fn snapshot(&self) -> Option<WorksheetDraft> {
        self.hydration.snapshot().await
    }

    fn resolve_language(&self, request: &GenerationRequest) -> String {
        let language = request.language.trim();
        if language.is_empty() {
            self.config.default_language.clone()
        } else {
            language.to_lowercase()
        }
    }

    async fn generate_draft(
        &self,
        candidates: &CandidateList,
        language: &str,
        pairs: PairCount,
        topic: &str,
    ) -> EngineResult<(WorksheetDraft, String)> {
        let outcome = run_fallback(candidates, &self.config, |candidate| {
            let model = candidate.model.clone();
            let prompt = prompt::worksheet_prompt(language, pairs, topic);
            let text = Arc::clone(&self.text);
            let language = language.to_string();
            async move {
                let value = text.generate_text(&model, &prompt).await?;
                // a parseable-but-unusable body counts against this model,
                // the next candidate may produce honest JSON
                normalize_worksheet(&value, &language, pairs)
                    .map_err(|err| ProviderFailure::MalformedPayload(err.to_string()))
            }
        })
        .await;
        outcome.into_result()
    }

    /// Fetch one image per unique unhydrated word and merge the results.
    /// Per-word failures degrade to a warning plus diagnostics; they never
    /// sink the worksheet.
    async fn hydrate_now(
        &self,
        draft: &mut WorksheetDraft,
        candidates: &CandidateList,
        language: &str,
    ) -> (Vec<String>, Option<String>, Option<ImageDiagnostics>) {
        let words = draft.unhydrated_words();
        if words.is_empty() {
            return (Vec::new(), None, None);
        }
        let budget = self.config.image_worker_budget(candidates.leading_provider());
        info!("🖼️ Fetching {} images with {} workers", words.len(), budget);

        let results = run_indexed(&words, budget, |_, word| {
            word_image(
                Arc::clone(&self.image),
                self.config.clone(),
                candidates.clone(),
                word.clone(),
                language.to_string(),
            )
        })
        .await;

        let mut image_models: Vec<String> = Vec::new();
        let mut failed: Vec<(String, FallbackFailure)> = Vec::new();
        for (word, result) in words.iter().zip(results) {
            match result {
                Ok((artwork, model)) => {
                    draft.set_artwork(word, &artwork);
                    if !image_models.contains(&model) {
                        image_models.push(model);
                    }
                }
                Err(failure) => failed.push((word.clone(), failure)),
            }
        }

        if failed.is_empty() {
            return (image_models, None, None);
        }

        warn!("⚠️ {}/{} images failed; returning worksheet without them", failed.len(), words.len());
        let warning = format!(
            "{} of {} images could not be generated; the worksheet is usable without them",
            failed.len(),
            words.len()
        );
        let diagnostics = build_diagnostics(&failed);
        (image_models, Some(warning), Some(diagnostics))
    }

    /// Ask for a replacement word that rhymes with `paired`. Best effort:
    /// on any failure the original word is kept and the caller is none the
    /// wiser.
    async fn alternative_word(
        &self,
        candidates: &CandidateList,
        word: &str,
        paired: &str,
        language: &str,
    ) -> Option<(String, String)> {
        let outcome = run_fallback(candidates, &self.config, |candidate| {
            let model = candidate.model.clone();
            let prompt = prompt::alternative_word_prompt(word, paired, language);
            let text = Arc::clone(&self.text);
            let word = word.to_string();
            async move {
                let value = text.generate_text(&model, &prompt).await?;
                let alternative = value
                    .get("word")
                    .and_then(|w| w.as_str())
                    .or_else(|| value.as_str())
                    .map(clean_word)
                    .filter(|w| w != FALLBACK_WORD && !w.eq_ignore_ascii_case(&word));
                alternative.ok_or_else(|| {
                    ProviderFailure::EmptyPayload("no alternative word in response".to_string())
                })
            }
        })
        .await;

        match outcome {
            GenerationOutcome::Success { value, used_model } => Some((value, used_model)),
            GenerationOutcome::Failure(failure) => {
                info!("ℹ️ Keeping original word '{}': {}", word, failure.message());
                None
            }
        }
    }
}

/// One word's image through the full fallback walk. Owns everything it
/// needs so the same routine serves the synchronous batch and the spawned
/// background hydration.
async fn word_image<G: ImageGenerator>(
    image: Arc<G>,
    config: EngineConfig,
    candidates: CandidateList,
    word: String,
    language: String,
) -> Result<(Artwork, String), FallbackFailure> {
    let outcome = run_fallback_with_attempts(
        &candidates,
        &config,
        config.image_attempts_per_model,
        |candidate| {
            let model = candidate.model.clone();
            let prompt = prompt::image_prompt(&word, &language);
            let image = Arc::clone(&image);
            async move {
                let payload = image.generate_image(&model, &prompt).await?;
                artwork_from_payload(payload).ok_or_else(|| {
                    ProviderFailure::EmptyPayload("no usable image in response".to_string())
                })
            }
        },
    )
    .await;

    match outcome {
        GenerationOutcome::Success { value, used_model } => Ok((value, used_model)),
        GenerationOutcome::Failure(failure) => Err(failure),
    }
}

/// Background hydration for one run token: fetch every image, merge each
/// one as it lands, and drop whatever the token check rejects.
async fn hydrate_in_background<G: ImageGenerator + 'static>(
    image: Arc<G>,
    hydration: Arc<HydrationState>,
    token: HydrationRun,
    words: Vec<String>,
    language: String,
    candidates: CandidateList,
    config: EngineConfig,
) {
    let budget = config.image_worker_budget(candidates.leading_provider());
    let results = run_indexed(&words, budget, |_, word| {
        word_image(
            Arc::clone(&image),
            config.clone(),
            candidates.clone(),
            word.clone(),
            language.clone(),
        )
    })
    .await;

    let mut hydrated = 0usize;
    let mut stale = 0usize;
    let mut failed = 0usize;
    for (word, result) in words.iter().zip(results) {
        match result {
            Ok((artwork, _model)) => {
                if hydration.apply(token, word, &artwork).await > 0 {
                    hydrated += 1;
                } else {
                    stale += 1;
                }
            }
            Err(failure) => {
                failed += 1;
                warn!("⚠️ Image for '{}' failed in run {}: {}", word, token, failure.message());
            }
        }
    }
    info!(
        "🖼️ Hydration run {} done: {} merged, {} failed, {} stale",
        token, hydrated, failed, stale
    );
}

fn build_diagnostics(failed: &[(String, FallbackFailure)]) -> ImageDiagnostics {
    let mut attempted_models: Vec<String> = Vec::new();
    for (_, failure) in failed {
        for model in &failure.tried_models {
            if !attempted_models.contains(model) {
                attempted_models.push(model.clone());
            }
        }
    }
    let samples = failed
        .iter()
        .map(|(word, failure)| {
            let sample = format!("{word}: {}", failure.last_failure);
            sample.chars().take(200).collect::<String>()
        })
        .collect();
    ImageDiagnostics {
        failed_words: failed.iter().map(|(word, _)| word.clone()).collect(),
        attempted_models,
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::traits::{MockImageGenerator, MockTextGenerator};
    use crate::types::ImagePayload;

    fn worksheet_json() -> serde_json::Value {
        json!({
            "title": "Rhyme Time",
            "instruction": "Match the rhymes.",
            "pairs": [
                {"sound": "-at", "left": {"word": "cat"}, "right": {"word": "hat"}},
                {"sound": "-og", "left": {"word": "dog"}, "right": {"word": "frog"}},
                {"sound": "-at", "left": {"word": "bat"}, "right": {"word": "cat"}},
            ]
        })
    }

    fn png_payload() -> ImagePayload {
        ImagePayload::Base64 {
            data: "aGVsbG8=".to_string(),
            media_type: "image/png".to_string(),
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            max_advisory_wait: std::time::Duration::from_millis(5),
            max_backoff: std::time::Duration::from_millis(1),
            ..EngineConfig::default()
        }
    }

    fn full_request() -> GenerationRequest {
        GenerationRequest::worksheet("english", PairCount::new(3).unwrap(), "animals")
    }

    #[tokio::test]
    async fn full_generation_fetches_each_unique_word_once() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .times(1)
            .returning(|_, _| Ok(worksheet_json()));

        // five unique words across six slots ("cat" repeats)
        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .times(5)
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let report = engine.generate(full_request()).await.unwrap();

        assert!(!report.deferred);
        assert_eq!(report.run, None);
        assert_eq!(report.text_model, "gemini-2.5-flash");
        assert_eq!(report.image_models, vec!["gemini-2.0-flash-preview-image-generation"]);
        assert!(report.warning.is_none());
        assert_eq!(report.draft.pairs.len(), 3);
        assert!(report.draft.slots().all(|slot| slot.artwork.is_some()));
    }

    #[tokio::test]
    async fn text_fallback_moves_to_the_next_model() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .withf(|model, _| model == "gemini-2.5-flash")
            .times(1)
            .returning(|_, _| {
                Err(ProviderFailure::Http {
                    status: 503,
                    message: "overloaded".to_string(),
                })
            });
        text.expect_generate_text()
            .withf(|model, _| model == "gemini-2.0-flash")
            .times(1)
            .returning(|_, _| Ok(worksheet_json()));

        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let report = engine.generate(full_request()).await.unwrap();
        assert_eq!(report.text_model, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn fatal_text_error_aborts_without_touching_images() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text().times(1).returning(|_, _| {
            Err(ProviderFailure::Http {
                status: 401,
                message: "invalid api key".to_string(),
            })
        });

        let mut image = MockImageGenerator::new();
        image.expect_generate_image().never();

        let engine = WorksheetEngine::new(text, image, test_config());
        let err = engine.generate(full_request()).await.unwrap_err();
        assert!(matches!(err, EngineError::ProviderRejected { .. }));
        assert!(err.to_string().contains("gemini-2.5-flash"));
    }

    #[tokio::test]
    async fn partial_image_failure_degrades_to_a_warning() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .returning(|_, _| Ok(worksheet_json()));

        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .withf(|_, prompt| prompt.contains("\"hat\""))
            .returning(|_, _| {
                Err(ProviderFailure::Http {
                    status: 500,
                    message: "internal".to_string(),
                })
            });
        image
            .expect_generate_image()
            .withf(|_, prompt| !prompt.contains("\"hat\""))
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let report = engine.generate(full_request()).await.unwrap();

        assert!(report.warning.is_some());
        let diagnostics = report.diagnostics.unwrap();
        assert_eq!(diagnostics.failed_words, vec!["hat"]);
        assert!(!diagnostics.attempted_models.is_empty());
        assert_eq!(report.draft.pairs.len(), 3);
        let hat_slot = report
            .draft
            .slots()
            .find(|slot| slot.word == "hat")
            .unwrap()
            .clone();
        assert!(hat_slot.artwork.is_none());
        assert!(report
            .draft
            .slots()
            .filter(|slot| slot.word != "hat")
            .all(|slot| slot.artwork.is_some()));
    }

    #[tokio::test]
    async fn deferred_generation_returns_before_hydration() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .returning(|_, _| Ok(worksheet_json()));

        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .times(5)
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let mut request = full_request();
        request.mode = GenerationMode::DeferredImages;

        let report = engine.generate(request).await.unwrap();
        assert!(report.deferred);
        assert_eq!(report.run, Some(1));
        assert!(report.draft.slots().all(|slot| slot.artwork.is_none()));

        let hydrated = engine.await_hydration().await.unwrap();
        assert!(hydrated.slots().all(|slot| slot.artwork.is_some()));
    }

    #[tokio::test]
    async fn refresh_word_swaps_in_a_rhyming_alternative() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .times(1)
            .returning(|_, _| Ok(json!({"word": "mat"})));

        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .withf(|_, prompt| prompt.contains("\"mat\""))
            .times(1)
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let report = engine
            .refresh_word(GenerationRequest::word_refresh("cat", Some("hat")))
            .await
            .unwrap();

        assert_eq!(report.word, "mat");
        assert_eq!(report.text_model.as_deref(), Some("gemini-2.5-flash"));
        assert!(matches!(report.artwork, Artwork::Bitmap { .. }));
    }

    #[tokio::test]
    async fn refresh_word_keeps_the_original_when_no_alternative_emerges() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .returning(|_, _| Ok(json!({"word": ""})));

        let mut image = MockImageGenerator::new();
        image
            .expect_generate_image()
            .withf(|_, prompt| prompt.contains("\"cat\""))
            .returning(|_, _| Ok(png_payload()));

        let engine = WorksheetEngine::new(text, image, test_config());
        let report = engine
            .refresh_word(GenerationRequest::word_refresh("cat", Some("hat")))
            .await
            .unwrap();

        assert_eq!(report.word, "cat");
        assert_eq!(report.text_model, None);
    }

    #[tokio::test]
    async fn refresh_word_without_a_word_is_invalid() {
        let text = MockTextGenerator::new();
        let image = MockImageGenerator::new();
        let engine = WorksheetEngine::new(text, image, test_config());

        let err = engine
            .refresh_word(GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn refresh_word_reports_no_image_after_exhaustion() {
        let text = MockTextGenerator::new();
        let mut image = MockImageGenerator::new();
        image.expect_generate_image().returning(|_, _| {
            Err(ProviderFailure::Http {
                status: 503,
                message: "overloaded".to_string(),
            })
        });

        let mut config = test_config();
        config.image_models = vec!["gemini-2.0-flash-preview-image-generation".to_string()];
        config.image_attempts_per_model = 1;
        config.word_refresh_attempts = 2;

        let engine = WorksheetEngine::new(text, image, config);
        let err = engine
            .refresh_word(GenerationRequest::word_refresh("cat", None))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NoImageProduced { .. }));
        assert!(err.to_string().contains("gemini-2.0-flash-preview-image-generation"));
    }

    #[tokio::test]
    async fn topic_randomization_returns_a_clean_topic() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .times(1)
            .returning(|_, _| Ok(json!({"topic": "  under the   sea "})));

        let image = MockImageGenerator::new();
        let engine = WorksheetEngine::new(text, image, test_config());
        assert_eq!(engine.randomize_topic().await.unwrap(), "under the sea");
    }

    #[tokio::test]
    async fn execute_dispatches_on_mode() {
        let mut text = MockTextGenerator::new();
        text.expect_generate_text()
            .returning(|_, _| Ok(json!({"topic": "space travel"})));

        let image = MockImageGenerator::new();
        let engine = WorksheetEngine::new(text, image, test_config());

        let request = GenerationRequest {
            mode: GenerationMode::TopicShuffle,
            ..GenerationRequest::default()
        };
        match engine.execute(request).await.unwrap() {
            EngineResponse::Topic { topic } => assert_eq!(topic, "space travel"),
            other => panic!("expected topic response, got {other:?}"),
        }
    }
}
