//! Model fallback resolution
//!
//! Walks an ordered candidate list until one model delivers. Fatal errors
//! abort the walk; retryable ones are recorded and the walk moves on,
//! pausing for the provider's advisory delay (capped) or a short
//! exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use shared::ProviderFailure;

use crate::core::classify::{disposition_of, retry_after_hint, Disposition};
use crate::types::{CandidateList, EngineConfig, FallbackFailure, GenerationOutcome, ModelCandidate};

/// One attempt per candidate, first success wins.
pub async fn run_fallback<T, F, Fut>(
    candidates: &CandidateList,
    config: &EngineConfig,
    mut call: F,
) -> GenerationOutcome<T>
where
    F: FnMut(&ModelCandidate) -> Fut,
    Fut: Future<Output = Result<T, ProviderFailure>>,
{
    run_walk(candidates, config, 1, &mut call).await
}

/// Image flavor: each model gets up to `attempts_per_model` tries before
/// the walk moves to the next candidate. Fatal errors still abort the
/// whole walk.
pub async fn run_fallback_with_attempts<T, F, Fut>(
    candidates: &CandidateList,
    config: &EngineConfig,
    attempts_per_model: u32,
    mut call: F,
) -> GenerationOutcome<T>
where
    F: FnMut(&ModelCandidate) -> Fut,
    Fut: Future<Output = Result<T, ProviderFailure>>,
{
    run_walk(candidates, config, attempts_per_model.max(1), &mut call).await
}

async fn run_walk<T, F, Fut>(
    candidates: &CandidateList,
    config: &EngineConfig,
    attempts_per_model: u32,
    call: &mut F,
) -> GenerationOutcome<T>
where
    F: FnMut(&ModelCandidate) -> Fut,
    Fut: Future<Output = Result<T, ProviderFailure>>,
{
    let mut tried: Vec<String> = Vec::new();
    let mut last_failure: Option<ProviderFailure> = None;
    let mut attempt_index: u32 = 0;

    for candidate in candidates.iter() {
        if !tried.iter().any(|m| m == &candidate.model) {
            tried.push(candidate.model.clone());
        }
        for attempt in 0..attempts_per_model {
            if attempt_index > 0 {
                let pause = backoff_delay(config, last_failure.as_ref(), attempt_index);
                if !pause.is_zero() {
                    debug!("⏳ Backing off {:?} before {}", pause, candidate.model);
                    tokio::time::sleep(pause).await;
                }
            }
            attempt_index += 1;

            match call(candidate).await {
                Ok(value) => {
                    debug!("✅ {} delivered on attempt {}", candidate.model, attempt + 1);
                    return GenerationOutcome::Success {
                        value,
                        used_model: candidate.model.clone(),
                    };
                }
                Err(failure) => {
                    let disposition = disposition_of(&failure);
                    warn!(
                        "⚠️ {} attempt {}/{} failed ({:?}): {}",
                        candidate.model,
                        attempt + 1,
                        attempts_per_model,
                        disposition,
                        failure
                    );
                    if disposition == Disposition::Fatal {
                        return GenerationOutcome::Failure(FallbackFailure {
                            tried_models: tried,
                            last_failure: failure,
                            fatal: true,
                        });
                    }
                    last_failure = Some(failure);
                }
            }
        }
    }

    let last_failure = last_failure
        .unwrap_or_else(|| ProviderFailure::EmptyPayload("no candidate models configured".to_string()));
    GenerationOutcome::Failure(FallbackFailure {
        tried_models: tried,
        last_failure,
        fatal: false,
    })
}

/// Pause before the next attempt: the provider's own suggestion when it
/// gave one, otherwise exponential.
fn backoff_delay(
    config: &EngineConfig,
    last_failure: Option<&ProviderFailure>,
    attempt_index: u32,
) -> Duration {
    if let Some(ProviderFailure::Http { message, .. }) = last_failure {
        if let Some(hint) = retry_after_hint(message) {
            return hint.min(config.max_advisory_wait);
        }
    }
    let exponential = Duration::from_millis(150 * (1u64 << attempt_index.min(4)));
    exponential.min(config.max_backoff)
}
