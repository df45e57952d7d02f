//! Bounded-concurrency indexed dispatch
//!
//! Runs one job per input item with a shared claim cursor and a small fixed
//! worker pool. Results land in the slot matching their input index, so
//! callers correlate by position, never by completion order. A panicking
//! job costs its own slot and nothing else.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::join_all;
use futures_util::FutureExt;
use tracing::error;

use shared::ProviderFailure;

use crate::types::FallbackFailure;

/// Marker for a job that panicked instead of returning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPanic {
    pub index: usize,
    pub detail: String,
}

impl From<JobPanic> for FallbackFailure {
    fn from(panic: JobPanic) -> Self {
        FallbackFailure {
            tried_models: Vec::new(),
            last_failure: ProviderFailure::EmptyPayload(format!(
                "job {} panicked: {}",
                panic.index, panic.detail
            )),
            fatal: false,
        }
    }
}

/// Run `job` once per item with at most `min(worker_budget, items.len())`
/// jobs in flight. Slot `i` of the output always belongs to `items[i]`;
/// individual failures (panics included) never abort the batch.
pub async fn run_indexed<I, S, F, Job, Fut>(
    items: &[I],
    worker_budget: usize,
    job: Job,
) -> Vec<Result<S, F>>
where
    F: From<JobPanic>,
    Job: Fn(usize, &I) -> Fut,
    Fut: std::future::Future<Output = Result<S, F>>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let workers = worker_budget.max(1).min(total);
    let cursor = AtomicUsize::new(0);
    let job = &job;
    let cursor_ref = &cursor;

    let worker_futures = (0..workers).map(|_| async move {
        let mut claimed: Vec<(usize, Result<S, F>)> = Vec::new();
        loop {
            let index = cursor_ref.fetch_add(1, Ordering::SeqCst);
            if index >= total {
                break;
            }
            let outcome = AssertUnwindSafe(job(index, &items[index])).catch_unwind().await;
            let result = match outcome {
                Ok(result) => result,
                Err(panic) => {
                    let detail = panic_detail(panic.as_ref());
                    error!("💥 Job {index} panicked: {detail}");
                    Err(F::from(JobPanic { index, detail }))
                }
            };
            claimed.push((index, result));
        }
        claimed
    });

    let mut slots: Vec<Option<Result<S, F>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    for claimed in join_all(worker_futures).await {
        for (index, result) in claimed {
            slots[index] = Some(result);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(F::from(JobPanic {
                    index,
                    detail: "job produced no result".to_string(),
                }))
            })
        })
        .collect()
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq)]
    struct TestError(String);

    impl From<JobPanic> for TestError {
        fn from(panic: JobPanic) -> Self {
            TestError(format!("panic at {}: {}", panic.index, panic.detail))
        }
    }

    #[tokio::test]
    async fn one_failing_job_costs_exactly_its_slot() {
        let items: Vec<usize> = (0..10).collect();
        let results: Vec<Result<usize, TestError>> = run_indexed(&items, 3, |index, item| {
            let item = *item;
            async move {
                // uneven finish order so slot identity is actually exercised
                tokio::time::sleep(Duration::from_millis((item * 7 % 5) as u64)).await;
                if index == 4 {
                    Err(TestError("job 4 always fails".to_string()))
                } else {
                    Ok(item * 10)
                }
            }
        })
        .await;

        assert_eq!(results.len(), 10);
        for (index, result) in results.iter().enumerate() {
            if index == 4 {
                assert_eq!(result, &Err(TestError("job 4 always fails".to_string())));
            } else {
                assert_eq!(result, &Ok(index * 10));
            }
        }
    }

    #[tokio::test]
    async fn concurrency_stays_within_budget() {
        let items: Vec<usize> = (0..12).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results: Vec<Result<(), TestError>> = run_indexed(&items, 3, |_, _| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            let in_flight = &in_flight;
            async move {
                tokio::time::sleep(Duration::from_millis(3)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3, "peak was {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panicking_job_is_contained() {
        let items: Vec<usize> = (0..5).collect();
        let results: Vec<Result<usize, TestError>> = run_indexed(&items, 2, |index, item| {
            let item = *item;
            async move {
                if index == 2 {
                    panic!("boom");
                }
                Ok(item)
            }
        })
        .await;

        assert_eq!(results.len(), 5);
        for (index, result) in results.iter().enumerate() {
            if index == 2 {
                let err = result.as_ref().unwrap_err();
                assert!(err.0.contains("boom"), "got {err:?}");
            } else {
                assert_eq!(result, &Ok(index));
            }
        }
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let items: Vec<usize> = Vec::new();
        let results: Vec<Result<usize, TestError>> = run_indexed(&items, 3, |_, item| {
            let item = *item;
            async move { Ok(item) }
        })
        .await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn budget_larger_than_batch_is_fine() {
        let items = vec!["a".to_string(), "b".to_string()];
        let results: Vec<Result<String, TestError>> = run_indexed(&items, 16, |_, item| {
            let item = item.clone();
            async move { Ok(item.to_uppercase()) }
        })
        .await;
        assert_eq!(results, vec![Ok("A".to_string()), Ok("B".to_string())]);
    }
}
