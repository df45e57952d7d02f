//! Hydration run state
//!
//! Deferred generation hands image work to a background task, and a newer
//! request must win over whatever is still in flight. Every generation
//! attempt mints a monotonically increasing run token; a completion whose
//! token is no longer current is discarded without touching the draft.
//! There is no abort signal, stale work simply lands nowhere.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use shared::{Artwork, WorksheetDraft};

/// Token identifying one generation attempt's hydration run
pub type HydrationRun = u64;

#[derive(Debug, Default)]
pub struct HydrationState {
    run: AtomicU64,
    draft: RwLock<Option<WorksheetDraft>>,
}

impl HydrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next run token and install the draft it will hydrate.
    /// Implicitly invalidates any in-flight hydration of an earlier run.
    /// Mint and install happen under one write guard so concurrent calls
    /// cannot interleave and leave the counter pointing at the other
    /// call's draft.
    pub async fn begin_run(&self, draft: WorksheetDraft) -> HydrationRun {
        let mut guard = self.draft.write().await;
        let token = self.run.fetch_add(1, Ordering::SeqCst) + 1;
        *guard = Some(draft);
        token
    }

    pub fn current_run(&self) -> HydrationRun {
        self.run.load(Ordering::SeqCst)
    }

    /// Merge one word's artwork into the draft, provided `token` is still
    /// current. Returns the number of slots updated; 0 means the result was
    /// stale and dropped. The token is re-checked under the write lock, the
    /// run may have been superseded while this task waited for it.
    pub async fn apply(&self, token: HydrationRun, word: &str, artwork: &Artwork) -> usize {
        if self.current_run() != token {
            return 0;
        }
        let mut guard = self.draft.write().await;
        if self.current_run() != token {
            return 0;
        }
        match guard.as_mut() {
            Some(draft) => draft.set_artwork(word, artwork),
            None => 0,
        }
    }

    /// Latest merged draft, if any generation has run.
    pub async fn snapshot(&self) -> Option<WorksheetDraft> {
        self.draft.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use shared::{RhymePair, WordIllustration};

    fn draft(words: &[(&str, &str)]) -> WorksheetDraft {
        WorksheetDraft {
            title: "t".to_string(),
            instruction: "i".to_string(),
            language: "english".to_string(),
            pairs: words
                .iter()
                .map(|(left, right)| RhymePair {
                    sound: String::new(),
                    left: WordIllustration::bare(left),
                    right: WordIllustration::bare(right),
                })
                .collect(),
        }
    }

    fn art(reference: &str) -> Artwork {
        Artwork::Bitmap {
            reference: reference.to_string(),
            media_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn tokens_increase_and_apply_targets_the_current_draft() {
        let state = HydrationState::new();
        assert_eq!(state.current_run(), 0);

        let token = state.begin_run(draft(&[("cat", "hat")])).await;
        assert_eq!(token, 1);
        assert_eq!(state.apply(token, "cat", &art("https://x.test/cat.png")).await, 1);

        let snapshot = state.snapshot().await.unwrap();
        assert!(snapshot.pairs[0].left.artwork.is_some());
        assert!(snapshot.pairs[0].right.artwork.is_none());
    }

    #[tokio::test]
    async fn stale_token_never_mutates_a_newer_draft() {
        let state = HydrationState::new();
        let first = state.begin_run(draft(&[("cat", "hat")])).await;
        let second = state.begin_run(draft(&[("dog", "frog")])).await;
        assert!(second > first);

        // the old run's image arrives late
        assert_eq!(state.apply(first, "cat", &art("https://x.test/cat.png")).await, 0);
        let snapshot = state.snapshot().await.unwrap();
        assert!(snapshot.slots().all(|slot| slot.artwork.is_none()));

        // the current run still lands
        assert_eq!(state.apply(second, "dog", &art("https://x.test/dog.png")).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_begin_runs_keep_token_and_draft_in_step() {
        // two racing begin_run calls: whichever mints the higher token must
        // be the one whose draft is installed
        for _ in 0..200 {
            let state = Arc::new(HydrationState::new());
            let a = {
                let state = Arc::clone(&state);
                tokio::spawn(async move { state.begin_run(draft(&[("cat", "hat")])).await })
            };
            let b = {
                let state = Arc::clone(&state);
                tokio::spawn(async move { state.begin_run(draft(&[("dog", "frog")])).await })
            };
            let token_a = a.await.unwrap();
            let token_b = b.await.unwrap();
            assert_ne!(token_a, token_b);

            let winner = if token_a > token_b { "cat" } else { "dog" };
            let snapshot = state.snapshot().await.unwrap();
            assert_eq!(snapshot.pairs[0].left.word, winner);
            assert_eq!(state.current_run(), token_a.max(token_b));
        }
    }

    #[tokio::test]
    async fn duplicate_words_hydrate_every_slot_at_once() {
        let state = HydrationState::new();
        let token = state.begin_run(draft(&[("cat", "hat"), ("bat", "cat")])).await;
        assert_eq!(state.apply(token, "cat", &art("https://x.test/cat.png")).await, 2);
    }
}
