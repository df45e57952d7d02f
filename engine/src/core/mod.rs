//! Engine core business logic

pub mod classify;
pub mod dispatch;
pub mod engine;
pub mod fallback;
pub mod normalize;
pub mod prompt;
pub mod sanitize;
pub mod svg;

pub use classify::{classify_provider_error, disposition_of, retry_after_hint, Disposition};
pub use dispatch::run_indexed;
pub use engine::WorksheetEngine;
pub use fallback::{run_fallback, run_fallback_with_attempts};
pub use normalize::normalize_worksheet;
pub use sanitize::{artwork_from_payload, clean_label, clean_text, clean_word};
pub use svg::sanitize_vector_markup;
