//! Worksheet generation engine library
//!
//! This library orchestrates text and image model calls into printable
//! rhyming worksheets, with ordered model fallback, bounded image
//! concurrency and deferred background hydration.

pub mod error;
pub mod types;
pub mod traits;
pub mod state;
pub mod core;
pub mod services;

// Re-export main types
pub use error::{EngineError, EngineResult};
pub use types::*;
pub use traits::*;
pub use state::{HydrationRun, HydrationState};
pub use self::core::WorksheetEngine;
pub use services::*;
