//! Shared types for the worksheet generation system
//!
//! Contains the vocabulary both sides of the engine boundary speak: the
//! generation request, the worksheet domain model, provider identifiers and
//! raw failure reasons. Engine-internal types (candidate lists, reports)
//! live in the engine crate.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
