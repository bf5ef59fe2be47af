//! # notewise-algo - study review scheduling core
//!
//! Pure-Rust algorithms behind notewise's flashcard reviews and gap
//! reports:
//!
//! - **SM-2 scheduling** - per-concept mastery updates and review-interval
//!   growth from graded recall quality
//! - **Gap priority scoring** - bounded ranking of diagnosed knowledge gaps
//!
//! The crate performs no IO and keeps no hidden state. Every function is a
//! total, deterministic mapping from inputs to outputs, so callers may run
//! one call per concept or per gap concurrently without coordination;
//! serializing writes to a given concept's persisted state is the calling
//! service's job.
//!
//! ## Modules
//!
//! - [`srs`] - SM-2 mastery update engine (state transition, interval
//!   ladder, ease-factor bounds)
//! - [`gaps`] - knowledge-gap priority scorer
//! - [`sanitize`] - numeric guards for noisy upstream input
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use notewise_algo::{score_priority, update_mastery, GapType};
//!
//! // First exposure, perfect recall
//! let state = update_mastery(None, "concept-1", 5);
//! assert_eq!(state.repetition_count, 1);
//!
//! // Rank a diagnosed gap
//! let priority = score_priority(GapType::Prerequisite, 0.2);
//! assert_eq!(priority, 1.0);
//! ```

pub mod gaps;
pub mod sanitize;
pub mod srs;
pub mod types;

pub use gaps::{score_gap, score_priority};
pub use srs::{preview_intervals, update_mastery, update_mastery_at};
pub use types::*;
