//! Common Types and Constants
//!
//! Shared data structures used across the scheduling and scoring modules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Minimum ease factor SM-2 will ever assign
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor seeded for a concept that has never been reviewed
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Quality at or above which a response counts as a successful recall
pub const SUCCESS_THRESHOLD: i32 = 3;

/// Ease penalty applied per quality point below the success threshold
pub const EASE_PENALTY_STEP: f64 = 0.2;

/// Fraction of the remaining mastery headroom a perfect answer earns
pub const MASTERY_GAIN: f64 = 0.3;

/// Multiplicative damping applied to mastery on a failed recall
pub const MASTERY_DAMPING: f64 = 0.7;

/// Priority boost for prerequisite gaps
pub const PREREQUISITE_BOOST: f64 = 0.3;

/// Priority boost for reinforcement gaps
pub const REINFORCEMENT_BOOST: f64 = 0.2;

/// Mastery assumed when an upstream producer omits or mangles the value
pub const FALLBACK_MASTERY: f64 = 0.5;

// ==================== Mastery Types ====================

/// A learner's scheduling state for one concept.
///
/// Created on first exposure via [`ConceptMasteryState::new`] and mutated
/// exclusively by [`crate::srs::update_mastery`]. The `concept_id` is an
/// opaque foreign reference owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMasteryState {
    pub concept_id: String,
    /// Estimated proficiency in [0, 1]
    pub mastery_level: f64,
    /// Successful reviews in the current streak
    pub repetition_count: u32,
    /// SM-2 ease factor, floored at [`MIN_EASE_FACTOR`]
    pub ease_factor: f64,
    /// Days until the next scheduled review, always >= 1
    pub interval_days: u32,
    pub due_date: NaiveDate,
}

impl ConceptMasteryState {
    /// State for a concept seen for the first time. Due immediately.
    pub fn new(concept_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            concept_id: concept_id.into(),
            mastery_level: 0.0,
            repetition_count: 0,
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 1,
            due_date: today,
        }
    }

    pub fn is_new(&self) -> bool {
        self.repetition_count == 0
    }
}

/// One graded recall event. Consumed by the engine, never stored by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    /// 0 = total failure, 5 = perfect recall
    pub quality: i32,
    pub response_time_ms: Option<i64>,
}

// ==================== Gap Types ====================

/// Closed tag set for diagnosed knowledge gaps. Unknown tags decode to
/// [`GapType::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapType {
    Prerequisite,
    Reinforcement,
    Connection,
    #[serde(other)]
    General,
}

impl Default for GapType {
    fn default() -> Self {
        Self::General
    }
}

impl GapType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "prerequisite" => Self::Prerequisite,
            "reinforcement" => Self::Reinforcement,
            "connection" => Self::Connection,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prerequisite => "prerequisite",
            Self::Reinforcement => "reinforcement",
            Self::Connection => "connection",
            Self::General => "general",
        }
    }
}

/// One diagnosed weakness, scored once and never mutated afterward.
/// Re-analysis produces fresh records rather than updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGap {
    /// Display reference to a concept
    pub concept: String,
    pub gap_type: GapType,
    /// Learner mastery in [0, 1]
    pub user_mastery: f64,
    /// Derived ranking value in [0, 1]
    pub priority_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_uses_sm2_defaults() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let state = ConceptMasteryState::new("c1", today);
        assert_eq!(state.mastery_level, 0.0);
        assert_eq!(state.repetition_count, 0);
        assert_eq!(state.ease_factor, DEFAULT_EASE_FACTOR);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.due_date, today);
        assert!(state.is_new());
    }

    #[test]
    fn gap_type_parses_known_tags() {
        assert_eq!(GapType::parse("prerequisite"), GapType::Prerequisite);
        assert_eq!(GapType::parse(" Reinforcement "), GapType::Reinforcement);
        assert_eq!(GapType::parse("connection"), GapType::Connection);
        assert_eq!(GapType::parse("general"), GapType::General);
    }

    #[test]
    fn gap_type_defaults_unknown_tags_to_general() {
        assert_eq!(GapType::parse(""), GapType::General);
        assert_eq!(GapType::parse("speling"), GapType::General);
    }

    #[test]
    fn gap_type_deserializes_unknown_as_general() {
        let parsed: GapType = serde_json::from_str("\"unheard-of\"").unwrap();
        assert_eq!(parsed, GapType::General);
    }

    #[test]
    fn mastery_state_serde_round_trip() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let state = ConceptMasteryState::new("concept-42", today);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"conceptId\""));
        assert!(json.contains("\"easeFactor\""));
        let back: ConceptMasteryState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
