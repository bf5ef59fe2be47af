//! Knowledge-Gap Priority Scoring
//!
//! Assigns a bounded priority to each diagnosed gap so the weakest, most
//! structurally important concepts surface first for remediation.

use crate::sanitize::clamp_unit_or;
use crate::types::{
    GapType, KnowledgeGap, FALLBACK_MASTERY, PREREQUISITE_BOOST, REINFORCEMENT_BOOST,
};

/// Priority for a gap of the given type at the given mastery.
///
/// Base score is `1 - mastery` (weaker concepts rank higher), boosted by
/// gap type and capped at 1.0. Out-of-range or non-finite mastery values
/// fall back to [`FALLBACK_MASTERY`] before scoring, so upstream noise can
/// never produce an out-of-range priority.
pub fn score_priority(gap_type: GapType, user_mastery: f64) -> f64 {
    let mastery = clamp_unit_or(user_mastery, FALLBACK_MASTERY);
    let base = 1.0 - mastery;
    let boost = match gap_type {
        GapType::Prerequisite => PREREQUISITE_BOOST,
        GapType::Reinforcement => REINFORCEMENT_BOOST,
        GapType::Connection | GapType::General => 0.0,
    };
    (base + boost).min(1.0)
}

/// Build a scored [`KnowledgeGap`] from raw candidate fields as an upstream
/// analysis producer emits them. Missing type defaults to general, missing
/// or invalid mastery to [`FALLBACK_MASTERY`].
pub fn score_gap(
    concept: impl Into<String>,
    gap_type: Option<GapType>,
    user_mastery: Option<f64>,
) -> KnowledgeGap {
    let gap_type = gap_type.unwrap_or_default();
    let user_mastery = clamp_unit_or(user_mastery.unwrap_or(FALLBACK_MASTERY), FALLBACK_MASTERY);
    KnowledgeGap {
        concept: concept.into(),
        gap_type,
        user_mastery,
        priority_score: score_priority(gap_type, user_mastery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerequisite_at_low_mastery_saturates() {
        let score = score_priority(GapType::Prerequisite, 0.2);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn general_at_high_mastery_scores_low() {
        let score = score_priority(GapType::General, 0.9);
        assert!((score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn boost_ordering_at_equal_mastery() {
        let mastery = 0.6;
        let prerequisite = score_priority(GapType::Prerequisite, mastery);
        let reinforcement = score_priority(GapType::Reinforcement, mastery);
        let connection = score_priority(GapType::Connection, mastery);
        let general = score_priority(GapType::General, mastery);
        assert!(prerequisite >= reinforcement);
        assert!(reinforcement >= connection);
        assert!((connection - general).abs() < 1e-9);
    }

    #[test]
    fn monotone_non_increasing_in_mastery() {
        for gap_type in [
            GapType::Prerequisite,
            GapType::Reinforcement,
            GapType::Connection,
            GapType::General,
        ] {
            let mut previous = score_priority(gap_type, 0.0);
            for step in 1..=100 {
                let mastery = f64::from(step) / 100.0;
                let score = score_priority(gap_type, mastery);
                assert!(score <= previous + 1e-12, "{gap_type:?} at {mastery}");
                previous = score;
            }
        }
    }

    #[test]
    fn out_of_range_mastery_is_clamped() {
        assert!((score_priority(GapType::General, -5.0) - 1.0).abs() < 1e-9);
        assert!((score_priority(GapType::General, 42.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_mastery_falls_back_to_midpoint() {
        let score = score_priority(GapType::General, f64::NAN);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn score_gap_defaults_missing_fields() {
        let gap = score_gap("derivatives", None, None);
        assert_eq!(gap.gap_type, GapType::General);
        assert!((gap.user_mastery - FALLBACK_MASTERY).abs() < 1e-9);
        assert!((gap.priority_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn score_is_always_bounded() {
        for gap_type in [GapType::Prerequisite, GapType::Reinforcement] {
            for step in -20..=120 {
                let mastery = f64::from(step) / 100.0;
                let score = score_priority(gap_type, mastery);
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }
}
