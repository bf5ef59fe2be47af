//! SM-2 Spaced Repetition Scheduling
//!
//! Mastery updates and review-interval growth based on graded recall
//! quality, following the SuperMemo 2 policy.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing the answer, remembered
//! - 2: Incorrect, but the answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response with no hesitation
//!
//! A quality below 3 counts as a failed recall: the repetition streak
//! resets, the concept comes back the next day, and both ease factor and
//! mastery drop. Every function here is pure; the caller owns persistence
//! of the returned state.

use chrono::{Duration, NaiveDate, Utc};

use crate::sanitize::{clamp_quality, clamp_unit};
use crate::types::{
    ConceptMasteryState, DEFAULT_EASE_FACTOR, EASE_PENALTY_STEP, MASTERY_DAMPING, MASTERY_GAIN,
    MIN_EASE_FACTOR, SUCCESS_THRESHOLD,
};

/// Apply a graded response to a concept's scheduling state.
///
/// `state` may be `None` for a concept seen for the first time; defaults
/// are synthesized rather than failing. Out-of-range qualities are clamped,
/// so every input maps to a defined output.
pub fn update_mastery(
    state: Option<&ConceptMasteryState>,
    concept_id: &str,
    quality: i32,
) -> ConceptMasteryState {
    update_mastery_at(state, concept_id, quality, Utc::now().date_naive())
}

/// Same as [`update_mastery`] with an injectable calendar date.
pub fn update_mastery_at(
    state: Option<&ConceptMasteryState>,
    concept_id: &str,
    quality: i32,
    today: NaiveDate,
) -> ConceptMasteryState {
    let quality = clamp_quality(quality);

    let (mastery, repetitions, ease, interval) = match state {
        Some(s) => (
            clamp_unit(s.mastery_level),
            s.repetition_count,
            s.ease_factor.max(MIN_EASE_FACTOR),
            s.interval_days.max(1),
        ),
        None => (0.0, 0, DEFAULT_EASE_FACTOR, 1),
    };

    if quality < SUCCESS_THRESHOLD {
        // Failed recall: reset the streak, review again tomorrow. The ease
        // penalty grows with the distance from the success threshold.
        let penalty = EASE_PENALTY_STEP * f64::from(SUCCESS_THRESHOLD - quality);
        return ConceptMasteryState {
            concept_id: concept_id.to_string(),
            mastery_level: clamp_unit(mastery * MASTERY_DAMPING),
            repetition_count: 0,
            ease_factor: (ease - penalty).max(MIN_EASE_FACTOR),
            interval_days: 1,
            due_date: today + Duration::days(1),
        };
    }

    let repetitions = repetitions + 1;

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let miss = f64::from(5 - quality);
    let ease = (ease + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    let interval = match repetitions {
        1 => 1,
        2 => 6,
        _ => ((f64::from(interval)) * ease).round().max(1.0) as u32,
    };

    // Move mastery toward 1 by a share of the remaining headroom that
    // scales with quality. Converges under repeated success, never
    // overshoots.
    let gain = (1.0 - mastery) * (f64::from(quality) / 5.0) * MASTERY_GAIN;

    ConceptMasteryState {
        concept_id: concept_id.to_string(),
        mastery_level: clamp_unit(mastery + gain),
        repetition_count: repetitions,
        ease_factor: ease,
        interval_days: interval,
        due_date: today + Duration::days(i64::from(interval)),
    }
}

/// The interval each quality rating would produce from the given state.
/// Index 0 corresponds to quality 0. Used to show learners what each
/// answer would schedule.
pub fn preview_intervals(state: Option<&ConceptMasteryState>, today: NaiveDate) -> [u32; 6] {
    let mut intervals = [0u32; 6];
    for (quality, slot) in intervals.iter_mut().enumerate() {
        *slot = update_mastery_at(state, "preview", quality as i32, today).interval_days;
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn reviewed_state(repetitions: u32, interval: u32, ease: f64) -> ConceptMasteryState {
        ConceptMasteryState {
            concept_id: "c1".to_string(),
            mastery_level: 0.5,
            repetition_count: repetitions,
            ease_factor: ease,
            interval_days: interval,
            due_date: day(),
        }
    }

    #[test]
    fn first_review_perfect() {
        let next = update_mastery_at(None, "c1", 5, day());
        assert_eq!(next.repetition_count, 1);
        assert_eq!(next.interval_days, 1);
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
        assert!(next.mastery_level > 0.0);
        assert_eq!(next.due_date, day() + Duration::days(1));
    }

    #[test]
    fn second_review_schedules_six_days() {
        let state = reviewed_state(1, 1, 2.6);
        let next = update_mastery_at(Some(&state), "c1", 4, day());
        assert_eq!(next.repetition_count, 2);
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.due_date, day() + Duration::days(6));
    }

    #[test]
    fn later_reviews_multiply_by_ease() {
        let state = reviewed_state(5, 10, 2.5);
        let next = update_mastery_at(Some(&state), "c1", 4, day());
        // ease stays 2.5 at quality 4, 10 * 2.5 = 25
        assert_eq!(next.interval_days, 25);
        assert_eq!(next.repetition_count, 6);
    }

    #[test]
    fn failure_resets_streak_and_interval() {
        let state = reviewed_state(5, 20, 2.0);
        let next = update_mastery_at(Some(&state), "c1", 1, day());
        assert_eq!(next.repetition_count, 0);
        assert_eq!(next.interval_days, 1);
        assert!(next.ease_factor < 2.0);
        assert!(next.ease_factor >= MIN_EASE_FACTOR);
    }

    #[test]
    fn every_failing_quality_resets() {
        for quality in 0..=2 {
            let state = reviewed_state(7, 40, 2.3);
            let next = update_mastery_at(Some(&state), "c1", quality, day());
            assert_eq!(next.repetition_count, 0, "quality {quality}");
            assert_eq!(next.interval_days, 1, "quality {quality}");
        }
    }

    #[test]
    fn every_passing_quality_increments_streak() {
        for quality in 3..=5 {
            let state = reviewed_state(4, 12, 2.2);
            let next = update_mastery_at(Some(&state), "c1", quality, day());
            assert_eq!(next.repetition_count, 5, "quality {quality}");
        }
    }

    #[test]
    fn ease_penalty_scales_with_miss_distance() {
        let state = reviewed_state(3, 10, 2.5);
        let after_two = update_mastery_at(Some(&state), "c1", 2, day());
        let after_zero = update_mastery_at(Some(&state), "c1", 0, day());
        assert!((after_two.ease_factor - 2.3).abs() < 1e-9);
        assert!((after_zero.ease_factor - 1.9).abs() < 1e-9);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let mut state = update_mastery_at(None, "c1", 0, day());
        for _ in 0..200 {
            state = update_mastery_at(Some(&state), "c1", 0, day());
            assert!(state.ease_factor >= MIN_EASE_FACTOR);
        }
    }

    #[test]
    fn mastery_stays_in_unit_range_under_hostile_input() {
        let mut state = update_mastery_at(None, "c1", 99, day());
        assert!(state.mastery_level <= 1.0);
        for quality in [-50, 99, 5, 5, 0, 7, -1] {
            state = update_mastery_at(Some(&state), "c1", quality, day());
            assert!((0.0..=1.0).contains(&state.mastery_level));
            assert!(state.interval_days >= 1);
        }
    }

    #[test]
    fn mastery_converges_without_overshoot() {
        let mut state = update_mastery_at(None, "c1", 5, day());
        let mut previous = state.mastery_level;
        for _ in 0..100 {
            state = update_mastery_at(Some(&state), "c1", 5, day());
            assert!(state.mastery_level >= previous);
            assert!(state.mastery_level <= 1.0);
            previous = state.mastery_level;
        }
        assert!(state.mastery_level > 0.99);
    }

    #[test]
    fn failure_damps_mastery_but_never_negative() {
        let mut state = reviewed_state(3, 10, 2.5);
        state.mastery_level = 0.8;
        let next = update_mastery_at(Some(&state), "c1", 0, day());
        assert!(next.mastery_level < 0.8);
        assert!(next.mastery_level >= 0.0);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let state = reviewed_state(2, 6, 2.4);
        let a = update_mastery_at(Some(&state), "c1", 4, day());
        let b = update_mastery_at(Some(&state), "c1", 4, day());
        assert_eq!(a, b);
    }

    #[test]
    fn preview_covers_all_qualities() {
        let state = reviewed_state(4, 10, 2.5);
        let intervals = preview_intervals(Some(&state), day());
        assert_eq!(intervals[0], 1);
        assert_eq!(intervals[2], 1);
        assert!(intervals[5] >= intervals[3]);
        assert!(intervals[5] > 1);
    }
}
