//! Property-Based Tests for the Scheduling and Gap-Scoring Core
//!
//! Tests the following invariants:
//! - Failed recall always resets: interval 1, repetition streak 0
//! - Successful recall always extends the streak by exactly one
//! - Ease factor never drops below its floor, for any input sequence
//! - Mastery and priority values stay inside [0, 1] under hostile input
//! - The engine is deterministic for a fixed (state, quality, date)
//! - Priority is monotonically non-increasing in mastery per gap type

use chrono::NaiveDate;
use proptest::prelude::*;

use notewise_algo::{
    score_priority, update_mastery_at, ConceptMasteryState, GapType, MIN_EASE_FACTOR,
};
use notewise_backend_rust::services::extraction::GapCandidate;
use notewise_backend_rust::services::gaps::{rank_candidates, MAX_RANKED_GAPS};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..=3650i64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    })
}

fn arb_mastery_state() -> impl Strategy<Value = ConceptMasteryState> {
    (
        "[a-z0-9]{8,16}",     // concept_id
        arb_f64_0_1(),        // mastery_level
        (0u32..=50u32),       // repetition_count
        (1.3f64..=3.0f64),    // ease_factor
        (1u32..=365u32),      // interval_days
        arb_date(),
    )
        .prop_map(
            |(concept_id, mastery_level, repetition_count, ease_factor, interval_days, due_date)| {
                ConceptMasteryState {
                    concept_id,
                    mastery_level,
                    repetition_count,
                    ease_factor,
                    interval_days,
                    due_date,
                }
            },
        )
}

fn arb_gap_type() -> impl Strategy<Value = GapType> {
    prop_oneof![
        Just(GapType::Prerequisite),
        Just(GapType::Reinforcement),
        Just(GapType::Connection),
        Just(GapType::General),
    ]
}

/// Qualities well outside the documented 0..=5 range, to exercise clamping.
fn arb_hostile_quality() -> impl Strategy<Value = i32> {
    (-100i32..=100i32)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// PBT-1: every failing quality resets the streak and schedules tomorrow
    #[test]
    fn failing_quality_resets(state in arb_mastery_state(), quality in 0i32..=2, today in arb_date()) {
        let next = update_mastery_at(Some(&state), &state.concept_id, quality, today);
        prop_assert_eq!(next.repetition_count, 0);
        prop_assert_eq!(next.interval_days, 1);
        prop_assert_eq!(next.due_date, today + chrono::Duration::days(1));
    }

    /// PBT-2: every passing quality extends the streak by exactly one
    #[test]
    fn passing_quality_extends_streak(state in arb_mastery_state(), quality in 3i32..=5, today in arb_date()) {
        let next = update_mastery_at(Some(&state), &state.concept_id, quality, today);
        prop_assert_eq!(next.repetition_count, state.repetition_count + 1);
    }

    /// PBT-3: ease factor holds its floor across arbitrary review sequences
    #[test]
    fn ease_never_below_floor(
        qualities in prop::collection::vec(arb_hostile_quality(), 1..60),
        today in arb_date(),
    ) {
        let mut state: Option<ConceptMasteryState> = None;
        for quality in qualities {
            let next = update_mastery_at(state.as_ref(), "c1", quality, today);
            prop_assert!(next.ease_factor >= MIN_EASE_FACTOR);
            state = Some(next);
        }
    }

    /// PBT-4: mastery and interval stay in range under hostile input
    #[test]
    fn state_bounds_hold_under_hostile_input(
        state in arb_mastery_state(),
        quality in arb_hostile_quality(),
        today in arb_date(),
    ) {
        let next = update_mastery_at(Some(&state), &state.concept_id, quality, today);
        prop_assert!((0.0..=1.0).contains(&next.mastery_level));
        prop_assert!(next.interval_days >= 1);
        prop_assert!(next.due_date > today);
    }

    /// PBT-5: the engine is deterministic for identical input
    #[test]
    fn engine_is_deterministic(
        state in arb_mastery_state(),
        quality in arb_hostile_quality(),
        today in arb_date(),
    ) {
        let a = update_mastery_at(Some(&state), &state.concept_id, quality, today);
        let b = update_mastery_at(Some(&state), &state.concept_id, quality, today);
        prop_assert_eq!(a, b);
    }

    /// PBT-6: priority is monotonically non-increasing in mastery
    #[test]
    fn priority_monotone_in_mastery(
        gap_type in arb_gap_type(),
        lower in arb_f64_0_1(),
        higher in arb_f64_0_1(),
    ) {
        let (lower, higher) = if lower <= higher { (lower, higher) } else { (higher, lower) };
        prop_assert!(score_priority(gap_type, lower) >= score_priority(gap_type, higher) - 1e-12);
    }

    /// PBT-7: priority stays bounded even for non-finite mastery
    #[test]
    fn priority_is_bounded(gap_type in arb_gap_type(), mastery in prop_oneof![
        (-1000.0f64..=1000.0f64),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]) {
        let score = score_priority(gap_type, mastery);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    /// PBT-8: ranked gaps come out sorted, capped, and fully scored
    #[test]
    fn ranked_gaps_sorted_and_capped(
        candidates in prop::collection::vec(
            ("[a-z]{3,12}", proptest::option::of("[a-z]{4,14}"), proptest::option::of(-2.0f64..=3.0f64)),
            0..20,
        )
    ) {
        let candidates: Vec<GapCandidate> = candidates
            .into_iter()
            .map(|(concept, gap_type, user_mastery)| GapCandidate {
                concept,
                gap_type,
                user_mastery,
                description: None,
            })
            .collect();

        let ranked = rank_candidates(candidates);
        prop_assert!(ranked.len() <= MAX_RANKED_GAPS);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].priority_score >= pair[1].priority_score);
        }
        for gap in &ranked {
            prop_assert!((0.0..=1.0).contains(&gap.priority_score));
            prop_assert!((0.0..=1.0).contains(&gap.user_mastery));
        }
    }
}

// ============================================================================
// Additional Unit Tests for Edge Cases
// ============================================================================

#[test]
fn long_failure_run_settles_at_floor() {
    let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let mut state = update_mastery_at(None, "c1", 0, today);
    for _ in 0..500 {
        state = update_mastery_at(Some(&state), "c1", 0, today);
    }
    assert_eq!(state.ease_factor, MIN_EASE_FACTOR);
    assert_eq!(state.interval_days, 1);
    assert_eq!(state.repetition_count, 0);
}

#[test]
fn missing_prior_state_synthesizes_defaults() {
    let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let state = update_mastery_at(None, "fresh", 3, today);
    assert_eq!(state.repetition_count, 1);
    assert_eq!(state.interval_days, 1);
    assert!(state.mastery_level > 0.0);
}
