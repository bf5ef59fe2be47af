//! Practice-question grading.
//!
//! The extraction collaborator judges free-text answers when it can; when
//! its verdict is missing the service degrades to normalized string
//! comparison. The judgment carries which strategy produced it, and maps
//! to the 0-5 recall quality the scheduling engine consumes.

use serde::{Deserialize, Serialize};

/// How a graded answer was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum AnswerJudgment {
    AiDerived { correct: bool, quality: i32 },
    HeuristicFallback { correct: bool, quality: i32 },
}

impl AnswerJudgment {
    pub fn correct(&self) -> bool {
        match self {
            Self::AiDerived { correct, .. } | Self::HeuristicFallback { correct, .. } => *correct,
        }
    }

    pub fn quality(&self) -> i32 {
        match self {
            Self::AiDerived { quality, .. } | Self::HeuristicFallback { quality, .. } => *quality,
        }
    }
}

/// Grade an answer, preferring the collaborator's verdict when present.
pub fn judge_answer(
    expected: &str,
    given: &str,
    ai_correct: Option<bool>,
    response_time_ms: Option<i64>,
) -> AnswerJudgment {
    match ai_correct {
        Some(correct) => AnswerJudgment::AiDerived {
            correct,
            quality: quality_for(correct, response_time_ms),
        },
        None => {
            let correct = normalize_answer(expected) == normalize_answer(given);
            AnswerJudgment::HeuristicFallback {
                correct,
                quality: quality_for(correct, response_time_ms),
            }
        }
    }
}

/// Map correctness and response time onto recall quality: quick correct
/// answers read as effortless recall, slow ones as labored.
fn quality_for(correct: bool, response_time_ms: Option<i64>) -> i32 {
    if !correct {
        return 1;
    }
    match response_time_ms {
        Some(ms) if ms < 2_000 => 5,
        Some(ms) if ms < 5_000 => 4,
        Some(_) => 3,
        None => 4,
    }
}

fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_verdict_wins_over_string_mismatch() {
        let judgment = judge_answer("photosynthesis", "plants making food", Some(true), Some(1500));
        assert_eq!(
            judgment,
            AnswerJudgment::AiDerived {
                correct: true,
                quality: 5
            }
        );
    }

    #[test]
    fn falls_back_to_normalized_comparison() {
        let judgment = judge_answer("  Newton's   Second Law ", "newton's second law", None, None);
        assert_eq!(
            judgment,
            AnswerJudgment::HeuristicFallback {
                correct: true,
                quality: 4
            }
        );
    }

    #[test]
    fn heuristic_mismatch_is_incorrect() {
        let judgment = judge_answer("mitosis", "meiosis", None, Some(900));
        assert!(!judgment.correct());
        assert_eq!(judgment.quality(), 1);
    }

    #[test]
    fn quality_scales_with_response_time() {
        assert_eq!(quality_for(true, Some(800)), 5);
        assert_eq!(quality_for(true, Some(3_000)), 4);
        assert_eq!(quality_for(true, Some(20_000)), 3);
        assert_eq!(quality_for(true, None), 4);
        assert_eq!(quality_for(false, Some(800)), 1);
    }

    #[test]
    fn judgment_serializes_with_strategy_tag() {
        let judgment = judge_answer("a", "b", None, None);
        let json = serde_json::to_string(&judgment).unwrap();
        assert!(json.contains("\"strategy\":\"heuristicFallback\""));
    }
}
