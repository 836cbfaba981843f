// src/services/scoring.rs

use crate::models::question::{AnswerKey, CorrectAnswer, QuestionDefinition, QuestionOption, QuestionType};

/// Outcome of scoring one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub is_correct: bool,
    pub marks_awarded: i32,
}

impl Score {
    const WRONG: Score = Score {
        is_correct: false,
        marks_awarded: 0,
    };

    fn full(marks: i32) -> Self {
        Score {
            is_correct: true,
            marks_awarded: marks.max(0),
        }
    }
}

/// Scores a response against the question's correctness data.
///
/// All-or-nothing: a correct response earns the question's full marks.
/// Unknown question types, and keys that do not match the type, score zero.
pub fn score_answer(
    definition: &QuestionDefinition,
    answer_text: Option<&str>,
    selected_option_id: Option<i64>,
) -> Score {
    let marks = definition.question.marks;

    match (definition.question.kind(), &definition.key) {
        (QuestionType::MultipleChoice | QuestionType::TrueFalse, AnswerKey::Options(options)) => {
            if is_correct_choice(options, selected_option_id) {
                Score::full(marks)
            } else {
                Score::WRONG
            }
        }
        (QuestionType::ShortAnswer, AnswerKey::Accepted(accepted)) => {
            if is_accepted_text(accepted, answer_text) {
                Score::full(marks)
            } else {
                Score::WRONG
            }
        }
        _ => Score::WRONG,
    }
}

fn is_correct_choice(options: &[QuestionOption], selected_option_id: Option<i64>) -> bool {
    let Some(selected) = selected_option_id else {
        return false;
    };
    options.iter().any(|o| o.id == selected && o.is_correct)
}

fn is_accepted_text(accepted: &[CorrectAnswer], answer_text: Option<&str>) -> bool {
    let submitted = match answer_text.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return false,
    };

    accepted.iter().any(|expected| {
        let expected_text = expected.answer_text.trim();
        if expected.is_case_sensitive {
            submitted == expected_text
        } else {
            submitted.to_lowercase() == expected_text.to_lowercase()
        }
    })
}
