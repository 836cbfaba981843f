// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Question kinds the scoring engine understands.
/// Anything else stored in the catalog maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Unknown,
}

impl QuestionType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "multiple_choice" => QuestionType::MultipleChoice,
            "true_false" => QuestionType::TrueFalse,
            "short_answer" => QuestionType::ShortAnswer,
            _ => QuestionType::Unknown,
        }
    }

    /// Choice questions are answered by selecting an option.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub question_text: String,

    /// Raw type column; see [`Question::kind`].
    pub question_type: String,

    /// Points for a correct answer.
    pub marks: i32,

    pub order_index: i32,
}

impl Question {
    pub fn kind(&self) -> QuestionType {
        QuestionType::parse(&self.question_type)
    }
}

/// Represents the 'question_options' table (choice questions).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: i64,
    pub question_id: i64,
    pub option_text: String,
    pub is_correct: bool,
    pub order_index: i32,
}

/// Represents the 'correct_answers' table (short-answer questions).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CorrectAnswer {
    pub id: i64,
    pub question_id: i64,
    pub answer_text: String,
    pub is_case_sensitive: bool,
}

/// The correctness data of a question; only the set matching its type.
#[derive(Debug, Clone)]
pub enum AnswerKey {
    Options(Vec<QuestionOption>),
    Accepted(Vec<CorrectAnswer>),
    None,
}

/// A question together with everything needed to score a response to it.
#[derive(Debug, Clone)]
pub struct QuestionDefinition {
    pub question: Question,
    pub key: AnswerKey,
}
