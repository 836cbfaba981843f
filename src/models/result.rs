// src/models/result.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Letter grade derived from a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    APlus,
    A,
    BPlus,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Fixed breakpoints, inclusive lower bounds.
    pub fn from_percentage(percentage: f64) -> Self {
        match percentage {
            p if p >= 90.0 => Grade::APlus,
            p if p >= 80.0 => Grade::A,
            p if p >= 70.0 => Grade::BPlus,
            p if p >= 60.0 => Grade::B,
            p if p >= 50.0 => Grade::C,
            p if p >= 40.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the 'test_results' table. Exactly one row per session.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TestResult {
    pub id: i64,
    pub session_id: i64,
    pub test_id: i64,
    pub user_id: i64,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub total_marks: i32,
    pub marks_obtained: i32,
    pub percentage: f64,
    pub grade: String,
    pub is_passed: bool,

    /// Seconds between first answer and submission, if both are known.
    pub time_taken: Option<i32>,

    pub completed_at: DateTime<Utc>,
}

impl TestResult {
    /// Renders `time_taken` as e.g. `1h 30m 45s`.
    pub fn time_taken_display(&self) -> String {
        let Some(total) = self.time_taken else {
            return "N/A".to_string();
        };

        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if hours > 0 {
            format!("{hours}h {minutes}m {seconds}s")
        } else if minutes > 0 {
            format!("{minutes}m {seconds}s")
        } else {
            format!("{seconds}s")
        }
    }
}

/// Insert payload for a computed result.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub session_id: i64,
    pub test_id: i64,
    pub user_id: i64,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub total_marks: i32,
    pub marks_obtained: i32,
    pub percentage: f64,
    pub grade: Grade,
    pub is_passed: bool,
    pub time_taken: Option<i32>,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate view over all results of one test. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStatistics {
    pub test_id: i64,
    pub total_attempts: i64,
    pub passed_attempts: i64,
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,

    /// Rounded to whole seconds; `None` when no result has a time taken.
    pub average_time_taken: Option<i64>,
}

impl TestStatistics {
    pub fn empty(test_id: i64) -> Self {
        Self {
            test_id,
            total_attempts: 0,
            passed_attempts: 0,
            average_score: 0.0,
            highest_score: 0.0,
            lowest_score: 0.0,
            average_time_taken: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(Grade::from_percentage(100.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(90.0), Grade::APlus);
        assert_eq!(Grade::from_percentage(89.99), Grade::A);
        assert_eq!(Grade::from_percentage(80.0), Grade::A);
        assert_eq!(Grade::from_percentage(70.0), Grade::BPlus);
        assert_eq!(Grade::from_percentage(60.0), Grade::B);
        assert_eq!(Grade::from_percentage(50.0), Grade::C);
        assert_eq!(Grade::from_percentage(40.0), Grade::D);
        assert_eq!(Grade::from_percentage(39.99), Grade::F);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
    }

    #[test]
    fn test_grade_strings() {
        assert_eq!(Grade::APlus.to_string(), "A+");
        assert_eq!(Grade::BPlus.as_str(), "B+");
        assert_eq!(Grade::F.as_str(), "F");
    }

    #[test]
    fn test_time_taken_display() {
        let mut result = TestResult {
            id: 1,
            session_id: 1,
            test_id: 1,
            user_id: 1,
            total_questions: 1,
            answered_questions: 1,
            correct_answers: 1,
            total_marks: 1,
            marks_obtained: 1,
            percentage: 100.0,
            grade: "A+".to_string(),
            is_passed: true,
            time_taken: None,
            completed_at: Utc::now(),
        };
        assert_eq!(result.time_taken_display(), "N/A");

        result.time_taken = Some(42);
        assert_eq!(result.time_taken_display(), "42s");

        result.time_taken = Some(303);
        assert_eq!(result.time_taken_display(), "5m 3s");

        result.time_taken = Some(5445);
        assert_eq!(result.time_taken_display(), "1h 30m 45s");
    }
}
