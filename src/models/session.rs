// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::MAX_ANSWER_TEXT_LEN;

/// Lifecycle of a test session.
///
/// `not_started -> in_progress -> submitted`, with `expired` reachable from
/// either non-terminal state once `expires_at` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Submitted,
    Expired,
}

impl SessionStatus {
    /// Statuses that still count as the user's current attempt.
    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::NotStarted | SessionStatus::InProgress)
    }
}

/// Represents the 'test_sessions' table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TestSession {
    pub id: i64,
    pub test_id: i64,
    pub user_id: i64,

    /// Opaque handle used by clients instead of the numeric id.
    pub session_token: String,

    pub status: SessionStatus,

    /// Stamped by the first answer.
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,

    /// Fixed at creation: creation time + test duration.
    pub expires_at: DateTime<Utc>,

    /// Seconds left as of the last time the session was resolved.
    pub time_remaining: Option<i32>,

    /// UI bookmark; never used for scoring.
    pub current_question_index: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// In progress and not past its expiry.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::InProgress && !self.is_expired_at(now)
    }

    /// Whether an answer may still be recorded.
    pub fn accepts_answers_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && !self.is_expired_at(now)
    }

    pub fn remaining_seconds_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.status.is_open() || self.is_expired_at(now) {
            return 0;
        }
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Insert payload for a fresh session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub test_id: i64,
    pub user_id: i64,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub time_remaining: i32,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'user_answers' table. One row per (session, question).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    pub answer_text: Option<String>,
    pub selected_option_id: Option<i64>,
    pub is_correct: Option<bool>,
    pub marks_awarded: i32,
    pub answered_at: DateTime<Utc>,
}

/// Insert payload for an answer.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub session_id: i64,
    pub question_id: i64,
    pub answer_text: Option<String>,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    pub marks_awarded: i32,
    pub answered_at: DateTime<Utc>,
}

/// DTO for starting a session.
#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[validate(range(min = 1))]
    pub test_id: i64,
}

/// DTO for submitting an answer to one question.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(range(min = 1))]
    pub question_id: i64,
    #[validate(length(max = MAX_ANSWER_TEXT_LEN))]
    pub answer_text: Option<String>,
    #[validate(range(min = 1))]
    pub selected_option_id: Option<i64>,
}

/// DTO for moving the UI bookmark.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProgressRequest {
    #[validate(range(min = 0))]
    pub current_question_index: i32,
}

/// Session as sent to clients, with the live remaining time.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: TestSession,
    pub remaining_time: i64,
}

impl SessionResponse {
    pub fn at(session: TestSession, now: DateTime<Utc>) -> Self {
        let remaining_time = session.remaining_seconds_at(now);
        Self {
            session,
            remaining_time,
        }
    }
}
