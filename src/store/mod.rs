//! Storage seams.
//!
//! The services only see these traits. `PgStore` backs them with Postgres,
//! `MemoryStore` with process memory for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        question::{CorrectAnswer, Question, QuestionOption},
        result::{NewResult, TestResult, TestStatistics},
        session::{NewAnswer, NewSession, TestSession, UserAnswer},
        test::Test,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to authored tests and questions.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_test(&self, id: i64) -> Result<Option<Test>, AppError>;

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError>;

    /// Questions of a test ordered by `order_index`.
    async fn list_questions_by_test(&self, test_id: i64) -> Result<Vec<Question>, AppError>;

    async fn list_options(&self, question_id: i64) -> Result<Vec<QuestionOption>, AppError>;

    async fn list_correct_answers(&self, question_id: i64)
    -> Result<Vec<CorrectAnswer>, AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session.
    ///
    /// Returns `None` when the store refused the row because (user, test)
    /// already has a `not_started` or `in_progress` session.
    async fn create_session(&self, new: NewSession) -> Result<Option<TestSession>, AppError>;

    async fn get_session(&self, id: i64) -> Result<Option<TestSession>, AppError>;

    async fn get_session_by_token(&self, token: &str) -> Result<Option<TestSession>, AppError>;

    /// Most recently created session of the user for the test.
    async fn get_session_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestSession>, AppError>;

    /// Persists status, timestamps, remaining time and bookmark.
    async fn update_session(&self, session: &TestSession) -> Result<(), AppError>;

    /// `not_started` → `in_progress`. Returns `false` if the stored status
    /// was anything else.
    async fn mark_started(&self, id: i64, started_at: DateTime<Utc>) -> Result<bool, AppError>;

    /// `not_started` / `in_progress` → `expired`. Returns `false` if the
    /// stored session was already terminal.
    async fn mark_expired(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Any status but `submitted` → `submitted`. Returns the stored row, or
    /// `None` if it had already been submitted.
    async fn mark_submitted(
        &self,
        id: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<TestSession>, AppError>;

    /// Moves the bookmark of an unexpired `in_progress` session. Returns
    /// `false` if the session was in any other state.
    async fn set_progress(
        &self,
        id: i64,
        current_question_index: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    async fn delete_session(&self, id: i64) -> Result<(), AppError>;

    /// Newest first.
    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestSession>, AppError>;

    /// Non-terminal sessions of a test, newest first.
    async fn list_active_sessions_by_test(&self, test_id: i64)
    -> Result<Vec<TestSession>, AppError>;

    /// Marks every non-terminal session with `expires_at < now` as expired.
    async fn expire_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Inserts an answer. A row already stored for the same
    /// (session, question) is overwritten and returned instead.
    async fn create_answer(&self, new: NewAnswer) -> Result<UserAnswer, AppError>;

    async fn get_answer(&self, id: i64) -> Result<Option<UserAnswer>, AppError>;

    async fn get_answer_by_session_and_question(
        &self,
        session_id: i64,
        question_id: i64,
    ) -> Result<Option<UserAnswer>, AppError>;

    /// Ordered by `answered_at` ascending.
    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<UserAnswer>, AppError>;

    /// Overwrites text, option, correctness and marks.
    async fn update_answer(&self, answer: &UserAnswer) -> Result<(), AppError>;

    async fn delete_answer(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Inserts a result. If the session already has one, the stored row is
    /// returned unchanged.
    async fn create_result(&self, new: NewResult) -> Result<TestResult, AppError>;

    async fn get_result(&self, id: i64) -> Result<Option<TestResult>, AppError>;

    async fn get_result_by_session(&self, session_id: i64)
    -> Result<Option<TestResult>, AppError>;

    /// Latest by completion time.
    async fn get_result_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestResult>, AppError>;

    /// Newest completion first.
    async fn list_results_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError>;

    /// Newest completion first.
    async fn list_results_by_test(
        &self,
        test_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError>;

    async fn update_result(&self, result: &TestResult) -> Result<(), AppError>;

    async fn delete_result(&self, id: i64) -> Result<(), AppError>;

    async fn test_statistics(&self, test_id: i64) -> Result<TestStatistics, AppError>;
}

/// A backend implementing every store trait.
pub trait Store: Catalog + SessionStore + AnswerStore + ResultStore {}

impl<T> Store for T where T: Catalog + SessionStore + AnswerStore + ResultStore {}

/// Handles to each store concern, shared by the services.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn Catalog>,
    pub sessions: Arc<dyn SessionStore>,
    pub answers: Arc<dyn AnswerStore>,
    pub results: Arc<dyn ResultStore>,
}

impl Stores {
    /// Routes every concern to the same backend.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: Store + 'static,
    {
        Self {
            catalog: backend.clone(),
            sessions: backend.clone(),
            answers: backend.clone(),
            results: backend,
        }
    }
}
