// tests/common/mod.rs
#![allow(dead_code)]

use std::{sync::Arc, time::Duration as StdDuration};

use async_trait::async_trait;
use cbt_backend::{
    error::AppError,
    models::{
        question::{CorrectAnswer, Question, QuestionOption},
        result::{NewResult, TestResult, TestStatistics},
        session::{NewSession, TestSession},
        test::Test,
    },
    state::AppState,
    store::{Catalog, MemoryStore, ResultStore, SessionStore, Stores},
};
use chrono::{DateTime, Duration, Utc};

pub const PHYSICS: i64 = 1;
pub const CLOSED: i64 = 2;
pub const OTHER: i64 = 3;

pub const Q_CHOICE: i64 = 101;
pub const Q_SHORT: i64 = 102;
pub const Q_FOREIGN: i64 = 301;

pub const OPT_WRONG: i64 = 1011;
pub const OPT_RIGHT: i64 = 1012;

pub fn test_def(id: i64, is_active: bool) -> Test {
    Test {
        id,
        title: format!("Test {id}"),
        duration_minutes: 60,
        total_marks: 10,
        passing_marks: 6,
        is_active,
        start_time: None,
        end_time: None,
    }
}

pub fn question(id: i64, test_id: i64, question_type: &str, marks: i32, order_index: i32) -> Question {
    Question {
        id,
        test_id,
        question_text: format!("Question {id}"),
        question_type: question_type.to_string(),
        marks,
        order_index,
    }
}

/// Physics: a 5-mark choice question and a 5-mark short answer ("Paris",
/// case-insensitive). Test 2 is inactive. Test 3 owns one foreign question.
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.insert_test(test_def(PHYSICS, true)).await;
    store.insert_test(test_def(CLOSED, false)).await;
    store.insert_test(test_def(OTHER, true)).await;

    store
        .insert_question(question(Q_CHOICE, PHYSICS, "multiple_choice", 5, 1))
        .await;
    store
        .insert_question(question(Q_SHORT, PHYSICS, "short_answer", 5, 2))
        .await;
    store
        .insert_question(question(Q_FOREIGN, OTHER, "true_false", 1, 1))
        .await;

    for (id, is_correct) in [(OPT_WRONG, false), (OPT_RIGHT, true)] {
        store
            .insert_option(QuestionOption {
                id,
                question_id: Q_CHOICE,
                option_text: format!("Option {id}"),
                is_correct,
                order_index: 0,
            })
            .await;
    }

    store
        .insert_correct_answer(CorrectAnswer {
            id: 5001,
            question_id: Q_SHORT,
            answer_text: "Paris".to_string(),
            is_case_sensitive: false,
        })
        .await;

    store
}

pub fn state_with(stores: Stores) -> AppState {
    let config = cbt_backend::config::Config::from_lookup(|name| match name {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        _ => None,
    })
    .expect("test config");
    AppState::new(config, stores)
}

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Sessions store that hands out sessions already past their deadline.
pub struct AlreadyExpired(pub Arc<MemoryStore>);

#[async_trait]
impl SessionStore for AlreadyExpired {
    async fn create_session(&self, mut new: NewSession) -> Result<Option<TestSession>, AppError> {
        new.expires_at = Utc::now() - Duration::seconds(1);
        self.0.create_session(new).await
    }

    async fn get_session(&self, id: i64) -> Result<Option<TestSession>, AppError> {
        self.0.get_session(id).await
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<TestSession>, AppError> {
        self.0.get_session_by_token(token).await
    }

    async fn get_session_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestSession>, AppError> {
        self.0.get_session_by_user_and_test(user_id, test_id).await
    }

    async fn update_session(&self, session: &TestSession) -> Result<(), AppError> {
        self.0.update_session(session).await
    }

    async fn mark_started(&self, id: i64, started_at: DateTime<Utc>) -> Result<bool, AppError> {
        self.0.mark_started(id, started_at).await
    }

    async fn mark_expired(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        self.0.mark_expired(id, now).await
    }

    async fn mark_submitted(
        &self,
        id: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<TestSession>, AppError> {
        self.0.mark_submitted(id, submitted_at).await
    }

    async fn set_progress(
        &self,
        id: i64,
        current_question_index: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.0.set_progress(id, current_question_index, now).await
    }

    async fn delete_session(&self, id: i64) -> Result<(), AppError> {
        self.0.delete_session(id).await
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        self.0.list_user_sessions(user_id, limit, offset).await
    }

    async fn list_active_sessions_by_test(
        &self,
        test_id: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        self.0.list_active_sessions_by_test(test_id).await
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        self.0.expire_sessions(now).await
    }
}

/// Results store whose writes always fail.
pub struct BrokenResults(pub Arc<MemoryStore>);

#[async_trait]
impl ResultStore for BrokenResults {
    async fn create_result(&self, _new: NewResult) -> Result<TestResult, AppError> {
        Err(AppError::InternalServerError("disk full".to_string()))
    }

    async fn get_result(&self, id: i64) -> Result<Option<TestResult>, AppError> {
        self.0.get_result(id).await
    }

    async fn get_result_by_session(
        &self,
        session_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        self.0.get_result_by_session(session_id).await
    }

    async fn get_result_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        self.0.get_result_by_user_and_test(user_id, test_id).await
    }

    async fn list_results_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        self.0.list_results_by_user(user_id, limit, offset).await
    }

    async fn list_results_by_test(
        &self,
        test_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        self.0.list_results_by_test(test_id, limit, offset).await
    }

    async fn update_result(&self, result: &TestResult) -> Result<(), AppError> {
        self.0.update_result(result).await
    }

    async fn delete_result(&self, id: i64) -> Result<(), AppError> {
        self.0.delete_result(id).await
    }

    async fn test_statistics(&self, test_id: i64) -> Result<TestStatistics, AppError> {
        self.0.test_statistics(test_id).await
    }
}

/// Catalog whose question lookups take a while.
pub struct SlowCatalog(pub Arc<MemoryStore>, pub StdDuration);

#[async_trait]
impl Catalog for SlowCatalog {
    async fn get_test(&self, id: i64) -> Result<Option<Test>, AppError> {
        self.0.get_test(id).await
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        tokio::time::sleep(self.1).await;
        self.0.get_question(id).await
    }

    async fn list_questions_by_test(&self, test_id: i64) -> Result<Vec<Question>, AppError> {
        self.0.list_questions_by_test(test_id).await
    }

    async fn list_options(&self, question_id: i64) -> Result<Vec<QuestionOption>, AppError> {
        self.0.list_options(question_id).await
    }

    async fn list_correct_answers(
        &self,
        question_id: i64,
    ) -> Result<Vec<CorrectAnswer>, AppError> {
        self.0.list_correct_answers(question_id).await
    }
}
