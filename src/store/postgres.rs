// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        question::{CorrectAnswer, Question, QuestionOption},
        result::{NewResult, TestResult, TestStatistics},
        session::{NewAnswer, NewSession, SessionStatus, TestSession, UserAnswer},
        test::Test,
    },
    store::{AnswerStore, Catalog, ResultStore, SessionStore},
};

const TEST_COLUMNS: &str = "\
    id, title, duration_minutes, total_marks, passing_marks, is_active, start_time, end_time";

const QUESTION_COLUMNS: &str = "id, test_id, question_text, question_type, marks, order_index";

const SESSION_COLUMNS: &str = "\
    id, test_id, user_id, session_token, status, started_at, submitted_at, expires_at, \
    time_remaining, current_question_index, created_at, updated_at";

const ANSWER_COLUMNS: &str = "\
    id, session_id, question_id, answer_text, selected_option_id, is_correct, marks_awarded, \
    answered_at";

const RESULT_COLUMNS: &str = "\
    id, session_id, test_id, user_id, total_questions, answered_questions, correct_answers, \
    total_marks, marks_obtained, percentage, grade, is_passed, time_taken, completed_at";

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Helper row for the statistics aggregate.
#[derive(sqlx::FromRow)]
struct StatisticsRow {
    total_attempts: i64,
    passed_attempts: i64,
    average_score: f64,
    highest_score: f64,
    lowest_score: f64,
    average_time_taken: Option<f64>,
}

#[async_trait]
impl Catalog for PgStore {
    async fn get_test(&self, id: i64) -> Result<Option<Test>, AppError> {
        let test =
            sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(test)
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn list_questions_by_test(&self, test_id: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = $1 ORDER BY order_index ASC, id ASC"
        ))
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn list_options(&self, question_id: i64) -> Result<Vec<QuestionOption>, AppError> {
        let options = sqlx::query_as::<_, QuestionOption>(
            "SELECT id, question_id, option_text, is_correct, order_index \
             FROM question_options WHERE question_id = $1 ORDER BY order_index ASC, id ASC",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }

    async fn list_correct_answers(
        &self,
        question_id: i64,
    ) -> Result<Vec<CorrectAnswer>, AppError> {
        let answers = sqlx::query_as::<_, CorrectAnswer>(
            "SELECT id, question_id, answer_text, is_case_sensitive \
             FROM correct_answers WHERE question_id = $1 ORDER BY id ASC",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, new: NewSession) -> Result<Option<TestSession>, AppError> {
        // ON CONFLICT without a target also covers the partial unique index
        // on open (user_id, test_id) sessions.
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "INSERT INTO test_sessions (
                test_id, user_id, session_token, status, expires_at,
                time_remaining, current_question_index, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $7)
            ON CONFLICT DO NOTHING
            RETURNING {SESSION_COLUMNS}"
        ))
        .bind(new.test_id)
        .bind(new.user_id)
        .bind(&new.session_token)
        .bind(SessionStatus::NotStarted)
        .bind(new.expires_at)
        .bind(new.time_remaining)
        .bind(new.created_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: i64) -> Result<Option<TestSession>, AppError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM test_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<TestSession>, AppError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM test_sessions WHERE session_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestSession>, AppError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM test_sessions \
             WHERE user_id = $1 AND test_id = $2 \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn update_session(&self, session: &TestSession) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE test_sessions
             SET status = $1, started_at = $2, submitted_at = $3, time_remaining = $4,
                 current_question_index = $5, updated_at = $6
             WHERE id = $7",
        )
        .bind(session.status)
        .bind(session.started_at)
        .bind(session.submitted_at)
        .bind(session.time_remaining)
        .bind(session.current_question_index)
        .bind(session.updated_at)
        .bind(session.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_started(&self, id: i64, started_at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE test_sessions
             SET status = 'in_progress', started_at = $1, updated_at = $1
             WHERE id = $2 AND status = 'not_started'",
        )
        .bind(started_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_expired(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE test_sessions
             SET status = 'expired', time_remaining = 0, updated_at = $1
             WHERE id = $2 AND status IN ('not_started', 'in_progress')",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_submitted(
        &self,
        id: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<TestSession>, AppError> {
        let session = sqlx::query_as::<_, TestSession>(&format!(
            "UPDATE test_sessions
             SET status = 'submitted', submitted_at = $1, time_remaining = 0, updated_at = $1
             WHERE id = $2 AND status <> 'submitted'
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(submitted_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn set_progress(
        &self,
        id: i64,
        current_question_index: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE test_sessions
             SET current_question_index = $1, updated_at = $2
             WHERE id = $3 AND status = 'in_progress' AND expires_at >= $2",
        )
        .bind(current_question_index)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_session(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM test_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        let sessions = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM test_sessions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn list_active_sessions_by_test(
        &self,
        test_id: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        let sessions = sqlx::query_as::<_, TestSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM test_sessions \
             WHERE test_id = $1 AND status IN ('not_started', 'in_progress') \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE test_sessions
             SET status = 'expired', time_remaining = 0, updated_at = $1
             WHERE expires_at < $1 AND status IN ('not_started', 'in_progress')",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AnswerStore for PgStore {
    async fn create_answer(&self, new: NewAnswer) -> Result<UserAnswer, AppError> {
        let answer = sqlx::query_as::<_, UserAnswer>(&format!(
            "INSERT INTO user_answers (
                session_id, question_id, answer_text, selected_option_id,
                is_correct, marks_awarded, answered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (session_id, question_id) DO UPDATE SET
                answer_text = EXCLUDED.answer_text,
                selected_option_id = EXCLUDED.selected_option_id,
                is_correct = EXCLUDED.is_correct,
                marks_awarded = EXCLUDED.marks_awarded
            RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(new.session_id)
        .bind(new.question_id)
        .bind(&new.answer_text)
        .bind(new.selected_option_id)
        .bind(new.is_correct)
        .bind(new.marks_awarded)
        .bind(new.answered_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn get_answer(&self, id: i64) -> Result<Option<UserAnswer>, AppError> {
        let answer = sqlx::query_as::<_, UserAnswer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM user_answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn get_answer_by_session_and_question(
        &self,
        session_id: i64,
        question_id: i64,
    ) -> Result<Option<UserAnswer>, AppError> {
        let answer = sqlx::query_as::<_, UserAnswer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM user_answers WHERE session_id = $1 AND question_id = $2"
        ))
        .bind(session_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<UserAnswer>, AppError> {
        let answers = sqlx::query_as::<_, UserAnswer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM user_answers WHERE session_id = $1 \
             ORDER BY answered_at ASC, id ASC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn update_answer(&self, answer: &UserAnswer) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE user_answers
             SET answer_text = $1, selected_option_id = $2, is_correct = $3, marks_awarded = $4
             WHERE id = $5",
        )
        .bind(&answer.answer_text)
        .bind(answer.selected_option_id)
        .bind(answer.is_correct)
        .bind(answer.marks_awarded)
        .bind(answer.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_answer(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_answers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn create_result(&self, new: NewResult) -> Result<TestResult, AppError> {
        let inserted = sqlx::query_as::<_, TestResult>(&format!(
            "INSERT INTO test_results (
                session_id, test_id, user_id, total_questions, answered_questions,
                correct_answers, total_marks, marks_obtained, percentage, grade,
                is_passed, time_taken, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING {RESULT_COLUMNS}"
        ))
        .bind(new.session_id)
        .bind(new.test_id)
        .bind(new.user_id)
        .bind(new.total_questions)
        .bind(new.answered_questions)
        .bind(new.correct_answers)
        .bind(new.total_marks)
        .bind(new.marks_obtained)
        .bind(new.percentage)
        .bind(new.grade.as_str())
        .bind(new.is_passed)
        .bind(new.time_taken)
        .bind(new.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(result) => Ok(result),
            None => self.get_result_by_session(new.session_id).await?.ok_or_else(|| {
                AppError::InternalServerError(format!(
                    "result for session {} vanished after conflicting insert",
                    new.session_id
                ))
            }),
        }
    }

    async fn get_result(&self, id: i64) -> Result<Option<TestResult>, AppError> {
        let result = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM test_results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn get_result_by_session(
        &self,
        session_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        let result = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM test_results WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn get_result_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        let result = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM test_results WHERE user_id = $1 AND test_id = $2 \
             ORDER BY completed_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(result)
    }

    async fn list_results_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        let results = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM test_results WHERE user_id = $1 \
             ORDER BY completed_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }

    async fn list_results_by_test(
        &self,
        test_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        let results = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM test_results WHERE test_id = $1 \
             ORDER BY completed_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(test_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(results)
    }

    async fn update_result(&self, result: &TestResult) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE test_results
             SET total_questions = $1, answered_questions = $2, correct_answers = $3,
                 total_marks = $4, marks_obtained = $5, percentage = $6, grade = $7,
                 is_passed = $8, time_taken = $9
             WHERE id = $10",
        )
        .bind(result.total_questions)
        .bind(result.answered_questions)
        .bind(result.correct_answers)
        .bind(result.total_marks)
        .bind(result.marks_obtained)
        .bind(result.percentage)
        .bind(&result.grade)
        .bind(result.is_passed)
        .bind(result.time_taken)
        .bind(result.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_result(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM test_results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn test_statistics(&self, test_id: i64) -> Result<TestStatistics, AppError> {
        // AVG skips NULL time_taken rows.
        let row = sqlx::query_as::<_, StatisticsRow>(
            "SELECT
                COUNT(*) AS total_attempts,
                COUNT(*) FILTER (WHERE is_passed) AS passed_attempts,
                COALESCE(AVG(percentage), 0)::DOUBLE PRECISION AS average_score,
                COALESCE(MAX(percentage), 0)::DOUBLE PRECISION AS highest_score,
                COALESCE(MIN(percentage), 0)::DOUBLE PRECISION AS lowest_score,
                ROUND(AVG(time_taken))::DOUBLE PRECISION AS average_time_taken
             FROM test_results
             WHERE test_id = $1",
        )
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TestStatistics {
            test_id,
            total_attempts: row.total_attempts,
            passed_attempts: row.passed_attempts,
            average_score: row.average_score,
            highest_score: row.highest_score,
            lowest_score: row.lowest_score,
            average_time_taken: row.average_time_taken.map(|secs| secs as i64),
        })
    }
}
