// src/services/result.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        result::{Grade, NewResult, TestResult, TestStatistics},
        session::{SessionStatus, TestSession, UserAnswer},
        test::Test,
    },
    services::Page,
    store::Stores,
};

/// Aggregates a finished session into its final result.
#[derive(Clone)]
pub struct ResultService {
    stores: Stores,
}

impl ResultService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Computes and stores the result of a submitted session, at most once.
    ///
    /// A session that already has a result gets it back unchanged.
    pub async fn calculate_result(&self, session_id: i64) -> Result<TestResult, AppError> {
        if let Some(existing) = self.stores.results.get_result_by_session(session_id).await? {
            return Ok(existing);
        }

        let session = self
            .stores
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

        if session.status != SessionStatus::Submitted {
            return Err(AppError::InvalidState(
                "Session has not been submitted".to_string(),
            ));
        }

        let test = self
            .stores
            .catalog
            .get_test(session.test_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test {} not found", session.test_id)))?;

        let questions = self
            .stores
            .catalog
            .list_questions_by_test(session.test_id)
            .await?;
        let answers = self.stores.answers.list_answers_by_session(session_id).await?;

        let new = summarize(&test, &session, questions.len(), &answers, Utc::now());
        let result = self.stores.results.create_result(new).await?;

        tracing::info!(
            session_id,
            test_id = result.test_id,
            marks_obtained = result.marks_obtained,
            grade = %result.grade,
            time_taken = %result.time_taken_display(),
            "Result calculated"
        );

        Ok(result)
    }

    pub async fn get_result(&self, result_id: i64) -> Result<TestResult, AppError> {
        self.stores
            .results
            .get_result(result_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Result not found".to_string()))
    }

    pub async fn get_result_by_session(&self, session_id: i64) -> Result<TestResult, AppError> {
        self.stores
            .results
            .get_result_by_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Result not found".to_string()))
    }

    /// Latest result of the user for the test.
    pub async fn get_result_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<TestResult, AppError> {
        self.stores
            .results
            .get_result_by_user_and_test(user_id, test_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Result not found".to_string()))
    }

    pub async fn get_user_results(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<TestResult>, AppError> {
        self.stores
            .results
            .list_results_by_user(user_id, page.limit, page.offset)
            .await
    }

    pub async fn get_test_results(
        &self,
        test_id: i64,
        page: Page,
    ) -> Result<Vec<TestResult>, AppError> {
        self.stores
            .results
            .list_results_by_test(test_id, page.limit, page.offset)
            .await
    }

    pub async fn get_test_statistics(&self, test_id: i64) -> Result<TestStatistics, AppError> {
        self.stores.results.test_statistics(test_id).await
    }
}

/// Builds the result row for a session from its answers.
fn summarize(
    test: &Test,
    session: &TestSession,
    total_questions: usize,
    answers: &[UserAnswer],
    completed_at: DateTime<Utc>,
) -> NewResult {
    let correct_answers = answers
        .iter()
        .filter(|a| a.is_correct == Some(true))
        .count();
    let marks_obtained: i32 = answers.iter().map(|a| a.marks_awarded).sum();
    let percentage = percentage(marks_obtained, test.total_marks);

    NewResult {
        session_id: session.id,
        test_id: session.test_id,
        user_id: session.user_id,
        total_questions: count_i32(total_questions),
        answered_questions: count_i32(answers.len()),
        correct_answers: count_i32(correct_answers),
        total_marks: test.total_marks,
        marks_obtained,
        percentage,
        grade: Grade::from_percentage(percentage),
        is_passed: marks_obtained >= test.passing_marks,
        time_taken: time_taken(session),
        completed_at,
    }
}

fn percentage(marks_obtained: i32, total_marks: i32) -> f64 {
    if total_marks <= 0 {
        return 0.0;
    }
    f64::from(marks_obtained) / f64::from(total_marks) * 100.0
}

/// Whole seconds from first answer to submission.
fn time_taken(session: &TestSession) -> Option<i32> {
    let started = session.started_at?;
    let submitted = session.submitted_at?;
    i32::try_from((submitted - started).num_seconds().max(0)).ok()
}

fn count_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
