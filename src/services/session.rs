// src/services/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        question::{AnswerKey, Question, QuestionDefinition, QuestionType},
        result::TestResult,
        session::{NewAnswer, NewSession, SessionStatus, TestSession, UserAnswer},
    },
    services::{Page, result::ResultService, scoring::score_answer},
    store::Stores,
    utils::token::generate_session_token,
};

/// Outcome of submitting a session.
///
/// The submission itself always succeeded; `result` or `result_error`
/// reports what happened to the follow-up aggregation.
#[derive(Debug, Serialize)]
pub struct SubmittedSession {
    pub session: TestSession,
    pub result: Option<TestResult>,
    pub result_error: Option<String>,
}

/// Drives a student's attempt: start, answer, bookmark, submit.
#[derive(Clone)]
pub struct SessionService {
    stores: Stores,
    results: ResultService,
}

impl SessionService {
    pub fn new(stores: Stores, results: ResultService) -> Self {
        Self { stores, results }
    }

    /// Starts an attempt, or hands back the current one.
    ///
    /// An unexpired, unsubmitted session for (user, test) is returned as-is.
    pub async fn start_session(&self, user_id: i64, test_id: i64) -> Result<TestSession, AppError> {
        let now = Utc::now();

        let test = self
            .stores
            .catalog
            .get_test(test_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test {test_id} not found")))?;

        if !test.is_available_at(now) {
            return Err(AppError::Unavailable("Test is not available".to_string()));
        }

        if let Some(existing) = self
            .stores
            .sessions
            .get_session_by_user_and_test(user_id, test_id)
            .await?
        {
            let existing = self.apply_expiry(existing, now).await?;
            if existing.status.is_open() {
                return Ok(existing);
            }
        }

        let duration = test.duration();
        let new = NewSession {
            test_id,
            user_id,
            session_token: generate_session_token(),
            expires_at: now + duration,
            time_remaining: i32::try_from(duration.num_seconds()).unwrap_or(i32::MAX),
            created_at: now,
        };

        match self.stores.sessions.create_session(new).await? {
            Some(session) => {
                tracing::info!(
                    session_id = session.id,
                    user_id,
                    test_id,
                    expires_at = %session.expires_at,
                    "Session created"
                );
                Ok(session)
            }
            None => {
                // Lost the race against a concurrent start; hand back the winner.
                tracing::debug!(user_id, test_id, "Concurrent start detected, reusing session");
                self.stores
                    .sessions
                    .get_session_by_user_and_test(user_id, test_id)
                    .await?
                    .filter(|s| s.status.is_open())
                    .ok_or_else(|| {
                        AppError::InternalServerError("Failed to create session".to_string())
                    })
            }
        }
    }

    /// Looks a session up by token, applying lazy expiry.
    pub async fn get_session(&self, token: &str) -> Result<TestSession, AppError> {
        let session = self
            .stores
            .sessions
            .get_session_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        let now = Utc::now();
        let mut session = self.apply_expiry(session, now).await?;
        if session.status.is_open() {
            session.time_remaining =
                Some(i32::try_from(session.remaining_seconds_at(now)).unwrap_or(i32::MAX));
        }
        Ok(session)
    }

    /// Records (or overwrites) the answer to one question.
    ///
    /// The first answer moves the session to `in_progress` and starts the clock.
    pub async fn submit_answer(
        &self,
        token: &str,
        question_id: i64,
        answer_text: Option<String>,
        selected_option_id: Option<i64>,
    ) -> Result<UserAnswer, AppError> {
        let session = self.get_session(token).await?;
        let now = Utc::now();

        if !session.accepts_answers_at(now) {
            return Err(AppError::InvalidState(
                "Session is not available for answers".to_string(),
            ));
        }

        let question = self
            .stores
            .catalog
            .get_question(question_id)
            .await?
            .filter(|q| q.test_id == session.test_id)
            .ok_or_else(|| AppError::BadRequest("Invalid question for this test".to_string()))?;

        // Conditional transitions: a submit or expiry that landed meanwhile wins.
        if session.status == SessionStatus::NotStarted
            && self.stores.sessions.mark_started(session.id, now).await?
        {
            tracing::info!(session_id = session.id, "Session started");
        } else {
            let current = self.reload(session.id).await?;
            if !current.accepts_answers_at(now) {
                return Err(AppError::InvalidState(
                    "Session is not available for answers".to_string(),
                ));
            }
        }

        let definition = self.load_definition(question).await?;
        let score = score_answer(&definition, answer_text.as_deref(), selected_option_id);

        let existing = self
            .stores
            .answers
            .get_answer_by_session_and_question(session.id, question_id)
            .await?;

        let answer = match existing {
            Some(mut answer) => {
                answer.answer_text = answer_text;
                answer.selected_option_id = selected_option_id;
                answer.is_correct = Some(score.is_correct);
                answer.marks_awarded = score.marks_awarded;
                self.stores.answers.update_answer(&answer).await?;
                answer
            }
            None => {
                self.stores
                    .answers
                    .create_answer(NewAnswer {
                        session_id: session.id,
                        question_id,
                        answer_text,
                        selected_option_id,
                        is_correct: score.is_correct,
                        marks_awarded: score.marks_awarded,
                        answered_at: now,
                    })
                    .await?
            }
        };

        tracing::debug!(
            session_id = session.id,
            question_id,
            is_correct = score.is_correct,
            "Answer recorded"
        );

        Ok(answer)
    }

    /// Answers of a session, oldest first.
    pub async fn get_session_answers(&self, token: &str) -> Result<Vec<UserAnswer>, AppError> {
        let session = self.get_session(token).await?;
        self.stores.answers.list_answers_by_session(session.id).await
    }

    /// Moves the UI bookmark. Only allowed while the session is active.
    pub async fn update_progress(
        &self,
        token: &str,
        current_question_index: i32,
    ) -> Result<TestSession, AppError> {
        let mut session = self.get_session(token).await?;
        let now = Utc::now();

        if !session.is_active_at(now) {
            return Err(AppError::InvalidState("Session is not active".to_string()));
        }

        if !self
            .stores
            .sessions
            .set_progress(session.id, current_question_index, now)
            .await?
        {
            return Err(AppError::InvalidState("Session is not active".to_string()));
        }

        session.current_question_index = current_question_index;
        session.updated_at = now;
        Ok(session)
    }

    /// Submits the session, then tries to compute its result.
    ///
    /// Submitting twice returns the first submission untouched. A failure
    /// while computing the result does not undo the submission; it is logged
    /// and reported in `result_error`, and can be retried through
    /// [`ResultService::calculate_result`].
    pub async fn submit_session(&self, token: &str) -> Result<SubmittedSession, AppError> {
        let session = self.get_session(token).await?;

        let submitted = match session.status {
            SessionStatus::Submitted => None,
            _ => {
                self.stores
                    .sessions
                    .mark_submitted(session.id, Utc::now())
                    .await?
            }
        };

        let Some(session) = submitted else {
            // Already submitted, possibly by a concurrent call.
            let session = self.reload(session.id).await?;
            let result = self.results_for_submitted(&session).await?;
            return Ok(SubmittedSession {
                session,
                result,
                result_error: None,
            });
        };
        tracing::info!(session_id = session.id, "Session submitted");

        let (result, result_error) = match self.results.calculate_result(session.id).await {
            Ok(result) => (Some(result), None),
            Err(err) => {
                tracing::warn!(
                    session_id = session.id,
                    error = %err,
                    "Failed to calculate result after submission"
                );
                (None, Some(err.to_string()))
            }
        };

        Ok(SubmittedSession {
            session,
            result,
            result_error,
        })
    }

    /// A user's sessions, newest first.
    pub async fn get_user_sessions(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<Vec<TestSession>, AppError> {
        self.stores
            .sessions
            .list_user_sessions(user_id, page.limit, page.offset)
            .await
    }

    /// Open sessions of a test, newest first. Stale ones are expired on the way.
    pub async fn get_active_sessions_by_test(
        &self,
        test_id: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        let now = Utc::now();
        let mut active = Vec::new();
        for session in self.stores.sessions.list_active_sessions_by_test(test_id).await? {
            let session = self.apply_expiry(session, now).await?;
            if session.status.is_open() {
                active.push(session);
            }
        }
        Ok(active)
    }

    /// Marks every open session past its expiry as expired.
    pub async fn expire_stale_sessions(&self) -> Result<u64, AppError> {
        let expired = self.stores.sessions.expire_sessions(Utc::now()).await?;
        if expired > 0 {
            tracing::info!(expired, "Expired stale sessions");
        }
        Ok(expired)
    }

    /// Persists the `expired` transition if the session ran out of time.
    async fn apply_expiry(
        &self,
        mut session: TestSession,
        now: DateTime<Utc>,
    ) -> Result<TestSession, AppError> {
        if !session.status.is_open() || !session.is_expired_at(now) {
            return Ok(session);
        }

        if self.stores.sessions.mark_expired(session.id, now).await? {
            session.status = SessionStatus::Expired;
            session.time_remaining = Some(0);
            session.updated_at = now;
            tracing::info!(session_id = session.id, "Session expired");
            Ok(session)
        } else {
            // Closed by someone else in the meantime.
            self.reload(session.id).await
        }
    }

    async fn reload(&self, id: i64) -> Result<TestSession, AppError> {
        self.stores
            .sessions
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    /// Loads only the correctness data relevant to the question's type.
    async fn load_definition(&self, question: Question) -> Result<QuestionDefinition, AppError> {
        let kind = question.kind();
        let key = if kind.is_choice() {
            AnswerKey::Options(self.stores.catalog.list_options(question.id).await?)
        } else if kind == QuestionType::ShortAnswer {
            AnswerKey::Accepted(self.stores.catalog.list_correct_answers(question.id).await?)
        } else {
            tracing::warn!(
                question_id = question.id,
                question_type = %question.question_type,
                "Unknown question type"
            );
            AnswerKey::None
        };
        Ok(QuestionDefinition { question, key })
    }

    async fn results_for_submitted(
        &self,
        session: &TestSession,
    ) -> Result<Option<TestResult>, AppError> {
        self.stores.results.get_result_by_session(session.id).await
    }
}
