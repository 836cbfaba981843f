// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

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

#[derive(Default)]
struct Tables {
    tests: BTreeMap<i64, Test>,
    questions: BTreeMap<i64, Question>,
    options: BTreeMap<i64, QuestionOption>,
    correct_answers: BTreeMap<i64, CorrectAnswer>,
    sessions: BTreeMap<i64, TestSession>,
    answers: BTreeMap<i64, UserAnswer>,
    results: BTreeMap<i64, TestResult>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_test(&self, test: Test) {
        self.tables.write().await.tests.insert(test.id, test);
    }

    pub async fn insert_question(&self, question: Question) {
        self.tables.write().await.questions.insert(question.id, question);
    }

    pub async fn insert_option(&self, option: QuestionOption) {
        self.tables.write().await.options.insert(option.id, option);
    }

    pub async fn insert_correct_answer(&self, answer: CorrectAnswer) {
        self.tables
            .write()
            .await
            .correct_answers
            .insert(answer.id, answer);
    }
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get_test(&self, id: i64) -> Result<Option<Test>, AppError> {
        Ok(self.tables.read().await.tests.get(&id).cloned())
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn list_questions_by_test(&self, test_id: i64) -> Result<Vec<Question>, AppError> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| q.test_id == test_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order_index, q.id));
        Ok(questions)
    }

    async fn list_options(&self, question_id: i64) -> Result<Vec<QuestionOption>, AppError> {
        let tables = self.tables.read().await;
        let mut options: Vec<QuestionOption> = tables
            .options
            .values()
            .filter(|o| o.question_id == question_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| (o.order_index, o.id));
        Ok(options)
    }

    async fn list_correct_answers(
        &self,
        question_id: i64,
    ) -> Result<Vec<CorrectAnswer>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .correct_answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, new: NewSession) -> Result<Option<TestSession>, AppError> {
        let mut tables = self.tables.write().await;

        let conflict = tables.sessions.values().any(|s| {
            s.session_token == new.session_token
                || (s.user_id == new.user_id && s.test_id == new.test_id && s.status.is_open())
        });
        if conflict {
            return Ok(None);
        }

        let session = TestSession {
            id: tables.next_id(),
            test_id: new.test_id,
            user_id: new.user_id,
            session_token: new.session_token,
            status: SessionStatus::NotStarted,
            started_at: None,
            submitted_at: None,
            expires_at: new.expires_at,
            time_remaining: Some(new.time_remaining),
            current_question_index: 0,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(Some(session))
    }

    async fn get_session(&self, id: i64) -> Result<Option<TestSession>, AppError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<TestSession>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.session_token == token)
            .cloned())
    }

    async fn get_session_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestSession>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.test_id == test_id)
            .max_by_key(|s| (s.created_at, s.id))
            .cloned())
    }

    async fn update_session(&self, session: &TestSession) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.sessions.get_mut(&session.id) {
            stored.status = session.status;
            stored.started_at = session.started_at;
            stored.submitted_at = session.submitted_at;
            stored.time_remaining = session.time_remaining;
            stored.current_question_index = session.current_question_index;
            stored.updated_at = session.updated_at;
        }
        Ok(())
    }

    async fn mark_started(&self, id: i64, started_at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(stored) if stored.status == SessionStatus::NotStarted => {
                stored.status = SessionStatus::InProgress;
                stored.started_at = Some(started_at);
                stored.updated_at = started_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_expired(&self, id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(stored) if stored.status.is_open() => {
                stored.status = SessionStatus::Expired;
                stored.time_remaining = Some(0);
                stored.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_submitted(
        &self,
        id: i64,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<TestSession>, AppError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(stored) if stored.status != SessionStatus::Submitted => {
                stored.status = SessionStatus::Submitted;
                stored.submitted_at = Some(submitted_at);
                stored.time_remaining = Some(0);
                stored.updated_at = submitted_at;
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_progress(
        &self,
        id: i64,
        current_question_index: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(stored)
                if stored.status == SessionStatus::InProgress && stored.expires_at >= now =>
            {
                stored.current_question_index = current_question_index;
                stored.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_session(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn list_user_sessions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<TestSession> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(page(sessions, limit, offset))
    }

    async fn list_active_sessions_by_test(
        &self,
        test_id: i64,
    ) -> Result<Vec<TestSession>, AppError> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<TestSession> = tables
            .sessions
            .values()
            .filter(|s| s.test_id == test_id && s.status.is_open())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(sessions)
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for session in tables.sessions.values_mut() {
            if session.status.is_open() && session.expires_at < now {
                session.status = SessionStatus::Expired;
                session.time_remaining = Some(0);
                session.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl AnswerStore for MemoryStore {
    async fn create_answer(&self, new: NewAnswer) -> Result<UserAnswer, AppError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .answers
            .values_mut()
            .find(|a| a.session_id == new.session_id && a.question_id == new.question_id)
        {
            existing.answer_text = new.answer_text;
            existing.selected_option_id = new.selected_option_id;
            existing.is_correct = Some(new.is_correct);
            existing.marks_awarded = new.marks_awarded;
            return Ok(existing.clone());
        }

        let answer = UserAnswer {
            id: tables.next_id(),
            session_id: new.session_id,
            question_id: new.question_id,
            answer_text: new.answer_text,
            selected_option_id: new.selected_option_id,
            is_correct: Some(new.is_correct),
            marks_awarded: new.marks_awarded,
            answered_at: new.answered_at,
        };
        tables.answers.insert(answer.id, answer.clone());
        Ok(answer)
    }

    async fn get_answer(&self, id: i64) -> Result<Option<UserAnswer>, AppError> {
        Ok(self.tables.read().await.answers.get(&id).cloned())
    }

    async fn get_answer_by_session_and_question(
        &self,
        session_id: i64,
        question_id: i64,
    ) -> Result<Option<UserAnswer>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .values()
            .find(|a| a.session_id == session_id && a.question_id == question_id)
            .cloned())
    }

    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<UserAnswer>, AppError> {
        let tables = self.tables.read().await;
        let mut answers: Vec<UserAnswer> = tables
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| (a.answered_at, a.id));
        Ok(answers)
    }

    async fn update_answer(&self, answer: &UserAnswer) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.answers.get_mut(&answer.id) {
            stored.answer_text = answer.answer_text.clone();
            stored.selected_option_id = answer.selected_option_id;
            stored.is_correct = answer.is_correct;
            stored.marks_awarded = answer.marks_awarded;
        }
        Ok(())
    }

    async fn delete_answer(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.answers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create_result(&self, new: NewResult) -> Result<TestResult, AppError> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .results
            .values()
            .find(|r| r.session_id == new.session_id)
        {
            return Ok(existing.clone());
        }

        let result = TestResult {
            id: tables.next_id(),
            session_id: new.session_id,
            test_id: new.test_id,
            user_id: new.user_id,
            total_questions: new.total_questions,
            answered_questions: new.answered_questions,
            correct_answers: new.correct_answers,
            total_marks: new.total_marks,
            marks_obtained: new.marks_obtained,
            percentage: new.percentage,
            grade: new.grade.as_str().to_string(),
            is_passed: new.is_passed,
            time_taken: new.time_taken,
            completed_at: new.completed_at,
        };
        tables.results.insert(result.id, result.clone());
        Ok(result)
    }

    async fn get_result(&self, id: i64) -> Result<Option<TestResult>, AppError> {
        Ok(self.tables.read().await.results.get(&id).cloned())
    }

    async fn get_result_by_session(
        &self,
        session_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .values()
            .find(|r| r.session_id == session_id)
            .cloned())
    }

    async fn get_result_by_user_and_test(
        &self,
        user_id: i64,
        test_id: i64,
    ) -> Result<Option<TestResult>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .values()
            .filter(|r| r.user_id == user_id && r.test_id == test_id)
            .max_by_key(|r| (r.completed_at, r.id))
            .cloned())
    }

    async fn list_results_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        let tables = self.tables.read().await;
        let mut results: Vec<TestResult> = tables
            .results
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| (b.completed_at, b.id).cmp(&(a.completed_at, a.id)));
        Ok(page(results, limit, offset))
    }

    async fn list_results_by_test(
        &self,
        test_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TestResult>, AppError> {
        let tables = self.tables.read().await;
        let mut results: Vec<TestResult> = tables
            .results
            .values()
            .filter(|r| r.test_id == test_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| (b.completed_at, b.id).cmp(&(a.completed_at, a.id)));
        Ok(page(results, limit, offset))
    }

    async fn update_result(&self, result: &TestResult) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.results.get_mut(&result.id) {
            *stored = TestResult {
                id: stored.id,
                session_id: stored.session_id,
                test_id: stored.test_id,
                user_id: stored.user_id,
                completed_at: stored.completed_at,
                ..result.clone()
            };
        }
        Ok(())
    }

    async fn delete_result(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.results.remove(&id);
        Ok(())
    }

    async fn test_statistics(&self, test_id: i64) -> Result<TestStatistics, AppError> {
        let tables = self.tables.read().await;
        let results: Vec<&TestResult> = tables
            .results
            .values()
            .filter(|r| r.test_id == test_id)
            .collect();

        if results.is_empty() {
            return Ok(TestStatistics::empty(test_id));
        }

        let count = results.len() as f64;
        let percentages = results.iter().map(|r| r.percentage);

        let timed: Vec<i64> = results
            .iter()
            .filter_map(|r| r.time_taken.map(i64::from))
            .collect();
        let average_time_taken = (!timed.is_empty())
            .then(|| (timed.iter().sum::<i64>() as f64 / timed.len() as f64).round() as i64);

        Ok(TestStatistics {
            test_id,
            total_attempts: results.len() as i64,
            passed_attempts: results.iter().filter(|r| r.is_passed).count() as i64,
            average_score: percentages.clone().sum::<f64>() / count,
            highest_score: percentages.clone().fold(f64::MIN, f64::max),
            lowest_score: percentages.fold(f64::MAX, f64::min),
            average_time_taken,
        })
    }
}
