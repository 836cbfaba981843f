// tests/session_flow.rs

mod common;

use std::{sync::Arc, time::Duration};

use cbt_backend::{
    error::AppError,
    models::session::SessionStatus,
    services::Page,
    state::AppState,
    store::Stores,
};
use common::*;

async fn app() -> AppState {
    state_with(Stores::from_backend(seeded_store().await))
}

#[tokio::test]
async fn start_session_is_idempotent() {
    let state = app().await;

    let first = state.sessions.start_session(7, PHYSICS).await.unwrap();
    let second = state.sessions.start_session(7, PHYSICS).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.session_token, second.session_token);
    assert_eq!(first.status, SessionStatus::NotStarted);
    assert_eq!(first.time_remaining, Some(3600));
    assert_eq!(first.session_token.len(), 64);
}

#[tokio::test]
async fn start_session_checks_the_test() {
    let state = app().await;

    let missing = state.sessions.start_session(7, 999).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let closed = state.sessions.start_session(7, CLOSED).await;
    assert!(matches!(closed, Err(AppError::Unavailable(_))));
}

#[tokio::test]
async fn first_answer_starts_the_clock() {
    let state = app().await;
    let session = state.sessions.start_session(7, PHYSICS).await.unwrap();
    assert!(session.started_at.is_none());

    state
        .sessions
        .submit_answer(&session.session_token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();

    let reloaded = state.sessions.get_session(&session.session_token).await.unwrap();
    assert_eq!(reloaded.status, SessionStatus::InProgress);
    assert!(reloaded.started_at.is_some());
}

#[tokio::test]
async fn resubmitting_an_answer_overwrites_it() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let wrong = state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_WRONG))
        .await
        .unwrap();
    assert_eq!(wrong.is_correct, Some(false));
    assert_eq!(wrong.marks_awarded, 0);

    let right = state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    assert_eq!(right.id, wrong.id);
    assert_eq!(right.answered_at, wrong.answered_at);

    let answers = state.sessions.get_session_answers(&token).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].selected_option_id, Some(OPT_RIGHT));
    assert_eq!(answers[0].is_correct, Some(true));
    assert_eq!(answers[0].marks_awarded, 5);
}

#[tokio::test]
async fn short_answer_ignores_case_and_padding() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let answer = state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("  pArIs ".to_string()), None)
        .await
        .unwrap();
    assert_eq!(answer.is_correct, Some(true));
    assert_eq!(answer.marks_awarded, 5);
}

#[tokio::test]
async fn question_from_another_test_is_rejected() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let foreign = state
        .sessions
        .submit_answer(&token, Q_FOREIGN, None, Some(1))
        .await;
    assert!(matches!(foreign, Err(AppError::BadRequest(_))));

    let unknown = state.sessions.submit_answer(&token, 4242, None, Some(1)).await;
    assert!(matches!(unknown, Err(AppError::BadRequest(_))));

    // Rejected answers do not start the session.
    let session = state.sessions.get_session(&token).await.unwrap();
    assert_eq!(session.status, SessionStatus::NotStarted);
}

#[tokio::test]
async fn progress_requires_an_active_session() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let early = state.sessions.update_progress(&token, 1).await;
    assert!(matches!(early, Err(AppError::InvalidState(_))));

    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    let moved = state.sessions.update_progress(&token, 1).await.unwrap();
    assert_eq!(moved.current_question_index, 1);

    state.sessions.submit_session(&token).await.unwrap();
    let late = state.sessions.update_progress(&token, 0).await;
    assert!(matches!(late, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn full_attempt_scores_full_marks() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("Paris".to_string()), None)
        .await
        .unwrap();

    let submitted = state.sessions.submit_session(&token).await.unwrap();
    assert_eq!(submitted.session.status, SessionStatus::Submitted);
    assert!(submitted.result_error.is_none());

    let result = submitted.result.unwrap();
    assert_eq!(result.total_questions, 2);
    assert_eq!(result.answered_questions, 2);
    assert_eq!(result.correct_answers, 2);
    assert_eq!(result.marks_obtained, 10);
    assert_eq!(result.percentage, 100.0);
    assert_eq!(result.grade, "A+");
    assert!(result.is_passed);
    assert!(result.time_taken.is_some());

    // Second submit is a no-op.
    let again = state.sessions.submit_session(&token).await.unwrap();
    assert_eq!(again.session.submitted_at, submitted.session.submitted_at);
    assert_eq!(again.result.unwrap().id, result.id);

    // Recalculation returns the stored row.
    let recalculated = state
        .results
        .calculate_result(submitted.session.id)
        .await
        .unwrap();
    assert_eq!(recalculated, result);

    let locked = state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_WRONG))
        .await;
    assert!(matches!(locked, Err(AppError::InvalidState(_))));

    let mine = state
        .results
        .get_result_by_user_and_test(7, PHYSICS)
        .await
        .unwrap();
    assert_eq!(mine.id, result.id);
}

#[tokio::test]
async fn partial_attempt_fails_by_marks() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("London".to_string()), None)
        .await
        .unwrap();

    let result = state.sessions.submit_session(&token).await.unwrap().result.unwrap();
    assert_eq!(result.marks_obtained, 5);
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.grade, "C");
    assert!(!result.is_passed);
}

#[tokio::test]
async fn expired_session_refuses_answers() {
    let memory = seeded_store().await;
    let stores = Stores {
        sessions: Arc::new(AlreadyExpired(memory.clone())),
        ..Stores::from_backend(memory)
    };
    let state = state_with(stores);

    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let session = state.sessions.get_session(&token).await.unwrap();
    assert_eq!(session.status, SessionStatus::Expired);
    assert_eq!(session.time_remaining, Some(0));

    let answer = state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await;
    assert!(matches!(answer, Err(AppError::InvalidState(_))));

    // A new start replaces the expired attempt.
    let fresh = state.sessions.start_session(7, PHYSICS).await.unwrap();
    assert_ne!(fresh.session_token, token);

    // An expired session can still be handed in.
    let submitted = state.sessions.submit_session(&token).await.unwrap();
    assert_eq!(submitted.session.status, SessionStatus::Submitted);
    let result = submitted.result.unwrap();
    assert_eq!(result.marks_obtained, 0);
    assert_eq!(result.grade, "F");
    assert!(result.time_taken.is_none());
}

#[tokio::test]
async fn sweep_expires_untouched_sessions() {
    let memory = seeded_store().await;
    let stores = Stores {
        sessions: Arc::new(AlreadyExpired(memory.clone())),
        ..Stores::from_backend(memory)
    };
    let state = state_with(stores);

    state.sessions.start_session(7, PHYSICS).await.unwrap();
    state.sessions.start_session(8, PHYSICS).await.unwrap();

    assert_eq!(state.sessions.expire_stale_sessions().await.unwrap(), 2);
    assert_eq!(state.sessions.expire_stale_sessions().await.unwrap(), 0);
    assert!(
        state
            .sessions
            .get_active_sessions_by_test(PHYSICS)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn failed_aggregation_keeps_the_submission() {
    let memory = seeded_store().await;
    let stores = Stores {
        results: Arc::new(BrokenResults(memory.clone())),
        ..Stores::from_backend(memory)
    };
    let state = state_with(stores);

    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;
    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();

    let submitted = state.sessions.submit_session(&token).await.unwrap();
    assert_eq!(submitted.session.status, SessionStatus::Submitted);
    assert!(submitted.result.is_none());
    assert!(submitted.result_error.unwrap().contains("disk full"));

    let reloaded = state.sessions.get_session(&token).await.unwrap();
    assert_eq!(reloaded.status, SessionStatus::Submitted);
    assert!(reloaded.submitted_at.is_some());

    let retry = state.results.calculate_result(reloaded.id).await;
    assert!(matches!(retry, Err(AppError::InternalServerError(_))));
}

#[tokio::test]
async fn statistics_and_listings() {
    let state = app().await;

    let strong = state.sessions.start_session(7, PHYSICS).await.unwrap().session_token;
    state
        .sessions
        .submit_answer(&strong, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    state
        .sessions
        .submit_answer(&strong, Q_SHORT, Some("paris".to_string()), None)
        .await
        .unwrap();

    let weak = state.sessions.start_session(8, PHYSICS).await.unwrap().session_token;
    let idle = state.sessions.start_session(9, PHYSICS).await.unwrap();

    let active = state.sessions.get_active_sessions_by_test(PHYSICS).await.unwrap();
    assert_eq!(active.len(), 3);

    state.sessions.submit_session(&strong).await.unwrap();
    state.sessions.submit_session(&weak).await.unwrap();

    let active = state.sessions.get_active_sessions_by_test(PHYSICS).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, idle.id);

    let stats = state.results.get_test_statistics(PHYSICS).await.unwrap();
    assert_eq!(stats.total_attempts, 2);
    assert_eq!(stats.passed_attempts, 1);
    assert_eq!(stats.average_score, 50.0);
    assert_eq!(stats.highest_score, 100.0);
    assert_eq!(stats.lowest_score, 0.0);
    // Only the attempt that answered something has a time taken.
    assert!(stats.average_time_taken.is_some());

    let results = state
        .results
        .get_test_results(PHYSICS, Page::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let first_page = state
        .results
        .get_test_results(PHYSICS, Page::new(Some(1), None))
        .await
        .unwrap();
    assert_eq!(first_page.len(), 1);

    let empty = state.results.get_test_statistics(OTHER).await.unwrap();
    assert_eq!(empty.total_attempts, 0);
    assert!(empty.average_time_taken.is_none());

    let mine = state.results.get_user_results(7, Page::default()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].grade, "A+");

    let sessions = state.sessions.get_user_sessions(8, Page::default()).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Submitted);
}

#[tokio::test]
async fn submit_during_first_answer_stays_final() {
    let memory = seeded_store().await;
    let stores = Stores {
        catalog: Arc::new(SlowCatalog(memory.clone(), Duration::from_millis(200))),
        ..Stores::from_backend(memory)
    };
    let state = state_with(stores);

    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    let answering = {
        let state = state.clone();
        let token = token.clone();
        tokio::spawn(async move {
            state
                .sessions
                .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let submitted = state.sessions.submit_session(&token).await.unwrap();
    assert_eq!(submitted.session.status, SessionStatus::Submitted);

    let late = answering.await.unwrap();
    assert!(matches!(late, Err(AppError::InvalidState(_))));

    let session = state.sessions.get_session(&token).await.unwrap();
    assert_eq!(session.status, SessionStatus::Submitted);
    assert_eq!(session.submitted_at, submitted.session.submitted_at);
    assert!(state.sessions.get_session_answers(&token).await.unwrap().is_empty());
}

#[tokio::test]
async fn result_waits_for_submission() {
    let state = app().await;
    let session = state.sessions.start_session(7, PHYSICS).await.unwrap();

    let early = state.results.calculate_result(session.id).await;
    assert!(matches!(early, Err(AppError::InvalidState(_))));

    let token = session.session_token;
    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    let early = state.results.calculate_result(session.id).await;
    assert!(matches!(early, Err(AppError::InvalidState(_))));

    state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("Paris".to_string()), None)
        .await
        .unwrap();
    let result = state.sessions.submit_session(&token).await.unwrap().result.unwrap();
    assert_eq!(result.marks_obtained, 10);
    assert_eq!(result.grade, "A+");
    assert!(result.time_taken.is_some());

    let missing = state.results.calculate_result(9999).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn user_sessions_are_newest_first() {
    let state = app().await;

    let older = state.sessions.start_session(7, PHYSICS).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = state.sessions.start_session(7, OTHER).await.unwrap();
    state.sessions.start_session(8, PHYSICS).await.unwrap();

    let all = state.sessions.get_user_sessions(7, Page::default()).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let second = state
        .sessions
        .get_user_sessions(7, Page::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, older.id);

    let past_end = state
        .sessions
        .get_user_sessions(7, Page::new(None, Some(2)))
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn answers_are_listed_oldest_first() {
    let state = app().await;
    let token = state
        .sessions
        .start_session(7, PHYSICS)
        .await
        .unwrap()
        .session_token;

    state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("Rome".to_string()), None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    state
        .sessions
        .submit_answer(&token, Q_CHOICE, None, Some(OPT_RIGHT))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    // Overwriting keeps the original position.
    state
        .sessions
        .submit_answer(&token, Q_SHORT, Some("Paris".to_string()), None)
        .await
        .unwrap();

    let answers = state.sessions.get_session_answers(&token).await.unwrap();
    let order: Vec<i64> = answers.iter().map(|a| a.question_id).collect();
    assert_eq!(order, vec![Q_SHORT, Q_CHOICE]);
    assert!(answers[0].answered_at < answers[1].answered_at);
    assert_eq!(answers[0].is_correct, Some(true));
}
