// src/handlers/sessions.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{Pagination, ensure_can_view, ensure_owner},
    models::session::{
        SessionResponse, StartSessionRequest, SubmitAnswerRequest, UpdateProgressRequest,
    },
    services::SessionService,
    utils::jwt::Claims,
};

/// Start (or resume) the caller's attempt at a test.
pub async fn start_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let session = sessions.start_session(user_id, payload.test_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::at(session, Utc::now())),
    ))
}

/// The caller's sessions, newest first.
pub async fn list_my_sessions(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let list = sessions.get_user_sessions(user_id, params.into()).await?;
    Ok(Json(list))
}

/// Session details with the live remaining time.
pub async fn get_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.get_session(&token).await?;
    ensure_can_view(&claims, session.user_id)?;
    Ok(Json(SessionResponse::at(session, Utc::now())))
}

/// Record or overwrite the answer to one question.
pub async fn submit_answer(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let session = sessions.get_session(&token).await?;
    ensure_owner(&claims, session.user_id)?;

    let answer = sessions
        .submit_answer(
            &token,
            payload.question_id,
            payload.answer_text,
            payload.selected_option_id,
        )
        .await?;
    Ok(Json(answer))
}

pub async fn list_answers(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.get_session(&token).await?;
    ensure_can_view(&claims, session.user_id)?;
    let answers = sessions.get_session_answers(&token).await?;
    Ok(Json(answers))
}

/// Move the question bookmark.
pub async fn update_progress(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let session = sessions.get_session(&token).await?;
    ensure_owner(&claims, session.user_id)?;

    let session = sessions
        .update_progress(&token, payload.current_question_index)
        .await?;
    Ok(Json(SessionResponse::at(session, Utc::now())))
}

/// Submit the session and compute its result.
///
/// Responds 200 even when the result could not be computed; the body then
/// carries `result_error` instead of `result`.
pub async fn submit_session(
    State(sessions): State<SessionService>,
    Extension(claims): Extension<Claims>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.get_session(&token).await?;
    ensure_owner(&claims, session.user_id)?;

    let submitted = sessions.submit_session(&token).await?;
    Ok(Json(submitted))
}

/// Open sessions of a test, for proctoring views.
pub async fn list_active_by_test(
    State(sessions): State<SessionService>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let active: Vec<SessionResponse> = sessions
        .get_active_sessions_by_test(test_id)
        .await?
        .into_iter()
        .map(|s| SessionResponse::at(s, now))
        .collect();
    Ok(Json(active))
}
