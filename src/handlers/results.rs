// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    handlers::{Pagination, ensure_can_view},
    services::ResultService,
    utils::jwt::Claims,
};

pub async fn list_my_results(
    State(results): State<ResultService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let list = results.get_user_results(user_id, params.into()).await?;
    Ok(Json(list))
}

pub async fn get_result(
    State(results): State<ResultService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = results.get_result(id).await?;
    ensure_can_view(&claims, result.user_id)?;
    Ok(Json(result))
}

pub async fn get_result_by_session(
    State(results): State<ResultService>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = results.get_result_by_session(session_id).await?;
    ensure_can_view(&claims, result.user_id)?;
    Ok(Json(result))
}

/// Compute a session's result by hand, e.g. after a failed submit-time attempt.
pub async fn calculate_result(
    State(results): State<ResultService>,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = results.calculate_result(session_id).await?;
    Ok(Json(result))
}

pub async fn list_test_results(
    State(results): State<ResultService>,
    Path(test_id): Path<i64>,
    Query(params): Query<Pagination>,
) -> Result<impl IntoResponse, AppError> {
    let list = results.get_test_results(test_id, params.into()).await?;
    Ok(Json(list))
}

pub async fn test_statistics(
    State(results): State<ResultService>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let stats = results.get_test_statistics(test_id).await?;
    Ok(Json(stats))
}

/// The caller's latest result for a test.
pub async fn my_result_for_test(
    State(results): State<ResultService>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let result = results.get_result_by_user_and_test(user_id, test_id).await?;
    Ok(Json(result))
}
