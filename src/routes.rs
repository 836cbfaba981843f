// src/routes.rs

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{results, sessions},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// Everything under `/api` requires a valid bearer token; staff routes
/// additionally require a teacher or admin role.
pub fn create_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/start", post(sessions::start_session))
        .route("/my", get(sessions::list_my_sessions))
        .route("/{token}", get(sessions::get_session))
        .route(
            "/{token}/answers",
            post(sessions::submit_answer).get(sessions::list_answers),
        )
        .route("/{token}/progress", put(sessions::update_progress))
        .route("/{token}/submit", post(sessions::submit_session));

    let result_routes = Router::new()
        .route("/my", get(results::list_my_results))
        .route("/{id}", get(results::get_result))
        .route("/session/{session_id}", get(results::get_result_by_session))
        .route("/test/{test_id}/my", get(results::my_result_for_test));

    let staff_routes = Router::new()
        .route(
            "/results/session/{session_id}/calculate",
            post(results::calculate_result),
        )
        .route("/results/test/{test_id}", get(results::list_test_results))
        .route(
            "/results/test/{test_id}/statistics",
            get(results::test_statistics),
        )
        .route(
            "/tests/{test_id}/sessions/active",
            get(sessions::list_active_by_test),
        )
        .route_layer(middleware::from_fn(staff_middleware));

    // Auth first, then the staff check on the inner routes.
    let api_routes = Router::new()
        .nest("/sessions", session_routes)
        .nest("/results", result_routes)
        .merge(staff_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
