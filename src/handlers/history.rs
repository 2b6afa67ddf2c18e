// src/handlers/history.rs

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerRequest, FinishRequest, GenerateRequest},
        history::HistoryListParams,
    },
    quiz::QuizEngine,
    utils::jwt::Claims,
};

/// Generates a new practice attempt for the current user.
///
/// * Draws `questionCount` random questions from the topic's leaf categories.
/// * Returns 400 when the topic is empty or has too few questions.
pub async fn generate(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let caller = claims.caller()?;
    let attempt = engine.generate(&caller, &payload).await?;

    Ok(Json(attempt))
}

/// Lists the current user's attempts, newest first by default.
pub async fn list_history(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<HistoryListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let caller = claims.caller()?;
    let page = engine.list_history(Some(caller.user_id), params).await?;

    Ok(Json(page))
}

/// Attempt header plus the answer state of every question.
pub async fn get_history_detail(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let caller = claims.caller()?;
    let detail = engine.attempt_detail(&caller, id).await?;

    Ok(Json(serde_json::json!({ "data": detail })))
}

/// One question of an attempt with its choices.
pub async fn get_soal_detail(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let caller = claims.caller()?;
    let view = engine.line_item(&caller, id).await?;

    Ok(Json(serde_json::json!({ "data": view })))
}

/// Saves the answer to one question. `jawabanSelect: null` clears it.
pub async fn answer(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let caller = claims.caller()?;
    engine.record_answer(&caller, &payload).await?;

    Ok(Json(serde_json::json!({ "message": "Answer saved" })))
}

/// Finishes an attempt: stores the normalized score and returns the full result.
pub async fn finish(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<FinishRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let caller = claims.caller()?;
    let stats = engine.finish(&caller, payload.id).await?;

    Ok(Json(serde_json::json!({ "data": stats })))
}

/// Result of an attempt, recomputed without changing anything.
pub async fn get_statistic(
    State(engine): State<QuizEngine>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let caller = claims.caller()?;
    let stats = engine.statistics(&caller, id).await?;

    Ok(Json(serde_json::json!({ "data": stats })))
}
