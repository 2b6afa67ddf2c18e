// src/handlers/admin.rs

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::{error::AppError, models::history::HistoryListParams, quiz::QuizEngine};

/// Lists attempts of all users. Accepts `userId` to narrow to one learner.
/// Admin only.
pub async fn list_all_history(
    State(engine): State<QuizEngine>,
    params: Result<Query<HistoryListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let page = engine.list_history(None, params).await?;

    Ok(Json(page))
}

/// Deletes an attempt together with its questions.
/// Admin only.
pub async fn delete_history(
    State(engine): State<QuizEngine>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    engine.delete_attempt(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
