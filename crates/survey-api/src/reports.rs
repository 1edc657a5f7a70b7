use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use survey_db::ReportLog;
use survey_types::models::Document;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    AppJson(report): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let inserted = state
        .with_store(move |db| Ok(ReportLog::new(db).record(report)?))
        .await?;
    Ok(Json(inserted))
}

/// GET /reports
pub async fn list_reports(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let reports = state
        .with_store(|db| Ok(ReportLog::new(db).list_all()?))
        .await?;
    Ok(Json(reports))
}

/// GET /reported/{email}
pub async fn reports_by_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state
        .with_store(move |db| Ok(ReportLog::new(db).by_user(&email)?))
        .await?;
    Ok(Json(reports))
}

/// GET /report/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .with_store(move |db| Ok(ReportLog::new(db).get(&id)?))
        .await?;
    Ok(Json(report))
}
