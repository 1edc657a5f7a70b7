use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;

use survey_db::VoteLedger;
use survey_db::votes::SURVEY_REF_FIELD;
use survey_types::models::Document;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

/// POST /votes: records the vote and bumps the survey's counter.
///
/// Succeeds whenever the vote is stored, even if the counter update did not
/// land (see `VoteLedger::cast`).
pub async fn cast_vote(
    State(state): State<AppState>,
    AppJson(vote): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let survey_id = match vote.get(SURVEY_REF_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => return Err(ApiError::Validation(format!("{} is required", SURVEY_REF_FIELD))),
    };

    let outcome = state
        .with_store(move |db| Ok(VoteLedger::new(db).cast(&survey_id, vote)?))
        .await?;
    Ok(Json(outcome.inserted))
}

/// GET /votes
pub async fn list_votes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let votes = state
        .with_store(|db| Ok(VoteLedger::new(db).list_all()?))
        .await?;
    Ok(Json(votes))
}

/// GET /vote/{id}
pub async fn get_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vote = state
        .with_store(move |db| Ok(VoteLedger::new(db).get(&id)?))
        .await?;
    Ok(Json(vote))
}

/// GET /votes/{email}: votes cast by this voter.
pub async fn votes_by_voter(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let votes = state
        .with_store(move |db| Ok(VoteLedger::new(db).by_voter(&email)?))
        .await?;
    Ok(Json(votes))
}

/// GET /comments/{email}: votes (and their comments) on this surveyor's surveys.
pub async fn comments_for_surveyor(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let votes = state
        .with_store(move |db| Ok(VoteLedger::new(db).by_surveyor(&email)?))
        .await?;
    Ok(Json(votes))
}
