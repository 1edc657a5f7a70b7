use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;

use survey_db::Sort;
use survey_db::surveys::{SurveyFilter, SurveyQuery};
use survey_db::SurveyStore;
use survey_types::api::{CountResponse, ListSurveysQuery, StatusUpdateRequest, TopSurveysQuery};
use survey_types::models::{Document, SurveyStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

fn survey_filter(query: &ListSurveysQuery) -> SurveyFilter {
    SurveyFilter {
        search: query.search().map(str::to_string),
        category: query.category().map(str::to_string),
    }
}

/// POST /survey
pub async fn create_survey(
    State(state): State<AppState>,
    AppJson(survey): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let inserted = state
        .with_store(move |db| Ok(SurveyStore::new(db).create(survey)?))
        .await?;
    info!("Survey {} created", inserted.inserted_id);
    Ok(Json(inserted))
}

/// GET /surveys: the six leading surveys by the requested key.
pub async fn top_surveys(
    State(state): State<AppState>,
    Query(query): Query<TopSurveysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sort = query
        .sort_key()
        .map(|(field, direction)| Sort::new(field, direction));
    let surveys = state
        .with_store(move |db| Ok(SurveyStore::new(db).top_ranked(sort)?))
        .await?;
    Ok(Json(surveys))
}

/// GET /surveys/{key}: `key` is the owner's email here.
pub async fn surveys_by_surveyor(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let surveys = state
        .with_store(move |db| Ok(SurveyStore::new(db).by_surveyor(&email)?))
        .await?;
    Ok(Json(surveys))
}

/// GET /survey/{id}: `null` when absent.
pub async fn get_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let survey = state
        .with_store(move |db| Ok(SurveyStore::new(db).get_by_id(&id)?))
        .await?;
    Ok(Json(survey))
}

/// DELETE /survey/{id}
pub async fn delete_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .with_store(move |db| Ok(SurveyStore::new(db).delete_by_id(&id)?))
        .await?;
    Ok(Json(result))
}

/// PUT /survey/{id} and PUT /surveys/{key}: `key` is the survey id here.
pub async fn replace_survey(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(fields): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .with_store(move |db| Ok(SurveyStore::new(db).replace(&id, fields)?))
        .await?;
    Ok(Json(result))
}

/// PUT /surveys/{key}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: SurveyStatus = req
        .status
        .parse()
        .map_err(|e: survey_types::models::UnknownStatus| ApiError::Validation(e.to_string()))?;

    let target = id.clone();
    let feedback = req.feedback;
    let result = state
        .with_store(move |db| {
            Ok(SurveyStore::new(db).update_status(&target, status, feedback.as_deref())?)
        })
        .await?;

    info!("Survey {} marked {}", id, status);
    Ok(Json(result))
}

/// GET /all-surveys
pub async fn all_surveys(
    State(state): State<AppState>,
    Query(query): Query<ListSurveysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = SurveyQuery {
        filter: survey_filter(&query),
        deadline_order: query.deadline_order(),
        page: query.page(),
        size: query.size(),
    };
    let page = state
        .with_store(move |db| Ok(SurveyStore::new(db).list(&query)?))
        .await?;
    Ok(Json(page))
}

/// GET /surveys-count
pub async fn surveys_count(
    State(state): State<AppState>,
    Query(query): Query<ListSurveysQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = survey_filter(&query);
    let count = state
        .with_store(move |db| Ok(SurveyStore::new(db).count(&filter)?))
        .await?;
    Ok(Json(CountResponse { count }))
}
