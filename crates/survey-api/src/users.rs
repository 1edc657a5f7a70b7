use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;
use tracing::info;

use survey_db::{UpsertOutcome, UserStore};
use survey_types::api::{Claims, RoleUpdateRequest, UpsertUserResponse};
use survey_types::models::{Document, Role};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

/// PUT /users: creates the account on first login, leaves it alone after.
pub async fn upsert_user(
    State(state): State<AppState>,
    AppJson(user): AppJson<Document>,
) -> Result<impl IntoResponse, ApiError> {
    match user.get("email") {
        Some(Value::String(email)) if !email.is_empty() => {}
        _ => return Err(ApiError::Validation("Invalid user data".to_string())),
    }
    match user.get("role") {
        None | Some(Value::Null) => {}
        Some(Value::String(raw)) => {
            raw.parse::<Role>()
                .map_err(|e| ApiError::Validation(e.to_string()))?;
        }
        Some(_) => return Err(ApiError::Validation("role must be a string".to_string())),
    }

    let outcome = state
        .with_store(move |db| Ok(UserStore::new(db).upsert_if_absent(user)?))
        .await?;

    let response = match outcome {
        UpsertOutcome::Created(inserted) => UpsertUserResponse {
            message: "user created".to_string(),
            inserted_id: Some(inserted.inserted_id),
        },
        UpsertOutcome::Existing => UpsertUserResponse {
            message: "user already exists".to_string(),
            inserted_id: None,
        },
    };
    Ok(Json(response))
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .with_store(|db| Ok(UserStore::new(db).list_all()?))
        .await?;
    Ok(Json(users))
}

/// Answers `{"<flag>": bool}` for the role-check endpoints. Unknown accounts
/// hold no role.
async fn has_role(state: &AppState, email: String, role: Role) -> Result<Json<Value>, ApiError> {
    let current = state
        .with_store(move |db| Ok(UserStore::new(db).role_of(&email)?))
        .await?;
    let mut body = serde_json::Map::new();
    body.insert(role.flag().to_string(), Value::Bool(current == Some(role)));
    Ok(Json(Value::Object(body)))
}

/// GET /users/admin/{email}
pub async fn is_admin(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    has_role(&state, email, Role::Admin).await
}

/// GET /users/surveyor/{email}
pub async fn is_surveyor(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    has_role(&state, email, Role::Surveyor).await
}

/// GET /users/prouser/{email}
pub async fn is_pro_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    has_role(&state, email, Role::ProUser).await
}

/// GET /users/user/{email}
pub async fn is_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    has_role(&state, email, Role::User).await
}

/// PATCH /users/role/{id}
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<RoleUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|e: survey_types::models::UnknownRole| ApiError::Validation(e.to_string()))?;

    let target = id.clone();
    let result = state
        .with_store(move |db| Ok(UserStore::new(db).set_role(&target, role)?))
        .await?;

    info!("{} set role of user {} to {}", claims.email, id, role);
    Ok(Json(result))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    let result = state
        .with_store(move |db| Ok(UserStore::new(db).delete_by_id(&target)?))
        .await?;

    info!("{} deleted user {} ({} removed)", claims.email, id, result.deleted_count);
    Ok(Json(result))
}
