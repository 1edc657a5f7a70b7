use std::collections::HashMap;

use axum::{
    RequestPartsExt,
    extract::{Path, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use survey_db::UserStore;
use survey_types::api::Claims;
use survey_types::models::Role;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// One authorization check. Gates run in the order an endpoint lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A valid, unexpired bearer token.
    Authenticated,
    /// The named path parameter must equal the token's email.
    SelfOrMatch(&'static str),
    /// The caller's stored role must be exactly this role.
    HasRole(Role),
}

pub const AUTHENTICATED: &[Gate] = &[Gate::Authenticated];
pub const SELF_BY_EMAIL: &[Gate] = &[Gate::Authenticated, Gate::SelfOrMatch("email")];
pub const ADMIN_ONLY: &[Gate] = &[Gate::Authenticated, Gate::HasRole(Role::Admin)];
pub const SURVEYOR_ONLY: &[Gate] = &[Gate::Authenticated, Gate::HasRole(Role::Surveyor)];

/// What the gates get to look at.
pub struct GateInput<'a> {
    pub authorization: Option<&'a str>,
    pub params: &'a HashMap<String, String>,
}

/// Runs `gates` left to right. The first denial is returned and nothing after
/// it runs. On success yields the verified claims, if any gate produced them.
pub async fn evaluate(
    state: &AppStateInner,
    gates: &[Gate],
    input: &GateInput<'_>,
) -> Result<Option<Claims>, ApiError> {
    let mut principal: Option<Claims> = None;

    for gate in gates {
        match *gate {
            Gate::Authenticated => {
                let token = bearer_token(input.authorization)?;
                principal = Some(state.tokens.verify(Some(token))?);
            }
            Gate::SelfOrMatch(param) => {
                let claims = principal.as_ref().ok_or(ApiError::Unauthenticated)?;
                if input.params.get(param) != Some(&claims.email) {
                    warn!(
                        "{} tried to access {}={:?}",
                        claims.email,
                        param,
                        input.params.get(param)
                    );
                    return Err(ApiError::Forbidden);
                }
            }
            Gate::HasRole(required) => {
                let email = principal.as_ref().ok_or(ApiError::Unauthenticated)?.email.clone();
                let lookup = email.clone();
                let role = state
                    .with_store(move |db| Ok(UserStore::new(db).role_of(&lookup)?))
                    .await?;
                if role != Some(required) {
                    warn!("{} lacks role {} (has {:?})", email, required, role);
                    return Err(ApiError::Forbidden);
                }
            }
        }
    }

    Ok(principal)
}

/// Missing header, or anything that is not `Bearer <token>`, counts as no token.
fn bearer_token(header: Option<&str>) -> Result<&str, ApiError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthenticated)
}

/// Route-level state for `enforce`: the app plus the gates of one endpoint.
#[derive(Clone)]
pub struct Guard {
    state: AppState,
    gates: &'static [Gate],
}

impl Guard {
    pub fn new(state: AppState, gates: &'static [Gate]) -> Self {
        Self { state, gates }
    }
}

/// Axum middleware running an endpoint's gates. Verified claims are put in
/// the request extensions for the handler.
pub async fn enforce(
    State(guard): State<Guard>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();
    let params = parts
        .extract::<Path<HashMap<String, String>>>()
        .await
        .map(|Path(params)| params)
        .unwrap_or_default();
    let authorization = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal = evaluate(
        &guard.state,
        guard.gates,
        &GateInput {
            authorization,
            params: &params,
        },
    )
    .await?;

    let mut req = Request::from_parts(parts, body);
    if let Some(claims) = principal {
        req.extensions_mut().insert(claims);
    }
    Ok(next.run(req).await)
}
