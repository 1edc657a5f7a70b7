use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::{
    ADMIN_ONLY, AUTHENTICATED, Gate, Guard, SELF_BY_EMAIL, SURVEYOR_ONLY, enforce,
};
use crate::{payments, reports, surveys, users, votes};

/// `/surveys/{key}` carries an owner email on GET and a survey id on PUT;
/// the router needs one parameter name per segment.
const SURVEY_OWNER_SELF: &[Gate] = &[Gate::Authenticated, Gate::SelfOrMatch("key")];

async fn welcome() -> &'static str {
    "Welcome..."
}

/// Every endpoint of the service. Gated routes get their gate list as a
/// route layer, so a denial never reaches the handler.
pub fn router(state: AppState) -> Router {
    let guard_state = state.clone();
    let gated = move |gates: &'static [Gate]| {
        middleware::from_fn_with_state(Guard::new(guard_state.clone(), gates), enforce)
    };

    Router::new()
        .route("/", get(welcome))
        // Identity
        .route("/jwt", post(auth::issue_token))
        // Surveys
        .route("/survey", post(surveys::create_survey))
        .route("/survey/{id}", get(surveys::get_survey))
        .route("/survey/{id}", delete(surveys::delete_survey))
        .route("/survey/{id}", put(surveys::replace_survey))
        .route("/surveys", get(surveys::top_surveys))
        .route(
            "/surveys/{key}",
            get(surveys::surveys_by_surveyor).route_layer(gated(SURVEY_OWNER_SELF)),
        )
        .route("/surveys/{key}", put(surveys::replace_survey))
        .route("/surveys/{key}/status", put(surveys::update_status))
        .route("/all-surveys", get(surveys::all_surveys))
        .route("/surveys-count", get(surveys::surveys_count))
        // Users
        .route("/users", put(users::upsert_user))
        .route("/users", get(users::list_users).route_layer(gated(ADMIN_ONLY)))
        .route(
            "/users/admin/{email}",
            get(users::is_admin).route_layer(gated(SELF_BY_EMAIL)),
        )
        .route(
            "/users/surveyor/{email}",
            get(users::is_surveyor).route_layer(gated(SELF_BY_EMAIL)),
        )
        .route(
            "/users/prouser/{email}",
            get(users::is_pro_user).route_layer(gated(SELF_BY_EMAIL)),
        )
        .route(
            "/users/user/{email}",
            get(users::is_user).route_layer(gated(SELF_BY_EMAIL)),
        )
        .route(
            "/users/role/{id}",
            patch(users::update_role).route_layer(gated(ADMIN_ONLY)),
        )
        .route(
            "/users/{id}",
            delete(users::delete_user).route_layer(gated(SURVEYOR_ONLY)),
        )
        // Payments
        .route("/create-payment-intent", post(payments::create_payment_intent))
        .route("/payments", post(payments::record_payment))
        .route("/payments", get(payments::list_payments))
        .route(
            "/payments/{email}",
            get(payments::payments_by_email).route_layer(gated(SELF_BY_EMAIL)),
        )
        // Votes
        .route("/votes", post(votes::cast_vote))
        .route("/votes", get(votes::list_votes))
        .route("/vote/{id}", get(votes::get_vote))
        .route("/votes/{email}", get(votes::votes_by_voter))
        .route("/comments/{email}", get(votes::comments_for_surveyor))
        // Reports
        .route("/reports", post(reports::create_report))
        .route("/reports", get(reports::list_reports))
        .route(
            "/reported/{email}",
            get(reports::reports_by_user).route_layer(gated(AUTHENTICATED)),
        )
        .route(
            "/report/{id}",
            get(reports::get_report).route_layer(gated(AUTHENTICATED)),
        )
        .with_state(state)
}
