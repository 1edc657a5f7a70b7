pub mod auth;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod middleware;
pub mod payments;
pub mod reports;
pub mod routes;
pub mod surveys;
pub mod token;
pub mod users;
pub mod votes;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;
