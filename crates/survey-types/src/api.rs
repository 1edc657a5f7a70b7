use serde::{Deserialize, Serialize};

use crate::models::{Direction, Document};

// -- JWT Claims --

/// Claims carried by an identity token. Whatever profile fields the client
/// sent at issuance (name, photo, ...) ride along in `profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub profile: Document,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Store results --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub inserted_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}

// -- Users --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertUserResponse {
    pub message: String,
    pub inserted_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: String,
}

// -- Surveys --

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyPage {
    pub surveys: Vec<Document>,
    pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Query string of `/all-surveys` and `/surveys-count`.
///
/// Every field is kept as raw text: browsers send `page=` or `size=abc` and
/// those must fall back to the defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListSurveysQuery {
    pub size: Option<String>,
    pub page: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
}

impl ListSurveysQuery {
    /// 1-based page index.
    pub fn page(&self) -> u64 {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn size(&self) -> u64 {
        positive_or(self.size.as_deref(), DEFAULT_PAGE_SIZE)
    }

    /// Category to match exactly.
    pub fn category(&self) -> Option<&str> {
        non_blank(self.filter.as_deref())
    }

    /// Title fragment to match case-insensitively.
    pub fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    /// Deadline ordering (`asc` / `desc`).
    pub fn deadline_order(&self) -> Option<Direction> {
        match non_blank(self.sort.as_deref())?.to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Ascending),
            "desc" => Some(Direction::Descending),
            _ => None,
        }
    }
}

/// Query string of `GET /surveys`.
#[derive(Debug, Default, Deserialize)]
pub struct TopSurveysQuery {
    pub sort: Option<String>,
}

impl TopSurveysQuery {
    /// Parses `voteCount_DESC`, `timestamp_ASC` and friends. Unknown keys
    /// yield `None`, which means insertion order.
    pub fn sort_key(&self) -> Option<(&'static str, Direction)> {
        let (field, direction) = self.sort.as_deref()?.rsplit_once('_')?;
        let field = match field {
            "voteCount" => "voteCount",
            "timestamp" => "timestamp",
            _ => return None,
        };
        let direction = match direction.to_ascii_uppercase().as_str() {
            "ASC" => Direction::Ascending,
            "DESC" => Direction::Descending,
            _ => return None,
        };
        Some((field, direction))
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

// -- Payments --

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_result: InsertResult,
    pub user_update_result: UpdateResult,
}
