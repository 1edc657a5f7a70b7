use anyhow::{Result, anyhow, bail};
use serde_json::Value;
use tracing::{info, warn};

use survey_types::api::{DeleteResult, InsertResult, UpdateResult};
use survey_types::models::{Document, Role, User};

use crate::document::{Collection, DocumentStore, Filter, FindOptions, Update};

/// Result of `upsert_if_absent`. `Existing` means the stored account was
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(InsertResult),
    Existing,
}

pub struct UserStore<'a> {
    db: &'a dyn DocumentStore,
}

impl<'a> UserStore<'a> {
    pub fn new(db: &'a dyn DocumentStore) -> Self {
        Self { db }
    }

    /// Creates the account on first login. A supplied role must be one of the
    /// known roles; without one the account starts as a plain user.
    pub fn upsert_if_absent(&self, mut user: Document) -> Result<UpsertOutcome> {
        let email = match user.get("email") {
            Some(Value::String(email)) if !email.is_empty() => email.clone(),
            _ => bail!("user document has no email"),
        };
        let role = match user.get("role") {
            None | Some(Value::Null) => Role::default(),
            Some(Value::String(raw)) => raw.parse::<Role>()?,
            Some(other) => bail!("role must be a string, got {}", other),
        };
        user.insert("role".to_string(), Value::String(role.as_str().to_string()));

        let by_email = Filter::all().eq("email", email.as_str());
        match self.db.insert_if_absent(Collection::Users, &by_email, user)? {
            Some(inserted) => {
                info!("Created account {} as {}", email, role);
                Ok(UpsertOutcome::Created(inserted))
            }
            None => Ok(UpsertOutcome::Existing),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.db
            .find_one(Collection::Users, &Filter::all().eq("email", email))?
            .map(|doc| {
                serde_json::from_value(Value::Object(doc))
                    .map_err(|e| anyhow!("Corrupt user record for {}: {}", email, e))
            })
            .transpose()
    }

    /// The account's role, or `None` for an unknown account. A stored role
    /// outside the known set also reads as `None`, so gates deny it.
    pub fn role_of(&self, email: &str) -> Result<Option<Role>> {
        let Some(user) = self
            .db
            .find_one(Collection::Users, &Filter::all().eq("email", email))?
        else {
            return Ok(None);
        };
        match user.get("role") {
            None | Some(Value::Null) => Ok(Some(Role::default())),
            Some(Value::String(raw)) => match raw.parse::<Role>() {
                Ok(role) => Ok(Some(role)),
                Err(e) => {
                    warn!("Account {} holds an unusable role: {}", email, e);
                    Ok(None)
                }
            },
            Some(other) => {
                warn!("Account {} holds a non-string role: {}", email, other);
                Ok(None)
            }
        }
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        self.db.find(Collection::Users, &Filter::all(), &FindOptions::default())
    }

    pub fn set_role(&self, id: &str, role: Role) -> Result<UpdateResult> {
        self.db
            .update_one(Collection::Users, &Filter::by_id(id), &role_update(role), false)
    }

    pub fn set_role_by_email(&self, email: &str, role: Role) -> Result<UpdateResult> {
        self.db.update_one(
            Collection::Users,
            &Filter::all().eq("email", email),
            &role_update(role),
            false,
        )
    }

    pub fn delete_by_id(&self, id: &str) -> Result<DeleteResult> {
        self.db.delete_one(Collection::Users, &Filter::by_id(id))
    }
}

fn role_update(role: Role) -> Update {
    Update::default().set_field("role", role.as_str())
}
