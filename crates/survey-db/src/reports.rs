use anyhow::Result;

use survey_types::api::InsertResult;
use survey_types::models::Document;

use crate::document::{Collection, DocumentStore, Filter, FindOptions, stamp_if_absent};

/// Reports filed against surveys. Stored and listed only; there is no
/// moderation state.
pub struct ReportLog<'a> {
    db: &'a dyn DocumentStore,
}

impl<'a> ReportLog<'a> {
    pub fn new(db: &'a dyn DocumentStore) -> Self {
        Self { db }
    }

    pub fn record(&self, mut report: Document) -> Result<InsertResult> {
        stamp_if_absent(&mut report, "timestamp");
        self.db.insert_one(Collection::Reports, report)
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        self.db.find(Collection::Reports, &Filter::all(), &FindOptions::default())
    }

    pub fn by_user(&self, email: &str) -> Result<Vec<Document>> {
        self.db.find(
            Collection::Reports,
            &Filter::all().eq("userEmail", email),
            &FindOptions::default(),
        )
    }

    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        self.db.find_one(Collection::Reports, &Filter::by_id(id))
    }
}
