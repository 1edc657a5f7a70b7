use anyhow::Result;

use survey_types::api::InsertResult;
use survey_types::models::Document;

use crate::document::{Collection, DocumentStore, Filter, FindOptions, stamp_if_absent};

/// Append-only record of settled payments.
pub struct PaymentLedger<'a> {
    db: &'a dyn DocumentStore,
}

impl<'a> PaymentLedger<'a> {
    pub fn new(db: &'a dyn DocumentStore) -> Self {
        Self { db }
    }

    pub fn record(&self, mut payment: Document) -> Result<InsertResult> {
        stamp_if_absent(&mut payment, "timestamp");
        self.db.insert_one(Collection::Payments, payment)
    }

    pub fn list_all(&self) -> Result<Vec<Document>> {
        self.db.find(Collection::Payments, &Filter::all(), &FindOptions::default())
    }

    pub fn by_email(&self, email: &str) -> Result<Vec<Document>> {
        self.db.find(
            Collection::Payments,
            &Filter::all().eq("email", email),
            &FindOptions::default(),
        )
    }
}
