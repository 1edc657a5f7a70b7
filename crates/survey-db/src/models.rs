use anyhow::Result;
use serde_json::Value;

use survey_types::models::Document;

use crate::document::ID_FIELD;

/// Raw row of the `documents` table.
/// The body is stored without `_id`; the id has its own column and is put
/// back into the document on read.
pub struct DocumentRow {
    pub seq: i64,
    pub id: String,
    pub body: String,
}

impl DocumentRow {
    pub fn body(&self) -> Result<Document> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn into_document(self) -> Result<Document> {
        let mut doc = self.body()?;
        doc.insert(ID_FIELD.to_string(), Value::String(self.id));
        Ok(doc)
    }
}
