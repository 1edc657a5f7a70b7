//! Collection-level operations the rest of the service is written against.
//!
//! `DocumentStore` is deliberately small: find, insert, update, delete and
//! count over schemaless JSON documents. `Database` implements it on SQLite;
//! tests may wrap or replace it.

use anyhow::{Result, bail};
use serde_json::Value;

use survey_types::api::{DeleteResult, InsertResult, UpdateResult};
use survey_types::models::{Direction, Document};

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Surveys,
    Votes,
    Reports,
    Payments,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Surveys => "surveys",
            Self::Votes => "votes",
            Self::Reports => "reports",
            Self::Payments => "payments",
        }
    }
}

// -- Filters --

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field equals a scalar value.
    Eq { field: String, value: Value },
    /// Case-insensitive substring match on a string field.
    Contains { field: String, needle: String },
}

/// Conjunction of clauses. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.clauses.push(Clause::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        });
        self
    }

    /// Equality clauses seed the document created by an upsert, the same way
    /// a query's equality terms become fields of an upserted record.
    pub(crate) fn seed(&self) -> Document {
        let mut doc = Document::new();
        for clause in &self.clauses {
            if let Clause::Eq { field, value } = clause {
                if !field.contains('.') {
                    doc.insert(field.clone(), value.clone());
                }
            }
        }
        doc
    }
}

// -- Find options --

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn new(field: &str, direction: Direction) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }
}

/// Without a sort, documents come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(mut self, sort: Option<Sort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

// -- Updates --

/// `set` overwrites top-level fields; `inc` adds to numeric fields, treating
/// a missing field as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Document,
    pub inc: Vec<(String, i64)>,
}

impl Update {
    pub fn set(fields: Document) -> Self {
        Self {
            set: fields,
            inc: Vec::new(),
        }
    }

    pub fn set_field(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn inc(field: &str, by: i64) -> Self {
        Self {
            set: Document::new(),
            inc: vec![(field.to_string(), by)],
        }
    }

    /// Applies the update in place and reports whether anything changed.
    pub(crate) fn apply(&self, doc: &mut Document) -> Result<bool> {
        let before = doc.clone();
        for (field, value) in &self.set {
            if field == ID_FIELD {
                continue;
            }
            doc.insert(field.clone(), value.clone());
        }
        for (field, by) in &self.inc {
            let next = match doc.get(field) {
                None | Some(Value::Null) => Value::from(*by),
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(current) => match current.checked_add(*by) {
                        Some(next) => Value::from(next),
                        None => bail!("incrementing '{}' by {} overflows", field, by),
                    },
                    None => match n.as_f64() {
                        Some(current) => Value::from(current + *by as f64),
                        None => bail!("cannot increment non-finite field '{}'", field),
                    },
                },
                Some(other) => bail!("cannot increment non-numeric field '{}': {}", field, other),
            };
            doc.insert(field.clone(), next);
        }
        Ok(*doc != before)
    }
}

// -- Store --

pub trait DocumentStore: Send + Sync {
    fn insert_one(&self, collection: Collection, doc: Document) -> Result<InsertResult>;

    /// Inserts `doc` only when nothing matches `filter`, as one atomic step.
    /// Returns `None` when a matching document already existed.
    fn insert_if_absent(
        &self,
        collection: Collection,
        filter: &Filter,
        doc: Document,
    ) -> Result<Option<InsertResult>>;

    fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>>;

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>>;

    fn count(&self, collection: Collection, filter: &Filter) -> Result<u64>;

    /// Updates the first matching document. With `upsert`, a miss inserts a
    /// new document built from the filter's equality terms plus the update.
    fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult>;

    /// Deletes the first matching document. Deleting nothing is not an error.
    fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult>;
}

/// Adds an RFC 3339 `timestamp` unless the caller already supplied one.
pub fn stamp_if_absent(doc: &mut Document, field: &str) {
    if !doc.contains_key(field) {
        doc.insert(field.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
    }
}

/// Field names are interpolated into JSON paths, so only plain identifiers
/// and dotted paths of them are accepted.
pub(crate) fn json_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        bail!("invalid field name '{}'", field);
    }
    Ok(format!("$.{}", field))
}
