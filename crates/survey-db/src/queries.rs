use anyhow::{Result, bail};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use uuid::Uuid;

use survey_types::api::{DeleteResult, InsertResult, UpdateResult};
use survey_types::models::{Direction, Document};

use crate::Database;
use crate::document::{
    Clause, Collection, DocumentStore, Filter, FindOptions, ID_FIELD, Update, json_path,
};
use crate::models::DocumentRow;

impl DocumentStore for Database {
    fn insert_one(&self, collection: Collection, doc: Document) -> Result<InsertResult> {
        self.with_conn(|conn| insert_row(conn, collection, doc))
    }

    fn insert_if_absent(
        &self,
        collection: Collection,
        filter: &Filter,
        doc: Document,
    ) -> Result<Option<InsertResult>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if query_first(&tx, collection, filter)?.is_some() {
                return Ok(None);
            }
            let inserted = insert_row(&tx, collection, doc)?;
            tx.commit()?;
            Ok(Some(inserted))
        })
    }

    fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>> {
        self.with_conn(|conn| query_first(conn, collection, filter))?
            .map(DocumentRow::into_document)
            .transpose()
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>> {
        let rows = self.with_conn(|conn| query_rows(conn, collection, filter, options))?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    fn count(&self, collection: Collection, filter: &Filter) -> Result<u64> {
        let (clause, params) = compile(collection, filter)?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause);
        let count: i64 = self.with_conn(|conn| {
            Ok(conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| row.get(0))?)
        })?;
        Ok(count as u64)
    }

    fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let result = match query_first(&tx, collection, filter)? {
                Some(row) => {
                    let mut body = row.body()?;
                    let modified = update.apply(&mut body)?;
                    if modified {
                        tx.execute(
                            "UPDATE documents SET body = ?1 WHERE seq = ?2",
                            (serde_json::to_string(&body)?, row.seq),
                        )?;
                    }
                    UpdateResult {
                        matched_count: 1,
                        modified_count: u64::from(modified),
                        upserted_id: None,
                    }
                }
                None if upsert => {
                    // An `_id` term in the filter becomes the new document's id
                    let mut doc = filter.seed();
                    update.apply(&mut doc)?;
                    let inserted = insert_row(&tx, collection, doc)?;
                    UpdateResult {
                        matched_count: 0,
                        modified_count: 0,
                        upserted_id: Some(inserted.inserted_id),
                    }
                }
                None => UpdateResult::default(),
            };
            tx.commit()?;
            Ok(result)
        })
    }

    fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult> {
        let (clause, params) = compile(collection, filter)?;
        let sql = format!(
            "DELETE FROM documents WHERE seq = (SELECT seq FROM documents WHERE {} ORDER BY seq LIMIT 1)",
            clause
        );
        let deleted = self.with_conn(|conn| {
            Ok(conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?)
        })?;
        Ok(DeleteResult {
            deleted_count: deleted as u64,
        })
    }
}

fn insert_row(conn: &Connection, collection: Collection, mut doc: Document) -> Result<InsertResult> {
    let id = match doc.remove(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        (collection.as_str(), &id, serde_json::to_string(&doc)?),
    )?;
    Ok(InsertResult { inserted_id: id })
}

fn query_first(conn: &Connection, collection: Collection, filter: &Filter) -> Result<Option<DocumentRow>> {
    let options = FindOptions::default().limit(1);
    Ok(query_rows(conn, collection, filter, &options)?.into_iter().next())
}

fn query_rows(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
    options: &FindOptions,
) -> Result<Vec<DocumentRow>> {
    let (clause, mut params) = compile(collection, filter)?;
    let mut sql = format!("SELECT seq, id, body FROM documents WHERE {}", clause);

    // seq breaks ties so paging over equal sort keys stays stable
    match &options.sort {
        Some(sort) => {
            let direction = match sort.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            if sort.field == ID_FIELD {
                sql.push_str(&format!(" ORDER BY id {}, seq ASC", direction));
            } else {
                sql.push_str(&format!(" ORDER BY json_extract(body, ?) {}, seq ASC", direction));
                params.push(SqlValue::Text(json_path(&sort.field)?));
            }
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    sql.push_str(" LIMIT ? OFFSET ?");
    // SQLite reads a negative OFFSET as 0 and a negative LIMIT as no limit
    let limit = options.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let skip = i64::try_from(options.skip).unwrap_or(i64::MAX);
    params.push(SqlValue::Integer(limit));
    params.push(SqlValue::Integer(skip));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(DocumentRow {
                seq: row.get(0)?,
                id: row.get(1)?,
                body: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Builds the WHERE clause for a filter, scoped to one collection.
fn compile(collection: Collection, filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = String::from("collection = ?");
    let mut params = vec![SqlValue::Text(collection.as_str().to_string())];

    for clause in &filter.clauses {
        match clause {
            Clause::Eq { field, value } if field == ID_FIELD => match value {
                Value::String(id) => {
                    sql.push_str(" AND id = ?");
                    params.push(SqlValue::Text(id.clone()));
                }
                // ids are always strings
                _ => sql.push_str(" AND 0"),
            },
            Clause::Eq { field, value } => {
                params.push(SqlValue::Text(json_path(field)?));
                match scalar(value)? {
                    Some(value) => {
                        sql.push_str(" AND json_extract(body, ?) = ?");
                        params.push(value);
                    }
                    None => sql.push_str(" AND json_extract(body, ?) IS NULL"),
                }
            }
            Clause::Contains { field, needle } => {
                sql.push_str(" AND instr(lower(json_extract(body, ?)), lower(?)) > 0");
                params.push(SqlValue::Text(json_path(field)?));
                params.push(SqlValue::Text(needle.clone()));
            }
        }
    }

    Ok((sql, params))
}

/// Maps a JSON scalar to the SQL value `json_extract` yields for it.
fn scalar(value: &Value) -> Result<Option<SqlValue>> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => match n.as_f64() {
                Some(f) => Some(SqlValue::Real(f)),
                None => bail!("unsupported number in filter: {}", n),
            },
        },
        Value::Array(_) | Value::Object(_) => bail!("filters only compare scalar values"),
    })
}
