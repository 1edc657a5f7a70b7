use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (document collections)");
        conn.execute_batch(
            "
            CREATE TABLE documents (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                collection  TEXT NOT NULL,
                id          TEXT NOT NULL,
                body        TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(collection, id)
            );

            CREATE INDEX idx_documents_collection
                ON documents(collection, seq);

            -- One account per email
            CREATE UNIQUE INDEX idx_users_email
                ON documents(json_extract(body, '$.email'))
                WHERE collection = 'users';

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
