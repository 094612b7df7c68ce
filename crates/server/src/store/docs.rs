// docs table access: insert, update, read, list, count.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quire_common::types::{iso_millis, Document};
use rusqlite::types::Type;
use rusqlite::{params, Connection};

/// Row-level operations on the `docs` table.
pub struct DocsTable;

impl DocsTable {
    pub fn insert(conn: &Connection, document: &Document) -> Result<()> {
        conn.execute(
            "INSERT INTO docs (id, title, content, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                document.id,
                document.title,
                document.content,
                encode_timestamp(document.created_at),
                encode_timestamp(document.updated_at),
            ],
        )
        .context("failed to insert docs row")?;
        Ok(())
    }

    /// Overwrite the mutable columns of a row. Returns false when no row matched.
    pub fn update(conn: &Connection, document: &Document) -> Result<bool> {
        let changed = conn
            .execute(
                "UPDATE docs SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    document.title,
                    document.content,
                    encode_timestamp(document.updated_at),
                    document.id,
                ],
            )
            .context("failed to update docs row")?;
        Ok(changed > 0)
    }

    pub fn get(conn: &Connection, id: &str) -> Result<Option<Document>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, title, content, created_at, updated_at \
                 FROM docs \
                 WHERE id = ?1",
            )
            .context("failed to prepare docs by id query")?;

        let mut rows = stmt.query_map(params![id], row_to_document).context("failed to query docs by id")?;

        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to decode docs row")?)),
            None => Ok(None),
        }
    }

    /// All rows, most recently updated first.
    pub fn list(conn: &Connection) -> Result<Vec<Document>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, title, content, created_at, updated_at \
                 FROM docs \
                 ORDER BY updated_at DESC, id ASC",
            )
            .context("failed to prepare docs list query")?;

        let rows = stmt.query_map([], row_to_document).context("failed to query docs list")?;

        rows.collect::<std::result::Result<Vec<_>, _>>().context("failed to collect docs rows")
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        conn.query_row("SELECT COUNT(1) FROM docs", [], |row| row.get(0))
            .context("failed to count docs rows")
    }
}

/// Fixed-width UTC text so lexical order matches chronological order.
fn encode_timestamp(at: DateTime<Utc>) -> String {
    iso_millis::format(&at)
}

fn decode_timestamp(index: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: decode_timestamp(3, row.get(3)?)?,
        updated_at: decode_timestamp(4, row.get(4)?)?,
    })
}
