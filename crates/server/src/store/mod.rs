// Document persistence: schema management plus the document operations the
// HTTP service exposes.

pub mod docs;
pub mod meta_db;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use quire_common::types::{
    normalize_title, now_millis, Document, DocumentPatch, WELCOME_CONTENT, WELCOME_TITLE,
};
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use self::docs::DocsTable;
use self::meta_db::MetaDb;

/// Shared handle to the document database.
///
/// Constructed once at startup and handed to the HTTP layer; every clone
/// talks to the same connection. Each operation holds the connection for
/// its full duration on a blocking thread.
#[derive(Clone)]
pub struct DocumentStore {
    db: Arc<Mutex<MetaDb>>,
}

impl DocumentStore {
    pub fn new(db: MetaDb) -> Self {
        Self { db: Arc::new(Mutex::new(db)) }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        MetaDb::open(path).map(Self::new)
    }

    pub fn in_memory() -> Result<Self> {
        MetaDb::in_memory().map(Self::new)
    }

    /// All documents, most recently updated first. Seeds an empty store.
    pub async fn list(&self) -> Result<Vec<Document>> {
        self.with_conn(|conn| {
            ensure_seed(conn, now_millis())?;
            DocsTable::list(conn)
        })
        .await
    }

    pub async fn get(&self, id: impl Into<String>) -> Result<Option<Document>> {
        let id = id.into();
        self.with_conn(move |conn| DocsTable::get(conn, &id)).await
    }

    pub async fn create(&self, patch: DocumentPatch) -> Result<Document> {
        self.with_conn(move |conn| create_document(conn, patch, now_millis())).await
    }

    /// `Ok(None)` when no document has this id.
    pub async fn update(&self, id: impl Into<String>, patch: DocumentPatch) -> Result<Option<Document>> {
        let id = id.into();
        self.with_conn(move |conn| update_document(conn, &id, patch, now_millis())).await
    }

    /// Returns true when the welcome document was inserted by this call.
    pub async fn ensure_seed(&self) -> Result<bool> {
        self.with_conn(|conn| ensure_seed(conn, now_millis())).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.with_conn(|conn| DocsTable::count(conn)).await
    }

    async fn with_conn<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = db.lock().map_err(|_| anyhow!("document store lock poisoned"))?;
            op(guard.connection_mut())
        })
        .await
        .context("document store task failed to complete")?
    }
}

/// Insert a new document, applying title normalization and the welcome
/// template when content is absent.
pub fn create_document(conn: &Connection, patch: DocumentPatch, now: DateTime<Utc>) -> Result<Document> {
    let document = Document {
        id: Uuid::new_v4().to_string(),
        title: normalize_title(patch.title.as_deref()),
        content: patch.content.unwrap_or_else(|| WELCOME_CONTENT.to_owned()),
        created_at: now,
        updated_at: now,
    };

    DocsTable::insert(conn, &document)?;
    let created = DocsTable::get(conn, &document.id)?
        .ok_or_else(|| anyhow!("document `{}` missing right after insert", document.id))?;

    debug!(doc_id = %created.id, "document created");
    Ok(created)
}

/// Apply a partial update. Fields absent from the patch keep their stored
/// value; `updated_at` is refreshed on every successful call and never moves
/// backwards.
pub fn update_document(
    conn: &mut Connection,
    id: &str,
    patch: DocumentPatch,
    now: DateTime<Utc>,
) -> Result<Option<Document>> {
    let tx = conn.transaction().context("failed to start update transaction")?;

    let Some(existing) = DocsTable::get(&tx, id)? else {
        return Ok(None);
    };

    let next = Document {
        title: match patch.title.as_deref() {
            Some(title) => normalize_title(Some(title)),
            None => existing.title.clone(),
        },
        content: patch.content.unwrap_or_else(|| existing.content.clone()),
        updated_at: now.max(existing.updated_at),
        ..existing
    };

    DocsTable::update(&tx, &next)?;
    let updated = DocsTable::get(&tx, id)?;
    tx.commit().context("failed to commit update transaction")?;

    debug!(doc_id = %id, "document updated");
    Ok(updated)
}

/// Materialize the welcome document when the store holds no documents.
pub fn ensure_seed(conn: &mut Connection, now: DateTime<Utc>) -> Result<bool> {
    let tx = conn.transaction().context("failed to start seed transaction")?;

    if DocsTable::count(&tx)? > 0 {
        return Ok(false);
    }

    let seeded = create_document(
        &tx,
        DocumentPatch::full(WELCOME_TITLE, WELCOME_CONTENT),
        now,
    )?;
    tx.commit().context("failed to commit seed transaction")?;

    info!(doc_id = %seeded.id, "seeded welcome document into empty store");
    Ok(true)
}
