//! SQLite document table
//!
//! Rows are durable in SQLite. A read-optimized mirror serves searches so that
//! concurrent queries only contend on a shared read lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{DistanceMetric, DocumentTable};
use crate::error::{Error, Result};
use crate::types::document::{decode_embedding, decode_metadata, encode_embedding, encode_metadata};
use crate::types::{Document, DocumentId, RetrievedMatch};

/// Check that a table name is a plain SQL identifier
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Config(format!("Invalid table name '{}'", name)));
    }
    Ok(())
}

/// Options for opening a table
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Table name
    pub table_name: String,
    /// Ranking metric; must match the persisted one on reopen
    pub metric: DistanceMetric,
    /// Embedding dimension used when the table is created
    pub dimension: usize,
}

impl TableOptions {
    /// Options with the default table name
    pub fn new(metric: DistanceMetric, dimension: usize) -> Self {
        Self {
            table_name: "vector_search".to_string(),
            metric,
            dimension,
        }
    }

    /// Use a different table name
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }
}

struct TableInner {
    conn: Mutex<Connection>,
    mirror: RwLock<BTreeMap<DocumentId, Document>>,
    table: String,
    metric: DistanceMetric,
    dimension: usize,
}

/// SQLite-backed document table
pub struct SqliteDocumentTable {
    inner: Arc<TableInner>,
    location: String,
}

impl SqliteDocumentTable {
    /// Create or open the table in the database at the given path
    pub fn open<P: AsRef<Path>>(path: P, options: TableOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::store(format!("Failed to open database {}: {}", path.display(), e)))?;
        Self::from_connection(conn, options, path.display().to_string())
    }

    /// Create an in-memory table
    pub fn in_memory(options: TableOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn, options, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, options: TableOptions, location: String) -> Result<Self> {
        validate_table_name(&options.table_name)?;

        let (metric, dimension) = migrate(&conn, &options)?;
        let mirror = load_documents(&conn, &options.table_name)?;

        tracing::info!(
            "Opened document table '{}' at {} ({} documents, dim={}, metric={})",
            options.table_name,
            location,
            mirror.len(),
            dimension,
            metric
        );

        Ok(Self {
            inner: Arc::new(TableInner {
                conn: Mutex::new(conn),
                mirror: RwLock::new(mirror),
                table: options.table_name,
                metric,
                dimension,
            }),
            location,
        })
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&TableInner) -> Result<T> + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner)).await?
    }
}

/// Create tables and reconcile persisted settings with `options`
fn migrate(conn: &Connection, options: &TableOptions) -> Result<(DistanceMetric, usize)> {
    let table = &options.table_name;

    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA temp_store=MEMORY;
        "#,
    )
    .map_err(|e| Error::store(format!("Failed to set pragmas: {}", e)))?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            doc_name TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata TEXT NOT NULL,
            embedding BLOB NOT NULL,
            ingested_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_{table}_doc_name ON {table}(doc_name);

        CREATE TABLE IF NOT EXISTS {table}_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#
    ))
    .map_err(|e| Error::store(format!("Failed to create tables: {}", e)))?;

    let stored_metric = read_meta(conn, table, "metric")?;
    let metric = match stored_metric {
        Some(raw) => {
            let persisted: DistanceMetric = raw.parse()?;
            if persisted != options.metric {
                return Err(Error::Config(format!(
                    "Table '{}' was created with metric '{}' but '{}' is configured",
                    table, persisted, options.metric
                )));
            }
            persisted
        }
        None => {
            write_meta(conn, table, "metric", options.metric.as_str())?;
            options.metric
        }
    };

    let dimension = match read_meta(conn, table, "dimension")? {
        Some(raw) => {
            let persisted: usize = raw.parse().map_err(|_| {
                Error::store(format!("Corrupt dimension '{}' in {}_meta", raw, table))
            })?;
            if persisted != options.dimension {
                tracing::warn!(
                    "Table '{}' stores {}-dimensional embeddings but the embedder produces {}",
                    table,
                    persisted,
                    options.dimension
                );
            }
            persisted
        }
        None => {
            write_meta(conn, table, "dimension", &options.dimension.to_string())?;
            options.dimension
        }
    };

    Ok((metric, dimension))
}

fn read_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            &format!("SELECT value FROM {}_meta WHERE key = ?1", table),
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

fn write_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT OR REPLACE INTO {}_meta (key, value) VALUES (?1, ?2)", table),
        params![key, value],
    )?;
    Ok(())
}

fn load_documents(conn: &Connection, table: &str) -> Result<BTreeMap<DocumentId, Document>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, doc_name, content, metadata, embedding, ingested_at FROM {}",
        table
    ))?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Vec<u8>>(4)?,
            row.get::<_, DateTime<Utc>>(5)?,
        ))
    })?;

    let mut documents = BTreeMap::new();
    for row in rows {
        let (id, name, content, metadata, embedding, ingested_at) = row?;
        let document = Document {
            id: id.clone(),
            name,
            content,
            metadata: decode_metadata(&metadata)?,
            embedding: decode_embedding(&embedding)?,
            ingested_at,
        };
        documents.insert(id, document);
    }
    Ok(documents)
}

impl TableInner {
    fn insert(&self, document: Document) -> Result<()> {
        if document.embedding.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: document.embedding.len(),
            });
        }

        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, doc_name, content, metadata, embedding, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.table
            ),
            params![
                document.id,
                document.name,
                document.content,
                encode_metadata(&document.metadata)?,
                encode_embedding(&document.embedding),
                document.ingested_at,
            ],
        )?;

        // Mirror updates happen under the connection lock so they follow commit order
        self.mirror.write().insert(document.id.clone(), document);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mirror = self.mirror.read();
        self.metric.rank(query, mirror.values(), k)
    }

    fn delete_by_name(&self, name: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE doc_name = ?1", self.table),
            params![name],
        )?;

        if removed > 0 {
            self.mirror.write().retain(|_, doc| doc.name != name);
        }
        Ok(removed)
    }

    fn update_metadata(&self, name: &str, key: &str, value: &str) -> Result<usize> {
        let mut conn = self.conn.lock();

        let mut patched = Vec::new();
        for doc in self.mirror.read().values().filter(|doc| doc.name == name) {
            let mut metadata = doc.metadata.clone();
            metadata.set(key, value)?;
            patched.push((doc.id.clone(), metadata));
        }
        if patched.is_empty() {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        for (id, metadata) in &patched {
            tx.execute(
                &format!("UPDATE {} SET metadata = ?1 WHERE id = ?2", self.table),
                params![encode_metadata(metadata)?, id],
            )?;
        }
        tx.commit()?;

        let mut mirror = self.mirror.write();
        for (id, metadata) in &patched {
            if let Some(doc) = mirror.get_mut(id) {
                doc.metadata = metadata.clone();
            }
        }
        Ok(patched.len())
    }

    fn get_by_name(&self, name: &str) -> Vec<Document> {
        self.mirror
            .read()
            .values()
            .filter(|doc| doc.name == name)
            .cloned()
            .collect()
    }

    fn health_check(&self) -> Result<bool> {
        let conn = self.conn.lock();
        let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(one == 1)
    }
}

#[async_trait]
impl DocumentTable for SqliteDocumentTable {
    async fn insert(&self, document: Document) -> Result<()> {
        self.blocking(move |inner| inner.insert(document)).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedMatch>> {
        let query = query.to_vec();
        self.blocking(move |inner| inner.search(&query, k)).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<usize> {
        let name = name.to_string();
        self.blocking(move |inner| inner.delete_by_name(&name)).await
    }

    async fn update_metadata(&self, name: &str, key: &str, value: &str) -> Result<usize> {
        let (name, key, value) = (name.to_string(), key.to_string(), value.to_string());
        self.blocking(move |inner| inner.update_metadata(&name, &key, &value))
            .await
    }

    async fn get_by_name(&self, name: &str) -> Result<Vec<Document>> {
        Ok(self.inner.get_by_name(name))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.mirror.read().len())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.inner.metric
    }

    async fn health_check(&self) -> Result<bool> {
        self.blocking(|inner| inner.health_check()).await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
