use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool, types::Json};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Document
///
/// A stored record: the store-assigned identifier plus the schemaless JSON body.
/// The body is always a JSON object; the identifier is never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Value,
}

/// Failures raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The caller tried to store something other than a JSON object.
    #[error("document body must be a JSON object")]
    NotAnObject,
}

/// Repository Trait
///
/// The document-store contract every collection is built on. Each method is a single
/// round trip touching at most one document, so the store's per-row atomicity is the
/// only consistency guarantee needed.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`) shareable
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Inserts `body` into `collection` and returns the generated identifier.
    async fn insert_one(&self, collection: &str, body: Value) -> Result<Uuid, StoreError>;

    /// Every document in `collection`, in insertion order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// First document whose top-level string `field` equals `value`.
    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrites the whole body. Returns the number of documents matched (0 or 1).
    async fn replace_by_id(&self, collection: &str, id: Uuid, body: Value) -> Result<u64, StoreError>;

    /// Shallow-merges the keys of `patch` into the stored body. Returns the number matched.
    async fn merge_by_id(&self, collection: &str, id: Uuid, patch: Value) -> Result<u64, StoreError>;

    /// Returns the number of documents removed (0 or 1).
    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<u64, StoreError>;

    /// Releases the underlying connections. Called once on shutdown.
    async fn close(&self) {}
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

fn ensure_object(body: &Value) -> Result<(), StoreError> {
    if body.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject)
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    body: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            body: row.body.0,
        }
    }
}

/// PostgresRepository
///
/// The production implementation, backed by a single `documents` table holding every
/// collection as JSONB (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn insert_one(&self, collection: &str, body: Value) -> Result<Uuid, StoreError> {
        ensure_object(&body)?;
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(Json(body))
            .execute(&self.pool)
            .await?;

        tracing::debug!(%id, collection, "document inserted");
        Ok(id)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, body
            FROM documents
            WHERE collection = $1 AND body ->> $2 = $3
            ORDER BY seq
            LIMIT 1
            "#,
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn replace_by_id(&self, collection: &str, id: Uuid, body: Value) -> Result<u64, StoreError> {
        ensure_object(&body)?;

        let result = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .bind(Json(body))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn merge_by_id(&self, collection: &str, id: Uuid, patch: Value) -> Result<u64, StoreError> {
        ensure_object(&patch)?;

        // `||` on two JSONB objects keeps the right-hand value for duplicate keys.
        let result = sqlx::query(
            "UPDATE documents SET body = body || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(patch))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// MemoryRepository
///
/// An in-process implementation of `Repository`. Used by the test suites and by local
/// runs started with `DATABASE_URL=memory://`, so the HTTP layer can be exercised without
/// a Postgres instance. Each collection is a `Vec`, which keeps insertion order.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    /// When true, all operations return a simulated failure.
    should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_one(&self, collection: &str, body: Value) -> Result<Uuid, StoreError> {
        self.check()?;
        ensure_object(&body)?;

        let id = Uuid::new_v4();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(Document { id, body });
        Ok(id)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.check()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.check()?;
        Ok(self.collections.read().await.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| doc.body.get(field).and_then(Value::as_str) == Some(value))
                .cloned()
        }))
    }

    async fn replace_by_id(&self, collection: &str, id: Uuid, body: Value) -> Result<u64, StoreError> {
        self.check()?;
        ensure_object(&body)?;

        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
        else {
            return Ok(0);
        };
        doc.body = body;
        Ok(1)
    }

    async fn merge_by_id(&self, collection: &str, id: Uuid, patch: Value) -> Result<u64, StoreError> {
        self.check()?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::NotAnObject);
        };

        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
        else {
            return Ok(0);
        };
        if let Value::Object(stored) = &mut doc.body {
            stored.extend(patch);
        }
        Ok(1)
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<u64, StoreError> {
        self.check()?;

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        Ok((before - docs.len()) as u64)
    }
}
