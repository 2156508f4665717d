use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::Stored,
    repository::{Document, RepositoryState, StoreError},
};

/// Record
///
/// A record type that lives in its own collection. The collection contract below is
/// instantiated once per implementor (clothing items, testimonials, comments).
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the backing collection in the document store.
    const COLLECTION: &'static str;
    /// Human-readable singular used in response messages ("Cloth not found").
    const LABEL: &'static str;
}

#[derive(Debug, Error)]
pub enum CollectionError {
    /// The id is malformed or matches no document.
    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored body or an incoming record could not be (de)serialized.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Parses a client-supplied identifier. Anything that is not a UUID can never match.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

/// Collection
///
/// Typed CRUD over one collection of the shared document store. Cheap to clone: it only
/// holds the repository handle.
pub struct Collection<T> {
    repo: RepositoryState,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            repo,
            _record: PhantomData,
        }
    }

    fn decode(doc: Document) -> Result<Stored<T>, CollectionError> {
        Ok(Stored {
            id: doc.id,
            fields: serde_json::from_value(doc.body)?,
        })
    }

    /// Inserts a new record and returns its generated identifier.
    pub async fn create(&self, fields: T) -> Result<Uuid, CollectionError> {
        let body = serde_json::to_value(fields)?;
        Ok(self.repo.insert_one(T::COLLECTION, body).await?)
    }

    /// Every record, in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Stored<T>>, CollectionError> {
        self.repo
            .find_all(T::COLLECTION)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Stored<T>, CollectionError> {
        let id = parse_id(id).ok_or(CollectionError::NotFound)?;
        let doc = self
            .repo
            .find_by_id(T::COLLECTION, id)
            .await?
            .ok_or(CollectionError::NotFound)?;
        Self::decode(doc)
    }

    /// replace_by_id
    ///
    /// Full overwrite. Fields that are `None` in `fields` are not serialized, so they are
    /// absent from the stored record afterwards. Replacing a record with identical content
    /// still succeeds.
    pub async fn replace_by_id(&self, id: &str, fields: T) -> Result<(), CollectionError> {
        let id = parse_id(id).ok_or(CollectionError::NotFound)?;
        let body = serde_json::to_value(fields)?;
        match self.repo.replace_by_id(T::COLLECTION, id, body).await? {
            0 => Err(CollectionError::NotFound),
            _ => Ok(()),
        }
    }

    /// merge_by_id
    ///
    /// Partial patch: only the fields present in `fields` overwrite stored values.
    pub async fn merge_by_id(&self, id: &str, fields: T) -> Result<(), CollectionError> {
        let id = parse_id(id).ok_or(CollectionError::NotFound)?;
        let patch = serde_json::to_value(fields)?;
        match self.repo.merge_by_id(T::COLLECTION, id, patch).await? {
            0 => Err(CollectionError::NotFound),
            _ => Ok(()),
        }
    }

    /// Returns how many records were removed. A malformed id removes nothing.
    pub async fn delete_by_id(&self, id: &str) -> Result<u64, CollectionError> {
        let Some(id) = parse_id(id) else {
            return Ok(0);
        };
        Ok(self.repo.delete_by_id(T::COLLECTION, id).await?)
    }
}
