//! Record store adapter.
//!
//! Translates entity operations into collection-scoped document queries.
//! Documents cross this boundary as JSON objects whose `_id` field holds the
//! hex form of a store-native [`ObjectId`].

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A stored document keyed by field name.
pub type Document = Map<String, Value>;

/// Field carrying the document identifier.
pub const ID_FIELD: &str = "_id";

/// Errors from a [`DocumentStore`], discriminated by cause
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Document rejected: {0}")]
    Validation(String),

    #[error("Operation not supported by this store: {0}")]
    Unsupported(&'static str),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Collection-scoped document operations used by the resource services.
///
/// Implementations must treat `update_fields` as a merge (`$set` semantics)
/// and `replace_one` as an atomic swap of everything except `_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError>;

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Documents whose `field` equals any of `values`
    async fn find_many_by_field(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a document. A valid `_id` in the document is kept, otherwise one is assigned.
    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<ObjectId, StoreError>;

    /// Returns false when nothing matched `id`
    async fn delete_one(&self, collection: &str, id: &ObjectId) -> Result<bool, StoreError>;

    /// Merge `fields` into the document. Returns false when nothing matched `id`.
    async fn update_fields(
        &self,
        collection: &str,
        id: &ObjectId,
        fields: Document,
    ) -> Result<bool, StoreError>;

    /// Atomically replace the document contents, keeping `id`.
    async fn replace_one(
        &self,
        _collection: &str,
        _id: &ObjectId,
        _document: Document,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported("replace_one"))
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Release connections; called once at shutdown
    async fn close(&self) {}
}

/// Parse a caller-supplied identifier, `None` when it is not a well-formed ObjectId
pub fn parse_object_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw).ok()
}

/// Remove and parse the `_id` of a document bound for insertion.
pub(crate) fn take_id(document: &mut Document) -> Result<Option<ObjectId>, StoreError> {
    match document.remove(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => parse_object_id(&raw)
            .map(Some)
            .ok_or_else(|| StoreError::Validation(format!("invalid _id '{}'", raw))),
        Some(other) => Err(StoreError::Validation(format!("invalid _id {}", other))),
    }
}
