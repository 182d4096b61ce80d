use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde_json::Value;

use crate::auth::{ApiUser, DirectoryError, KeyDirectory};
use crate::store::{Document, DocumentStore, StoreError};

/// Store wrapper that counts calls and can simulate a weaker backend
pub struct ProbeStore {
    inner: Arc<dyn DocumentStore>,
    calls: AtomicUsize,
    atomic_replace: bool,
    hide_names: bool,
    fail_updates: AtomicBool,
}

impl ProbeStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            atomic_replace: true,
            hide_names: false,
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Behaves like a store lacking atomic replace
    pub fn without_replace(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            atomic_replace: false,
            ..Self::new(inner)
        }
    }

    /// Field lookups never match, so only unique indexes catch duplicates
    pub fn hide_names(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            hide_names: true,
            ..Self::new(inner)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for ProbeStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.find_all(collection).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.find_by_id(collection, id).await
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        if self.hide_names {
            return Ok(None);
        }
        self.inner.find_one_by_field(collection, field, value).await
    }

    async fn find_many_by_field(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.find_many_by_field(collection, field, values).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, StoreError> {
        self.hit();
        self.inner.insert_one(collection, document).await
    }

    async fn delete_one(&self, collection: &str, id: &ObjectId) -> Result<bool, StoreError> {
        self.hit();
        self.inner.delete_one(collection, id).await
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &ObjectId,
        fields: Document,
    ) -> Result<bool, StoreError> {
        self.hit();
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("simulated outage".to_string()));
        }
        self.inner.update_fields(collection, id, fields).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &ObjectId,
        document: Document,
    ) -> Result<bool, StoreError> {
        self.hit();
        if !self.atomic_replace {
            return Err(StoreError::Unsupported("replace_one"));
        }
        self.inner.replace_one(collection, id, document).await
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.hit();
        self.inner.ensure_unique_index(collection, field).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.hit();
        self.inner.ping().await
    }
}

/// Key directory whose backend is always down
pub struct BrokenDirectory;

#[async_trait]
impl KeyDirectory for BrokenDirectory {
    async fn find_by_key(&self, _key: &str) -> Result<Option<ApiUser>, DirectoryError> {
        Err(DirectoryError::Unavailable("connection refused".to_string()))
    }
}
