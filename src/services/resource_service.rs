use std::marker::PhantomData;
use std::sync::Arc;

use bson::oid::ObjectId;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::Resource;
use crate::store::{Document, DocumentStore, StoreError, ID_FIELD};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{label} {id} not found in the database")]
    NotFound { label: &'static str, id: String },

    #[error("{label} with name '{name}' already exists in the database")]
    AlreadyExists { label: &'static str, name: String },

    #[error("{label} has no mutable field(s): {}", .fields.join(", "))]
    UnknownFields {
        label: &'static str,
        fields: Vec<String>,
    },

    #[error("Invalid {label}: {reason}")]
    InvalidRecord { label: &'static str, reason: String },

    #[error("Stored {label} could not be decoded: {reason}")]
    Decode { label: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// CRUD lifecycle for one entity kind.
///
/// Enforces existence before mutation and uniqueness of
/// [`Resource::NAME_FIELD`] before insertion, then delegates to the store.
pub struct ResourceService<R> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Every record of this kind. Documents that don't decode are logged and skipped.
    pub async fn get_all(&self) -> Result<Vec<R>, ServiceError> {
        let documents = self.store.find_all(R::COLLECTION).await?;
        Ok(decode_listed(documents))
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Option<R>, ServiceError> {
        self.store
            .find_by_id(R::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn get_404(&self, id: &ObjectId) -> Result<R, ServiceError> {
        self.get(id).await?.ok_or_else(|| not_found::<R>(id))
    }

    /// Lookup by the uniqueness field. Kinds without one never match.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<R>, ServiceError> {
        let Some(field) = R::NAME_FIELD else {
            return Ok(None);
        };
        self.store
            .find_one_by_field(R::COLLECTION, field, &Value::String(name.to_string()))
            .await?
            .map(decode)
            .transpose()
    }

    /// Records whose `field` equals any of `values`
    pub async fn find_by_field(&self, field: &str, values: &[Value]) -> Result<Vec<R>, ServiceError> {
        let documents = self
            .store
            .find_many_by_field(R::COLLECTION, field, values)
            .await?;
        Ok(decode_listed(documents))
    }

    /// Insert a new record, returning it with its assigned `_id`.
    /// Any `_id` sent by the caller is ignored.
    pub async fn add(&self, mut record: R) -> Result<R, ServiceError> {
        let name = required_name(&record)?;
        if let Some(name) = &name {
            if self.get_by_name(name).await?.is_some() {
                info!("{} with name '{}' already exists in the database", R::LABEL, name);
                return Err(already_exists::<R>(name));
            }
        }

        let document = encode(&record)?;
        let id = match self.store.insert_one(R::COLLECTION, document).await {
            Ok(id) => id,
            Err(StoreError::DuplicateKey(detail)) => {
                info!("Duplicate key inserting {}: {}", R::LABEL, detail);
                return Err(already_exists::<R>(name.as_deref().unwrap_or_default()));
            }
            Err(e) => return Err(e.into()),
        };

        record.set_id(Some(id.to_hex()));
        info!("{} {} added to the database", R::LABEL, id);
        Ok(record)
    }

    /// Insert a placeholder carrying only `id`
    pub async fn add_empty(&self, id: &ObjectId) -> Result<(), ServiceError> {
        let mut placeholder = Document::new();
        placeholder.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        self.store.insert_one(R::COLLECTION, placeholder).await?;
        Ok(())
    }

    pub async fn remove(&self, id: &ObjectId) -> Result<(), ServiceError> {
        if !self.store.delete_one(R::COLLECTION, id).await? {
            return Err(not_found::<R>(id));
        }
        info!("{} {} deleted from the database", R::LABEL, id);
        Ok(())
    }

    /// Merge `fields` into the stored record, leaving other fields untouched.
    ///
    /// Only [`Resource::MUTABLE_FIELDS`] may appear, and the merged result
    /// must still decode as `R`. Returns the merged record.
    pub async fn patch_additional(&self, id: &ObjectId, fields: Document) -> Result<R, ServiceError> {
        let unknown: Vec<String> = fields
            .keys()
            .filter(|key| !R::MUTABLE_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ServiceError::UnknownFields {
                label: R::LABEL,
                fields: unknown,
            });
        }

        let mut merged = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| not_found::<R>(id))?;
        merged.extend(fields.clone());

        let record: R = serde_json::from_value(Value::Object(merged)).map_err(|e| {
            ServiceError::InvalidRecord {
                label: R::LABEL,
                reason: e.to_string(),
            }
        })?;
        let name = required_name(&record)?;
        if let (Some(field), Some(name)) = (R::NAME_FIELD, &name) {
            if fields.contains_key(field) {
                self.ensure_name_free(id, name).await?;
            }
        }

        self.update(id, fields, name.as_deref()).await?;
        info!("{} {} patched", R::LABEL, id);
        Ok(record)
    }

    /// Merge every set field of `record` into the stored document
    pub async fn patch_all(&self, id: &ObjectId, record: &R) -> Result<(), ServiceError> {
        let document = encode(record)?;
        self.update(id, document, record.name()).await
    }

    /// Overwrite the stored record with `record`, keeping its identifier.
    ///
    /// Uses the store's atomic replace. Stores without one fall back to
    /// remove, placeholder insert and patch, restoring the original
    /// document if a later step fails.
    pub async fn replace(&self, id: &ObjectId, mut record: R) -> Result<R, ServiceError> {
        let original = self
            .store
            .find_by_id(R::COLLECTION, id)
            .await?
            .ok_or_else(|| not_found::<R>(id))?;
        let name = required_name(&record)?;
        if let Some(name) = &name {
            self.ensure_name_free(id, name).await?;
        }

        let document = encode(&record)?;
        match self.store.replace_one(R::COLLECTION, id, document).await {
            Ok(true) => {}
            Ok(false) => return Err(not_found::<R>(id)),
            Err(StoreError::Unsupported(_)) => self.replace_in_steps(id, &record, original).await?,
            Err(StoreError::DuplicateKey(_)) => {
                return Err(already_exists::<R>(name.as_deref().unwrap_or_default()))
            }
            Err(e) => return Err(e.into()),
        }

        record.set_id(Some(id.to_hex()));
        info!("{} {} updated", R::LABEL, id);
        Ok(record)
    }

    async fn replace_in_steps(
        &self,
        id: &ObjectId,
        record: &R,
        original: Document,
    ) -> Result<(), ServiceError> {
        warn!(
            "Store has no atomic replace, rewriting {} {} in steps",
            R::LABEL,
            id
        );
        self.remove(id).await?;

        let steps = async {
            self.add_empty(id).await?;
            self.patch_all(id, record).await
        };
        if let Err(err) = steps.await {
            error!("Replacing {} {} failed, restoring original: {}", R::LABEL, id, err);
            self.restore(id, original).await;
            return Err(err);
        }
        Ok(())
    }

    async fn restore(&self, id: &ObjectId, original: Document) {
        if let Err(e) = self.store.delete_one(R::COLLECTION, id).await {
            error!("Could not clear placeholder for {} {}: {}", R::LABEL, id, e);
        }
        if let Err(e) = self.store.insert_one(R::COLLECTION, original).await {
            error!(
                "Could not restore {} {}, record is left in placeholder state: {}",
                R::LABEL,
                id,
                e
            );
        }
    }

    async fn update(
        &self,
        id: &ObjectId,
        fields: Document,
        name: Option<&str>,
    ) -> Result<(), ServiceError> {
        match self.store.update_fields(R::COLLECTION, id, fields).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(not_found::<R>(id)),
            Err(StoreError::DuplicateKey(_)) => Err(already_exists::<R>(name.unwrap_or_default())),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_name_free(&self, id: &ObjectId, name: &str) -> Result<(), ServiceError> {
        let hex = id.to_hex();
        match self.get_by_name(name).await? {
            Some(other) if other.id() != Some(hex.as_str()) => Err(already_exists::<R>(name)),
            _ => Ok(()),
        }
    }

    /// Create the unique index backing [`Resource::NAME_FIELD`]
    pub async fn ensure_indexes(&self) -> Result<(), ServiceError> {
        if let Some(field) = R::NAME_FIELD {
            self.store.ensure_unique_index(R::COLLECTION, field).await?;
        }
        Ok(())
    }
}

fn required_name<R: Resource>(record: &R) -> Result<Option<String>, ServiceError> {
    match (R::NAME_FIELD, record.name()) {
        (Some(field), None) => Err(ServiceError::InvalidRecord {
            label: R::LABEL,
            reason: format!("'{}' must be a non-empty string", field),
        }),
        (_, name) => Ok(name.map(str::to_string)),
    }
}

fn encode<R: Resource>(record: &R) -> Result<Document, ServiceError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(mut map)) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        Ok(other) => Err(ServiceError::InvalidRecord {
            label: R::LABEL,
            reason: format!("expected an object, got {}", other),
        }),
        Err(e) => Err(ServiceError::InvalidRecord {
            label: R::LABEL,
            reason: e.to_string(),
        }),
    }
}

fn decode<R: Resource>(document: Document) -> Result<R, ServiceError> {
    serde_json::from_value(Value::Object(document)).map_err(|e| ServiceError::Decode {
        label: R::LABEL,
        reason: e.to_string(),
    })
}

fn decode_listed<R: Resource>(documents: Vec<Document>) -> Vec<R> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .unwrap_or("<no _id>")
                .to_string();
            match decode::<R>(document) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping {} {} in listing: {}", R::LABEL, id, e);
                    None
                }
            }
        })
        .collect()
}

fn not_found<R: Resource>(id: &ObjectId) -> ServiceError {
    ServiceError::NotFound {
        label: R::LABEL,
        id: id.to_hex(),
    }
}

fn already_exists<R: Resource>(name: &str) -> ServiceError {
    ServiceError::AlreadyExists {
        label: R::LABEL,
        name: name.to_string(),
    }
}
