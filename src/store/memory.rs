use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{take_id, Document, DocumentStore, StoreError, ID_FIELD};

#[derive(Default)]
struct Collections {
    documents: HashMap<String, Vec<Document>>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl Collections {
    /// Reject `document` if it collides with another document (other than `skip`) on a unique field.
    fn check_unique(
        &self,
        collection: &str,
        document: &Document,
        skip: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(fields) = self.unique_fields.get(collection) else {
            return Ok(());
        };
        let existing = self.documents.get(collection).map(Vec::as_slice).unwrap_or(&[]);

        for field in fields {
            let value = match document.get(field) {
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };
            let clash = existing.iter().any(|other| {
                id_of(other) != skip && other.get(field) == Some(value)
            });
            if clash {
                return Err(StoreError::DuplicateKey(format!(
                    "{}.{} = {}",
                    collection, field, value
                )));
            }
        }
        Ok(())
    }
}

fn id_of(document: &Document) -> Option<&str> {
    document.get(ID_FIELD).and_then(Value::as_str)
}

/// Process-local document store.
///
/// Keeps insertion order per collection and honours unique indexes, which is
/// enough to stand in for MongoDB in tests and throwaway local runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.documents.get(collection).cloned().unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let hex = id.to_hex();
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(hex.as_str())))
            .cloned())
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.get(field) == Some(value)))
            .cloned())
    }

    async fn find_many_by_field(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.get(field).map_or(false, |v| values.contains(v)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<ObjectId, StoreError> {
        let id = take_id(&mut document)?.unwrap_or_else(ObjectId::new);
        let hex = id.to_hex();

        let mut inner = self.inner.write().await;
        let taken = inner
            .documents
            .get(collection)
            .map_or(false, |docs| docs.iter().any(|d| id_of(d) == Some(hex.as_str())));
        if taken {
            return Err(StoreError::DuplicateKey(format!("{}._id = {}", collection, hex)));
        }
        inner.check_unique(collection, &document, None)?;

        document.insert(ID_FIELD.to_string(), Value::String(hex));
        inner
            .documents
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn delete_one(&self, collection: &str, id: &ObjectId) -> Result<bool, StoreError> {
        let hex = id.to_hex();
        let mut inner = self.inner.write().await;
        let Some(docs) = inner.documents.get_mut(collection) else {
            return Ok(false);
        };
        match docs.iter().position(|d| id_of(d) == Some(hex.as_str())) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &ObjectId,
        mut fields: Document,
    ) -> Result<bool, StoreError> {
        fields.remove(ID_FIELD);
        let hex = id.to_hex();
        let mut inner = self.inner.write().await;

        let Some(current) = inner
            .documents
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| id_of(d) == Some(hex.as_str())))
        else {
            return Ok(false);
        };
        let mut merged = current.clone();
        merged.extend(fields);
        inner.check_unique(collection, &merged, Some(&hex))?;

        if let Some(slot) = inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(hex.as_str())))
        {
            *slot = merged;
        }
        Ok(true)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &ObjectId,
        mut document: Document,
    ) -> Result<bool, StoreError> {
        let hex = id.to_hex();
        document.insert(ID_FIELD.to_string(), Value::String(hex.clone()));

        let mut inner = self.inner.write().await;
        let exists = inner
            .documents
            .get(collection)
            .map_or(false, |docs| docs.iter().any(|d| id_of(d) == Some(hex.as_str())));
        if !exists {
            return Ok(false);
        }
        inner.check_unique(collection, &document, Some(&hex))?;

        if let Some(slot) = inner
            .documents
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| id_of(d) == Some(hex.as_str())))
        {
            *slot = document;
        }
        Ok(true)
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let fields = inner.unique_fields.entry(collection.to_string()).or_default();
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_keeps_order() {
        let store = MemoryStore::new();
        let a = store.insert_one("rooms", doc(json!({"name": "504"}))).await.unwrap();
        let b = store.insert_one("rooms", doc(json!({"name": "505"}))).await.unwrap();
        assert_ne!(a, b);

        let all = store.find_all("rooms").await.unwrap();
        let names: Vec<_> = all.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["504", "505"]);
        assert_eq!(all[0]["_id"], json!(a.to_hex()));
    }

    #[tokio::test]
    async fn insert_keeps_caller_id() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        let got = store
            .insert_one("rooms", doc(json!({"_id": id.to_hex()})))
            .await
            .unwrap();
        assert_eq!(got, id);
        assert!(store.find_by_id("rooms", &id).await.unwrap().is_some());

        let again = store.insert_one("rooms", doc(json!({"_id": id.to_hex()}))).await;
        assert!(matches!(again, Err(StoreError::DuplicateKey(_))));
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store.ensure_unique_index("rooms", "name").await.unwrap();
        store.insert_one("rooms", doc(json!({"name": "504"}))).await.unwrap();
        let dup = store.insert_one("rooms", doc(json!({"name": "504"}))).await;
        assert!(matches!(dup, Err(StoreError::DuplicateKey(_))));
        // missing values never collide
        store.insert_one("rooms", doc(json!({}))).await.unwrap();
        store.insert_one("rooms", doc(json!({}))).await.unwrap();
        assert_eq!(store.find_all("rooms").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_fields_merges() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("equipment", doc(json!({"name": "Cam1", "ip": "10.0.0.1"})))
            .await
            .unwrap();
        assert!(store
            .update_fields("equipment", &id, doc(json!({"name": "Cam2", "port": 80})))
            .await
            .unwrap());

        let stored = store.find_by_id("equipment", &id).await.unwrap().unwrap();
        assert_eq!(stored["name"], json!("Cam2"));
        assert_eq!(stored["ip"], json!("10.0.0.1"));
        assert_eq!(stored["port"], json!(80));

        let missing = store
            .update_fields("equipment", &ObjectId::new(), doc(json!({"name": "x"})))
            .await
            .unwrap();
        assert!(!missing);
    }

    #[tokio::test]
    async fn replace_swaps_contents_and_keeps_id() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("rooms", doc(json!({"name": "504", "drive": "d"})))
            .await
            .unwrap();
        assert!(store
            .replace_one("rooms", &id, doc(json!({"name": "505"})))
            .await
            .unwrap());

        let stored = store.find_by_id("rooms", &id).await.unwrap().unwrap();
        assert_eq!(stored["name"], json!("505"));
        assert!(!stored.contains_key("drive"));
        assert_eq!(stored["_id"], json!(id.to_hex()));
    }

    #[tokio::test]
    async fn find_many_matches_any_value() {
        let store = MemoryStore::new();
        store.insert_one("equipment", doc(json!({"name": "a", "room_id": "504"}))).await.unwrap();
        store.insert_one("equipment", doc(json!({"name": "b", "room_id": "x"}))).await.unwrap();
        store.insert_one("equipment", doc(json!({"name": "c"}))).await.unwrap();

        let found = store
            .find_many_by_field("equipment", "room_id", &[json!("504"), json!("x")])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryStore::new();
        let id = store.insert_one("rooms", doc(json!({"name": "504"}))).await.unwrap();
        assert!(store.delete_one("rooms", &id).await.unwrap());
        assert!(!store.delete_one("rooms", &id).await.unwrap());
        assert!(store.find_by_id("rooms", &id).await.unwrap().is_none());
    }
}
