use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde_json::{Map, Value};
use tracing::info;

use super::{take_id, Document, DocumentStore, StoreError, ID_FIELD};
use crate::config::StoreConfig;

/// Server error code for unique index violations
const DUPLICATE_KEY_CODE: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                StoreError::DuplicateKey(write_error.message.clone())
            }
            ErrorKind::Io(_)
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Connection(err.to_string()),
            ErrorKind::BsonSerialization(_)
            | ErrorKind::BsonDeserialization(_)
            | ErrorKind::InvalidArgument { .. } => StoreError::Validation(err.to_string()),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// MongoDB-backed document store. One client per process, opened in
/// [`MongoStore::connect`] and shut down through [`DocumentStore::close`].
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.app_name = Some("erudite".to_string());
        let client = Client::with_options(options)?;
        let database = client.database(config.database_name());

        info!("Opened MongoDB client for database: {}", config.database_name());
        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<bson::Document> {
        self.database.collection(name)
    }
}

/// JSON document (hex `_id`) into BSON (ObjectId `_id`)
fn to_bson(mut document: Document) -> Result<bson::Document, StoreError> {
    let id = take_id(&mut document)?;
    let mut out =
        bson::to_document(&document).map_err(|e| StoreError::Validation(e.to_string()))?;
    if let Some(id) = id {
        out.insert(ID_FIELD, id);
    }
    Ok(out)
}

/// BSON document back into the JSON shape handed to services
fn from_bson(mut document: bson::Document) -> Document {
    let id = document.remove(ID_FIELD);
    let mut out = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Some(id) = id {
        let hex = match id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };
        out.insert(ID_FIELD.to_string(), Value::String(hex));
    }
    out
}

fn value_to_bson(value: &Value) -> Result<Bson, StoreError> {
    bson::to_bson(value).map_err(|e| StoreError::Validation(e.to_string()))
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(None, None).await?;
        let documents: Vec<bson::Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(from_bson).collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
    ) -> Result<Option<Document>, StoreError> {
        let found = self
            .collection(collection)
            .find_one(doc! { ID_FIELD: *id }, None)
            .await?;
        Ok(found.map(from_bson))
    }

    async fn find_one_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError> {
        let found = self
            .collection(collection)
            .find_one(doc! { field: value_to_bson(value)? }, None)
            .await?;
        Ok(found.map(from_bson))
    }

    async fn find_many_by_field(
        &self,
        collection: &str,
        field: &str,
        values: &[Value],
    ) -> Result<Vec<Document>, StoreError> {
        let values = values
            .iter()
            .map(value_to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        let cursor = self
            .collection(collection)
            .find(doc! { field: { "$in": values } }, None)
            .await?;
        let documents: Vec<bson::Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(from_bson).collect())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<ObjectId, StoreError> {
        let mut document = to_bson(document)?;
        if !document.contains_key(ID_FIELD) {
            document.insert(ID_FIELD, ObjectId::new());
        }
        let result = self.collection(collection).insert_one(document, None).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Backend("inserted _id is not an ObjectId".to_string()))
    }

    async fn delete_one(&self, collection: &str, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(doc! { ID_FIELD: *id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &ObjectId,
        mut fields: Document,
    ) -> Result<bool, StoreError> {
        fields.remove(ID_FIELD);
        if fields.is_empty() {
            return Ok(self.find_by_id(collection, id).await?.is_some());
        }
        let fields = to_bson(fields)?;
        let result = self
            .collection(collection)
            .update_one(doc! { ID_FIELD: *id }, doc! { "$set": fields }, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn replace_one(
        &self,
        collection: &str,
        id: &ObjectId,
        mut document: Document,
    ) -> Result<bool, StoreError> {
        document.remove(ID_FIELD);
        let replacement = to_bson(document)?;
        let result = self
            .collection(collection)
            .replace_one(doc! { ID_FIELD: *id }, replacement, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let options = IndexOptions::builder().unique(true).sparse(true).build();
        let model = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(options)
            .build();
        self.collection(collection).create_index(model, None).await?;
        info!("Ensured unique index on {}.{}", collection, field);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("Closed MongoDB client");
    }
}
