pub mod resource_service;

use std::sync::Arc;

use crate::models::{Discipline, Equipment, Lesson, Record, Room};
use crate::store::DocumentStore;

pub use resource_service::{ResourceService, ServiceError};

/// Create the unique indexes every entity kind relies on
pub async fn ensure_indexes(store: &Arc<dyn DocumentStore>) -> Result<(), ServiceError> {
    ResourceService::<Room>::new(store.clone()).ensure_indexes().await?;
    ResourceService::<Equipment>::new(store.clone()).ensure_indexes().await?;
    ResourceService::<Discipline>::new(store.clone()).ensure_indexes().await?;
    ResourceService::<Lesson>::new(store.clone()).ensure_indexes().await?;
    ResourceService::<Record>::new(store.clone()).ensure_indexes().await?;
    Ok(())
}
