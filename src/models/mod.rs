//! Entity records stored in the document database.
//!
//! Every entity is a flat record of optional fields plus the store-assigned
//! `_id`. Unset fields are left out of stored documents.

mod discipline;
mod equipment;
mod lesson;
mod record;
mod room;

use serde::{de, de::DeserializeOwned, Deserialize, Deserializer, Serialize};

pub use discipline::Discipline;
pub use equipment::Equipment;
pub use lesson::Lesson;
pub use record::Record;
pub use room::Room;

/// An entity kind served by a [`ResourceService`](crate::services::ResourceService).
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection holding this kind
    const COLLECTION: &'static str;
    /// Singular label used in messages, e.g. "Room"
    const LABEL: &'static str;
    /// Label for list responses, e.g. "Rooms"
    const PLURAL: &'static str;
    /// Field that must be present and unique across the collection
    const NAME_FIELD: Option<&'static str>;
    /// Fields a partial patch may touch
    const MUTABLE_FIELDS: &'static [&'static str];

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: Option<String>);

    /// Value of [`Self::NAME_FIELD`], `None` when unset or blank
    fn name(&self) -> Option<&str>;
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Ports arrive as numbers from this service and as strings from older writers
pub(crate) fn port_number<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port '{}'", text))),
    }
}
