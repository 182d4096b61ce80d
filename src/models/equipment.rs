use serde::{Deserialize, Serialize};

use super::{non_blank, port_number, Resource};

/// A camera, microphone or encoder installed in a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning room, by ObjectId or by room name. Not checked against `rooms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge: Option<String>,
    #[serde(
        default,
        deserialize_with = "port_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_editing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl Resource for Equipment {
    const COLLECTION: &'static str = "equipment";
    const LABEL: &'static str = "Equipment";
    const PLURAL: &'static str = "Equipment";
    const NAME_FIELD: Option<&'static str> = Some("name");
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "ip",
        "name",
        "room_id",
        "audio",
        "merge",
        "port",
        "rtsp",
        "tracking",
        "time_editing",
        "external_id",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        non_blank(&self.name)
    }
}
