use serde::{Deserialize, Serialize};

use super::{non_blank, Resource};

/// A lecture room with its media sources and scheduling links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Shared drive folder for recordings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    /// Room id in the university timetable (RUZ)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruz_id: Option<String>,
}

impl Resource for Room {
    const COLLECTION: &'static str = "rooms";
    const LABEL: &'static str = "Room";
    const PLURAL: &'static str = "Rooms";
    const NAME_FIELD: Option<&'static str> = Some("name");
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "name",
        "drive",
        "calendar",
        "tracking_state",
        "main_source",
        "screen_source",
        "sound_source",
        "tracking_source",
        "auto_control",
        "stream_url",
        "ruz_id",
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
