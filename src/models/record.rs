use serde::{Deserialize, Serialize};

use super::Resource;

/// A lecture recording uploaded from a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
}

impl Resource for Record {
    const COLLECTION: &'static str = "records";
    const LABEL: &'static str = "Record";
    const PLURAL: &'static str = "Records";
    const NAME_FIELD: Option<&'static str> = None;
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "room_name",
        "date",
        "start_time",
        "end_time",
        "event_name",
        "drive_file_url",
        "lesson_id",
    ];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        None
    }
}
