use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruz_lesson_id: Option<String>,
}

impl Resource for Lesson {
    const COLLECTION: &'static str = "lessons";
    const LABEL: &'static str = "Lesson";
    const PLURAL: &'static str = "Lessons";
    const NAME_FIELD: Option<&'static str> = None;
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "course_code",
        "room_name",
        "groups",
        "date",
        "start_time",
        "end_time",
        "lecturer",
        "ruz_lesson_id",
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
