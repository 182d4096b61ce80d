use serde::{Deserialize, Serialize};

use super::Resource;

/// A course with the student groups attending it and who to notify
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discipline {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    // Blank codes are rejected on write; the default only lets placeholders decode.
    #[serde(default)]
    pub course_code: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

impl Resource for Discipline {
    const COLLECTION: &'static str = "disciplines";
    const LABEL: &'static str = "Discipline";
    const PLURAL: &'static str = "Disciplines";
    const NAME_FIELD: Option<&'static str> = Some("course_code");
    const MUTABLE_FIELDS: &'static [&'static str] = &["course_code", "groups", "emails"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn name(&self) -> Option<&str> {
        Some(self.course_code.as_str()).filter(|s| !s.trim().is_empty())
    }
}
