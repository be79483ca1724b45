//! The bucketed filter request.

use crate::definition::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Filter request split into `contact` and `company` buckets.
///
/// Each bucket maps a filter id to its raw value. Key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dsl {
    #[serde(default)]
    pub contact: Map<String, JsonValue>,
    #[serde(default)]
    pub company: Map<String, JsonValue>,
}

impl Dsl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, entity: EntityKind) -> &Map<String, JsonValue> {
        match entity {
            EntityKind::Contact => &self.contact,
            EntityKind::Company => &self.company,
        }
    }

    pub fn bucket_mut(&mut self, entity: EntityKind) -> &mut Map<String, JsonValue> {
        match entity {
            EntityKind::Contact => &mut self.contact,
            EntityKind::Company => &mut self.company,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contact.is_empty() && self.company.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contact.len() + self.company.len()
    }

    pub fn to_value(&self) -> JsonValue {
        let mut out = Map::new();
        out.insert("contact".to_string(), JsonValue::Object(self.contact.clone()));
        out.insert("company".to_string(), JsonValue::Object(self.company.clone()));
        JsonValue::Object(out)
    }
}
