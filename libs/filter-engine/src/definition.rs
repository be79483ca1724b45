//! Filter definitions as published by the filter registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity a filter (or a DSL bucket) is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[serde(alias = "contacts")]
    Contact,
    #[serde(alias = "companies")]
    Company,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Contact, EntityKind::Company];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Company => "company",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Contact => Self::Company,
            Self::Company => Self::Contact,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntityKindError(pub String);

impl fmt::Display for ParseEntityKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entity '{}' (expected contact or company)", self.0)
    }
}

impl std::error::Error for ParseEntityKindError {}

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contact" | "contacts" => Ok(Self::Contact),
            "company" | "companies" => Ok(Self::Company),
            _ => Err(ParseEntityKindError(s.to_string())),
        }
    }
}

/// Where the selectable values of a filter come from. Selects the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Elasticsearch,
    Predefined,
    Direct,
    Specialized,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::Predefined => "predefined",
            Self::Direct => "direct",
            Self::Specialized => "specialized",
        }
    }
}

/// Index type of the underlying field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Keyword,
    Text,
    Range,
    Date,
    Boolean,
    Direct,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::Range => "range",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Direct => "direct",
        }
    }
}

/// Value shape a filter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Term,
    Range,
    Exists,
}

/// Underlying field names per entity context, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldsByEntity {
    #[serde(default)]
    pub contact: Vec<String>,
    #[serde(default)]
    pub company: Vec<String>,
}

impl FieldsByEntity {
    pub fn for_entity(&self, entity: EntityKind) -> &[String] {
        match entity {
            EntityKind::Contact => &self.contact,
            EntityKind::Company => &self.company,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub suggest_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteringSettings {
    #[serde(default)]
    pub supports_exclusion: bool,
    #[serde(default)]
    pub mode: FilterMode,
}

/// A selectable value published with the definition (predefined and specialized sources).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub name: String,
}

fn default_active() -> bool {
    true
}

/// Registry entry describing a filterable attribute and how to query it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub group: String,
    pub applies_to: Vec<EntityKind>,
    #[serde(rename = "data_source")]
    pub value_source: ValueSource,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(rename = "fields", default)]
    pub fields_by_entity: FieldsByEntity,
    /// Entity whose field mapping is used when the request context has none.
    #[serde(default)]
    pub target_entity: Option<EntityKind>,
    /// Single field name used by definitions that predate per-entity mappings.
    #[serde(rename = "field", default)]
    pub legacy_field: Option<String>,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub filtering: FilteringSettings,
    #[serde(default)]
    pub options: Vec<FilterOption>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl FilterDefinition {
    pub fn applies_to(&self, entity: EntityKind) -> bool {
        self.applies_to.contains(&entity)
    }

    /// True when the filter applies to `entity` and nothing else.
    pub fn only_applies_to(&self, entity: EntityKind) -> bool {
        self.applies_to(entity) && !self.applies_to(entity.other())
    }

    /// Location filters may sit in either bucket with distinct semantics.
    pub fn is_location(&self) -> bool {
        self.group.eq_ignore_ascii_case("location")
    }

    pub fn supports_exclusion(&self) -> bool {
        self.filtering.supports_exclusion
    }

    pub fn mode(&self) -> FilterMode {
        self.filtering.mode
    }

    /// Entity used by context-free operations such as value listing.
    pub fn default_entity(&self) -> EntityKind {
        self.target_entity
            .or_else(|| self.applies_to.first().copied())
            .unwrap_or(EntityKind::Contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_registry_contract() {
        let def: FilterDefinition = serde_json::from_value(json!({
            "id": "job_title",
            "label": "Job Title",
            "group": "role",
            "applies_to": ["contact"],
            "data_source": "elasticsearch",
            "type": "keyword",
            "fields": { "contact": ["job_title.keyword"] },
            "search": { "enabled": true, "suggest_fields": ["job_title"] },
            "filtering": { "supports_exclusion": true, "mode": "term" },
            "sort_order": 2,
            "active": true
        }))
        .unwrap();

        assert_eq!(def.value_source, ValueSource::Elasticsearch);
        assert_eq!(def.field_type, FieldType::Keyword);
        assert!(def.only_applies_to(EntityKind::Contact));
        assert_eq!(
            def.fields_by_entity.for_entity(EntityKind::Contact),
            ["job_title.keyword".to_string()]
        );
        assert!(def.fields_by_entity.company.is_empty());
        assert!(def.supports_exclusion());
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let def: FilterDefinition = serde_json::from_value(json!({
            "id": "has_email",
            "applies_to": ["contacts"],
            "data_source": "direct",
            "type": "boolean"
        }))
        .unwrap();

        assert!(def.active);
        assert_eq!(def.mode(), FilterMode::Term);
        assert!(!def.supports_exclusion());
        assert_eq!(def.default_entity(), EntityKind::Contact);
    }

    #[test]
    fn entity_kind_parses_plural_forms() {
        assert_eq!("companies".parse::<EntityKind>().unwrap(), EntityKind::Company);
        assert_eq!("Contact".parse::<EntityKind>().unwrap(), EntityKind::Contact);
        assert!("people".parse::<EntityKind>().is_err());
    }
}
