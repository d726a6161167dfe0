use super::EntityType;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One importable entity as it travels through the queue.
///
/// Serialized as camelCase JSON. `entity_type` stays a plain string so that a
/// record with an unknown or missing type still parses and can be rejected
/// (and routed to the failure queue) by the consumer instead of being
/// discarded as unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntity {
    #[serde(default)]
    pub entity_type: String,

    #[serde(default)]
    pub origin_id: String,

    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<String>,

    #[serde(default)]
    pub data: EntityData,
}

impl QueuedEntity {
    pub fn new(kind: EntityType, source: impl Into<String>, origin_id: impl Into<String>) -> Self {
        Self {
            entity_type: kind.as_str().to_string(),
            origin_id: origin_id.into(),
            source: source.into(),
            last_edited: None,
            data: EntityData::default(),
        }
    }

    /// Parsed entity type, `None` if the tag is not supported
    pub fn kind(&self) -> Option<EntityType> {
        self.entity_type.parse().ok()
    }

    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Human readable form used in log lines: `'<default alias>' (<type> <originId>)`
impl std::fmt::Display for QueuedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self
            .data
            .default_alias()
            .or_else(|| self.data.alias.first())
            .map_or("[unknown]", |alias| alias.name.as_str());
        write!(f, "'{}' ({} {})", name, self.entity_type, self.origin_id)
    }
}

/// Normalized payload of an entity.
///
/// Fields that only some entity kinds carry (dates, areas, formats...) are
/// kept in `fields` and read through the typed sections in
/// [`crate::types::sections`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    #[serde(default)]
    pub alias: Vec<Alias>,

    #[serde(default)]
    pub identifiers: Vec<Identifier>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityData {
    /// The alias flagged as default, never simply the first one
    pub fn default_alias(&self) -> Option<&Alias> {
        self.alias.iter().find(|alias| alias.default)
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub sort_name: String,

    #[serde(default)]
    pub language_id: Option<i64>,

    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(default)]
    pub type_id: Option<i64>,

    #[serde(default)]
    pub value: String,
}

/// Source specific metadata, not validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}
