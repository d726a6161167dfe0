//! Typed views over the kind-specific fields of [`EntityData`].
//!
//! Each section is deserialized from [`EntityData::fields`]; unknown keys are
//! ignored and a field with the wrong JSON type is a parse error.

use super::EntityData;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read a section out of the flattened kind-specific fields
pub fn read_section<T: DeserializeOwned>(data: &EntityData) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(data.fields.clone()))?)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSection {
    pub type_id: Option<i64>,
    pub gender_id: Option<i64>,
    pub begin_area_id: Option<i64>,
    pub begin_date: Option<String>,
    pub end_area_id: Option<i64>,
    pub end_date: Option<String>,
    pub ended: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRef {
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionSection {
    pub depth: Option<i64>,
    pub edition_group_bbid: Option<String>,
    pub format_id: Option<i64>,
    pub height: Option<i64>,
    #[serde(default)]
    pub languages: Vec<LanguageRef>,
    pub pages: Option<i64>,
    pub status_id: Option<i64>,
    pub weight: Option<i64>,
    pub width: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionGroupSection {
    pub type_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublisherSection {
    pub area_id: Option<i64>,
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub ended: Option<bool>,
    pub type_id: Option<i64>,
}

/// Series carry the kind of their items; older producers name it `entityType`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSection {
    pub ordering_type_id: Option<i64>,
    #[serde(alias = "entityType")]
    pub series_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSection {
    pub type_id: Option<i64>,
    #[serde(default)]
    pub languages: Vec<LanguageRef>,
}
