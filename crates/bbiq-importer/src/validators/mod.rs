//! Structural validation of entity payloads before persistence.
//!
//! Validation is pure and deterministic: a payload that fails here will fail
//! again on every retry, so the consumer rejects it without touching the
//! database. Each entity kind has its own module; [`validate`] is the single
//! dispatch site and matches exhaustively over [`EntityType`].

mod author;
mod common;
mod edition;
mod edition_group;
mod publisher;
mod series;
mod work;

use crate::error::ValidationError;
use bbiq_common::types::EntityData;
use bbiq_common::EntityType;

/// Validate `data` as an entity of kind `kind`
pub fn validate(kind: EntityType, data: &EntityData) -> Result<(), ValidationError> {
    common::validate_common(data)?;

    match kind {
        EntityType::Author => author::validate(data),
        EntityType::Edition => edition::validate(data),
        EntityType::EditionGroup => edition_group::validate(data),
        EntityType::Publisher => publisher::validate(data),
        EntityType::Series => series::validate(data),
        EntityType::Work => work::validate(data),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_data(fields: serde_json::Value) -> EntityData {
        serde_json::from_value(fields).unwrap()
    }

    fn named(mut extra: serde_json::Value) -> EntityData {
        let object = extra.as_object_mut().unwrap();
        object.insert(
            "alias".into(),
            json!([{
                "name": "All Adventures of Jane Doe",
                "sortName": "All Adventures of Jane Doe",
                "languageId": 120,
                "default": true,
                "primary": true
            }]),
        );
        entity_data(extra)
    }

    #[test]
    fn test_every_kind_accepts_minimal_valid_data() {
        for kind in EntityType::ALL {
            let data = match kind {
                EntityType::Series => named(json!({"orderingTypeId": 1, "seriesType": "Work"})),
                _ => named(json!({})),
            };
            assert!(validate(kind, &data).is_ok(), "{kind} should be valid");
        }
    }

    #[test]
    fn test_common_checks_run_before_kind_checks() {
        let data = entity_data(json!({"alias": [], "pages": 0}));
        let err = validate(EntityType::Edition, &data).unwrap_err();
        assert_eq!(err.field, "alias");
    }

    #[test]
    fn test_kind_specific_failure() {
        let data = named(json!({"typeId": 0}));
        assert!(validate(EntityType::Work, &data).is_err());
        assert!(validate(EntityType::Author, &data).is_err());
        assert!(validate(EntityType::EditionGroup, &data).is_err());
    }
}
