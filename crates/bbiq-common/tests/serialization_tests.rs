//! Round-trip properties of the queued entity representation

use bbiq_common::types::{Alias, EntityData, Identifier, Link, QueuedEntity, Relationship};
use bbiq_common::EntityType;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,'-]{0,24}"
}

fn arb_alias() -> impl Strategy<Value = Alias> {
    (arb_text(), arb_text(), proptest::option::of(1i64..10_000), any::<bool>(), any::<bool>()).prop_map(
        |(name, sort_name, language_id, default, primary)| Alias {
            name,
            sort_name,
            language_id,
            default,
            primary,
        },
    )
}

fn arb_identifier() -> impl Strategy<Value = Identifier> {
    (proptest::option::of(1i64..64), arb_text()).prop_map(|(type_id, value)| Identifier { type_id, value })
}

fn arb_fields() -> impl Strategy<Value = Map<String, Value>> {
    (
        proptest::option::of(1i64..10),
        proptest::option::of("[0-9]{4}(-[0-9]{2}){0,2}"),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(type_id, begin_date, ended)| {
            let mut fields = Map::new();
            if let Some(type_id) = type_id {
                fields.insert("typeId".into(), json!(type_id));
            }
            if let Some(date) = begin_date {
                fields.insert("beginDate".into(), json!(date));
            }
            if let Some(ended) = ended {
                fields.insert("ended".into(), json!(ended));
            }
            fields
        })
}

fn arb_entity() -> impl Strategy<Value = QueuedEntity> {
    (
        proptest::sample::select(EntityType::ALL.to_vec()),
        "[A-Z]{2}[0-9]{1,8}[AWM]",
        proptest::option::of("20[0-9]{2}-[01][0-9]-[0-3][0-9]"),
        proptest::collection::vec(arb_alias(), 0..4),
        proptest::collection::vec(arb_identifier(), 0..4),
        proptest::option::of(arb_text()),
        arb_fields(),
        proptest::collection::vec((arb_text(), arb_text()), 0..3),
    )
        .prop_map(
            |(kind, origin_id, last_edited, alias, identifiers, disambiguation, fields, links)| {
                let mut entity = QueuedEntity::new(kind, "OPENLIBRARY", origin_id);
                entity.last_edited = last_edited;
                entity.data = EntityData {
                    alias,
                    identifiers,
                    disambiguation,
                    fields,
                    ..EntityData::default()
                };
                entity.data.metadata.links = links
                    .into_iter()
                    .map(|(title, url)| Link { title, url })
                    .collect();
                entity.data.metadata.relationships.push(Relationship {
                    kind: "authoredBy".into(),
                    value: "OL1A".into(),
                });
                entity
            },
        )
}

proptest! {
    #[test]
    fn entity_survives_serialization(entity in arb_entity()) {
        let bytes = entity.to_vec().unwrap();
        let decoded = QueuedEntity::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, entity);
    }

    #[test]
    fn display_never_panics(entity in arb_entity()) {
        let rendered = entity.to_string();
        let expected_suffix = format!("({} {})", entity.entity_type, entity.origin_id);
        prop_assert!(rendered.ends_with(&expected_suffix));
    }
}
