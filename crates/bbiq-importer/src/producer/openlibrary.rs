//! Mapping of OpenLibrary dump records onto queued entities.
//!
//! Dump lines hold five tab-separated columns: type (`/type/author`), key
//! (`/authors/OL1A`), revision, last-modified timestamp and the JSON record.
//! See <https://openlibrary.org/developers/dumps>.

use bbiq_common::sort_name::sort_name;
use bbiq_common::types::{Alias, EntityData, Identifier, Link, Relationship};
use bbiq_common::{EntityType, QueuedEntity};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;

pub const SOURCE: &str = "OPENLIBRARY";

// ============================================================================
// Identifier Type IDs
// ============================================================================

pub const WIKIDATA_ID_EDITION: i64 = 4;
pub const OPEN_LIBRARY_BOOK_ID_EDITION: i64 = 6;
pub const OPEN_LIBRARY_WORK_ID: i64 = 8;
pub const ISBN13_EDITION: i64 = 9;
pub const ISBN10_EDITION: i64 = 10;
pub const VIAF_AUTHOR: i64 = 12;
pub const ISNI_AUTHOR: i64 = 13;
pub const LIBRARY_THING_WORK: i64 = 14;
pub const LIBRARY_THING_AUTHOR: i64 = 15;
pub const WIKIDATA_ID_AUTHOR: i64 = 18;
pub const WIKIDATA_ID_WORK: i64 = 21;
pub const OPEN_LIBRARY_AUTHOR_ID: i64 = 23;

/// Language id used when a record does not tell its language
pub const ENGLISH_LANGUAGE_ID: i64 = 120;

/// OpenLibrary (MARC) language codes to language ids
const LANGUAGES: &[(&str, i64)] = &[
    ("ara", 818),
    ("ben", 47),
    ("bul", 62),
    ("chi", 1739),
    ("cze", 98),
    ("dut", 113),
    ("eng", 120),
    ("fre", 134),
    ("ger", 145),
    ("gre", 289),
    ("heb", 170),
    ("hin", 171),
    ("hun", 176),
    ("ind", 189),
    ("ita", 195),
    ("jpn", 198),
    ("kor", 224),
    ("per", 334),
    ("pol", 338),
    ("por", 340),
    ("rum", 351),
    ("rus", 353),
    ("spa", 393),
    ("swe", 403),
    ("tam", 407),
    ("tha", 415),
    ("tur", 433),
    ("ukr", 441),
    ("urd", 444),
    ("vie", 448),
];

const AUTHOR_METADATA_FIELDS: &[&str] = &[
    "comment",
    "date",
    "entity_type",
    "location",
    "numeration",
    "photos",
    "remote_ids",
    "role",
    "source_records",
    "title",
];

const WORK_METADATA_FIELDS: &[&str] = &[
    "cover_edition",
    "dewey_number",
    "excerpts",
    "first_publish_date",
    "first_sentence",
    "lc_classifications",
    "number_of_editions",
    "remote_ids",
    "subject_people",
    "subject_places",
    "subject_times",
    "subjects",
];

const EDITION_METADATA_FIELDS: &[&str] = &[
    "by_statement",
    "covers",
    "dewey_decimal_class",
    "edition_name",
    "lc_classifications",
    "lccn",
    "oclc_numbers",
    "pagination",
    "physical_format",
    "publish_country",
    "publish_date",
    "publish_places",
    "publishers",
    "series",
    "subjects",
];

#[allow(clippy::expect_used)]
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year pattern"));

#[allow(clippy::expect_used)]
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").expect("valid ISO date pattern")
});

/// Why a dump line could not be turned into an entity
#[derive(Error, Debug)]
pub enum DumpLineError {
    #[error("expected 5 tab-separated columns, found {0}")]
    MissingColumns(usize),

    #[error("unsupported OpenLibrary entity type '{0}'")]
    UnsupportedType(String),

    #[error("invalid JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record has no usable key")]
    MissingKey,

    #[error("record has no name to use as default alias")]
    NoDefaultAlias,
}

/// Last segment of an OpenLibrary key: `/authors/OL1A` -> `OL1A`
pub fn key_id(key: &str) -> Option<&str> {
    key.rsplit('/').next().filter(|id| !id.is_empty())
}

/// OpenLibrary type name to entity kind
pub fn map_entity_type(ol_type: &str) -> Option<EntityType> {
    match ol_type {
        "author" => Some(EntityType::Author),
        "work" => Some(EntityType::Work),
        "edition" => Some(EntityType::Edition),
        _ => None,
    }
}

/// Language id for a `/languages/xxx` key, English when unknown
pub fn map_language(key: &str) -> i64 {
    let code = key_id(key).unwrap_or(key);
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(ENGLISH_LANGUAGE_ID, |(_, id)| *id)
}

/// Reduce free-form dates to something the validators accept.
///
/// ISO partial dates pass through; otherwise the first four-digit year is used.
fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if ISO_DATE.is_match(raw) {
        return Some(raw.to_string());
    }
    YEAR.captures(raw).map(|captures| captures[1].to_string())
}

/// Text of a field that is either a string or `{"type": ..., "value": ...}`
fn text_value(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(text) => Some(text.clone()),
        Value::Object(object) => object.get("value")?.as_str().map(str::to_string),
        _ => None,
    };
    text.filter(|text| !text.trim().is_empty())
}

fn str_field<'a>(json: &'a Value, field: &str) -> Option<&'a str> {
    json.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn array_field<'a>(json: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    json.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Collects aliases; the first one added becomes the default
#[derive(Default)]
struct AliasList {
    aliases: Vec<Alias>,
}

impl AliasList {
    fn add(&mut self, name: &str, language_id: i64, primary: bool) {
        let name = name.trim();
        if name.is_empty() || self.aliases.iter().any(|alias| alias.name == name) {
            return;
        }
        self.aliases.push(Alias {
            name: name.to_string(),
            sort_name: sort_name(name),
            language_id: Some(language_id),
            default: self.aliases.is_empty(),
            primary,
        });
    }
}

fn copy_fields(json: &Value, fields: &[&str], extra: &mut Map<String, Value>) {
    for field in fields {
        if let Some(value) = json.get(*field).filter(|v| !v.is_null()) {
            extra.insert((*field).to_string(), value.clone());
        }
    }
}

fn push_links(json: &Value, links: &mut Vec<Link>) {
    for link in array_field(json, "links") {
        if let (Some(title), Some(url)) = (str_field(link, "title"), str_field(link, "url")) {
            links.push(Link {
                title: title.to_string(),
                url: url.to_string(),
            });
        }
    }
}

fn identifier(type_id: i64, value: &str) -> Identifier {
    Identifier {
        type_id: Some(type_id),
        value: value.to_string(),
    }
}

fn base_data() -> EntityData {
    EntityData {
        source: Some(SOURCE.to_string()),
        ..EntityData::default()
    }
}

fn process_author(json: &Value) -> EntityData {
    let mut data = base_data();

    let mut aliases = AliasList::default();
    for field in ["name", "personal_name"] {
        if let Some(name) = str_field(json, field) {
            aliases.add(name, ENGLISH_LANGUAGE_ID, false);
        }
    }
    for name in array_field(json, "alternate_names").filter_map(Value::as_str) {
        aliases.add(name, ENGLISH_LANGUAGE_ID, false);
    }
    if let Some(name) = str_field(json, "fuller_name") {
        aliases.add(name, ENGLISH_LANGUAGE_ID, false);
    }
    data.alias = aliases.aliases;

    if let Some(id) = str_field(json, "key").and_then(key_id) {
        data.identifiers.push(identifier(OPEN_LIBRARY_AUTHOR_ID, id));
        data.origin_id = Some(id.to_string());
    }

    let identifier_keys = [
        ("id_librarything", LIBRARY_THING_AUTHOR),
        ("id_wikidata", WIKIDATA_ID_AUTHOR),
        ("id_viaf", VIAF_AUTHOR),
    ];
    for (key, type_id) in identifier_keys {
        if let Some(value) = str_field(json, key) {
            data.identifiers.push(identifier(type_id, value));
        }
    }
    if let Some(remote) = json.get("remote_ids") {
        let remote_keys = [
            ("viaf", VIAF_AUTHOR),
            ("wikidata", WIKIDATA_ID_AUTHOR),
            ("isni", ISNI_AUTHOR),
        ];
        for (key, type_id) in remote_keys {
            if let Some(value) = str_field(remote, key) {
                if !data
                    .identifiers
                    .iter()
                    .any(|i| i.type_id == Some(type_id) && i.value == value)
                {
                    data.identifiers.push(identifier(type_id, value));
                }
            }
        }
    }

    let mut ended = false;
    for (field, target) in [("birth_date", "beginDate"), ("death_date", "endDate")] {
        let Some(raw) = str_field(json, field) else {
            continue;
        };
        match normalize_date(raw) {
            Some(date) => data.set_field(target, date),
            None => {
                data.metadata.extra.insert(field.to_string(), raw.into());
            }
        }
        data.set_field("type", "Person");
        ended |= field == "death_date";
    }
    data.set_field("ended", ended);

    data.annotation = text_value(json.get("bio"));

    push_links(json, &mut data.metadata.links);
    for key in ["wikipedia", "website"] {
        if let Some(url) = str_field(json, key) {
            data.metadata.links.push(Link {
                title: key.to_string(),
                url: url.to_string(),
            });
        }
    }

    for work in array_field(json, "works") {
        if let Some(key) = str_field(work, "key") {
            data.metadata.relationships.push(Relationship {
                kind: "hasAuthored".to_string(),
                value: key.to_string(),
            });
        }
    }

    copy_fields(json, AUTHOR_METADATA_FIELDS, &mut data.metadata.extra);
    data
}

fn process_work(json: &Value) -> EntityData {
    let mut data = base_data();

    let mut aliases = AliasList::default();
    if let Some(title) = str_field(json, "title") {
        aliases.add(title, ENGLISH_LANGUAGE_ID, true);
    }
    if let Some(subtitle) = str_field(json, "subtitle") {
        aliases.add(subtitle, ENGLISH_LANGUAGE_ID, false);
    }
    data.alias = aliases.aliases;

    if let Some(id) = str_field(json, "key").and_then(key_id) {
        data.identifiers.push(identifier(OPEN_LIBRARY_WORK_ID, id));
        data.origin_id = Some(id.to_string());
    }
    if let Some(remote) = json.get("remote_ids") {
        if let Some(value) = str_field(remote, "wikidata") {
            data.identifiers.push(identifier(WIKIDATA_ID_WORK, value));
        }
        if let Some(value) = str_field(remote, "librarything") {
            data.identifiers.push(identifier(LIBRARY_THING_WORK, value));
        }
    }

    for author in array_field(json, "authors") {
        if let Some(id) = author
            .get("author")
            .and_then(|a| str_field(a, "key"))
            .and_then(key_id)
        {
            data.metadata.relationships.push(Relationship {
                kind: "authoredBy".to_string(),
                value: id.to_string(),
            });
        }
    }

    data.annotation = text_value(json.get("description"));
    push_links(json, &mut data.metadata.links);
    copy_fields(json, WORK_METADATA_FIELDS, &mut data.metadata.extra);
    data
}

fn process_edition(json: &Value) -> EntityData {
    let mut data = base_data();

    let languages: Vec<i64> = array_field(json, "languages")
        .filter_map(|language| str_field(language, "key"))
        .map(map_language)
        .collect();
    let language_id = languages.first().copied().unwrap_or(ENGLISH_LANGUAGE_ID);

    let mut aliases = AliasList::default();
    if let Some(title) = str_field(json, "title") {
        let full_title = match str_field(json, "title_prefix") {
            Some(prefix) => format!("{} {}", prefix, title),
            None => title.to_string(),
        };
        aliases.add(&full_title, language_id, true);
    }
    if let Some(subtitle) = str_field(json, "subtitle") {
        aliases.add(subtitle, language_id, false);
    }
    data.alias = aliases.aliases;

    if let Some(id) = str_field(json, "key").and_then(key_id) {
        data.identifiers.push(identifier(OPEN_LIBRARY_BOOK_ID_EDITION, id));
        data.origin_id = Some(id.to_string());
    }
    for (field, type_id) in [("isbn_13", ISBN13_EDITION), ("isbn_10", ISBN10_EDITION)] {
        for isbn in array_field(json, field).filter_map(Value::as_str) {
            data.identifiers.push(identifier(type_id, isbn));
        }
    }
    if let Some(value) = json
        .get("identifiers")
        .and_then(|ids| ids.get("wikidata"))
        .and_then(Value::as_array)
        .and_then(|values| values.first())
        .and_then(Value::as_str)
    {
        data.identifiers.push(identifier(WIKIDATA_ID_EDITION, value));
    }

    if let Some(pages) = json
        .get("number_of_pages")
        .and_then(Value::as_i64)
        .filter(|pages| *pages > 0)
    {
        data.set_field("pages", pages);
    }
    if !languages.is_empty() {
        let languages: Vec<Value> = languages
            .into_iter()
            .map(|id| serde_json::json!({ "id": id }))
            .collect();
        data.set_field("languages", languages);
    }

    for work in array_field(json, "works") {
        if let Some(id) = str_field(work, "key").and_then(key_id) {
            data.metadata.relationships.push(Relationship {
                kind: "editionOf".to_string(),
                value: id.to_string(),
            });
        }
    }
    for author in array_field(json, "authors") {
        if let Some(id) = str_field(author, "key").and_then(key_id) {
            data.metadata.relationships.push(Relationship {
                kind: "authoredBy".to_string(),
                value: id.to_string(),
            });
        }
    }

    data.annotation = text_value(json.get("description"));
    push_links(json, &mut data.metadata.links);
    copy_fields(json, EDITION_METADATA_FIELDS, &mut data.metadata.extra);
    data
}

/// Parse one dump line into an entity ready to be pushed
pub fn parse_line(line: &str) -> Result<QueuedEntity, DumpLineError> {
    let columns: Vec<&str> = line.splitn(5, '\t').collect();
    let [record_type, key, _revision, last_modified, record] = columns[..] else {
        return Err(DumpLineError::MissingColumns(columns.len()));
    };

    let ol_type = key_id(record_type).unwrap_or(record_type);
    let kind = map_entity_type(ol_type)
        .ok_or_else(|| DumpLineError::UnsupportedType(ol_type.to_string()))?;

    let json: Value = serde_json::from_str(record)?;
    let mut data = match kind {
        EntityType::Author => process_author(&json),
        EntityType::Work => process_work(&json),
        _ => process_edition(&json),
    };

    data.last_edited = json
        .get("last_modified")
        .and_then(|modified| text_value(Some(modified)));

    let origin_id = key_id(key)
        .map(str::to_string)
        .or_else(|| data.origin_id.clone())
        .ok_or(DumpLineError::MissingKey)?;
    if data.default_alias().is_none() {
        return Err(DumpLineError::NoDefaultAlias);
    }
    let last_edited = Some(last_modified.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| data.last_edited.clone());

    let mut entity = QueuedEntity::new(kind, SOURCE, origin_id);
    entity.last_edited = last_edited;
    entity.data = data;
    Ok(entity)
}
