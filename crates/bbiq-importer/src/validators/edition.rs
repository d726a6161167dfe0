use super::common::{languages, positive_integer};
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, EditionSection};
use bbiq_common::types::EntityData;
use uuid::Uuid;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: EditionSection =
        read_section(data).map_err(|e| ValidationError::new("edition", e.to_string()))?;

    positive_integer("depth", section.depth)?;
    positive_integer("formatId", section.format_id)?;
    positive_integer("height", section.height)?;
    positive_integer("pages", section.pages)?;
    positive_integer("statusId", section.status_id)?;
    positive_integer("weight", section.weight)?;
    positive_integer("width", section.width)?;
    languages("languages", &section.languages)?;

    if let Some(bbid) = &section.edition_group_bbid {
        Uuid::parse_str(bbid).map_err(|_| {
            ValidationError::new("editionGroupBbid", format!("'{bbid}' is not a valid BBID"))
        })?;
    }
    Ok(())
}
