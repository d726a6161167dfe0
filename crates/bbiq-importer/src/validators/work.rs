use super::common::{languages, positive_integer};
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, WorkSection};
use bbiq_common::types::EntityData;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: WorkSection =
        read_section(data).map_err(|e| ValidationError::new("work", e.to_string()))?;

    positive_integer("typeId", section.type_id)?;
    languages("languages", &section.languages)
}
