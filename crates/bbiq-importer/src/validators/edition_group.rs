use super::common::positive_integer;
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, EditionGroupSection};
use bbiq_common::types::EntityData;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: EditionGroupSection =
        read_section(data).map_err(|e| ValidationError::new("editionGroup", e.to_string()))?;
    positive_integer("typeId", section.type_id)
}
