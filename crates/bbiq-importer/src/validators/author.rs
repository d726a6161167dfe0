use super::common::{date_range, positive_integer};
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, AuthorSection};
use bbiq_common::types::EntityData;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: AuthorSection =
        read_section(data).map_err(|e| ValidationError::new("author", e.to_string()))?;

    positive_integer("typeId", section.type_id)?;
    positive_integer("genderId", section.gender_id)?;
    positive_integer("beginAreaId", section.begin_area_id)?;
    positive_integer("endAreaId", section.end_area_id)?;
    date_range(
        "beginDate",
        section.begin_date.as_deref(),
        "endDate",
        section.end_date.as_deref(),
        section.ended,
    )
}
