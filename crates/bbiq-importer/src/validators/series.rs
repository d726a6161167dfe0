use super::common::required_positive_integer;
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, SeriesSection};
use bbiq_common::types::EntityData;
use bbiq_common::EntityType;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: SeriesSection =
        read_section(data).map_err(|e| ValidationError::new("series", e.to_string()))?;

    required_positive_integer("orderingTypeId", section.ordering_type_id)?;

    let series_type = section
        .series_type
        .ok_or_else(|| ValidationError::new("seriesType", "is required"))?;
    series_type
        .parse::<EntityType>()
        .map_err(|e| ValidationError::new("seriesType", e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(fields: serde_json::Value) -> EntityData {
        serde_json::from_value(fields).unwrap()
    }

    #[test]
    fn test_series_requires_ordering_and_type() {
        assert!(validate(&data(json!({"orderingTypeId": 1, "seriesType": "Work"}))).is_ok());
        assert!(validate(&data(json!({"orderingTypeId": 1, "entityType": "Edition"}))).is_ok());

        let err = validate(&data(json!({"seriesType": "Work"}))).unwrap_err();
        assert_eq!(err.field, "orderingTypeId");

        let err = validate(&data(json!({"orderingTypeId": 1, "seriesType": "Bogus"}))).unwrap_err();
        assert_eq!(err.field, "seriesType");
    }
}
