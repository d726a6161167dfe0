use super::common::{date_range, positive_integer};
use crate::error::ValidationError;
use bbiq_common::types::sections::{read_section, PublisherSection};
use bbiq_common::types::EntityData;

pub fn validate(data: &EntityData) -> Result<(), ValidationError> {
    let section: PublisherSection =
        read_section(data).map_err(|e| ValidationError::new("publisher", e.to_string()))?;

    positive_integer("areaId", section.area_id)?;
    positive_integer("typeId", section.type_id)?;
    date_range(
        "beginDate",
        section.begin_date.as_deref(),
        "endDate",
        section.end_date.as_deref(),
        section.ended,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publisher_dates() {
        let ok: EntityData =
            serde_json::from_value(json!({"areaId": 222, "beginDate": "1950", "ended": false}))
                .unwrap();
        assert!(validate(&ok).is_ok());

        let reversed: EntityData =
            serde_json::from_value(json!({"beginDate": "1950", "endDate": "1949", "ended": true}))
                .unwrap();
        assert_eq!(validate(&reversed).unwrap_err().field, "endDate");
    }
}
