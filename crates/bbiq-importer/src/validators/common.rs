//! Checks shared by every entity kind: aliases, identifiers, the name section
//! and the field helpers used by the kind-specific validators.

use crate::error::ValidationError;
use bbiq_common::types::{sections::LanguageRef, EntityData};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

type Result<T = ()> = std::result::Result<T, ValidationError>;

#[allow(clippy::expect_used)]
static PARTIAL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?\d{4,6})(?:-(\d{2})(?:-(\d{2}))?)?$").expect("valid date pattern")
});

pub fn required_string(field: &str, value: &str) -> Result {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

pub fn positive_integer(field: &str, value: Option<i64>) -> Result {
    match value {
        Some(n) if n <= 0 => Err(ValidationError::new(
            field,
            format!("must be a positive integer, got {n}"),
        )),
        _ => Ok(()),
    }
}

pub fn required_positive_integer(field: &str, value: Option<i64>) -> Result {
    match value {
        None => Err(ValidationError::new(field, "is required")),
        some => positive_integer(field, some),
    }
}

/// Partial ISO 8601 date, `(year, month, day)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartialDate(i32, u32, u32);

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD` (optionally signed). Missing
/// components compare as the earliest possible value.
pub fn partial_date(field: &str, value: Option<&str>) -> Result<Option<PartialDate>> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let invalid = || ValidationError::new(field, format!("'{raw}' is not a valid date"));

    let captures = PARTIAL_DATE.captures(raw).ok_or_else(invalid)?;
    let year: i32 = captures[1].parse().map_err(|_| invalid())?;
    let month = captures
        .get(2)
        .map(|m| m.as_str().parse::<u32>())
        .transpose()
        .map_err(|_| invalid())?;
    let day = captures
        .get(3)
        .map(|d| d.as_str().parse::<u32>())
        .transpose()
        .map_err(|_| invalid())?;

    match (month, day) {
        (Some(month), Some(day)) => {
            NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
        }
        (Some(month), None) if !(1..=12).contains(&month) => return Err(invalid()),
        _ => {}
    }

    Ok(Some(PartialDate(year, month.unwrap_or(0), day.unwrap_or(0))))
}

/// Begin/end date pair of authors and publishers
pub fn date_range(
    begin_field: &str,
    begin: Option<&str>,
    end_field: &str,
    end: Option<&str>,
    ended: Option<bool>,
) -> Result {
    let begin = partial_date(begin_field, begin)?;
    let end = partial_date(end_field, end)?;

    if let (Some(begin), Some(end)) = (begin, end) {
        if begin > end {
            return Err(ValidationError::new(
                end_field,
                "end date must not be before begin date",
            ));
        }
    }
    if end.is_some() && ended == Some(false) {
        return Err(ValidationError::new(
            "ended",
            "an entity with an end date must be marked as ended",
        ));
    }
    Ok(())
}

pub fn languages(field: &str, languages: &[LanguageRef]) -> Result {
    for (index, language) in languages.iter().enumerate() {
        required_positive_integer(&format!("{field}[{index}].id"), language.id)?;
    }
    Ok(())
}

/// Aliases, the default alias, identifiers and disambiguation
pub fn validate_common(data: &EntityData) -> Result {
    for (index, alias) in data.alias.iter().enumerate() {
        required_string(&format!("alias[{index}].name"), &alias.name)?;
        required_string(&format!("alias[{index}].sortName"), &alias.sort_name)?;
        required_positive_integer(&format!("alias[{index}].languageId"), alias.language_id)?;
    }

    match data.alias.iter().filter(|alias| alias.default).count() {
        0 => return Err(ValidationError::new("alias", "no default alias")),
        1 => {}
        n => {
            return Err(ValidationError::new(
                "alias",
                format!("{n} aliases are marked as default"),
            ))
        }
    }

    for (index, identifier) in data.identifiers.iter().enumerate() {
        required_positive_integer(&format!("identifiers[{index}].typeId"), identifier.type_id)?;
        required_string(&format!("identifiers[{index}].value"), &identifier.value)?;
    }

    if let Some(disambiguation) = &data.disambiguation {
        if disambiguation.chars().count() > 255 {
            return Err(ValidationError::new(
                "disambiguation",
                "must be at most 255 characters",
            ));
        }
    }

    Ok(())
}
