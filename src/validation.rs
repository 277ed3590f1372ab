//! Client-side filter validation, run before any request is sent

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{FilterValue, QueryFilters};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("'{0}' is required")]
    MissingField(String),

    #[error("'{field}' must be a date in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { field: String, value: String },

    #[error("'{from_field}' ({from}) must not be after '{to_field}' ({to})")]
    InvertedRange {
        from_field: String,
        from: NaiveDate,
        to_field: String,
        to: NaiveDate,
    },
}

/// Rules a list's filters must satisfy before they are sent
pub trait FilterSchema: Send + Sync {
    fn validate(&self, filters: &QueryFilters) -> Result<(), ValidationError>;
}

/// Parse an optional date filter
pub fn parse_date(filters: &QueryFilters, field: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = filters.get(field) else {
        return Ok(None);
    };
    let raw = match value {
        FilterValue::Text(s) => s.as_str(),
        other => {
            return Err(ValidationError::InvalidDate {
                field: field.to_string(),
                value: other.to_string(),
            })
        }
    };
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Both ends optional, but if both are present `from <= to`
pub fn check_date_range(
    filters: &QueryFilters,
    from_field: &str,
    to_field: &str,
) -> Result<(), ValidationError> {
    let from = parse_date(filters, from_field)?;
    let to = parse_date(filters, to_field)?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvertedRange {
                from_field: from_field.to_string(),
                from,
                to_field: to_field.to_string(),
                to,
            });
        }
    }
    Ok(())
}

pub fn check_required(filters: &QueryFilters, field: &str) -> Result<(), ValidationError> {
    match filters.get(field) {
        None => Err(ValidationError::MissingField(field.to_string())),
        Some(FilterValue::Text(s)) if s.trim().is_empty() => {
            Err(ValidationError::MissingField(field.to_string()))
        }
        Some(_) => Ok(()),
    }
}
