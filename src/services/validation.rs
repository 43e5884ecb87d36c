use crate::database::models::{Draft, ValidatedLocation};
use crate::error::{ValidationError, ValidationField};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationRules {
    /// Reject latitudes outside ±90 and longitudes outside ±180.
    pub enforce_coordinate_bounds: bool,
}

/// Validate a draft with the default (unbounded) rules.
pub fn validate(draft: &Draft) -> Result<ValidatedLocation, ValidationError> {
    validate_with(draft, ValidationRules::default())
}

pub fn validate_with(
    draft: &Draft,
    rules: ValidationRules,
) -> Result<ValidatedLocation, ValidationError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    let latitude = parse_coordinate(&draft.latitude, ValidationField::Latitude)?;
    let longitude = parse_coordinate(&draft.longitude, ValidationField::Longitude)?;
    let radius = parse_radius(&draft.radius)?;

    if rules.enforce_coordinate_bounds {
        check_bounds(latitude, 90.0, ValidationField::Latitude)?;
        check_bounds(longitude, 180.0, ValidationField::Longitude)?;
    }

    let description = if draft.description.is_empty() {
        None
    } else {
        Some(draft.description.clone())
    };

    Ok(ValidatedLocation {
        name: name.to_string(),
        latitude,
        longitude,
        radius,
        description,
    })
}

fn parse_coordinate(text: &str, field: ValidationField) -> Result<f64, ValidationError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(ValidationError::InvalidNumber { field })
}

fn parse_radius(text: &str) -> Result<i32, ValidationError> {
    text.trim()
        .parse::<i32>()
        .ok()
        .filter(|radius| *radius >= 0)
        .ok_or(ValidationError::InvalidNumber {
            field: ValidationField::Radius,
        })
}

fn check_bounds(value: f64, limit: f64, field: ValidationField) -> Result<(), ValidationError> {
    if (-limit..=limit).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field })
    }
}
