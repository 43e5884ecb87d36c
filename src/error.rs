use std::fmt;

use thiserror::Error;

/// Numeric draft fields that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationField {
    Latitude,
    Longitude,
    Radius,
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationField::Latitude => write!(f, "latitude"),
            ValidationField::Longitude => write!(f, "longitude"),
            ValidationField::Radius => write!(f, "radius"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Location name is required")]
    MissingName,

    #[error("Invalid number for {field}")]
    InvalidNumber { field: ValidationField },

    #[error("{field} is outside the valid range")]
    OutOfRange { field: ValidationField },
}

impl ValidationError {
    /// The draft field the error belongs to, if it is field-specific.
    pub fn field(&self) -> Option<ValidationField> {
        match self {
            ValidationError::MissingName => None,
            ValidationError::InvalidNumber { field } | ValidationError::OutOfRange { field } => {
                Some(*field)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Location service unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    WriteRejected(String),

    #[error("Location not found")]
    NotFound,

    #[error("Location is still assigned to {0} employee(s)")]
    InUse(i64),
}

/// Why the location dialog could not save.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Location dialog is not open")]
    NotOpen,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        log::error!("Database error: {}", error);
        match error {
            sqlx::Error::Database(db_error) => {
                StoreError::WriteRejected(db_error.message().to_string())
            }
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_message_includes_count() {
        assert_eq!(
            StoreError::InUse(3).to_string(),
            "Location is still assigned to 3 employee(s)"
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert_eq!(StoreError::from(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_validation_error_field() {
        assert_eq!(ValidationError::MissingName.field(), None);
        assert_eq!(
            ValidationError::InvalidNumber {
                field: ValidationField::Radius
            }
            .field(),
            Some(ValidationField::Radius)
        );
    }
}
