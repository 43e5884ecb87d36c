use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted row of the `geofence_locations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters.
    pub radius: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Location fields that passed validation and are ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: i32,
    pub description: Option<String>,
}

impl From<&LocationRecord> for ValidatedLocation {
    fn from(record: &LocationRecord) -> Self {
        Self {
            name: record.name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            radius: record.radius,
            description: record.description.clone(),
        }
    }
}

/// Text form of a location while the add/edit dialog is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: Option<Uuid>,
    pub is_editing: bool,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub radius: String,
    pub description: String,
}

impl Draft {
    /// Empty draft for the "add location" dialog.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_record(record: &LocationRecord) -> Self {
        Self {
            id: Some(record.id),
            is_editing: true,
            name: record.name.clone(),
            latitude: record.latitude.to_string(),
            longitude: record.longitude.to_string(),
            radius: record.radius.to_string(),
            description: record.description.clone().unwrap_or_default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_coordinates(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.latitude = latitude.into();
        self.longitude = longitude.into();
        self
    }

    pub fn with_radius(mut self, radius: impl Into<String>) -> Self {
        self.radius = radius.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
