use chrono::Utc;
use uuid::Uuid;

use crate::database::backends::LocationBackend;
use crate::database::models::{LocationRecord, ValidatedLocation};
use crate::database::realtime::{ChangeEvent, Subscription};
use crate::error::StoreError;

/// Client for the `geofence_locations` table.
///
/// Constructed explicitly around a backend and shared with controllers through an `Arc`.
pub struct LocationStore<B> {
    backend: B,
}

impl<B: LocationBackend> LocationStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// All locations, sorted by name ascending.
    pub async fn list_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let mut locations = self.backend.list_locations().await.map_err(|e| match e {
            StoreError::Unavailable(_) => e,
            other => StoreError::Unavailable(other.to_string()),
        })?;
        locations.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(locations)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LocationRecord>, StoreError> {
        self.backend.find_location(id).await
    }

    pub async fn create(&self, input: ValidatedLocation) -> Result<LocationRecord, StoreError> {
        let location = self
            .backend
            .insert_location(input, Utc::now())
            .await
            .map_err(|e| {
                log::error!("Error creating location: {}", e);
                e
            })?;
        log::info!("Location '{}' created ({})", location.name, location.id);

        Ok(location)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: ValidatedLocation,
    ) -> Result<LocationRecord, StoreError> {
        let location = self
            .backend
            .update_location(id, input, Utc::now())
            .await
            .map_err(|e| {
                log::error!("Error updating location {}: {}", id, e);
                e
            })?
            .ok_or_else(|| {
                log::warn!("Location {} not found", id);
                StoreError::NotFound
            })?;
        log::info!("Location '{}' updated ({})", location.name, location.id);

        Ok(location)
    }

    /// Delete a location unless employees are still assigned to it.
    ///
    /// The assignment count and the delete are separate statements: an employee assigned
    /// in between is not seen by the guard. The `employees.geofence_id` foreign key is the
    /// backstop and surfaces as [`StoreError::WriteRejected`].
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let count = self.count_assignments_for(id).await?;
        if count > 0 {
            log::warn!(
                "Refusing to delete location {}: {} employee(s) assigned",
                id,
                count
            );
            return Err(StoreError::InUse(count));
        }

        let removed = self.backend.delete_location(id).await.map_err(|e| {
            log::error!("Error deleting location {}: {}", id, e);
            e
        })?;
        if !removed {
            log::warn!("Location {} not found", id);
            return Err(StoreError::NotFound);
        }
        log::info!("Location {} deleted", id);

        Ok(())
    }

    pub async fn count_assignments_for(&self, id: Uuid) -> Result<i64, StoreError> {
        self.backend.count_assignments(id).await
    }

    /// Invoke `callback` for every change to the table, including ones made through
    /// this store. Events are delivered on a spawned tokio task.
    pub fn subscribe_to_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ChangeEvent) + Send + 'static,
    {
        Subscription::spawn(self.backend.changes(), callback)
    }
}
