use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::LocationBackend;
use crate::database::models::{LocationRecord, ValidatedLocation};
use crate::database::realtime::{CHANGE_FEED_CAPACITY, ChangeEvent, ChangeKind};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    locations: HashMap<Uuid, LocationRecord>,
    assignments: HashMap<Uuid, i64>,
    unavailable: bool,
    write_rejection: Option<String>,
    write_calls: usize,
}

/// In-process row store with the same change-feed behaviour as
/// [`PgBackend`](super::PgBackend).
///
/// Used for local development and tests; supports fault injection.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            state: Mutex::new(MemoryState::default()),
            sender,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, kind: ChangeKind, id: Uuid) {
        let _ = self.sender.send(ChangeEvent::new(kind, id));
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Make every subsequent write fail with [`StoreError::WriteRejected`].
    pub fn reject_writes(&self, message: Option<&str>) {
        self.state().write_rejection = message.map(str::to_string);
    }

    /// Number of insert/update/delete calls that reached the backend.
    pub fn write_calls(&self) -> usize {
        self.state().write_calls
    }

    /// Number of live receivers on the change feed.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Record an employee assigned to `geofence_id`.
    pub fn assign_employee(&self, geofence_id: Uuid) {
        *self.state().assignments.entry(geofence_id).or_insert(0) += 1;
    }

    pub fn clear_assignments(&self, geofence_id: Uuid) {
        self.state().assignments.remove(&geofence_id);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.state().unavailable {
            return Err(StoreError::Unavailable("memory backend offline".to_string()));
        }
        Ok(())
    }

    fn begin_write(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        let mut state = self.state();
        state.write_calls += 1;
        if state.unavailable {
            return Err(StoreError::Unavailable("memory backend offline".to_string()));
        }
        if let Some(message) = &state.write_rejection {
            return Err(StoreError::WriteRejected(message.clone()));
        }
        Ok(state)
    }
}

impl LocationBackend for MemoryBackend {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        self.check_available()?;
        Ok(self.state().locations.values().cloned().collect())
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, StoreError> {
        self.check_available()?;
        Ok(self.state().locations.get(&id).cloned())
    }

    async fn insert_location(
        &self,
        input: ValidatedLocation,
        created_at: DateTime<Utc>,
    ) -> Result<LocationRecord, StoreError> {
        let record = LocationRecord {
            id: Uuid::new_v4(),
            name: input.name,
            latitude: input.latitude,
            longitude: input.longitude,
            radius: input.radius,
            description: input.description,
            created_at,
            updated_at: created_at,
        };
        {
            let mut state = self.begin_write()?;
            if record.radius < 0 {
                return Err(StoreError::WriteRejected(
                    "new row violates check constraint on radius".to_string(),
                ));
            }
            state.locations.insert(record.id, record.clone());
        }

        self.publish(ChangeKind::Insert, record.id);
        Ok(record)
    }

    async fn update_location(
        &self,
        id: Uuid,
        input: ValidatedLocation,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let updated = {
            let mut state = self.begin_write()?;
            let Some(record) = state.locations.get_mut(&id) else {
                return Ok(None);
            };
            record.name = input.name;
            record.latitude = input.latitude;
            record.longitude = input.longitude;
            record.radius = input.radius;
            record.description = input.description;
            record.updated_at = updated_at;
            record.clone()
        };

        self.publish(ChangeKind::Update, id);
        Ok(Some(updated))
    }

    async fn delete_location(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.begin_write()?.locations.remove(&id).is_some();
        if removed {
            self.publish(ChangeKind::Delete, id);
        }
        Ok(removed)
    }

    async fn count_assignments(&self, id: Uuid) -> Result<i64, StoreError> {
        self.check_available()?;
        Ok(self.state().assignments.get(&id).copied().unwrap_or(0))
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}
