//! Row-store backends behind the [`LocationStore`](crate::database::repositories::LocationStore).

use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::database::models::{LocationRecord, ValidatedLocation};
use crate::database::realtime::ChangeEvent;
use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

/// Raw row operations on the `geofence_locations` and `employees` tables.
///
/// Backends only move rows; ordering, timestamps and the in-use guard belong to the
/// store client.
pub trait LocationBackend: Send + Sync + 'static {
    fn list_locations(
        &self,
    ) -> impl Future<Output = Result<Vec<LocationRecord>, StoreError>> + Send;

    fn find_location(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<LocationRecord>, StoreError>> + Send;

    /// Insert a row; the backend assigns its id.
    fn insert_location(
        &self,
        input: ValidatedLocation,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> impl Future<Output = Result<LocationRecord, StoreError>> + Send;

    /// Returns `None` when no row has the given id.
    fn update_location(
        &self,
        id: Uuid,
        input: ValidatedLocation,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> impl Future<Output = Result<Option<LocationRecord>, StoreError>> + Send;

    /// Returns whether a row was removed.
    fn delete_location(&self, id: Uuid) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Number of employees whose `geofence_id` references the location.
    fn count_assignments(&self, id: Uuid) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// A fresh receiver on the table's change feed.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}
