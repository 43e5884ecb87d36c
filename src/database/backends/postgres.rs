use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, postgres::PgListener};
use tokio::{sync::broadcast, task::JoinHandle};
use uuid::Uuid;

use super::LocationBackend;
use crate::database::models::{LocationRecord, ValidatedLocation};
use crate::database::realtime::{CHANGE_CHANNEL, CHANGE_FEED_CAPACITY, ChangeEvent};
use crate::error::StoreError;

const LOCATION_COLUMNS: &str =
    "id, name, latitude, longitude, radius, description, created_at, updated_at";

/// Postgres-backed row store. Change notifications arrive through `LISTEN` on
/// [`CHANGE_CHANNEL`], which the `geofence_locations_change_feed` trigger publishes to.
pub struct PgBackend {
    pool: PgPool,
    sender: broadcast::Sender<ChangeEvent>,
    listener_task: JoinHandle<()>,
}

impl PgBackend {
    /// Start listening for location changes and return a backend sharing `pool`.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        log::info!("Listening for location changes on channel '{}'", CHANGE_CHANNEL);

        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let feed = sender.clone();
        let listener_task = tokio::spawn(async move {
            loop {
                let received = listener.recv().await;
                let event = change_event_for(received.as_ref().map(|n| n.payload()));
                // No receivers just means no view is mounted.
                let _ = feed.send(event);
                if received.is_err() {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });

        Ok(Self {
            pool,
            sender,
            listener_task,
        })
    }
}

/// Map one listener result to the event published on the feed.
///
/// Notifications sent while the listener was disconnected are lost; the next `recv`
/// reconnects, so a listener error publishes an `Unknown` event and subscribers re-fetch.
fn change_event_for(received: Result<&str, &sqlx::Error>) -> ChangeEvent {
    match received {
        Ok(payload) => {
            let event = ChangeEvent::from_payload(payload);
            log::debug!("Location change received: {:?}", event);
            event
        }
        Err(e) => {
            log::error!("Change listener error: {}", e);
            ChangeEvent::unknown()
        }
    }
}

impl Drop for PgBackend {
    fn drop(&mut self) {
        self.listener_task.abort();
    }
}

impl LocationBackend for PgBackend {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM geofence_locations ORDER BY name",
            LOCATION_COLUMNS
        );
        let locations = sqlx::query_as::<_, LocationRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(locations)
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, StoreError> {
        let query = format!(
            "SELECT {} FROM geofence_locations WHERE id = $1",
            LOCATION_COLUMNS
        );
        let location = sqlx::query_as::<_, LocationRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    async fn insert_location(
        &self,
        input: ValidatedLocation,
        created_at: DateTime<Utc>,
    ) -> Result<LocationRecord, StoreError> {
        let query = format!(
            r#"
            INSERT INTO geofence_locations
                (name, latitude, longitude, radius, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        );
        let location = sqlx::query_as::<_, LocationRecord>(&query)
            .bind(&input.name)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.radius)
            .bind(&input.description)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(location)
    }

    async fn update_location(
        &self,
        id: Uuid,
        input: ValidatedLocation,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let query = format!(
            r#"
            UPDATE geofence_locations
            SET name = $1, latitude = $2, longitude = $3, radius = $4, description = $5,
                updated_at = $6
            WHERE id = $7
            RETURNING {}
            "#,
            LOCATION_COLUMNS
        );
        let location = sqlx::query_as::<_, LocationRecord>(&query)
            .bind(&input.name)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(input.radius)
            .bind(&input.description)
            .bind(updated_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    async fn delete_location(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM geofence_locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_assignments(&self, id: Uuid) -> Result<i64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE geofence_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}
