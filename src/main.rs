use std::sync::Arc;

use anyhow::Result;

use geofence::database::init_database;
use geofence::services::{GeofenceListController, ListState, LogNotifier};
use geofence::{Config, LocationBackend, LocationStore, PgBackend};

fn log_locations<B: LocationBackend>(list: &GeofenceListController<B>) {
    if let ListState::Failed(message) = list.state() {
        log::warn!("Showing last known locations ({})", message);
    }

    log::info!("{} geofence location(s)", list.locations().len());
    for location in list.locations() {
        log::info!(
            "  {} ({:.6}, {:.6}) r={}m {}",
            location.name,
            location.latitude,
            location.longitude,
            location.radius,
            location.description.as_deref().unwrap_or("")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("Starting geofence location watcher...");

    let config = Config::from_env()?;
    log::info!("Configuration loaded (environment: {})", config.environment);

    let pool = init_database(&config.database_url).await?;
    log::info!("Database initialized");

    let backend = PgBackend::connect(pool).await?;
    let store = Arc::new(LocationStore::new(backend));

    // The watcher never deletes, so confirmation always declines.
    let mut list = GeofenceListController::new(store, |_: &str| false, LogNotifier);
    list.mount().await;
    log_locations(&list);

    loop {
        let trigger = tokio::select! {
            trigger = list.process_next_trigger() => trigger,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                None
            }
        };

        match trigger {
            Some(trigger) => {
                log::debug!("Refreshed after {:?}", trigger);
                log_locations(&list);
            }
            None => break,
        }
    }

    list.unmount();
    Ok(())
}
