#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use fake::Fake;
use fake::faker::company::en::CompanyName;

use geofence::services::{GeofenceListController, Notice, Notifier, RefreshTrigger};
use geofence::{
    Draft, LocationBackend, LocationRecord, LocationStore, MemoryBackend, ValidatedLocation,
};

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Store wired to a fresh in-memory backend.
pub struct TestContext {
    pub store: Arc<LocationStore<MemoryBackend>>,
}

impl TestContext {
    pub fn new() -> Self {
        setup_test_env();
        TestContext {
            store: Arc::new(LocationStore::new(MemoryBackend::new())),
        }
    }

    pub fn backend(&self) -> &MemoryBackend {
        self.store.backend()
    }

    /// Create a location through the store.
    pub async fn seed(&self, name: &str) -> LocationRecord {
        let mut input = random_location();
        input.name = name.to_string();
        self.store.create(input).await.unwrap()
    }

    /// Insert a row directly, as another client of the backend would.
    pub async fn insert_as_other_actor(&self, name: &str) -> LocationRecord {
        let mut input = random_location();
        input.name = name.to_string();
        self.backend()
            .insert_location(input, Utc::now())
            .await
            .unwrap()
    }
}

pub fn random_location() -> ValidatedLocation {
    ValidatedLocation {
        name: CompanyName().fake(),
        latitude: (-60.0..60.0).fake::<f64>(),
        longitude: (-170.0..170.0).fake::<f64>(),
        radius: (10..500).fake::<i32>(),
        description: None,
    }
}

pub fn hq_draft() -> Draft {
    Draft::empty()
        .with_name("HQ")
        .with_coordinates("-6.200000", "106.816666")
        .with_radius("100")
}

/// Notifier that keeps every notice for later assertions.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub async fn next_trigger<B: LocationBackend>(
    list: &mut GeofenceListController<B>,
) -> RefreshTrigger {
    tokio::time::timeout(Duration::from_secs(2), list.process_next_trigger())
        .await
        .expect("timed out waiting for a refresh trigger")
        .expect("refresh inbox closed")
}
