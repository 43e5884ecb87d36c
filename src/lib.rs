pub mod config;
pub mod database;
pub mod error;
pub mod services;

pub use config::Config;
pub use database::backends::{LocationBackend, MemoryBackend, PgBackend};
pub use database::models::{Draft, LocationRecord, ValidatedLocation};
pub use database::realtime::{ChangeEvent, ChangeKind, Subscription};
pub use database::repositories::LocationStore;
pub use error::{StoreError, SubmitError, ValidationError, ValidationField};
pub use services::{GeofenceListController, LocationEditController};
