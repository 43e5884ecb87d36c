pub mod geofence_list;
pub mod location_edit;
pub mod prompt;
pub mod validation;

pub use geofence_list::{
    DeleteOutcome, GeofenceListController, ListState, RefreshHandle, RefreshTrigger,
};
pub use location_edit::{DialogState, LocationEditController};
pub use prompt::{Confirmation, LogNotifier, Notice, NoticeLevel, Notifier};
pub use validation::{ValidationRules, validate, validate_with};
