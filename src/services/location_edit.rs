use std::sync::Arc;

use uuid::Uuid;

use crate::database::backends::LocationBackend;
use crate::database::models::{Draft, LocationRecord};
use crate::database::repositories::LocationStore;
use crate::error::{SubmitError, ValidationError};
use crate::services::geofence_list::{RefreshHandle, RefreshTrigger};
use crate::services::validation::{ValidationRules, validate_with};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    OpenCreate,
    OpenEdit(Uuid),
}

/// Add/edit dialog for a single location.
pub struct LocationEditController<B> {
    store: Arc<LocationStore<B>>,
    refresh: RefreshHandle,
    rules: ValidationRules,
    state: DialogState,
    draft: Option<Draft>,
    validation_error: Option<ValidationError>,
    store_error: Option<String>,
}

impl<B: LocationBackend> LocationEditController<B> {
    pub fn new(
        store: Arc<LocationStore<B>>,
        refresh: RefreshHandle,
        rules: ValidationRules,
    ) -> Self {
        Self {
            store,
            refresh,
            rules,
            state: DialogState::Closed,
            draft: None,
            validation_error: None,
            store_error: None,
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != DialogState::Closed
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Field-level error from the last submit.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    /// Store error message from the last submit.
    pub fn store_error(&self) -> Option<&str> {
        self.store_error.as_deref()
    }

    pub fn open_create(&mut self) {
        self.reset(DialogState::OpenCreate, Some(Draft::empty()));
    }

    pub fn open_edit(&mut self, record: &LocationRecord) {
        self.reset(DialogState::OpenEdit(record.id), Some(Draft::from_record(record)));
    }

    /// Validate and persist `draft`.
    ///
    /// The create/update target comes from how the dialog was opened, not from the
    /// draft's own `id`. On any error the dialog stays open with the draft kept.
    pub async fn submit(&mut self, draft: Draft) -> Result<LocationRecord, SubmitError> {
        let target = match self.state {
            DialogState::Closed => return Err(SubmitError::NotOpen),
            DialogState::OpenCreate => None,
            DialogState::OpenEdit(id) => Some(id),
        };
        let draft = Draft {
            id: target,
            is_editing: target.is_some(),
            ..draft
        };
        self.validation_error = None;
        self.store_error = None;

        let validated = match validate_with(&draft, self.rules) {
            Ok(validated) => validated,
            Err(e) => {
                log::debug!("Location draft rejected: {}", e);
                self.draft = Some(draft);
                self.validation_error = Some(e.clone());
                return Err(e.into());
            }
        };
        self.draft = Some(draft);

        let result = match target {
            None => self.store.create(validated).await,
            Some(id) => self.store.update(id, validated).await,
        };

        match result {
            Ok(record) => {
                self.reset(DialogState::Closed, None);
                self.refresh.request(RefreshTrigger::Saved(record.id));
                Ok(record)
            }
            Err(e) => {
                self.store_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn cancel(&mut self) {
        if self.is_open() {
            self.reset(DialogState::Closed, None);
        }
    }

    fn reset(&mut self, state: DialogState, draft: Option<Draft>) {
        self.state = state;
        self.draft = draft;
        self.validation_error = None;
        self.store_error = None;
    }
}
