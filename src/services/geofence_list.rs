//! List view state for geofence locations.
//!
//! The controller re-fetches the whole table whenever a refresh is triggered, either by
//! the change feed or by a [`RefreshHandle`] held by an edit dialog. Refreshes can
//! overlap when a caller drives [`GeofenceListController::begin_refresh`] and
//! [`GeofenceListController::complete_refresh`] itself; only the response for the most
//! recent ticket is applied.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::database::backends::LocationBackend;
use crate::database::models::LocationRecord;
use crate::database::realtime::{ChangeEvent, Subscription};
use crate::database::repositories::LocationStore;
use crate::error::StoreError;
use crate::services::prompt::{Confirmation, Notice, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Idle,
    Loading,
    Loaded,
    /// The last refresh failed; previously loaded locations are kept.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTrigger {
    Changed(ChangeEvent),
    Saved(Uuid),
}

/// Lets other controllers ask the list to refresh.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    sender: mpsc::UnboundedSender<RefreshTrigger>,
}

impl RefreshHandle {
    pub fn request(&self, trigger: RefreshTrigger) {
        if self.sender.send(trigger).is_err() {
            log::debug!("Refresh requested after the list view was torn down");
        }
    }
}

/// Identifies one refresh request; see [`GeofenceListController::complete_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
    InUse(i64),
    Failed(StoreError),
}

pub struct GeofenceListController<B> {
    store: Arc<LocationStore<B>>,
    state: ListState,
    locations: Vec<LocationRecord>,
    latest_request: u64,
    inbox_tx: mpsc::UnboundedSender<RefreshTrigger>,
    inbox_rx: mpsc::UnboundedReceiver<RefreshTrigger>,
    subscription: Option<Subscription>,
    confirmation: Box<dyn Confirmation>,
    notifier: Box<dyn Notifier>,
}

impl<B: LocationBackend> GeofenceListController<B> {
    pub fn new(
        store: Arc<LocationStore<B>>,
        confirmation: impl Confirmation + 'static,
        notifier: impl Notifier + 'static,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            store,
            state: ListState::Idle,
            locations: Vec::new(),
            latest_request: 0,
            inbox_tx,
            inbox_rx,
            subscription: None,
            confirmation: Box::new(confirmation),
            notifier: Box::new(notifier),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn locations(&self) -> &[LocationRecord] {
        &self.locations
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            sender: self.inbox_tx.clone(),
        }
    }

    /// Subscribe to the change feed and load the initial list.
    pub async fn mount(&mut self) {
        if self.subscription.is_none() {
            let inbox = self.inbox_tx.clone();
            let subscription = self.store.subscribe_to_changes(move |event| {
                let _ = inbox.send(RefreshTrigger::Changed(event));
            });
            self.subscription = Some(subscription);
        }

        self.refresh().await;
    }

    /// Release the change-feed subscription. Safe to call more than once.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub async fn refresh(&mut self) {
        let ticket = self.begin_refresh();
        let result = self.store.list_all().await;
        self.complete_refresh(ticket, result);
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.latest_request += 1;
        self.state = ListState::Loading;
        RefreshTicket(self.latest_request)
    }

    /// Apply a fetch result. Returns `false` and discards the result if a newer refresh
    /// has started since `ticket` was issued.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<LocationRecord>, StoreError>,
    ) -> bool {
        if ticket.0 != self.latest_request {
            log::warn!(
                "Discarding stale location list response (request {}, latest {})",
                ticket.0,
                self.latest_request
            );
            return false;
        }

        match result {
            Ok(locations) => {
                self.locations = locations;
                self.state = ListState::Loaded;
            }
            Err(e) => {
                let message = e.to_string();
                self.notifier
                    .notify(Notice::error("Failed to load locations", message.clone()));
                self.state = ListState::Failed(message);
            }
        }
        true
    }

    /// Wait for the next refresh trigger and re-fetch the list.
    pub async fn process_next_trigger(&mut self) -> Option<RefreshTrigger> {
        let trigger = self.inbox_rx.recv().await?;
        log::debug!("Refreshing locations after {:?}", trigger);
        self.refresh().await;
        Some(trigger)
    }

    pub async fn delete(&mut self, id: Uuid) -> DeleteOutcome {
        let prompt = match self.locations.iter().find(|location| location.id == id) {
            Some(location) => format!("Are you sure you want to delete '{}'?", location.name),
            None => "Are you sure you want to delete this location?".to_string(),
        };
        if !self.confirmation.confirm(&prompt) {
            return DeleteOutcome::Cancelled;
        }

        match self.store.delete(id).await {
            Ok(()) => {
                self.notifier
                    .notify(Notice::success("Location deleted", "Location removed successfully"));
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(StoreError::InUse(count)) => {
                self.notifier.notify(Notice::error(
                    "Cannot delete location",
                    format!(
                        "This location is assigned to {} employee(s). \
                         Reassign them before deleting.",
                        count
                    ),
                ));
                DeleteOutcome::InUse(count)
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error("Failed to delete location", e.to_string()));
                DeleteOutcome::Failed(e)
            }
        }
    }
}
