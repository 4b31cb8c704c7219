//! The dashboard page: three tabs of records over one store.
//!
//! Loads fetch all three tables at once and either replace every tab or, on
//! any failure, clear every tab and raise a single error notification. Each
//! load takes a ticket; a result that arrives after a newer load has started
//! is dropped, so a slow response can never overwrite fresher data.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, StoreError};
use crate::filter::{FilterField, FilterState, Filters};
use crate::form::RecordForm;
use crate::kinds::RecordKind;
use crate::list::RecordList;
use crate::models::{Record, RecordId};
use crate::notify::Notifications;
use crate::session::SessionHandle;
use crate::stats::Aggregates;
use crate::store::RecordStore;

/// Records of every kind, indexed by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collections {
    by_kind: [Vec<Record>; 3],
}

impl Collections {
    pub fn get(&self, kind: RecordKind) -> &[Record] {
        &self.by_kind[kind.index()]
    }

    pub fn set(&mut self, kind: RecordKind, records: Vec<Record>) {
        self.by_kind[kind.index()] = records;
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.iter().all(Vec::is_empty)
    }
}

/// Fetches the three tables concurrently; the first failure wins.
pub async fn fetch_all<S>(store: &S) -> Result<Collections, StoreError>
where
    S: RecordStore + ?Sized,
{
    let (suppliers, materials, jobs) = tokio::try_join!(
        store.select(RecordKind::Supplier),
        store.select(RecordKind::Material),
        store.select(RecordKind::PieceWork),
    )?;
    Ok(Collections {
        by_kind: [suppliers, materials, jobs],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Identifies one load; only the newest ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

pub struct DashboardController<S: ?Sized> {
    store: Arc<S>,
    session: SessionHandle,
    active: RecordKind,
    data: Collections,
    filters: Filters,
    state: LoadState,
    generation: u64,
    form: Option<RecordForm>,
    notifications: Notifications,
}

impl<S> DashboardController<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, session: SessionHandle) -> Self {
        Self {
            store,
            session,
            active: RecordKind::Supplier,
            data: Collections::default(),
            filters: Filters::default(),
            state: LoadState::Idle,
            generation: 0,
            form: None,
            notifications: Notifications::default(),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn active_tab(&self) -> RecordKind {
        self.active
    }

    pub fn set_active_tab(&mut self, kind: RecordKind) {
        self.active = kind;
    }

    pub fn records(&self, kind: RecordKind) -> &[Record] {
        self.data.get(kind)
    }

    /// Starts a load. Without a signed-in user there is nothing to load.
    pub fn begin_load(&mut self) -> Option<LoadTicket> {
        if !self.session.is_authenticated() {
            debug!("load skipped, nobody signed in");
            return None;
        }
        self.generation += 1;
        self.state = LoadState::Loading;
        Some(LoadTicket(self.generation))
    }

    /// Applies a load result, unless a newer load has started since.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Collections, StoreError>,
    ) -> bool {
        if ticket.0 != self.generation {
            debug!(ticket = ticket.0, current = self.generation, "dropping stale load");
            return false;
        }
        match result {
            Ok(data) => {
                self.data = data;
                self.state = LoadState::Ready;
            }
            Err(err) => {
                warn!(error = %err, "load failed");
                self.data = Collections::default();
                self.state = LoadState::Failed;
                self.notifications
                    .error("Failed to load data", Some(err.to_string()));
            }
        }
        true
    }

    /// Loads every tab from the store.
    pub async fn load(&mut self) {
        if let Some(ticket) = self.begin_load() {
            let result = fetch_all(&*self.store).await;
            self.apply_load(ticket, result);
        }
    }

    /// Follows the session: data is dropped on sign-out and loaded on sign-in.
    pub async fn sync_identity(&mut self) {
        if self.session.is_authenticated() {
            self.load().await;
        } else {
            self.generation += 1;
            self.data = Collections::default();
            self.form = None;
            self.state = LoadState::Idle;
        }
    }

    pub fn filter(&self) -> &FilterState {
        self.filters.get(self.active)
    }

    /// Edits one filter input of the active tab
    pub fn set_filter(&mut self, field: FilterField, value: impl Into<String>) {
        self.filters.get_mut(self.active).set(field, value);
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear(self.active);
    }

    /// Active tab records that pass its filters
    pub fn visible(&self) -> Vec<&Record> {
        self.filter().apply(self.records(self.active))
    }

    pub fn list(&self) -> RecordList<'_> {
        RecordList::new(self.active, self.visible())
    }

    /// Totals over the whole active tab, filters notwithstanding
    pub fn aggregates(&self) -> Aggregates {
        Aggregates::compute(self.active, self.records(self.active))
    }

    pub fn open_create(&mut self) -> &mut RecordForm {
        self.form.insert(RecordForm::create(self.active))
    }

    /// Opens the edit form for a record of the active tab
    pub fn open_edit(&mut self, id: &RecordId) -> Option<&mut RecordForm> {
        let record = self.records(self.active).iter().find(|r| r.id() == id)?;
        let form = RecordForm::edit(record);
        Some(self.form.insert(form))
    }

    pub fn form(&self) -> Option<&RecordForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut RecordForm> {
        self.form.as_mut()
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
    }

    /// Submits the open form. On success the form closes and data reloads;
    /// on failure the form stays open and one error is raised.
    pub async fn submit_form(&mut self) -> bool {
        let Some(form) = self.form.as_ref() else {
            return false;
        };
        let identity = self.session.current();
        match form.submit(&*self.store, identity.as_ref()).await {
            Ok(outcome) => {
                info!(table = form.kind().table(), ?outcome, "record saved");
                self.form = None;
                self.load().await;
                self.notifications.success(outcome.message());
                true
            }
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    /// Deletes a record of the active tab, then reloads.
    pub async fn delete(&mut self, id: RecordId) -> bool {
        if !self.session.is_authenticated() {
            self.report(Error::AuthRequired);
            return false;
        }
        match self.store.delete(self.active, &id).await {
            Ok(()) => {
                info!(table = self.active.table(), %id, "record deleted");
                self.load().await;
                self.notifications.success("Record deleted");
                true
            }
            Err(err) => {
                self.report(err.into());
                false
            }
        }
    }

    fn report(&mut self, err: Error) {
        warn!(error = %err, "dashboard action failed");
        self.notifications.error("Error", Some(err.to_string()));
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut Notifications {
        &mut self.notifications
    }
}
