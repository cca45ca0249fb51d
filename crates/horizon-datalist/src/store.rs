//! The application store contract.
//!
//! The store is the single mutable resource the widget shares with the rest
//! of the application. The widget only ever talks to it through three
//! fire-and-forget calls:
//!
//! - [`Store::app_init`] merges a partial state ([`AppInit`]),
//! - [`Store::filter_change`] applies one record or a batch,
//! - [`Store::update_items`] replaces the current result set.
//!
//! [`MemoryStore`] is a small reference implementation used as the default
//! store and in tests. It merges slices the obvious way, counts calls and
//! announces every update on [`MemoryStore::changed`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use horizon_datalist_core::logging::targets;
use horizon_datalist_core::{Property, Signal};

use crate::config::DataListConfig;
use crate::preferences::Preferences;
use crate::query::QueryObject;
use crate::types::{FilterChange, FilterChangeBatch, ItemsPayload, Pagination};

/// A partial application state; `None` slices are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppInit {
    /// Host configuration.
    pub config: Option<DataListConfig>,
    /// Column/list preferences.
    pub preferences: Option<Preferences>,
    /// Pagination state.
    pub pagination: Option<Pagination>,
    /// Verbatim query object.
    pub query_object: Option<QueryObject>,
    /// Raw query string.
    pub query_string: Option<String>,
    /// The view subsequent fetches run against.
    pub selected_view: Option<String>,
}

impl AppInit {
    /// Only the configuration slice.
    pub fn config(config: DataListConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Only the preferences slice.
    pub fn preferences(preferences: Preferences) -> Self {
        Self {
            preferences: Some(preferences),
            ..Self::default()
        }
    }

    /// Only the pagination slice.
    pub fn pagination(pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::default()
        }
    }

    /// The combined snapshot issued once per initialization pass.
    pub fn snapshot(
        pagination: Pagination,
        query_object: QueryObject,
        query_string: impl Into<String>,
        selected_view: Option<String>,
    ) -> Self {
        Self {
            pagination: Some(pagination),
            query_object: Some(query_object),
            query_string: Some(query_string.into()),
            selected_view,
            ..Self::default()
        }
    }

    /// Add a preferences slice.
    pub fn with_preferences(mut self, preferences: Option<Preferences>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Whether no slice is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The merged application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    /// Host configuration.
    pub config: Option<DataListConfig>,
    /// Column/list preferences.
    pub preferences: Option<Preferences>,
    /// Pagination state.
    pub pagination: Option<Pagination>,
    /// Verbatim query object.
    pub query_object: QueryObject,
    /// Raw query string.
    pub query_string: String,
    /// The view subsequent fetches run against.
    pub selected_view: Option<String>,
    /// Active filters, one per `(id, view)`.
    pub filters: Vec<FilterChange>,
    /// The most recently applied result set.
    pub items: Option<Arc<ItemsPayload>>,
}

impl AppState {
    /// Merge a partial state.
    pub fn merge(&mut self, init: AppInit) {
        if let Some(config) = init.config {
            self.config = Some(config);
        }
        if let Some(preferences) = init.preferences {
            self.preferences = Some(preferences);
        }
        if let Some(pagination) = init.pagination {
            self.pagination = Some(pagination);
        }
        if let Some(query_object) = init.query_object {
            self.query_object = query_object;
        }
        if let Some(query_string) = init.query_string {
            self.query_string = query_string;
        }
        if let Some(selected_view) = init.selected_view {
            self.selected_view = Some(selected_view);
        }
    }

    /// Apply filter records, replacing any earlier value for the same `(id, view)`.
    pub fn apply_filters(&mut self, batch: &FilterChangeBatch) {
        for record in batch.records() {
            match self
                .filters
                .iter_mut()
                .find(|f| f.id == record.id && f.view == record.view)
            {
                Some(existing) => existing.value = record.value.clone(),
                None => self.filters.push(record.clone()),
            }
        }
    }

    /// The current value of a filter.
    pub fn filter(&self, id: &str, view: Option<&str>) -> Option<&FilterChange> {
        self.filters
            .iter()
            .find(|f| f.id == id && f.view.as_deref() == view)
    }
}

/// Update calls the widget makes on the shared store.
///
/// Every call is fire-and-forget; the widget never relies on a return value.
pub trait Store: Send + Sync {
    /// Merge a partial state.
    fn app_init(&self, init: AppInit);

    /// Apply one filter record or an ordered batch.
    fn filter_change(&self, batch: FilterChangeBatch);

    /// Replace the current result set.
    fn update_items(&self, payload: Arc<ItemsPayload>);

    /// A snapshot of the current state.
    fn state(&self) -> AppState;
}

/// Which update a [`MemoryStore`] just applied.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    /// An `app_init` call.
    AppInit(AppInit),
    /// A `filter_change` call.
    FilterChange(FilterChangeBatch),
    /// An `update_items` call.
    Items(Arc<ItemsPayload>),
}

/// In-memory reference store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Property<AppState>,
    update_count: AtomicUsize,
    changed: Signal<StoreUpdate>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared empty store.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total number of update calls received.
    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    /// Signal emitted after every update, with the update applied.
    pub fn changed(&self) -> &Signal<StoreUpdate> {
        &self.changed
    }

    fn record(&self, update: StoreUpdate) {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        self.changed.emit(update);
    }
}

impl Store for MemoryStore {
    fn app_init(&self, init: AppInit) {
        tracing::trace!(target: targets::STORE, ?init, "app_init");
        self.state.update(|state| state.merge(init.clone()));
        self.record(StoreUpdate::AppInit(init));
    }

    fn filter_change(&self, batch: FilterChangeBatch) {
        tracing::trace!(target: targets::STORE, records = batch.len(), "filter_change");
        self.state.update(|state| state.apply_filters(&batch));
        self.record(StoreUpdate::FilterChange(batch));
    }

    fn update_items(&self, payload: Arc<ItemsPayload>) {
        tracing::trace!(target: targets::STORE, count = payload.count, "update_items");
        self.state.update(|state| state.items = Some(payload.clone()));
        self.record(StoreUpdate::Items(payload));
    }

    fn state(&self) -> AppState {
        self.state.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_app_init_merges_slices() {
        let store = MemoryStore::new();
        store.app_init(AppInit::config(DataListConfig::new("x")));
        store.app_init(AppInit::pagination(Pagination::new("dl__items__x", 0, 10, 1)));

        let state = store.state();
        assert_eq!(state.config.unwrap().id, "x");
        assert_eq!(state.pagination.unwrap().take, 10);
        assert_eq!(store.update_count(), 2);
    }

    #[test]
    fn test_empty_app_init_keeps_state() {
        let store = MemoryStore::new();
        store.app_init(AppInit::pagination(Pagination::new("p", 5, 5, 2)));
        assert!(AppInit::default().is_empty());
        store.app_init(AppInit::default());
        assert_eq!(store.state().pagination.unwrap().page, 2);
    }

    #[test]
    fn test_filter_change_upserts_by_id_and_view() {
        let store = MemoryStore::new();
        store.filter_change(
            vec![
                FilterChange::new("status", Some("main".into()), "open"),
                FilterChange::new("status", Some("archive".into()), "closed"),
            ]
            .into(),
        );
        store.filter_change(FilterChange::new("status", Some("main".into()), "done").into());

        let state = store.state();
        assert_eq!(state.filters.len(), 2);
        assert_eq!(state.filter("status", Some("main")).unwrap().value, json!("done"));
    }

    #[test]
    fn test_update_items_replaces_payload() {
        let store = MemoryStore::new();
        let first = ItemsPayload::new(vec![json!(1)], 1);
        let second = ItemsPayload::new(vec![json!(2), json!(3)], 2);
        store.update_items(first);
        store.update_items(second.clone());
        assert!(Arc::ptr_eq(store.state().items.as_ref().unwrap(), &second));
    }

    #[test]
    fn test_changed_signal() {
        let store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store.changed().connect(move |update| {
            seen_clone.lock().push(matches!(update, StoreUpdate::FilterChange(_)));
        });

        store.filter_change(Vec::new().into());
        store.app_init(AppInit::default());
        assert_eq!(*seen.lock(), vec![true, false]);
    }
}
