//! The mounted widget and its initialization pass.
//!
//! [`DataList::builder`] collects the collaborators a widget needs and
//! [`DataListBuilder::mount`] wires them together and runs the one-time
//! initialization pass:
//!
//! 1. the configuration is applied to the store;
//! 2. the host `on_init` hook runs and may defer the rest of the pass until
//!    it resumes, optionally with preferences;
//! 3. pagination is read from the query string, falling back to the
//!    configured defaults;
//! 4. persisted preferences are loaded, failures meaning "none";
//! 5. pagination and preferences are applied to the store;
//! 6. the pagination channel and the host's filter/sort hooks are wired;
//! 7. the query string is translated, its filters resolved against the view
//!    hierarchy and dispatched as one batch, the sort directive dispatched
//!    on its own, and finally the combined snapshot applied.
//!
//! The data-push channel is live from the moment of mounting, independent of
//! the pass. A deferring host that never resumes stalls steps 3 to 7 only.

use std::fmt;
use std::sync::{Arc, Weak};

use horizon_datalist_core::logging::{span_names, targets};
use horizon_datalist_core::{datalist_debug, datalist_trace, datalist_warn, PerfSpan, Property};

use crate::bridge::{EventBridge, FilterRunner, HostSignals};
use crate::config::DataListConfig;
use crate::dispatch::FilterDispatchBuilder;
use crate::error::{DataListError, Result};
use crate::hooks::{
    filter_change_callback, guard_host_call, sort_callback, HookCapabilities, HookRegistry, Hooks,
    InitOutcome, InitReady,
};
use crate::preferences::{load_or_none, MemoryPreferenceStore, PreferenceStore, Preferences};
use crate::query::{translate, PaginationParams, QuerySource};
use crate::store::{AppInit, Store};

/// Where a widget is in its initialization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitPhase {
    /// The pass has not started.
    #[default]
    Idle,
    /// The host's `on_init` hook deferred the pass and has not resumed yet.
    AwaitingHost,
    /// Steps 3 to 7 are running.
    Running,
    /// The pass has finished. It never runs again.
    Complete,
}

/// Collects the collaborators of a [`DataList`].
///
/// A store and a filter runner are required. Without a query source the
/// query string is empty; without a preference store preferences live in
/// memory; without signals the widget gets a private surface.
pub struct DataListBuilder {
    config: DataListConfig,
    store: Option<Arc<dyn Store>>,
    runner: Option<Arc<dyn FilterRunner>>,
    query_source: Option<Arc<dyn QuerySource>>,
    preference_store: Option<Arc<dyn PreferenceStore>>,
    signals: Option<Arc<HostSignals>>,
    hooks: Hooks,
}

impl DataListBuilder {
    fn new(config: DataListConfig) -> Self {
        Self {
            config,
            store: None,
            runner: None,
            query_source: None,
            preference_store: None,
            signals: None,
            hooks: Hooks::new(),
        }
    }

    /// The shared application store.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// The data-fetch collaborator used for page changes.
    pub fn runner(mut self, runner: Arc<dyn FilterRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Where the current query string is read from.
    pub fn query_source(mut self, source: Arc<dyn QuerySource>) -> Self {
        self.query_source = Some(source);
        self
    }

    /// Where preferences are persisted.
    pub fn preference_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preference_store = Some(store);
        self
    }

    /// The signal surface shared with the host.
    pub fn signals(mut self, signals: Arc<HostSignals>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Host hooks.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Mount the widget and run its initialization pass.
    ///
    /// Returns once the pass has completed or the host has deferred it.
    pub fn mount(self) -> Result<DataList> {
        let store = self
            .store
            .ok_or(DataListError::MissingCollaborator("store"))?;
        let runner = self
            .runner
            .ok_or(DataListError::MissingCollaborator("runner"))?;
        let query_source = self
            .query_source
            .unwrap_or_else(|| Arc::new(String::new()) as Arc<dyn QuerySource>);
        let preference_store = self
            .preference_store
            .unwrap_or_else(|| Arc::new(MemoryPreferenceStore::new()) as Arc<dyn PreferenceStore>);
        let signals = self.signals.unwrap_or_else(HostSignals::shared);

        let pagination_id = self.config.pagination_id();
        let bridge = EventBridge::new(pagination_id.clone(), store.clone(), runner);
        let inner = Arc::new(Inner {
            dispatch: FilterDispatchBuilder::new(self.config.views.clone()),
            hooks: HookRegistry::new(self.hooks),
            config: self.config,
            pagination_id,
            store,
            query_source,
            preference_store,
            signals,
            bridge,
            phase: Property::new(InitPhase::Idle),
        });

        tracing::debug!(
            target: targets::SEQUENCER,
            id = %inner.pagination_id,
            capabilities = ?inner.hooks.capabilities(),
            "mounting data list"
        );

        inner.bridge.activate_data_push(&inner.signals);
        inner.hooks.wire_push_dispatch(inner.bridge.push_fn());

        Inner::start(&inner);
        Ok(DataList { inner })
    }
}

impl fmt::Debug for DataListBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataListBuilder")
            .field("config", &self.config)
            .field("store", &self.store.is_some())
            .field("runner", &self.runner.is_some())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

struct Inner {
    config: DataListConfig,
    pagination_id: String,
    store: Arc<dyn Store>,
    query_source: Arc<dyn QuerySource>,
    preference_store: Arc<dyn PreferenceStore>,
    signals: Arc<HostSignals>,
    hooks: HookRegistry,
    dispatch: FilterDispatchBuilder,
    bridge: Arc<EventBridge>,
    phase: Property<InitPhase>,
}

impl Inner {
    fn start(this: &Arc<Self>) {
        this.store.app_init(AppInit::config(this.config.clone()));

        match this.hooks.run_on_init(&this.store.state(), &this.config) {
            InitOutcome::NotDeclared | InitOutcome::Proceed => this.finish(None),
            InitOutcome::Deferred(deferral) => {
                this.phase.set(InitPhase::AwaitingHost);
                datalist_debug!(id = %this.pagination_id, "initialization deferred to host");

                let weak: Weak<Self> = Arc::downgrade(this);
                let ready = InitReady::new(move |preferences| {
                    if let Some(inner) = weak.upgrade() {
                        inner.finish(preferences);
                    }
                });
                if guard_host_call("on_init deferral", || deferral(ready)).is_none()
                    && this.phase.get() == InitPhase::AwaitingHost
                {
                    this.finish(None);
                }
            }
        }
    }

    /// Steps 2 (host preferences) to 7.
    fn finish(&self, host_preferences: Option<Preferences>) {
        let claimed = self.phase.update(|phase| match *phase {
            InitPhase::Idle | InitPhase::AwaitingHost => {
                *phase = InitPhase::Running;
                true
            }
            InitPhase::Running | InitPhase::Complete => false,
        });
        if !claimed {
            datalist_warn!(id = %self.pagination_id, "initialization already ran, ignoring resume");
            return;
        }

        let _span = PerfSpan::for_instance(span_names::INIT, &self.pagination_id);

        if let Some(preferences) = host_preferences {
            self.store.app_init(AppInit::preferences(preferences));
        }

        let query_string = self.query_source.query_string();
        let translation = translate(&query_string);
        let pagination = PaginationParams::from_query(&translation.query_object)
            .resolve(&self.config.pagination, self.pagination_id.clone());
        datalist_trace!(?pagination, "resolved pagination");

        let stored = load_or_none(self.preference_store.as_ref());
        self.store
            .app_init(AppInit::pagination(pagination.clone()).with_preferences(stored));

        self.bridge.activate_pagination(&self.signals);
        self.hooks
            .wire_filter_change(filter_change_callback(self.store.clone()));
        self.hooks.wire_sort(sort_callback(self.store.clone()));

        {
            let _pipeline = PerfSpan::for_instance(span_names::QUERY_PIPELINE, &self.pagination_id);
            let batch = self.dispatch.resolve_batch(translation.filter_batch);
            tracing::debug!(
                target: targets::SEQUENCER,
                id = %self.pagination_id,
                filters = batch.len(),
                "dispatching initial filters"
            );
            self.store.filter_change(batch.into());

            if let Some(sort) = translation.sort {
                self.store.filter_change(sort.to_filter_change().into());
            }

            self.store.app_init(AppInit::snapshot(
                pagination,
                translation.query_object,
                translation.query_string,
                translation.view,
            ));
        }

        self.phase.set(InitPhase::Complete);
        datalist_debug!(id = %self.pagination_id, "initialization complete");
    }
}

/// A mounted data-list widget.
///
/// Dropping the widget disconnects it from the host signals. Callbacks the
/// host still holds become no-ops.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_datalist::prelude::*;
///
/// let config = DataListConfig::new("orders")
///     .with_view(View::new("main").with_group(FilterGroup::with_filters(["status"])));
/// let store = MemoryStore::shared();
/// let runner: Arc<dyn FilterRunner> = Arc::new(|_: FetchRequest, done: FetchDone| done(Ok(())));
///
/// let list = DataList::builder(config)
///     .store(store.clone())
///     .runner(runner)
///     .query_source(Arc::new("?view=main&status=open&take=25".to_string()))
///     .mount()
///     .unwrap();
///
/// assert_eq!(list.phase(), InitPhase::Complete);
/// let state = store.state();
/// assert_eq!(state.pagination.as_ref().unwrap().take, 25);
/// assert_eq!(state.filter("status", Some("main")).unwrap().value, "open");
/// ```
pub struct DataList {
    inner: Arc<Inner>,
}

impl DataList {
    /// Start building a widget for `config`.
    pub fn builder(config: DataListConfig) -> DataListBuilder {
        DataListBuilder::new(config)
    }

    /// The host configuration.
    pub fn config(&self) -> &DataListConfig {
        &self.inner.config
    }

    /// The id pagination signals must carry to reach this widget.
    pub fn pagination_id(&self) -> &str {
        &self.inner.pagination_id
    }

    /// Progress of the initialization pass.
    pub fn phase(&self) -> InitPhase {
        self.inner.phase.get()
    }

    /// The hook capabilities the host declared.
    pub fn capabilities(&self) -> HookCapabilities {
        self.inner.hooks.capabilities()
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// The signal surface this widget listens on.
    pub fn signals(&self) -> &Arc<HostSignals> {
        &self.inner.signals
    }

    /// The bridge connecting this widget to its signals.
    pub fn bridge(&self) -> &Arc<EventBridge> {
        &self.inner.bridge
    }

    /// The filter resolver over the configured views.
    pub fn dispatch(&self) -> &FilterDispatchBuilder {
        &self.inner.dispatch
    }

    /// Persist preferences and apply them to the store.
    ///
    /// The store is only updated once the preferences were saved.
    pub fn save_preferences(&self, preferences: Preferences) -> Result<()> {
        self.inner.preference_store.save(&preferences)?;
        self.inner.store.app_init(AppInit::preferences(preferences));
        Ok(())
    }
}

impl fmt::Debug for DataList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataList")
            .field("id", &self.inner.config.id)
            .field("phase", &self.phase())
            .field("bridge", &self.inner.bridge)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DataList: Send, Sync);
