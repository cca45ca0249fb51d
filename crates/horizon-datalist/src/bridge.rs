//! Host signal bridge.
//!
//! The host talks to a mounted widget through two named signals on a
//! [`HostSignals`] surface, which may be shared by any number of widget
//! instances:
//!
//! - `pagination_change` carries a [`Pagination`]. Every instance sees every
//!   emission and ignores the ones whose `id` is not its own pagination id.
//!   A match runs the [`FilterRunner`] for the new page and, once the run
//!   completes successfully, writes the pagination back into the store.
//! - `render_to_store` carries an [`ItemsPayload`]. It is not filtered by
//!   instance; the most recent payload wins. The host can also push payloads
//!   directly through the [`PushFn`] handed to its `push_dispatch` hook.
//!
//! Both data-push paths go through [`EventBridge::deliver_items`], which
//! ignores a payload that is the very same allocation as the last one
//! applied. Equal but distinct payloads are applied again.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_datalist_core::logging::{span_names, targets};
use horizon_datalist_core::{ConnectionGuard, PerfSpan, Signal};

use crate::error::Result;
use crate::hooks::PushFn;
use crate::store::{AppInit, AppState, Store};
use crate::types::{ItemsPayload, Pagination};

/// The dispatch surface shared between a host and its widgets.
#[derive(Debug, Default)]
pub struct HostSignals {
    /// Pagination requests, addressed by pagination id.
    pub pagination_change: Arc<Signal<Pagination>>,
    /// Fetched result sets, addressed to whichever widget is listening.
    pub render_to_store: Arc<Signal<Arc<ItemsPayload>>>,
}

impl HostSignals {
    /// Create an idle surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a surface ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Request a page change. Returns the number of listeners reached.
    pub fn emit_pagination(&self, pagination: Pagination) -> usize {
        self.pagination_change.emit(pagination)
    }

    /// Push a result set. Returns the number of listeners reached.
    pub fn emit_render(&self, payload: Arc<ItemsPayload>) -> usize {
        self.render_to_store.emit(payload)
    }
}

/// Completion callback of a [`FilterRunner`] run.
pub type FetchDone = Box<dyn FnOnce(Result<()>) + Send>;

/// What the data-fetch collaborator is asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// The store state when the request was made.
    pub state: AppState,
    /// The view to fetch for.
    pub view: Option<String>,
    /// The requested page.
    pub pagination: Pagination,
}

/// The data-fetch collaborator.
///
/// A run may complete synchronously or later from any thread by calling
/// `done`. Its item data is expected to arrive separately, through the
/// render signal or the push callback. Runs cannot be cancelled.
pub trait FilterRunner: Send + Sync {
    /// Start fetching `request`, calling `done` once finished.
    fn run(&self, request: FetchRequest, done: FetchDone);
}

impl<F> FilterRunner for F
where
    F: Fn(FetchRequest, FetchDone) + Send + Sync,
{
    fn run(&self, request: FetchRequest, done: FetchDone) {
        self(request, done)
    }
}

/// Connects one widget instance to the host signals.
pub struct EventBridge {
    pagination_id: String,
    store: Arc<dyn Store>,
    runner: Arc<dyn FilterRunner>,
    // Holding the Arc keeps its address from being reused by a later payload.
    last_items: Mutex<Option<Arc<ItemsPayload>>>,
    pagination_guard: Mutex<Option<ConnectionGuard<Pagination>>>,
    render_guard: Mutex<Option<ConnectionGuard<Arc<ItemsPayload>>>>,
}

impl EventBridge {
    /// Create an inactive bridge for the instance owning `pagination_id`.
    pub fn new(
        pagination_id: impl Into<String>,
        store: Arc<dyn Store>,
        runner: Arc<dyn FilterRunner>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pagination_id: pagination_id.into(),
            store,
            runner,
            last_items: Mutex::new(None),
            pagination_guard: Mutex::new(None),
            render_guard: Mutex::new(None),
        })
    }

    /// The pagination id this bridge answers to.
    pub fn pagination_id(&self) -> &str {
        &self.pagination_id
    }

    /// Start listening for pagination changes. Returns `false` if already listening.
    pub fn activate_pagination(self: &Arc<Self>, signals: &HostSignals) -> bool {
        let mut guard = self.pagination_guard.lock();
        if guard.is_some() {
            return false;
        }
        let bridge = Arc::downgrade(self);
        *guard = Some(signals.pagination_change.connect_guarded(move |pagination| {
            if let Some(bridge) = bridge.upgrade() {
                bridge.handle_pagination(pagination);
            }
        }));
        tracing::debug!(target: targets::BRIDGE, id = %self.pagination_id, "pagination channel active");
        true
    }

    /// Start listening for rendered result sets. Returns `false` if already listening.
    pub fn activate_data_push(self: &Arc<Self>, signals: &HostSignals) -> bool {
        let mut guard = self.render_guard.lock();
        if guard.is_some() {
            return false;
        }
        let bridge = Arc::downgrade(self);
        *guard = Some(signals.render_to_store.connect_guarded(move |payload| {
            if let Some(bridge) = bridge.upgrade() {
                bridge.deliver_items(payload.clone());
            }
        }));
        tracing::debug!(target: targets::BRIDGE, id = %self.pagination_id, "data-push channel active");
        true
    }

    /// Whether the pagination channel is listening.
    pub fn is_pagination_active(&self) -> bool {
        self.pagination_guard
            .lock()
            .as_ref()
            .is_some_and(ConnectionGuard::is_connected)
    }

    /// Whether the data-push channel is listening.
    pub fn is_data_push_active(&self) -> bool {
        self.render_guard
            .lock()
            .as_ref()
            .is_some_and(ConnectionGuard::is_connected)
    }

    /// Handle a pagination change. Returns whether it was addressed to this instance.
    pub fn handle_pagination(&self, pagination: &Pagination) -> bool {
        if pagination.id != self.pagination_id {
            tracing::trace!(
                target: targets::BRIDGE,
                id = %pagination.id,
                own = %self.pagination_id,
                "ignoring pagination change for another instance"
            );
            return false;
        }

        let _span = PerfSpan::for_instance(span_names::PAGINATION, &self.pagination_id);
        let state = self.store.state();
        let request = FetchRequest {
            view: state.selected_view.clone(),
            state,
            pagination: pagination.clone(),
        };

        let store = self.store.clone();
        let applied = pagination.clone();
        self.runner.run(
            request,
            Box::new(move |result: Result<()>| match result {
                Ok(()) => store.app_init(AppInit::pagination(applied)),
                Err(err) => {
                    tracing::warn!(target: targets::BRIDGE, id = %applied.id, error = %err, "filter run failed");
                }
            }),
        );
        true
    }

    /// Apply a result set unless it is the one applied last.
    ///
    /// Returns whether the store was updated.
    pub fn deliver_items(&self, payload: Arc<ItemsPayload>) -> bool {
        {
            let mut last = self.last_items.lock();
            if last.as_ref().is_some_and(|last| Arc::ptr_eq(last, &payload)) {
                tracing::trace!(target: targets::BRIDGE, "ignoring repeated payload");
                return false;
            }
            *last = Some(payload.clone());
        }
        self.store.update_items(payload);
        true
    }

    /// Callback handed to the host's `push_dispatch` hook.
    pub fn push_fn(self: &Arc<Self>) -> PushFn {
        let bridge: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |payload: Arc<ItemsPayload>| {
            if let Some(bridge) = bridge.upgrade() {
                bridge.deliver_items(payload);
            }
        })
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("pagination_id", &self.pagination_id)
            .field("pagination_active", &self.is_pagination_active())
            .field("data_push_active", &self.is_data_push_active())
            .finish_non_exhaustive()
    }
}
