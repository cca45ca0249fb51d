//! Host hook registry.
//!
//! A host integrates with the widget through four optional capabilities:
//!
//! | capability | host receives | used for |
//! |---|---|---|
//! | [`Capability::OnInit`] | app state + config | intercepting startup to supply preferences |
//! | [`Capability::DoFilterChange`] | a [`FilterChangeFn`] | pushing filter changes at any later time |
//! | [`Capability::DoSort`] | a [`SortFn`] | sorting by key, `DESC` by default |
//! | [`Capability::PushDispatch`] | a [`PushFn`] | pushing out-of-band fetched items |
//!
//! Each slot is an `FnOnce`: the registry hands it to the widget at most once
//! and the type system guarantees it cannot run twice. Which slots were
//! declared is fixed when the registry is built ([`HookCapabilities`]).
//!
//! Host code is foreign to the widget. A hook that panics is logged and
//! treated as if it had not been declared; it never unwinds into the widget.
//!
//! # Example
//!
//! ```
//! use horizon_datalist::hooks::{Capability, HookRegistry, Hooks};
//!
//! let hooks = Hooks::new()
//!     .do_sort(|sort| sort("price", None))
//!     .on_init(|_state, _config| None);
//!
//! let registry = HookRegistry::new(hooks);
//! assert!(registry.capabilities().contains(Capability::DoSort));
//! assert!(!registry.capabilities().contains(Capability::PushDispatch));
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use horizon_datalist_core::logging::targets;

use crate::config::DataListConfig;
use crate::preferences::Preferences;
use crate::store::{AppState, Store};
use crate::types::{FilterChangeBatch, ItemsPayload, SortDirection, SortDirective};

/// Callback pushing filter changes to the store.
pub type FilterChangeFn = Arc<dyn Fn(FilterChangeBatch) + Send + Sync>;

/// Callback sorting by a key; `None` means the default direction (`DESC`).
pub type SortFn = Arc<dyn Fn(&str, Option<SortDirection>) + Send + Sync>;

/// Callback pushing a fetched result set.
pub type PushFn = Arc<dyn Fn(Arc<ItemsPayload>) + Send + Sync>;

/// What an `on_init` hook returns to defer startup: it is handed the
/// [`InitReady`] handle to call once preferences are available.
pub type InitDeferral = Box<dyn FnOnce(InitReady) + Send>;

type OnInitHook = Box<dyn FnOnce(&AppState, &DataListConfig) -> Option<InitDeferral> + Send>;
type FilterChangeHook = Box<dyn FnOnce(FilterChangeFn) + Send>;
type SortHook = Box<dyn FnOnce(SortFn) + Send>;
type PushDispatchHook = Box<dyn FnOnce(PushFn) + Send>;

/// Continuation handed to a deferring `on_init` hook.
///
/// Calling [`resume`](Self::resume) continues startup. Dropping it without
/// resuming stalls the initial filter population indefinitely; the rest of
/// the widget keeps working.
pub struct InitReady {
    resume: Box<dyn FnOnce(Option<Preferences>) + Send>,
}

impl InitReady {
    /// Wrap a continuation.
    pub fn new<F>(resume: F) -> Self
    where
        F: FnOnce(Option<Preferences>) + Send + 'static,
    {
        Self {
            resume: Box::new(resume),
        }
    }

    /// Continue startup, optionally with preferences.
    pub fn resume(self, preferences: Option<Preferences>) {
        (self.resume)(preferences);
    }
}

impl fmt::Debug for InitReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitReady").finish_non_exhaustive()
    }
}

/// One host capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Startup interception.
    OnInit,
    /// Programmatic filter changes.
    DoFilterChange,
    /// Programmatic sorting.
    DoSort,
    /// Out-of-band item pushes.
    PushDispatch,
}

/// The set of capabilities a host declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookCapabilities {
    on_init: bool,
    do_filter_change: bool,
    do_sort: bool,
    push_dispatch: bool,
}

impl HookCapabilities {
    /// Whether the capability was declared.
    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::OnInit => self.on_init,
            Capability::DoFilterChange => self.do_filter_change,
            Capability::DoSort => self.do_sort,
            Capability::PushDispatch => self.push_dispatch,
        }
    }

    /// Whether any capability was declared.
    pub fn is_empty(&self) -> bool {
        !(self.on_init || self.do_filter_change || self.do_sort || self.push_dispatch)
    }
}

/// Host-supplied hooks; every slot is optional.
#[derive(Default)]
pub struct Hooks {
    on_init: Option<OnInitHook>,
    do_filter_change: Option<FilterChangeHook>,
    do_sort: Option<SortHook>,
    push_dispatch: Option<PushDispatchHook>,
}

impl Hooks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intercept startup. Return `Some` to defer until the host resumes.
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&AppState, &DataListConfig) -> Option<InitDeferral> + Send + 'static,
    {
        self.on_init = Some(Box::new(hook));
        self
    }

    /// Receive a callback for pushing filter changes.
    pub fn do_filter_change<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(FilterChangeFn) + Send + 'static,
    {
        self.do_filter_change = Some(Box::new(hook));
        self
    }

    /// Receive a callback for sorting.
    pub fn do_sort<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(SortFn) + Send + 'static,
    {
        self.do_sort = Some(Box::new(hook));
        self
    }

    /// Receive a callback for pushing fetched items.
    pub fn push_dispatch<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(PushFn) + Send + 'static,
    {
        self.push_dispatch = Some(Box::new(hook));
        self
    }

    /// The declared capabilities.
    pub fn capabilities(&self) -> HookCapabilities {
        HookCapabilities {
            on_init: self.on_init.is_some(),
            do_filter_change: self.do_filter_change.is_some(),
            do_sort: self.do_sort.is_some(),
            push_dispatch: self.push_dispatch.is_some(),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Result of running the `on_init` hook.
pub enum InitOutcome {
    /// No hook was declared (or it already ran, or it panicked).
    NotDeclared,
    /// The hook ran and startup may proceed immediately.
    Proceed,
    /// The hook wants to supply preferences later.
    Deferred(InitDeferral),
}

impl fmt::Debug for InitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDeclared => f.write_str("NotDeclared"),
            Self::Proceed => f.write_str("Proceed"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Owns the host hooks and hands each one out at most once.
pub struct HookRegistry {
    capabilities: HookCapabilities,
    slots: Mutex<Hooks>,
}

impl HookRegistry {
    /// Capture the hooks and their capability set.
    pub fn new(hooks: Hooks) -> Self {
        Self {
            capabilities: hooks.capabilities(),
            slots: Mutex::new(hooks),
        }
    }

    /// The capabilities declared at construction.
    pub fn capabilities(&self) -> HookCapabilities {
        self.capabilities
    }

    /// Run the `on_init` hook, if declared and not yet run.
    pub fn run_on_init(&self, state: &AppState, config: &DataListConfig) -> InitOutcome {
        let Some(hook) = self.slots.lock().on_init.take() else {
            return InitOutcome::NotDeclared;
        };
        match guard_host_call("on_init", || hook(state, config)) {
            Some(Some(deferral)) => InitOutcome::Deferred(deferral),
            Some(None) => InitOutcome::Proceed,
            None => InitOutcome::NotDeclared,
        }
    }

    /// Hand the filter-change callback to the host. Returns whether a hook ran.
    pub fn wire_filter_change(&self, callback: FilterChangeFn) -> bool {
        let hook = self.slots.lock().do_filter_change.take();
        wire("do_filter_change", hook, callback)
    }

    /// Hand the sort callback to the host. Returns whether a hook ran.
    pub fn wire_sort(&self, callback: SortFn) -> bool {
        let hook = self.slots.lock().do_sort.take();
        wire("do_sort", hook, callback)
    }

    /// Hand the item-push callback to the host. Returns whether a hook ran.
    pub fn wire_push_dispatch(&self, callback: PushFn) -> bool {
        let hook = self.slots.lock().push_dispatch.take();
        wire("push_dispatch", hook, callback)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

fn wire<C>(name: &'static str, hook: Option<Box<dyn FnOnce(C) + Send>>, callback: C) -> bool {
    match hook {
        Some(hook) => {
            tracing::debug!(target: targets::HOOKS, hook = name, "wiring host hook");
            guard_host_call(name, || hook(callback)).is_some()
        }
        None => false,
    }
}

/// Run host code, turning a panic into `None`.
pub(crate) fn guard_host_call<R>(name: &'static str, call: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(target: targets::HOOKS, hook = name, "host hook panicked, ignoring it");
            None
        }
    }
}

/// Callback that forwards host filter changes to the store verbatim.
pub fn filter_change_callback(store: Arc<dyn Store>) -> FilterChangeFn {
    Arc::new(move |batch: FilterChangeBatch| store.filter_change(batch))
}

/// Callback that turns `(key, direction)` into a sort directive dispatch.
pub fn sort_callback(store: Arc<dyn Store>) -> SortFn {
    Arc::new(move |key: &str, direction: Option<SortDirection>| {
        let directive = SortDirective::new(key, direction.unwrap_or_default());
        store.filter_change(directive.to_filter_change().into());
    })
}
