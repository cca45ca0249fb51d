//! Filter dispatch resolution.
//!
//! [`FilterDispatchBuilder`] routes a `(view, key, value)` triple to the
//! filter definition that owns it inside the static view hierarchy and
//! produces the record the store is sent.
//!
//! Views are scanned in order, then the addressed view's groups, then each
//! group's filters; the first definition whose id equals the key wins.
//! Duplicate ids within a view are a configuration error and are silently
//! shadowed by the earliest one. A key that matches nothing yields `None`:
//! URLs outlive configurations, and a filter that no longer exists is
//! dropped rather than reported.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use horizon_datalist_core::logging::targets;

use crate::config::{FilterDefinition, View};
use crate::types::FilterChange;

/// Resolves filter keys against a view hierarchy.
#[derive(Debug)]
pub struct FilterDispatchBuilder {
    views: Vec<View>,
    lookups: AtomicUsize,
}

impl FilterDispatchBuilder {
    /// Create a builder over an immutable view hierarchy.
    pub fn new(views: Vec<View>) -> Self {
        Self {
            views,
            lookups: AtomicUsize::new(0),
        }
    }

    /// The view hierarchy.
    pub fn views(&self) -> &[View] {
        &self.views
    }

    /// Number of lookups performed so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Find the definition owning `key` in the view `view_id`.
    pub fn find_definition(&self, view_id: &str, key: &str) -> Option<&FilterDefinition> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.views
            .iter()
            .filter(|view| view.id == view_id)
            .flat_map(View::filters)
            .find(|filter| filter.id == key)
    }

    /// Resolve one filter value into a dispatch-ready record.
    ///
    /// Returns `None` when no view is addressed or the key matches no
    /// definition in it.
    pub fn resolve(&self, view_id: Option<&str>, key: &str, value: Value) -> Option<FilterChange> {
        let Some(view_id) = view_id else {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: targets::DISPATCH, key, "no view addressed, dropping filter");
            return None;
        };

        match self.find_definition(view_id, key) {
            Some(definition) => Some(FilterChange {
                id: definition.id.clone(),
                view: Some(view_id.to_string()),
                value,
            }),
            None => {
                tracing::debug!(target: targets::DISPATCH, view = view_id, key, "unknown filter, dropping");
                None
            }
        }
    }

    /// Resolve a translated batch against the view each record carries,
    /// dropping records that match nothing.
    pub fn resolve_batch<I>(&self, records: I) -> Vec<FilterChange>
    where
        I: IntoIterator<Item = FilterChange>,
    {
        records
            .into_iter()
            .filter_map(|record| self.resolve(record.view.as_deref(), &record.id, record.value))
            .collect()
    }
}
