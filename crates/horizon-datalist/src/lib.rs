//! Synchronization core of the Horizon DataList widget.
//!
//! An embeddable data list keeps three things in step: the address-bar query
//! string, the filter/sort/pagination state in a shared store, and the result
//! sets a host application fetches. This crate provides:
//!
//! - **Query translation**: Query strings to pagination, filter batches and sort directives
//! - **Filter dispatch**: Routing filter values to their definitions in the view hierarchy
//! - **Host hooks**: Optional startup, filter, sort and item-push capabilities
//! - **Event bridge**: Instance-scoped pagination and data-push channels
//! - **Initialization**: The single ordered pass run when a widget mounts
//! - **Preferences**: Persisted column/list settings that never block startup
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_datalist::prelude::*;
//!
//! let config = DataListConfig::from_json(r#"{
//!     "id": "orders",
//!     "pagination": { "take": 10 },
//!     "views": [{ "id": "main", "filterGroups": [{ "filters": [{ "id": "status" }] }] }]
//! }"#).unwrap();
//!
//! let store = MemoryStore::shared();
//! let signals = HostSignals::shared();
//! let runner: Arc<dyn FilterRunner> = Arc::new(|_: FetchRequest, done: FetchDone| done(Ok(())));
//!
//! let list = DataList::builder(config)
//!     .store(store.clone())
//!     .runner(runner)
//!     .signals(signals.clone())
//!     .query_source(Arc::new("?skip=0&take=25&page=1&view=main&status=active".to_string()))
//!     .mount()
//!     .unwrap();
//!
//! // The host pushes fetched items on the shared surface.
//! signals.emit_render(ItemsPayload::new(vec![serde_json::json!({ "id": 1 })], 1));
//! assert_eq!(store.state().items.unwrap().count, 1);
//! assert_eq!(list.pagination_id(), "dl__items__orders");
//! ```

pub mod bridge;
pub mod config;
pub mod datalist;
pub mod dispatch;
pub mod error;
pub mod hooks;
pub mod preferences;
pub mod query;
pub mod store;
pub mod types;

pub use horizon_datalist_core::{ConnectionGuard, PerfSpan, Property, Signal};

pub use datalist::{DataList, DataListBuilder, InitPhase};
pub use error::{DataListError, Result};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::bridge::{EventBridge, FetchDone, FetchRequest, FilterRunner, HostSignals};
    pub use crate::config::{DataListConfig, FilterDefinition, FilterGroup, PaginationDefaults, View};
    pub use crate::datalist::{DataList, DataListBuilder, InitPhase};
    pub use crate::error::{DataListError, Result};
    pub use crate::hooks::{
        Capability, FilterChangeFn, HookCapabilities, Hooks, InitDeferral, InitReady, PushFn, SortFn,
    };
    pub use crate::preferences::{
        FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Preferences,
    };
    pub use crate::query::{QueryObject, QuerySource, QueryValue};
    pub use crate::store::{AppInit, AppState, MemoryStore, Store, StoreUpdate};
    pub use crate::types::{
        FilterChange, FilterChangeBatch, ItemsPayload, Pagination, SortDirection, SortDirective,
    };
}
