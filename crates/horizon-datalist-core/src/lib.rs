//! Core primitives for Horizon DataList.
//!
//! This crate provides the building blocks the data-list synchronization
//! core is assembled from:
//!
//! - **Signals**: Typed, instance-scoped event channels with RAII connections
//! - **Properties**: Lock-protected state cells with change detection
//! - **Logging**: `tracing` targets, timing spans and convenience macros
//!
//! # Signal Example
//!
//! ```
//! use horizon_datalist_core::Signal;
//!
//! let items_pushed = Signal::<usize>::new();
//! items_pushed.connect(|count| println!("{} items arrived", count));
//! items_pushed.emit(25);
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};

static_assertions::assert_impl_all!(Signal<u64>: Send, Sync);
static_assertions::assert_impl_all!(Property<String>: Send, Sync);
