//! Reactive state cells.
//!
//! [`Property<T>`] wraps a value behind a lock and reports whether writes
//! actually changed it, so owners can pair it with a [`Signal`](crate::Signal)
//! and only notify on real changes.
//!
//! # Example
//!
//! ```
//! use horizon_datalist_core::{Property, Signal};
//!
//! struct PageCounter {
//!     page: Property<u64>,
//!     page_changed: Signal<u64>,
//! }
//!
//! impl PageCounter {
//!     fn next(&self) {
//!         let page = self.page.get() + 1;
//!         if self.page.set(page) {
//!             self.page_changed.emit(page);
//!         }
//!     }
//! }
//!
//! let counter = PageCounter { page: Property::new(1), page_changed: Signal::new() };
//! counter.next();
//! assert_eq!(counter.page.get(), 2);
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A lock-guarded value with change detection.
///
/// Reads clone the current value; writes through [`set`](Self::set) or
/// [`replace`](Self::replace) compare against it first. Shareable across
/// threads when `T` is `Send + Sync`.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Snapshot of the held value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Run `f` against the held value under the write lock and return its
    /// result. `f` must not touch this property again.
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.value.write();
        f(&mut guard)
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Store `value` when it differs from the held one. Returns whether a
    /// write happened.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Like [`set`](Self::set), but hands back the displaced value.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut guard = self.value.write();
        (*guard != value).then(|| std::mem::replace(&mut *guard, value))
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Property::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&*self.value.read()).finish()
    }
}
