//! Live-tunable values shared between a component and its operators.
//!
//! Reads are lock-free (`ArcSwap`), so the admission hot path never contends
//! with a retune.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared handle to a value that can be replaced while readers are active.
/// Clones observe the same value.
#[derive(Debug)]
pub struct DynamicConfig<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Clone for DynamicConfig<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> DynamicConfig<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(value)) }
    }

    /// Snapshot the current value.
    pub fn get(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Replace the value for all holders.
    pub fn set(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T: Copy> DynamicConfig<T> {
    /// Copy the current value out.
    pub fn value(&self) -> T {
        **self.inner.load()
    }
}
