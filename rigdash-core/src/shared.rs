//! Shared-store wrapper for multi-context hosts.
//!
//! Bus receivers, the display tick and the persistence tick all touch the
//! parameter store. [`SharedStore`] serialises them with a mutex so each
//! `update` and each `get` is atomic with respect to the others, which is
//! the whole coherence contract: one record's value, timestamp, source and
//! validity always change together. Nothing holds the lock across a flash
//! write or any other slow operation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::param::{ParamId, Source};
use crate::store::ParamStore;

/// Cheaply clonable handle to one [`ParamStore`].
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<ParamStore>>,
}

impl SharedStore {
    /// Wrap a fresh store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ParamStore::new())),
        }
    }

    /// Atomic update.
    pub fn update(&self, id: ParamId, value: f32, source: Source, timestamp_ms: u64) {
        self.inner.lock().update(id, value, source, timestamp_ms);
    }

    /// Atomic read of the current value.
    pub fn get(&self, id: ParamId) -> Option<f32> {
        self.inner.lock().get(id)
    }

    /// Atomic read of value and timestamp.
    pub fn get_with_time(&self, id: ParamId) -> Option<(f32, u64)> {
        self.inner.lock().get_with_time(id)
    }

    /// Freshness check under the lock.
    pub fn is_fresh(&self, id: ParamId, now_ms: u64, max_age_ms: u64) -> bool {
        self.inner.lock().is_fresh(id, now_ms, max_age_ms)
    }

    /// Invalidate under the lock.
    pub fn invalidate(&self, id: ParamId) {
        self.inner.lock().invalidate(id);
    }

    /// Run a closure with exclusive store access.
    ///
    /// For batched work (ingest loops, watch-list refresh) that wants one
    /// lock acquisition instead of many. Keep the closure short; observer
    /// callbacks also run inside it.
    pub fn with<R>(&self, f: impl FnOnce(&mut ParamStore) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}
