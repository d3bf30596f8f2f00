//! The central parameter store.
//!
//! One record per identity, created on first update and kept for the life
//! of the process. Records carry the previous value, the update timestamp,
//! an update counter, the producing source and a validity flag, so every
//! consumer (display, persistence, alerting) reads the same coherent view.
//!
//! Change observers fire on the writer's context when a parameter becomes
//! valid for the first time or moves by more than [`CHANGE_EPSILON`];
//! callbacks must not block.

use crate::param::{PARAM_CAPACITY, ParamId, Source};

/// Minimum change that counts as a change for observers.
pub const CHANGE_EPSILON: f32 = 1e-3;

/// Default freshness window.
pub const DEFAULT_FRESH_MS: u64 = 5_000;

/// Bounded observer list size.
pub const MAX_OBSERVERS: usize = 8;

/// One parameter's state.
#[derive(Debug, Clone, Copy)]
pub struct ParamRecord {
    /// Latest value.
    pub value: f32,
    /// Value before the latest update.
    pub prev_value: f32,
    /// Monotonic milliseconds of the latest update.
    pub timestamp_ms: u64,
    /// Total updates applied.
    pub update_count: u32,
    /// Producer of the latest value.
    pub source: Source,
    /// Cleared by [`ParamStore::invalidate`], set again by any update.
    pub valid: bool,
}

impl ParamRecord {
    const fn empty() -> Self {
        Self {
            value: 0.0,
            prev_value: 0.0,
            timestamp_ms: 0,
            update_count: 0,
            source: Source::Unknown,
            valid: false,
        }
    }
}

#[cfg(feature = "alloc")]
type Observer = alloc::boxed::Box<dyn FnMut(ParamId, f32, f32) + Send>;

/// Handle for removing a registered observer.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverToken(usize);

/// Dense map from [`ParamId`] to [`ParamRecord`].
pub struct ParamStore {
    records: [ParamRecord; PARAM_CAPACITY],
    total_updates: u64,
    #[cfg(feature = "alloc")]
    observers: alloc::vec::Vec<Option<Observer>>,
}

impl ParamStore {
    /// Everything invalid, no observers.
    pub fn new() -> Self {
        Self {
            records: [ParamRecord::empty(); PARAM_CAPACITY],
            total_updates: 0,
            #[cfg(feature = "alloc")]
            observers: alloc::vec::Vec::new(),
        }
    }

    /// Install a new value.
    ///
    /// Updates to [`ParamId::None`] are silently ignored. An update carrying
    /// an older timestamp than the current valid record is discarded so the
    /// newest-stamped source wins when two buses report the same identity.
    pub fn update(&mut self, id: ParamId, value: f32, source: Source, timestamp_ms: u64) {
        if id == ParamId::None {
            return;
        }

        let record = &mut self.records[id.index()];
        if record.valid && timestamp_ms < record.timestamp_ms {
            return;
        }

        let was_valid = record.valid;
        let old_value = record.value;

        record.prev_value = record.value;
        record.value = value;
        record.timestamp_ms = timestamp_ms;
        record.source = source;
        record.valid = true;
        record.update_count += 1;
        self.total_updates += 1;

        #[cfg(feature = "alloc")]
        if !was_valid || (value - old_value).abs() > CHANGE_EPSILON {
            for observer in self.observers.iter_mut().flatten() {
                observer(id, value, old_value);
            }
        }
        #[cfg(not(feature = "alloc"))]
        let _ = (was_valid, old_value);
    }

    /// Current value, only while the record is valid.
    pub fn get(&self, id: ParamId) -> Option<f32> {
        let record = self.record(id)?;
        record.valid.then_some(record.value)
    }

    /// Current value with its update timestamp.
    pub fn get_with_time(&self, id: ParamId) -> Option<(f32, u64)> {
        let record = self.record(id)?;
        record.valid.then_some((record.value, record.timestamp_ms))
    }

    /// True when valid and updated within `max_age_ms` of `now_ms`.
    pub fn is_fresh(&self, id: ParamId, now_ms: u64, max_age_ms: u64) -> bool {
        match self.get_with_time(id) {
            Some((_, at)) => now_ms.saturating_sub(at) <= max_age_ms,
            None => false,
        }
    }

    /// Milliseconds since the last update, saturating when invalid.
    pub fn age(&self, id: ParamId, now_ms: u64) -> u64 {
        match self.get_with_time(id) {
            Some((_, at)) => now_ms.saturating_sub(at),
            None => u64::MAX,
        }
    }

    /// Clear the valid flag; history and counters stay.
    pub fn invalidate(&mut self, id: ParamId) {
        if id == ParamId::None {
            return;
        }
        self.records[id.index()].valid = false;
    }

    /// Full record access for diagnostics displays.
    pub fn record(&self, id: ParamId) -> Option<&ParamRecord> {
        (id != ParamId::None).then(|| &self.records[id.index()])
    }

    /// Register a change observer.
    ///
    /// Observers receive `(identity, new_value, previous_value)` and run on
    /// the updating context. Returns `None` when all observer slots are
    /// taken.
    #[cfg(feature = "alloc")]
    pub fn register_observer(
        &mut self,
        observer: impl FnMut(ParamId, f32, f32) + Send + 'static,
    ) -> Option<ObserverToken> {
        let boxed: Observer = alloc::boxed::Box::new(observer);
        if let Some(slot) = self.observers.iter_mut().position(|o| o.is_none()) {
            self.observers[slot] = Some(boxed);
            return Some(ObserverToken(slot));
        }
        if self.observers.len() < MAX_OBSERVERS {
            self.observers.push(Some(boxed));
            return Some(ObserverToken(self.observers.len() - 1));
        }
        None
    }

    /// Remove an observer by its token.
    #[cfg(feature = "alloc")]
    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        match self.observers.get_mut(token.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// (valid records, total updates) for status reporting.
    pub fn stats(&self) -> (u32, u64) {
        let valid = self.records.iter().filter(|r| r.valid).count() as u32;
        (valid, self.total_updates)
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}
