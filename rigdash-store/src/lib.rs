//! `rigdash-store`: persistent state for the dashboard.
//!
//! Trip counters, lifetime statistics, fault-code history, user settings
//! and the clean-shutdown protocol all live here, on top of an abstract
//! namespaced key-value substrate ([`backend::Backend`]) standing in for
//! flash NVS.
//!
//! Flash wears, so nothing writes eagerly: mutations mark a namespace dirty
//! and real writes happen on a five-minute timer, after a kilometre of
//! accumulated distance, on an emergency trigger, or at shutdown. See
//! [`storage::Storage`] for the batching rules and the boot protocol.

pub mod backend;
pub mod records;
pub mod storage;

pub use backend::{Backend, JsonFileBackend, MemBackend, Namespace, StoreError};
pub use records::{
    EconomyUnit, LifetimeStats, PressureUnit, StoredDtc, SystemState, TempUnit, TripData,
    UnitSystem, UserSettings,
};
pub use storage::{MAX_DTC_HISTORY, Storage, TripId};
