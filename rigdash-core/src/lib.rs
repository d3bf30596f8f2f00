//! `rigdash-core`: the data backbone of the dashboard.
//!
//! Decoded bus traffic from [`rig_j1939`] and [`rig_j1708`] lands in a
//! central [`ParamStore`]: a dense, timestamped map from a closed set of
//! parameter identities to their latest physical values. Everything the
//! dashboard shows or persists reads from that one map.
//!
//! - [`param`] defines the identity catalogue (names, units, domains),
//! - [`store`] is the parameter store with freshness tracking and change
//!   observers,
//! - [`watch`] projects the store onto a paged dashboard layout with
//!   warning/critical thresholds,
//! - [`ingest`] routes raw bus input through the protocol crates into the
//!   store and surfaces diagnostic events for persistence,
//! - [`units`] holds the dashboard's unit conversions,
//! - [`shared`] (std) wraps the store for multi-context use.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod ingest;
pub mod param;
#[cfg(feature = "std")]
pub mod shared;
pub mod store;
pub mod units;
pub mod watch;

pub use ingest::{DiagEvent, J1708Ingest, J1939Ingest};
pub use param::{Domain, ParamId, Source};
#[cfg(feature = "std")]
pub use shared::SharedStore;
pub use store::{ParamRecord, ParamStore};
pub use watch::{AlertLevel, WatchItem, WatchList, Widget};
