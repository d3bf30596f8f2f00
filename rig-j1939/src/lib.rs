//! `rig-j1939`: a listen-only SAE J1939 application layer for 29-bit CAN.
//!
//! J1939 carries vehicle parameters and diagnostics over extended-identifier
//! CAN at 250 kbit/s. This crate provides the receive side only:
//! - identifier decomposition (PDU1/PDU2 addressing) and PGN extraction
//!   ([`id`]),
//! - frame-to-message decoding ([`frame`]),
//! - signal scaling with J1939-71 validity sentinels ([`signal`]),
//! - Broadcast Announce transport-protocol reassembly for multi-packet
//!   payloads ([`transport`]), and
//! - DM1/DM2 diagnostic trouble code parsing ([`dm1`]).
//!
//! The crate never transmits: no address claiming, no requests, no RTS/CTS
//! sessions. Frames that do not parse are counted and dropped; a decoder
//! that meets an error or not-available sentinel returns `None` rather than
//! a magic value.
//!
//! The public API is usable in `no_std` environments. All buffers are fixed
//! size and owned by the state machines that fill them.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod dm1;
pub mod errors;
pub mod frame;
pub mod id;
pub mod signal;
pub mod transport;

pub use dm1::{DiagnosticReport, Dtc, LampStatus, parse_dm1};
pub use errors::DecodeError;
pub use frame::J1939Frame;
pub use id::{IdFields, pgn};
pub use signal::Signal;
pub use transport::{Completed, TpEvent, TransportAssembler};
