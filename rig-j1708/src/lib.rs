//! `rig-j1708`: SAE J1708 framing and J1587 application-layer decoding.
//!
//! J1708 is a 9600 bit/s half-duplex differential serial link that predates
//! J1939 on heavy-duty vehicles. Messages have no start/stop delimiters;
//! the link frames them by inter-byte silence, and a modulo-256 checksum
//! closes each message. The J1587 application layer then packs a message as
//! a source identifier (MID) followed by parameter-identifier (PID) tagged
//! values.
//!
//! - [`framer`] turns a timestamped byte stream into raw messages,
//! - [`message`] splits a raw message into its ordered parameter list and
//!   can build messages for test stimulus,
//! - [`pid`] holds the PID length catalogue and scaled decoders,
//! - [`fault`] parses the PID 194/195 diagnostic code lists,
//! - [`checksum`] is the shared checksum arithmetic.
//!
//! Receive-side failures (bad checksum, short frame, overflow) are counted
//! and the frame dropped; nothing in this crate panics on bus input.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod checksum;
pub mod fault;
pub mod framer;
pub mod message;
pub mod pid;

pub use fault::{FaultCode, FaultLocation};
pub use framer::{Framer, PushOutcome};
pub use message::{J1587Param, J1708Message, MAX_MESSAGE_LEN, MIN_MESSAGE_LEN};
pub use pid::PidLength;
