//! Inter-byte-gap framing state machine.
//!
//! J1708 marks message boundaries with bus silence: nominally at most two
//! bit times between the bytes of one message, which at 9600 bit/s is about
//! 2 ms. The framer uses a 10 ms margin. A byte arriving after a longer gap
//! terminates the previous message; if that message is at least two bytes
//! and its checksum holds it becomes available for draining, otherwise it
//! is discarded and counted.
//!
//! The terminating byte belongs to the *next* message. The framer does not
//! consume it: [`PushOutcome::Completed`] and [`PushOutcome::Blocked`] tell
//! the caller to drain the finished message and offer the byte again. This
//! keeps a completed message from being lost or overwritten while the
//! consumer is slow.

use heapless::Vec;

use crate::checksum;
use crate::message::{MAX_MESSAGE_LEN, MIN_MESSAGE_LEN};

/// Inter-byte gap that terminates a message.
pub const INTER_BYTE_GAP_MS: u64 = 10;

/// Receive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Nothing buffered.
    Idle,
    /// Bytes accumulating.
    Receiving,
    /// A validated message is waiting to be drained.
    Complete,
}

/// What happened to a pushed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PushOutcome {
    /// Byte buffered; the message is still open.
    Consumed,
    /// The gap before this byte completed a valid message. The byte was NOT
    /// consumed: drain with [`Framer::take_frame`] and push it again.
    Completed,
    /// A completed message is still pending; the byte was not consumed.
    Blocked,
}

/// A raw framed message plus its arrival time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// All bytes including MID and checksum.
    pub bytes: Vec<u8, MAX_MESSAGE_LEN>,
    /// Timestamp of the last byte.
    pub timestamp_ms: u64,
}

/// Receive counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FramerStats {
    /// Messages that framed and passed the checksum.
    pub messages: u32,
    /// Messages dropped on checksum mismatch.
    pub checksum_errors: u32,
    /// Buffer overflows (more than 21 bytes without a gap).
    pub overflows: u32,
}

/// The framing state machine.
pub struct Framer {
    state: RxState,
    buf: Vec<u8, MAX_MESSAGE_LEN>,
    last_byte_ms: u64,
    stats: FramerStats,
}

impl Framer {
    /// Start idle.
    pub fn new() -> Self {
        Self {
            state: RxState::Idle,
            buf: Vec::new(),
            last_byte_ms: 0,
            stats: FramerStats::default(),
        }
    }

    /// Offer one byte with its arrival time (monotonic milliseconds).
    pub fn push_byte(&mut self, byte: u8, now_ms: u64) -> PushOutcome {
        if self.state == RxState::Receiving
            && now_ms.saturating_sub(self.last_byte_ms) > INTER_BYTE_GAP_MS
            && self.try_complete()
        {
            return PushOutcome::Completed;
        }

        if self.state == RxState::Complete {
            return PushOutcome::Blocked;
        }

        if self.buf.push(byte).is_err() {
            // 21 bytes without a gap cannot be a legal message.
            self.stats.overflows += 1;
            self.buf.clear();
            self.state = RxState::Idle;
            return PushOutcome::Consumed;
        }
        self.last_byte_ms = now_ms;
        self.state = RxState::Receiving;
        PushOutcome::Consumed
    }

    /// Terminate the current message if the line has been silent.
    ///
    /// The gap rule in [`Framer::push_byte`] only runs when a successor
    /// byte arrives; a stream that simply stops needs this explicit poll so
    /// its final message can complete.
    pub fn flush(&mut self, now_ms: u64) -> bool {
        self.state == RxState::Receiving
            && now_ms.saturating_sub(self.last_byte_ms) > INTER_BYTE_GAP_MS
            && self.try_complete()
    }

    /// Drain the completed raw message, freeing the framer.
    pub fn take_frame(&mut self) -> Option<RawFrame> {
        if self.state != RxState::Complete {
            return None;
        }
        let bytes = core::mem::take(&mut self.buf);
        self.state = RxState::Idle;
        Some(RawFrame {
            bytes,
            timestamp_ms: self.last_byte_ms,
        })
    }

    /// Current state.
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Receive counters.
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    fn try_complete(&mut self) -> bool {
        if self.buf.len() >= MIN_MESSAGE_LEN && checksum::validate(&self.buf) {
            self.state = RxState::Complete;
            self.stats.messages += 1;
            true
        } else {
            if self.buf.len() >= MIN_MESSAGE_LEN {
                self.stats.checksum_errors += 1;
            }
            self.buf.clear();
            self.state = RxState::Idle;
            false
        }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
