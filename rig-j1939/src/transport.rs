//! Broadcast Announce transport-protocol reassembly.
//!
//! J1939-21 carries payloads larger than 8 bytes by announcing a transfer
//! (TP.CM with the BAM control byte) and then streaming numbered TP.DT
//! frames, 7 payload bytes each. This module reassembles those transfers on
//! the receive side only; the peer-to-peer RTS/CTS mode is not decoded.
//!
//! One session can be active per source address, up to [`MAX_SESSIONS`]
//! concurrently. A completed buffer is one-shot: draining it with
//! [`TransportAssembler::take_completed`] returns the slot to idle.

use crate::frame::J1939Frame;
use crate::id::pgn;

/// Largest payload a BAM transfer can announce (255 packets of 7 bytes).
pub const TP_MAX_SIZE: usize = 1785;
/// Inter-packet silence that aborts a session, per J1939-21.
pub const TP_TIMEOUT_MS: u64 = 750;
/// Concurrent reassembly slots.
pub const MAX_SESSIONS: usize = 4;
/// TP.CM control byte announcing a broadcast transfer.
pub const CM_BAM: u8 = 32;

/// Per-source reassembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Slot free.
    Idle,
    /// Between BAM and the final data frame.
    Receiving,
    /// Fully reassembled, waiting to be drained.
    Complete,
    /// Sequence or timing fault; reset by the next BAM from the same source.
    Error,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    state: SessionState,
    source_address: u8,
    target_pgn: u32,
    total_size: u16,
    total_packets: u8,
    received_packets: u8,
    last_packet_ms: u64,
    buffer: [u8; TP_MAX_SIZE],
}

impl Session {
    const fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            source_address: 0,
            target_pgn: 0,
            total_size: 0,
            total_packets: 0,
            received_packets: 0,
            last_packet_ms: 0,
            buffer: [0xFF; TP_MAX_SIZE],
        }
    }
}

/// Outcome of feeding one frame to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpEvent {
    /// Frame was not a transport-protocol frame, or not one we track.
    Ignored,
    /// A BAM opened (or re-opened) a session.
    Announced,
    /// A data frame landed; more packets expected.
    InProgress,
    /// The final packet arrived; the session is ready to drain.
    Completed,
    /// A BAM arrived with every slot busy; the transfer is lost.
    Dropped,
    /// Out-of-order sequence number; the session is abandoned.
    SequenceError,
    /// More than [`TP_TIMEOUT_MS`] of silence; the session is abandoned.
    Timeout,
}

/// A drained transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completed {
    /// PGN the announced payload belongs to.
    pub pgn: u32,
    /// Bytes copied into the caller's buffer.
    pub len: usize,
}

/// Multi-session BAM reassembler.
pub struct TransportAssembler {
    sessions: [Session; MAX_SESSIONS],
    completed_count: u32,
    dropped_count: u32,
    sequence_errors: u32,
    timeouts: u32,
}

impl TransportAssembler {
    /// All slots idle.
    pub fn new() -> Self {
        Self {
            sessions: [Session::idle(); MAX_SESSIONS],
            completed_count: 0,
            dropped_count: 0,
            sequence_errors: 0,
            timeouts: 0,
        }
    }

    /// Feed one frame. Only TP.CM and TP.DT frames are examined.
    pub fn handle(&mut self, frame: &J1939Frame) -> TpEvent {
        match frame.pgn {
            pgn::TP_CM => self.handle_cm(frame),
            pgn::TP_DT => self.handle_dt(frame),
            _ => TpEvent::Ignored,
        }
    }

    fn handle_cm(&mut self, frame: &J1939Frame) -> TpEvent {
        let data = frame.data();
        if data.len() < 8 || data[0] != CM_BAM {
            // RTS/CTS and abort control frames are not decoded.
            return TpEvent::Ignored;
        }

        let total_size = u16::from_le_bytes([data[1], data[2]]);
        if total_size as usize > TP_MAX_SIZE {
            return TpEvent::Ignored;
        }

        // A new announce from a source discards whatever that source had
        // in flight, complete or not.
        let slot = match self.find(frame.source_address).or_else(|| self.free_slot()) {
            Some(slot) => slot,
            None => {
                self.dropped_count += 1;
                return TpEvent::Dropped;
            }
        };

        let session = &mut self.sessions[slot];
        session.state = SessionState::Receiving;
        session.source_address = frame.source_address;
        session.total_size = total_size;
        session.total_packets = data[3];
        session.target_pgn =
            u32::from(data[5]) | (u32::from(data[6]) << 8) | (u32::from(data[7]) << 16);
        session.received_packets = 0;
        session.last_packet_ms = frame.timestamp_ms;
        session.buffer = [0xFF; TP_MAX_SIZE];
        TpEvent::Announced
    }

    fn handle_dt(&mut self, frame: &J1939Frame) -> TpEvent {
        let data = frame.data();
        if data.is_empty() {
            return TpEvent::Ignored;
        }

        let Some(slot) = self.find(frame.source_address) else {
            return TpEvent::Ignored;
        };
        let session = &mut self.sessions[slot];
        if session.state != SessionState::Receiving {
            return TpEvent::Ignored;
        }

        if frame.timestamp_ms.saturating_sub(session.last_packet_ms) > TP_TIMEOUT_MS {
            session.state = SessionState::Error;
            self.timeouts += 1;
            return TpEvent::Timeout;
        }

        // Sequence numbers are 1-based and must be contiguous; broadcast
        // has no retransmit, so any gap kills the session.
        let seq = data[0];
        if seq != session.received_packets + 1 {
            session.state = SessionState::Error;
            self.sequence_errors += 1;
            return TpEvent::SequenceError;
        }

        let offset = (usize::from(seq) - 1) * 7;
        let remaining = (session.total_size as usize).saturating_sub(offset);
        let avail = data.len() - 1;
        let copy = remaining.min(7).min(avail);
        session.buffer[offset..offset + copy].copy_from_slice(&data[1..1 + copy]);

        session.received_packets += 1;
        session.last_packet_ms = frame.timestamp_ms;

        if session.received_packets >= session.total_packets {
            session.state = SessionState::Complete;
            self.completed_count += 1;
            TpEvent::Completed
        } else {
            TpEvent::InProgress
        }
    }

    /// Drain a completed transfer for a source address.
    ///
    /// Copies at most `out.len()` bytes and frees the slot. Returns `None`
    /// when that source has no completed transfer.
    pub fn take_completed(&mut self, source_address: u8, out: &mut [u8]) -> Option<Completed> {
        let slot = self.find(source_address)?;
        let session = &mut self.sessions[slot];
        if session.state != SessionState::Complete {
            return None;
        }

        let len = (session.total_size as usize).min(out.len());
        out[..len].copy_from_slice(&session.buffer[..len]);
        let pgn = session.target_pgn;
        session.state = SessionState::Idle;
        Some(Completed { pgn, len })
    }

    /// Abandon sessions that have been silent past the timeout.
    ///
    /// The in-band check in [`TransportAssembler::handle`] only fires when
    /// another data frame arrives, so a sender that died mid-transfer would
    /// otherwise pin a slot. Call this from a periodic tick.
    pub fn expire(&mut self, now_ms: u64) {
        for session in &mut self.sessions {
            if session.state == SessionState::Receiving
                && now_ms.saturating_sub(session.last_packet_ms) > TP_TIMEOUT_MS
            {
                session.state = SessionState::Idle;
                self.timeouts += 1;
            }
        }
    }

    /// State of the session owned by a source address, if any.
    pub fn session_state(&self, source_address: u8) -> SessionState {
        self.find(source_address)
            .map_or(SessionState::Idle, |slot| self.sessions[slot].state)
    }

    /// Transfers fully reassembled since construction.
    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    /// Announces dropped for want of a free slot.
    pub fn dropped_count(&self) -> u32 {
        self.dropped_count
    }

    /// Sessions abandoned for out-of-order data frames.
    pub fn sequence_errors(&self) -> u32 {
        self.sequence_errors
    }

    /// Sessions abandoned for inter-packet silence.
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    fn find(&self, source_address: u8) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.state != SessionState::Idle && s.source_address == source_address)
    }

    fn free_slot(&self) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.state == SessionState::Idle)
    }
}

impl Default for TransportAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::build_raw_id;

    fn cm_frame(sa: u8, total: u16, packets: u8, target_pgn: u32, ts: u64) -> J1939Frame {
        let data = [
            CM_BAM,
            (total & 0xFF) as u8,
            (total >> 8) as u8,
            packets,
            0xFF,
            (target_pgn & 0xFF) as u8,
            ((target_pgn >> 8) & 0xFF) as u8,
            ((target_pgn >> 16) & 0xFF) as u8,
        ];
        J1939Frame::decode(build_raw_id(pgn::TP_CM, sa, 7), &data, ts).unwrap()
    }

    fn dt_frame(sa: u8, seq: u8, payload: [u8; 7], ts: u64) -> J1939Frame {
        let mut data = [0u8; 8];
        data[0] = seq;
        data[1..].copy_from_slice(&payload);
        J1939Frame::decode(build_raw_id(pgn::TP_DT, sa, 7), &data, ts).unwrap()
    }

    #[test]
    fn two_packet_transfer_reassembles() {
        let mut tp = TransportAssembler::new();
        assert_eq!(tp.handle(&cm_frame(0x00, 14, 2, pgn::DM1, 0)), TpEvent::Announced);
        assert_eq!(
            tp.handle(&dt_frame(0x00, 1, [0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7], 10)),
            TpEvent::InProgress
        );
        assert_eq!(
            tp.handle(&dt_frame(0x00, 2, [0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE], 20)),
            TpEvent::Completed
        );

        let mut out = [0u8; 64];
        let done = tp.take_completed(0x00, &mut out).unwrap();
        assert_eq!(done.pgn, pgn::DM1);
        assert_eq!(done.len, 14);
        assert_eq!(
            &out[..14],
            &[0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xAB, 0xAC, 0xAD, 0xAE]
        );
        // One-shot: the slot is free again.
        assert!(tp.take_completed(0x00, &mut out).is_none());
        assert_eq!(tp.session_state(0x00), SessionState::Idle);
    }

    #[test]
    fn last_packet_truncates_to_total_size() {
        let mut tp = TransportAssembler::new();
        tp.handle(&cm_frame(0x03, 10, 2, 65259, 0));
        tp.handle(&dt_frame(0x03, 1, [1, 2, 3, 4, 5, 6, 7], 1));
        tp.handle(&dt_frame(0x03, 2, [8, 9, 10, 11, 12, 13, 14], 2));

        let mut out = [0u8; 32];
        let done = tp.take_completed(0x03, &mut out).unwrap();
        assert_eq!(done.len, 10);
        assert_eq!(&out[..10], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn out_of_order_sequence_abandons_session() {
        let mut tp = TransportAssembler::new();
        tp.handle(&cm_frame(0x00, 14, 2, pgn::DM1, 0));
        assert_eq!(
            tp.handle(&dt_frame(0x00, 2, [0; 7], 5)),
            TpEvent::SequenceError
        );
        assert_eq!(tp.session_state(0x00), SessionState::Error);
        assert_eq!(tp.sequence_errors(), 1);

        // The next BAM from the same source starts fresh.
        assert_eq!(tp.handle(&cm_frame(0x00, 14, 2, pgn::DM1, 10)), TpEvent::Announced);
        assert_eq!(tp.session_state(0x00), SessionState::Receiving);
    }

    #[test]
    fn silence_past_750ms_times_out() {
        let mut tp = TransportAssembler::new();
        tp.handle(&cm_frame(0x00, 21, 3, pgn::DM1, 1000));
        tp.handle(&dt_frame(0x00, 1, [0; 7], 1100));
        assert_eq!(tp.handle(&dt_frame(0x00, 2, [0; 7], 1851)), TpEvent::Timeout);
        assert_eq!(tp.timeouts(), 1);

        // Exactly at the limit is still accepted.
        let mut tp = TransportAssembler::new();
        tp.handle(&cm_frame(0x00, 21, 3, pgn::DM1, 1000));
        tp.handle(&dt_frame(0x00, 1, [0; 7], 1100));
        assert_eq!(tp.handle(&dt_frame(0x00, 2, [0; 7], 1850)), TpEvent::InProgress);
    }

    #[test]
    fn expire_frees_a_dead_session() {
        let mut tp = TransportAssembler::new();
        tp.handle(&cm_frame(0x42, 14, 2, pgn::DM1, 0));
        tp.expire(500);
        assert_eq!(tp.session_state(0x42), SessionState::Receiving);
        tp.expire(751);
        assert_eq!(tp.session_state(0x42), SessionState::Idle);
    }

    #[test]
    fn fifth_concurrent_announce_is_dropped() {
        let mut tp = TransportAssembler::new();
        for sa in 0..4u8 {
            assert_eq!(tp.handle(&cm_frame(sa, 14, 2, pgn::DM1, 0)), TpEvent::Announced);
        }
        assert_eq!(tp.handle(&cm_frame(4, 14, 2, pgn::DM1, 0)), TpEvent::Dropped);
        assert_eq!(tp.dropped_count(), 1);

        // A repeated announce from a tracked source reuses its own slot.
        assert_eq!(tp.handle(&cm_frame(2, 14, 2, pgn::DM1, 1)), TpEvent::Announced);
    }

    #[test]
    fn oversize_announce_is_ignored() {
        let mut tp = TransportAssembler::new();
        assert_eq!(
            tp.handle(&cm_frame(0x00, (TP_MAX_SIZE + 1) as u16, 255, pgn::DM1, 0)),
            TpEvent::Ignored
        );
    }

    #[test]
    fn short_announce_opens_a_session_like_any_other() {
        let mut tp = TransportAssembler::new();
        assert_eq!(tp.handle(&cm_frame(0x00, 5, 1, pgn::DM1, 0)), TpEvent::Announced);
        assert_eq!(
            tp.handle(&dt_frame(0x00, 1, [1, 2, 3, 4, 5, 0xFF, 0xFF], 10)),
            TpEvent::Completed
        );

        let mut out = [0u8; 16];
        let done = tp.take_completed(0x00, &mut out).unwrap();
        assert_eq!(done.len, 5);
        assert_eq!(&out[..5], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn non_transport_frames_are_ignored() {
        let mut tp = TransportAssembler::new();
        let frame = J1939Frame::decode(build_raw_id(65262, 0, 6), &[0x8C], 0).unwrap();
        assert_eq!(tp.handle(&frame), TpEvent::Ignored);
    }
}
