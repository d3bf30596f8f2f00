//! Routing from raw bus input into the parameter store.
//!
//! The receivers own the protocol state machines: the CAN side holds the
//! transport-protocol assembler, the serial side holds the framer. Decoded
//! physical values go straight into the store; diagnostic content (lamps
//! and trouble codes) is returned to the caller as an event, because what
//! to persist is a policy the store layer should not decide.

use heapless::Vec;

use rig_j1708::framer::{Framer, PushOutcome};
use rig_j1708::pid::pids;
use rig_j1708::{FaultCode, message, pid};
use rig_j1939::transport::TP_MAX_SIZE;
use rig_j1939::{DiagnosticReport, Dtc, J1939Frame, LampStatus, Signal, TpEvent, TransportAssembler, id, parse_dm1, signal};

use crate::param::{ParamId, Source};
use crate::store::ParamStore;

/// Most trouble codes carried in one event.
pub const MAX_EVENT_DTCS: usize = 16;
/// Most fault codes carried in one serial event.
pub const MAX_EVENT_FAULTS: usize = 8;

/// Diagnostic content surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagEvent {
    /// Active codes (DM1), single frame or reassembled.
    Active {
        /// Lamp commands.
        lamps: LampStatus,
        /// The codes.
        dtcs: Vec<Dtc, MAX_EVENT_DTCS>,
    },
    /// Previously active codes (DM2).
    Historic {
        /// The codes.
        dtcs: Vec<Dtc, MAX_EVENT_DTCS>,
    },
}

/// CAN-side receiver: frames in, store updates and diagnostics out.
pub struct J1939Ingest {
    tp: TransportAssembler,
    frames: u32,
    decode_errors: u32,
}

impl J1939Ingest {
    /// Fresh state, no sessions.
    pub fn new() -> Self {
        Self {
            tp: TransportAssembler::new(),
            frames: 0,
            decode_errors: 0,
        }
    }

    /// Handle a raw identifier + payload as delivered by a CAN driver.
    pub fn handle_raw(
        &mut self,
        raw_id: u32,
        data: &[u8],
        timestamp_ms: u64,
        store: &mut ParamStore,
    ) -> Option<DiagEvent> {
        match J1939Frame::decode(raw_id, data, timestamp_ms) {
            Ok(frame) => self.handle_frame(&frame, store),
            Err(_) => {
                self.decode_errors += 1;
                None
            }
        }
    }

    /// Handle a decoded frame.
    pub fn handle_frame(&mut self, frame: &J1939Frame, store: &mut ParamStore) -> Option<DiagEvent> {
        self.frames += 1;

        match frame.pgn {
            id::pgn::TP_CM | id::pgn::TP_DT => {
                if self.tp.handle(frame) == TpEvent::Completed {
                    return self.drain_transport(frame.source_address, frame.timestamp_ms, store);
                }
                None
            }
            id::pgn::DM1 => self.diagnostics(frame.data(), frame, true, store),
            id::pgn::DM2 => self.diagnostics(frame.data(), frame, false, store),
            _ => {
                self.route_signals(frame, store);
                None
            }
        }
    }

    /// Periodic housekeeping: abandon transport sessions gone silent.
    pub fn tick(&mut self, now_ms: u64) {
        self.tp.expire(now_ms);
    }

    /// Frames seen and frames that failed to decode.
    pub fn counters(&self) -> (u32, u32) {
        (self.frames, self.decode_errors)
    }

    /// Transport-protocol assembler, for status displays.
    pub fn transport(&self) -> &TransportAssembler {
        &self.tp
    }

    fn drain_transport(
        &mut self,
        source_address: u8,
        timestamp_ms: u64,
        store: &mut ParamStore,
    ) -> Option<DiagEvent> {
        let mut buf = [0u8; TP_MAX_SIZE];
        let done = self.tp.take_completed(source_address, &mut buf)?;
        let payload = &buf[..done.len];
        match done.pgn {
            id::pgn::DM1 => self.report(payload, source_address, timestamp_ms, true, store),
            id::pgn::DM2 => self.report(payload, source_address, timestamp_ms, false, store),
            // Other multi-packet groups have no decoder here yet.
            _ => None,
        }
    }

    fn diagnostics(
        &mut self,
        payload: &[u8],
        frame: &J1939Frame,
        active: bool,
        store: &mut ParamStore,
    ) -> Option<DiagEvent> {
        self.report(payload, frame.source_address, frame.timestamp_ms, active, store)
    }

    fn report(
        &mut self,
        payload: &[u8],
        source_address: u8,
        timestamp_ms: u64,
        active: bool,
        store: &mut ParamStore,
    ) -> Option<DiagEvent> {
        let report: DiagnosticReport<MAX_EVENT_DTCS> = match parse_dm1(payload, source_address) {
            Some(report) => report,
            None => {
                self.decode_errors += 1;
                return None;
            }
        };

        if active {
            store.update(
                ParamId::ActiveDtcCount,
                report.dtcs.len() as f32,
                Source::J1939,
                timestamp_ms,
            );
            store.update(
                ParamId::MilStatus,
                u8::from(report.lamps.malfunction) as f32,
                Source::J1939,
                timestamp_ms,
            );
            Some(DiagEvent::Active {
                lamps: report.lamps,
                dtcs: report.dtcs,
            })
        } else {
            Some(DiagEvent::Historic { dtcs: report.dtcs })
        }
    }

    fn route_signals(&mut self, frame: &J1939Frame, store: &mut ParamStore) {
        for &sig in Signal::for_pgn(frame.pgn) {
            if let Some(value) = sig.decode(frame.data()) {
                store.update(param_for(sig), value, Source::J1939, frame.timestamp_ms);
            }
        }
        // The gear sign convention wants the dedicated decoder.
        if frame.pgn == id::pgn::ETC2
            && let Some(gear) = signal::current_gear(frame.data())
        {
            store.update(
                ParamId::CurrentGear,
                f32::from(gear),
                Source::J1939,
                frame.timestamp_ms,
            );
        }
    }
}

impl Default for J1939Ingest {
    fn default() -> Self {
        Self::new()
    }
}

fn param_for(sig: Signal) -> ParamId {
    match sig {
        Signal::EngineSpeed => ParamId::EngineSpeed,
        Signal::PedalPosition => ParamId::PedalPosition,
        Signal::CoolantTemp => ParamId::CoolantTemp,
        Signal::OilPressure => ParamId::OilPressure,
        Signal::WheelSpeed => ParamId::VehicleSpeed,
        Signal::FuelRate => ParamId::FuelRate,
        Signal::AmbientTemp => ParamId::AmbientTemp,
        Signal::BoostPressure => ParamId::BoostPressure,
        Signal::BatteryVoltage => ParamId::BatteryVoltage,
        Signal::TransOilTemp => ParamId::TransOilTemp,
        Signal::FuelLevel1 => ParamId::FuelLevel1,
        Signal::EngineHours => ParamId::EngineHours,
        // Routed through the signed decoder in route_signals; the table
        // entry exists for completeness.
        Signal::CurrentGear => ParamId::None,
    }
}

/// Serial-side receiver: bytes in, store updates and fault lists out.
pub struct J1708Ingest {
    framer: Framer,
    messages: u32,
    parse_errors: u32,
}

impl J1708Ingest {
    /// Idle framer.
    pub fn new() -> Self {
        Self {
            framer: Framer::new(),
            messages: 0,
            parse_errors: 0,
        }
    }

    /// Offer one received byte with its arrival time.
    ///
    /// When the byte's arrival terminates a pending message, the message is
    /// decoded into the store first and the byte then re-offered, so the
    /// caller never has to care about the deferred-byte rule.
    pub fn push_byte(
        &mut self,
        byte: u8,
        now_ms: u64,
        store: &mut ParamStore,
    ) -> Option<Vec<FaultCode, MAX_EVENT_FAULTS>> {
        let mut faults = None;
        loop {
            match self.framer.push_byte(byte, now_ms) {
                PushOutcome::Consumed => return faults,
                PushOutcome::Completed | PushOutcome::Blocked => {
                    if let Some(found) = self.drain(store) {
                        faults = faults.or(Some(found));
                    }
                }
            }
        }
    }

    /// Terminate a trailing message once the line has gone quiet.
    pub fn flush(
        &mut self,
        now_ms: u64,
        store: &mut ParamStore,
    ) -> Option<Vec<FaultCode, MAX_EVENT_FAULTS>> {
        if self.framer.flush(now_ms) {
            self.drain(store)
        } else {
            None
        }
    }

    /// Messages decoded and parse failures.
    pub fn counters(&self) -> (u32, u32) {
        (self.messages, self.parse_errors)
    }

    /// Framer statistics (checksum errors, overflows).
    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    fn drain(&mut self, store: &mut ParamStore) -> Option<Vec<FaultCode, MAX_EVENT_FAULTS>> {
        let frame = self.framer.take_frame()?;
        let msg = match message::parse(&frame.bytes, frame.timestamp_ms) {
            Ok(msg) => msg,
            Err(_) => {
                self.parse_errors += 1;
                return None;
            }
        };
        self.messages += 1;

        let mut faults: Option<Vec<FaultCode, MAX_EVENT_FAULTS>> = None;
        for param in &msg.params {
            let data = param.data.as_slice();
            let ts = msg.timestamp_ms;
            let decoded = match param.pid {
                pids::ROAD_SPEED => pid::road_speed(data).map(|v| (ParamId::VehicleSpeed, v)),
                pids::ENGINE_SPEED => pid::engine_speed(data).map(|v| (ParamId::EngineSpeed, v)),
                pids::COOLANT_TEMP => pid::coolant_temp(data).map(|v| (ParamId::CoolantTemp, v)),
                pids::FUEL_LEVEL => pid::fuel_level(data).map(|v| (ParamId::FuelLevel1, v)),
                pids::OIL_PRESSURE => pid::oil_pressure(data).map(|v| (ParamId::OilPressure, v)),
                pids::BATTERY_VOLTAGE => {
                    pid::battery_voltage(data).map(|v| (ParamId::BatteryVoltage, v))
                }
                pids::TRANS_OIL_TEMP => {
                    pid::trans_oil_temp(data).map(|v| (ParamId::TransOilTemp, v))
                }
                pids::ACTIVE_FAULTS | pids::HISTORIC_FAULTS => {
                    let active = param.pid == pids::ACTIVE_FAULTS;
                    let found = rig_j1708::fault::parse_fault_codes(msg.mid, data, active);
                    if !found.is_empty() {
                        faults = faults.or(Some(found));
                    }
                    None
                }
                _ => None,
            };
            if let Some((id, value)) = decoded {
                store.update(id, value, Source::J1708, ts);
            }
        }
        faults
    }
}

impl Default for J1708Ingest {
    fn default() -> Self {
        Self::new()
    }
}
