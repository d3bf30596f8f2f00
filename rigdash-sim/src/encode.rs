//! Inverse encoders: vehicle state to wire bytes.
//!
//! Each builder fills the payload exactly as the corresponding decoder
//! expects, with 0xFF in every byte the simulator does not drive (the
//! J1939 idle pattern).

use rig_j1708::message;
use rig_j1939::id;
use rig_j1939::transport::CM_BAM;

use crate::scenario::VehicleState;

/// Default priority used for broadcast traffic.
pub const PRIORITY: u8 = 6;
/// Engine ECU source address.
pub const SA_ENGINE: u8 = 0x00;
/// Transmission ECU source address.
pub const SA_TRANSMISSION: u8 = 0x03;

fn le16(value: f32, scale: f32) -> [u8; 2] {
    ((value / scale).round() as u16).to_le_bytes()
}

/// EEC1: engine speed at 0.125 rpm/bit in bytes 3..=4.
pub fn eec1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[0] = 0x01;
    let rpm = le16(state.engine_rpm, 0.125);
    data[3] = rpm[0];
    data[4] = rpm[1];
    data[5] = SA_ENGINE;
    data
}

/// EEC2: pedal position at 0.4 %/bit in byte 1.
pub fn eec2(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[1] = (state.throttle_pct / 0.4) as u8;
    data[2] = state.engine_load_pct as u8;
    data
}

/// ET1: coolant at 1 degC/bit offset -40 in byte 0.
pub fn et1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[0] = (state.coolant_temp_c + 40.0) as u8;
    data
}

/// EFLP1: oil pressure at 4 kPa/bit in byte 3.
pub fn eflp1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[3] = (state.oil_pressure_kpa / 4.0) as u8;
    data
}

/// CCVS: wheel speed at 1/256 km/h per bit in bytes 1..=2.
pub fn ccvs(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[0] = if state.parking_brake { 0x04 } else { 0x00 };
    let speed = le16(state.vehicle_speed_kmh, 1.0 / 256.0);
    data[1] = speed[0];
    data[2] = speed[1];
    let mut switches = 0x00;
    if state.cruise_active {
        switches |= 0x01;
    }
    if state.brake_switch {
        switches |= 0x10;
    }
    data[3] = switches;
    data[5] = state.cruise_set_speed_kmh;
    data
}

/// LFE: fuel rate at 0.05 L/h per bit in bytes 0..=1.
pub fn lfe(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    let rate = le16(state.fuel_rate_lph, 0.05);
    data[0] = rate[0];
    data[1] = rate[1];
    data
}

/// AMB: ambient temperature at 0.03125 degC/bit offset -273 in bytes 3..=4.
pub fn amb(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    let temp = le16(state.ambient_temp_c + 273.0, 0.03125);
    data[3] = temp[0];
    data[4] = temp[1];
    data
}

/// IC1: boost at 2 kPa/bit in byte 1.
pub fn ic1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[1] = (state.boost_pressure_kpa / 2.0) as u8;
    data
}

/// VEP1: battery potential at 0.05 V/bit in bytes 6..=7.
pub fn vep1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    let volts = le16(state.battery_voltage, 0.05);
    data[6] = volts[0];
    data[7] = volts[1];
    data
}

/// TRF1: transmission oil temperature in bytes 4..=5.
pub fn trf1(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    let temp = le16(state.trans_oil_temp_c + 273.0, 0.03125);
    data[4] = temp[0];
    data[5] = temp[1];
    data
}

/// ETC2: selected gear in byte 0, current gear in byte 3, offset 125.
pub fn etc2(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[0] = (i16::from(state.selected_gear) + 125) as u8;
    data[3] = (i16::from(state.current_gear) + 125) as u8;
    data
}

/// DD: fuel level 1 at 0.4 %/bit in byte 1.
pub fn dd(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    data[1] = (state.fuel_level_pct / 0.4) as u8;
    data
}

/// HOURS: engine hours at 0.05 h/bit in bytes 0..=3.
pub fn hours(state: &VehicleState) -> [u8; 8] {
    let mut data = [0xFF; 8];
    let raw = ((state.engine_hours / 0.05) as u32).to_le_bytes();
    data[..4].copy_from_slice(&raw);
    data
}

/// One injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub spn: u32,
    pub fmi: u8,
    pub occurrence: u8,
}

/// DM1 payload: two lamp bytes plus one 4-byte record per fault.
///
/// With no faults the payload carries the all-zero "no active faults"
/// record. The result only fits a single frame for zero or one fault;
/// larger payloads go out via [`bam_frames`].
pub fn dm1_payload(faults: &[Fault], out: &mut Vec<u8>) {
    out.clear();
    if faults.is_empty() {
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
        return;
    }

    // Amber warning plus MIL whenever anything is active.
    out.push(0x10);
    out.push(0x10);
    for fault in faults {
        out.push((fault.spn & 0xFF) as u8);
        out.push(((fault.spn >> 8) & 0xFF) as u8);
        out.push((((fault.spn >> 16) as u8 & 0x07) << 5) | (fault.fmi & 0x1F));
        out.push(fault.occurrence & 0x7F);
    }
    if out.len() < 8 {
        out.resize(8, 0xFF);
    }
}

/// A raw frame ready for a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCanFrame {
    /// 29-bit identifier.
    pub id: u32,
    /// Always 8 bytes on this bus.
    pub data: [u8; 8],
}

/// Identifier for a broadcast PGN from a source address.
pub fn can_id(pgn: u32, source_address: u8) -> u32 {
    id::build_raw_id(pgn, source_address, PRIORITY)
}

/// Split a payload into a BAM announce plus data-transfer frames.
pub fn bam_frames(target_pgn: u32, payload: &[u8], source_address: u8, out: &mut Vec<RawCanFrame>) {
    out.clear();
    let total = payload.len() as u16;
    let packets = payload.len().div_ceil(7) as u8;

    out.push(RawCanFrame {
        id: can_id(id::pgn::TP_CM, source_address),
        data: [
            CM_BAM,
            (total & 0xFF) as u8,
            (total >> 8) as u8,
            packets,
            0xFF,
            (target_pgn & 0xFF) as u8,
            ((target_pgn >> 8) & 0xFF) as u8,
            ((target_pgn >> 16) & 0xFF) as u8,
        ],
    });

    for (index, chunk) in payload.chunks(7).enumerate() {
        let mut data = [0xFF; 8];
        data[0] = index as u8 + 1;
        data[1..1 + chunk.len()].copy_from_slice(chunk);
        out.push(RawCanFrame {
            id: can_id(id::pgn::TP_DT, source_address),
            data,
        });
    }
}

/// J1708 engine broadcast: road speed, coolant (degF) and engine speed.
pub fn j1708_engine(state: &VehicleState, out: &mut [u8]) -> usize {
    let speed_raw = [(state.vehicle_speed_kmh / 1.60934 / 0.5) as u8];
    let coolant_raw = [(state.coolant_temp_c * 9.0 / 5.0 + 32.0) as u8];
    let rpm_raw = ((state.engine_rpm / 0.25) as u16).to_le_bytes();
    message::build(
        128,
        &[(84, &speed_raw), (110, &coolant_raw), (190, &rpm_raw)],
        out,
    )
    .map_or(0, |len| len)
}

/// J1708 transmission broadcast: oil temperature.
pub fn j1708_transmission(state: &VehicleState, out: &mut [u8]) -> usize {
    let raw = (((state.trans_oil_temp_c + 273.0) / 0.25) as u16).to_le_bytes();
    message::build(130, &[(177, &raw)], out).map_or(0, |len| len)
}
