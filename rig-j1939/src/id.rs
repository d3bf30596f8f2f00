//! 29-bit identifier decomposition and construction.
//!
//! A J1939 identifier packs, from the most significant bit down: priority
//! (3 bits), reserved (1), data page (1), PDU format (8), PDU specific (8)
//! and source address (8). The Parameter Group Number is derived from the
//! PDU fields: when PF < 240 (PDU1) the PS byte is a destination address and
//! does not contribute to the PGN; when PF >= 240 (PDU2) the PS byte is a
//! group extension and does.

use embedded_can::ExtendedId;

/// Destination byte reported for PDU2 (broadcast) traffic.
pub const BROADCAST: u8 = 0xFF;

/// Parameter group numbers this crate knows by name.
pub mod pgn {
    /// Electronic Engine Controller 2 (pedal position).
    pub const EEC2: u32 = 61443;
    /// Electronic Engine Controller 1 (engine speed).
    pub const EEC1: u32 = 61444;
    /// Electronic Transmission Controller 2 (gears).
    pub const ETC2: u32 = 61445;
    /// Transport Protocol, Data Transfer.
    pub const TP_DT: u32 = 60160;
    /// Transport Protocol, Connection Management.
    pub const TP_CM: u32 = 60416;
    /// Engine Hours, Revolutions.
    pub const HOURS: u32 = 65253;
    /// Active Diagnostic Trouble Codes.
    pub const DM1: u32 = 65226;
    /// Previously Active Diagnostic Trouble Codes.
    pub const DM2: u32 = 65227;
    /// Engine Temperature 1.
    pub const ET1: u32 = 65262;
    /// Engine Fluid Level/Pressure 1.
    pub const EFLP1: u32 = 65263;
    /// Cruise Control/Vehicle Speed.
    pub const CCVS: u32 = 65265;
    /// Fuel Economy (liquid).
    pub const LFE: u32 = 65266;
    /// Ambient Conditions.
    pub const AMB: u32 = 65269;
    /// Inlet/Exhaust Conditions 1.
    pub const IC1: u32 = 65270;
    /// Vehicle Electrical Power 1.
    pub const VEP1: u32 = 65271;
    /// Transmission Fluids 1.
    pub const TRF1: u32 = 65272;
    /// Dash Display.
    pub const DD: u32 = 65276;
}

/// Decomposed fields of a 29-bit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdFields {
    /// Message priority, 0 (highest) to 7.
    pub priority: u8,
    /// 18-bit parameter group number.
    pub pgn: u32,
    /// Source address of the transmitting ECU.
    pub source_address: u8,
    /// Destination address; [`BROADCAST`] for PDU2 traffic.
    pub destination: u8,
}

/// Split a raw 29-bit identifier into its J1939 fields.
pub fn decompose(raw: u32) -> IdFields {
    IdFields {
        priority: priority(raw),
        pgn: extract_pgn(raw),
        source_address: source_address(raw),
        destination: destination(raw),
    }
}

/// Extract the 18-bit PGN, applying the PDU1/PDU2 rule.
pub fn extract_pgn(raw: u32) -> u32 {
    let pdu_format = (raw >> 16) & 0xFF;
    let pdu_specific = (raw >> 8) & 0xFF;
    // Data page plus the reserved bit above it, as in J1939-21.
    let data_page = (raw >> 24) & 0x03;

    if pdu_format < 240 {
        // PDU1: PS is a destination address, not part of the PGN.
        (data_page << 16) | (pdu_format << 8)
    } else {
        // PDU2: PS is a group extension.
        (data_page << 16) | (pdu_format << 8) | pdu_specific
    }
}

/// Source address (low byte).
pub fn source_address(raw: u32) -> u8 {
    (raw & 0xFF) as u8
}

/// Priority bits 28..=26.
pub fn priority(raw: u32) -> u8 {
    ((raw >> 26) & 0x07) as u8
}

/// Destination address: the PS byte for PDU1, [`BROADCAST`] for PDU2.
pub fn destination(raw: u32) -> u8 {
    let pdu_format = (raw >> 16) & 0xFF;
    if pdu_format < 240 {
        ((raw >> 8) & 0xFF) as u8
    } else {
        BROADCAST
    }
}

/// Build a raw identifier from (pgn, source address, priority).
///
/// The PGN is encoded verbatim into the PF:PS field, which is what broadcast
/// (PDU2) traffic needs. Callers building PDU1 unicast identifiers must
/// place the destination address in the low byte of the PGN themselves.
pub fn build_raw_id(pgn: u32, source_address: u8, priority: u8) -> u32 {
    (u32::from(priority & 0x07) << 26) | ((pgn & 0x3FFFF) << 8) | u32::from(source_address)
}

/// Like [`build_raw_id`], producing an [`ExtendedId`] for CAN drivers.
pub fn build_id(pgn: u32, source_address: u8, priority: u8) -> ExtendedId {
    // The masked value can never exceed the 29-bit range.
    ExtendedId::new(build_raw_id(pgn, source_address, priority)).unwrap_or(ExtendedId::MAX)
}

/// Human-readable name for a known PGN.
pub fn pgn_name(pgn_value: u32) -> Option<&'static str> {
    Some(match pgn_value {
        pgn::EEC1 => "EEC1 - Electronic Engine Controller 1",
        pgn::EEC2 => "EEC2 - Electronic Engine Controller 2",
        pgn::ETC2 => "ETC2 - Electronic Transmission Controller 2",
        pgn::ET1 => "ET1 - Engine Temperature 1",
        pgn::EFLP1 => "EFLP1 - Engine Fluid Level/Pressure 1",
        pgn::CCVS => "CCVS - Cruise Control/Vehicle Speed",
        pgn::LFE => "LFE - Fuel Economy",
        pgn::AMB => "AMB - Ambient Conditions",
        pgn::IC1 => "IC1 - Intake/Exhaust Conditions 1",
        pgn::VEP1 => "VEP1 - Vehicle Electrical Power 1",
        pgn::TRF1 => "TRF1 - Transmission Fluids 1",
        pgn::DD => "DD - Dash Display",
        pgn::HOURS => "HOURS - Engine Hours, Revolutions",
        pgn::DM1 => "DM1 - Active Diagnostic Trouble Codes",
        pgn::DM2 => "DM2 - Previously Active DTCs",
        pgn::TP_CM => "TP.CM - Transport Protocol Connection Management",
        pgn::TP_DT => "TP.DT - Transport Protocol Data Transfer",
        _ => return None,
    })
}
