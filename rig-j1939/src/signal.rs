//! Signal scaling per the J1939-71 parameter catalogue.
//!
//! Each signal is described by a byte range, a raw width, a scale and an
//! offset. Multi-byte raws are little-endian. Raw values in the sentinel
//! range mean "error" or "not available" and decode to `None`; consumers
//! must treat the absence explicitly and never forward a sentinel into the
//! parameter store.

use crate::id::pgn;

/// Raw integer width of a signal, which also selects the sentinel rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWidth {
    /// One byte; 0xFE is error, 0xFF is not available.
    U8,
    /// Two bytes little-endian; anything at or above 0xFE00 is invalid.
    U16,
    /// Four bytes little-endian; all-ones is not available.
    U32,
}

/// Scaling descriptor for one signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSpec {
    /// PGN the signal lives in.
    pub pgn: u32,
    /// Byte offset of the raw value within the payload.
    pub start: usize,
    /// Raw width and sentinel rule.
    pub width: RawWidth,
    /// Physical units per bit.
    pub scale: f32,
    /// Offset added after scaling.
    pub offset: f32,
    /// Engineering unit of the decoded value.
    pub unit: &'static str,
}

/// The decoded signal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Engine speed, rpm (EEC1).
    EngineSpeed,
    /// Accelerator pedal position, percent (EEC2).
    PedalPosition,
    /// Engine coolant temperature, degrees C (ET1).
    CoolantTemp,
    /// Engine oil pressure, kPa (EFLP1).
    OilPressure,
    /// Wheel-based vehicle speed, km/h (CCVS).
    WheelSpeed,
    /// Fuel rate, L/h (LFE).
    FuelRate,
    /// Ambient air temperature, degrees C (AMB).
    AmbientTemp,
    /// Boost pressure, kPa (IC1).
    BoostPressure,
    /// Battery potential, V (VEP1).
    BatteryVoltage,
    /// Transmission oil temperature, degrees C (TRF1).
    TransOilTemp,
    /// Fuel level 1, percent (DD).
    FuelLevel1,
    /// Engine total hours (HOURS).
    EngineHours,
    /// Current gear, signed (ETC2).
    CurrentGear,
}

impl Signal {
    /// Every signal this crate decodes.
    pub const ALL: [Signal; 13] = [
        Signal::EngineSpeed,
        Signal::PedalPosition,
        Signal::CoolantTemp,
        Signal::OilPressure,
        Signal::WheelSpeed,
        Signal::FuelRate,
        Signal::AmbientTemp,
        Signal::BoostPressure,
        Signal::BatteryVoltage,
        Signal::TransOilTemp,
        Signal::FuelLevel1,
        Signal::EngineHours,
        Signal::CurrentGear,
    ];

    /// Scaling descriptor for this signal.
    pub fn spec(self) -> SignalSpec {
        use RawWidth::*;
        let (pgn, start, width, scale, offset, unit) = match self {
            Signal::EngineSpeed => (pgn::EEC1, 3, U16, 0.125, 0.0, "rpm"),
            Signal::PedalPosition => (pgn::EEC2, 1, U8, 0.4, 0.0, "%"),
            Signal::CoolantTemp => (pgn::ET1, 0, U8, 1.0, -40.0, "\u{b0}C"),
            Signal::OilPressure => (pgn::EFLP1, 3, U8, 4.0, 0.0, "kPa"),
            Signal::WheelSpeed => (pgn::CCVS, 1, U16, 1.0 / 256.0, 0.0, "km/h"),
            Signal::FuelRate => (pgn::LFE, 0, U16, 0.05, 0.0, "L/h"),
            Signal::AmbientTemp => (pgn::AMB, 3, U16, 0.03125, -273.0, "\u{b0}C"),
            Signal::BoostPressure => (pgn::IC1, 1, U8, 2.0, 0.0, "kPa"),
            Signal::BatteryVoltage => (pgn::VEP1, 6, U16, 0.05, 0.0, "V"),
            Signal::TransOilTemp => (pgn::TRF1, 4, U16, 0.03125, -273.0, "\u{b0}C"),
            Signal::FuelLevel1 => (pgn::DD, 1, U8, 0.4, 0.0, "%"),
            Signal::EngineHours => (pgn::HOURS, 0, U32, 0.05, 0.0, "h"),
            Signal::CurrentGear => (pgn::ETC2, 3, U8, 1.0, -125.0, "gear"),
        };
        SignalSpec {
            pgn,
            start,
            width,
            scale,
            offset,
            unit,
        }
    }

    /// Decode the signal from a payload.
    ///
    /// Returns `None` when the payload is too short for the byte range or
    /// when the raw value is in the sentinel range.
    pub fn decode(self, data: &[u8]) -> Option<f32> {
        let spec = self.spec();
        let raw = read_raw(data, spec.start, spec.width)?;
        Some(raw as f32 * spec.scale + spec.offset)
    }

    /// Signals carried by a PGN, in payload order.
    pub fn for_pgn(pgn_value: u32) -> &'static [Signal] {
        match pgn_value {
            pgn::EEC1 => &[Signal::EngineSpeed],
            pgn::EEC2 => &[Signal::PedalPosition],
            pgn::ET1 => &[Signal::CoolantTemp],
            pgn::EFLP1 => &[Signal::OilPressure],
            pgn::CCVS => &[Signal::WheelSpeed],
            pgn::LFE => &[Signal::FuelRate],
            pgn::AMB => &[Signal::AmbientTemp],
            pgn::IC1 => &[Signal::BoostPressure],
            pgn::VEP1 => &[Signal::BatteryVoltage],
            pgn::TRF1 => &[Signal::TransOilTemp],
            pgn::DD => &[Signal::FuelLevel1],
            pgn::HOURS => &[Signal::EngineHours],
            pgn::ETC2 => &[Signal::CurrentGear],
            _ => &[],
        }
    }
}

/// Valid 8-bit raw check: 0xFE is error, 0xFF is not available.
pub fn is_valid_u8(raw: u8) -> bool {
    raw < 0xFE
}

/// Valid 16-bit raw check: the 0xFExx and 0xFFxx pages are invalid.
pub fn is_valid_u16(raw: u16) -> bool {
    raw < 0xFE00
}

fn read_raw(data: &[u8], start: usize, width: RawWidth) -> Option<u32> {
    match width {
        RawWidth::U8 => {
            let raw = *data.get(start)?;
            is_valid_u8(raw).then_some(u32::from(raw))
        }
        RawWidth::U16 => {
            let bytes = data.get(start..start + 2)?;
            let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
            is_valid_u16(raw).then_some(u32::from(raw))
        }
        RawWidth::U32 => {
            let bytes = data.get(start..start + 4)?;
            let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (raw != u32::MAX).then_some(raw)
        }
    }
}

/// Decode the ETC2 current gear as a signed gear number.
///
/// -125 is deep reverse, 0 neutral, positive values forward gears. Sentinel
/// raws return `None`; the dashboard shows reverse as -1 and neutral as 0.
pub fn current_gear(data: &[u8]) -> Option<i8> {
    let raw = *data.get(3)?;
    if !is_valid_u8(raw) {
        return None;
    }
    Some((i16::from(raw) - 125) as i8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_speed_decodes_scaled() {
        // 0x3E80 = 16000 raw, 0.125 rpm/bit.
        let payload = [0x00, 0x7D, 0x7D, 0x80, 0x3E, 0x00, 0x00, 0x00];
        assert_eq!(Signal::EngineSpeed.decode(&payload), Some(2000.0));
    }

    #[test]
    fn coolant_temp_applies_offset() {
        let payload = [0x8C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(Signal::CoolantTemp.decode(&payload), Some(100.0));
    }

    #[test]
    fn wheel_speed_divides_by_256() {
        let payload = [0xFF, 0x00, 0x69, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(Signal::WheelSpeed.decode(&payload), Some(105.0));
    }

    #[test]
    fn sentinel_rules_match_width() {
        for raw in 0u16..=255 {
            let expected = raw < 0xFE;
            assert_eq!(is_valid_u8(raw as u8), expected, "raw {raw:#x}");
        }
        assert!(is_valid_u16(0xFDFF));
        assert!(!is_valid_u16(0xFE00));
        assert!(!is_valid_u16(0xFFFF));
    }

    #[test]
    fn error_and_not_available_decode_to_none() {
        let mut payload = [0xFFu8; 8];
        payload[0] = 0xFE;
        assert_eq!(Signal::CoolantTemp.decode(&payload), None);
        payload[0] = 0xFF;
        assert_eq!(Signal::CoolantTemp.decode(&payload), None);
        // 16-bit sentinel on engine speed.
        let payload = [0x00, 0x00, 0x00, 0x00, 0xFE, 0x00, 0x00, 0x00];
        assert_eq!(Signal::EngineSpeed.decode(&payload), None);
        // 32-bit all-ones on engine hours.
        assert_eq!(Signal::EngineHours.decode(&[0xFF; 8]), None);
    }

    #[test]
    fn short_payload_is_unavailable() {
        assert_eq!(Signal::EngineSpeed.decode(&[0x00, 0x7D, 0x7D, 0x80]), None);
    }

    #[test]
    fn gear_decode_covers_reverse_neutral_forward() {
        let mut payload = [0xFFu8; 8];
        payload[3] = 0x7C;
        assert_eq!(current_gear(&payload), Some(-1));
        payload[3] = 0x7D;
        assert_eq!(current_gear(&payload), Some(0));
        payload[3] = 0x85;
        assert_eq!(current_gear(&payload), Some(8));
        payload[3] = 0xFE;
        assert_eq!(current_gear(&payload), None);
    }

    #[test]
    fn scale_offset_round_trips_within_one_bit() {
        for signal in Signal::ALL {
            let spec = signal.spec();
            // Pick a mid-range raw, re-derive it from the decoded value.
            let raw = 1000u32;
            let value = raw as f32 * spec.scale + spec.offset;
            let back = (value - spec.offset) / spec.scale;
            assert!(
                (back - raw as f32).abs() <= 1.0,
                "{signal:?}: {back} vs {raw}"
            );
        }
    }

    #[test]
    fn every_signal_maps_back_from_its_pgn() {
        for signal in Signal::ALL {
            let listed = Signal::for_pgn(signal.spec().pgn);
            assert!(listed.contains(&signal), "{signal:?} missing");
        }
        assert!(Signal::for_pgn(12345).is_empty());
    }
}
