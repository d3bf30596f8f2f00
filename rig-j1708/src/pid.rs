//! J1587 parameter identifier catalogue and scaled decoders.
//!
//! Parameter data lengths follow a fixed catalogue for the common PIDs.
//! PIDs in the 192..=254 band that the catalogue does not know carry an
//! explicit length byte after the PID, and unknown PIDs are assumed to do
//! the same.
//!
//! Decoders emit the unit the parameter store expects (SI), converting from
//! the imperial units J1587 uses on the wire where needed.

/// Data length policy for a PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidLength {
    /// Fixed number of data bytes, no length prefix.
    Fixed(u8),
    /// A length byte follows the PID.
    Variable,
}

/// Well-known PIDs used by the dashboard.
pub mod pids {
    /// Road speed, 0.5 mi/h per bit.
    pub const ROAD_SPEED: u8 = 84;
    /// Fuel level 1, 0.5 % per bit.
    pub const FUEL_LEVEL: u8 = 96;
    /// Engine oil pressure, 4 kPa per bit.
    pub const OIL_PRESSURE: u8 = 100;
    /// Engine coolant temperature, 1 degree F per bit.
    pub const COOLANT_TEMP: u8 = 110;
    /// Battery voltage, 0.05 V per bit.
    pub const BATTERY_VOLTAGE: u8 = 168;
    /// Transmission oil temperature, 0.25 degrees C per bit less 273.
    pub const TRANS_OIL_TEMP: u8 = 177;
    /// Engine speed, 0.25 rpm per bit.
    pub const ENGINE_SPEED: u8 = 190;
    /// Active diagnostic codes.
    pub const ACTIVE_FAULTS: u8 = 194;
    /// Previously active diagnostic codes.
    pub const HISTORIC_FAULTS: u8 = 195;
}

/// Expected data length for a PID.
pub fn pid_length(pid: u8) -> PidLength {
    use PidLength::*;
    match pid {
        // One-byte parameters.
        84..=86 | 91 | 92 | 96 | 97 | 100 | 102 | 105 | 108 | 110 => Fixed(1),
        168 | 171 | 174 | 175 | 178 => Fixed(1),
        // Two-byte parameters.
        177 | 183 | 184 | 190 | 191 => Fixed(2),
        // Four-byte totals.
        245 | 247 => Fixed(4),
        // Diagnostic code lists and identification strings.
        194 | 195 | 233 | 234 => Variable,
        // Unknown extended-band PIDs carry a length prefix, and so does
        // anything else we have no table entry for.
        _ => Variable,
    }
}

/// PID 84: road speed in km/h.
pub fn road_speed(data: &[u8]) -> Option<f32> {
    let raw = *data.first()?;
    let mph = f32::from(raw) * 0.5;
    Some(mph * 1.60934)
}

/// PID 96: fuel level in percent.
pub fn fuel_level(data: &[u8]) -> Option<f32> {
    Some(f32::from(*data.first()?) * 0.5)
}

/// PID 100: engine oil pressure in kPa.
pub fn oil_pressure(data: &[u8]) -> Option<f32> {
    Some(f32::from(*data.first()?) * 4.0)
}

/// PID 110: coolant temperature in degrees C (wire unit is degrees F).
pub fn coolant_temp(data: &[u8]) -> Option<f32> {
    let fahrenheit = f32::from(*data.first()?);
    Some((fahrenheit - 32.0) * 5.0 / 9.0)
}

/// PID 168: battery voltage in volts.
pub fn battery_voltage(data: &[u8]) -> Option<f32> {
    Some(f32::from(*data.first()?) * 0.05)
}

/// PID 177: transmission oil temperature in degrees C.
///
/// Decoded as `raw * 0.25 - 273` (two bytes little-endian). Some documents
/// describe PID 177 without the Kelvin offset; ECUs following that reading
/// will report about 273 degrees high here.
pub fn trans_oil_temp(data: &[u8]) -> Option<f32> {
    let bytes = data.get(..2)?;
    let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
    Some(f32::from(raw) * 0.25 - 273.0)
}

/// PID 190: engine speed in rpm.
pub fn engine_speed(data: &[u8]) -> Option<f32> {
    let bytes = data.get(..2)?;
    let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
    Some(f32::from(raw) * 0.25)
}

/// Human-readable name for a MID.
pub fn mid_name(mid: u8) -> Option<&'static str> {
    Some(match mid {
        128 => "Engine #1",
        129 => "Engine #2",
        130 => "Transmission",
        136 => "Trailer #1 ABS",
        137 => "Trailer #2 ABS",
        140 => "Instrument Cluster",
        142 => "Vehicle Management",
        172 => "Tractor ABS",
        175 => "Tire Pressure Monitor",
        _ => return None,
    })
}

/// Human-readable name for a PID.
pub fn pid_name(pid: u8) -> Option<&'static str> {
    Some(match pid {
        84 => "Road Speed",
        91 => "Throttle Position",
        92 => "Percent Load",
        96 => "Fuel Level 1",
        100 => "Engine Oil Pressure",
        102 => "Boost Pressure",
        105 => "Intake Manifold Temp",
        110 => "Coolant Temperature",
        168 => "Battery Voltage",
        171 => "Ambient Temperature",
        174 => "Fuel Temperature",
        175 => "Engine Oil Temperature",
        177 => "Trans Oil Temperature",
        183 => "Fuel Rate",
        190 => "Engine Speed",
        194 => "Active Fault Codes",
        195 => "Historical Fault Codes",
        _ => return None,
    })
}
