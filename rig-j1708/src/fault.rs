//! J1587 diagnostic code lists (PIDs 194 and 195).
//!
//! Each entry is two bytes: an identifier byte and a failure-mode byte. An
//! identifier with the high bit set names a subsystem (SID); otherwise it
//! names a parameter (PID). The low nibble of the second byte is the FMI.
//! Occurrence counts are not carried in this compact form and default to 1.

use heapless::Vec;

/// What a fault entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultLocation {
    /// A parameter identifier.
    Param(u8),
    /// A subsystem identifier.
    Subsystem(u8),
}

/// One decoded fault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultCode {
    /// ECU the list came from.
    pub mid: u8,
    /// PID or SID the fault is attributed to.
    pub location: FaultLocation,
    /// Failure mode identifier (low nibble on the wire).
    pub fmi: u8,
    /// Defaults to 1; this PID format carries no count.
    pub occurrence_count: u8,
    /// True for PID 194 lists, false for 195.
    pub active: bool,
}

/// Parse the data bytes of a PID 194/195 parameter.
pub fn parse_fault_codes<const N: usize>(
    mid: u8,
    data: &[u8],
    active: bool,
) -> Vec<FaultCode, N> {
    let mut faults = Vec::new();

    let mut offset = 0;
    while offset + 2 <= data.len() {
        let id_byte = data[offset];
        let location = if id_byte & 0x80 != 0 {
            FaultLocation::Subsystem(id_byte & 0x7F)
        } else {
            FaultLocation::Param(id_byte)
        };
        let code = FaultCode {
            mid,
            location,
            fmi: data[offset + 1] & 0x0F,
            occurrence_count: 1,
            active,
        };
        if faults.push(code).is_err() {
            break;
        }
        offset += 2;
    }

    faults
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_and_sid_entries_parse() {
        // PID 110 FMI 0, SID 21 FMI 3.
        let data = [110, 0x00, 0x95, 0x03];
        let faults: Vec<FaultCode, 8> = parse_fault_codes(128, &data, true);
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].location, FaultLocation::Param(110));
        assert_eq!(faults[0].fmi, 0);
        assert_eq!(faults[1].location, FaultLocation::Subsystem(0x15));
        assert_eq!(faults[1].fmi, 3);
        assert!(faults.iter().all(|f| f.occurrence_count == 1 && f.active));
    }

    #[test]
    fn fmi_takes_only_the_low_nibble() {
        let faults: Vec<FaultCode, 4> = parse_fault_codes(130, &[100, 0xF7], false);
        assert_eq!(faults[0].fmi, 7);
        assert!(!faults[0].active);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let faults: Vec<FaultCode, 4> = parse_fault_codes(128, &[110, 0x00, 0x64], true);
        assert_eq!(faults.len(), 1);
    }

    #[test]
    fn empty_list_is_fine() {
        let faults: Vec<FaultCode, 4> = parse_fault_codes(128, &[], true);
        assert!(faults.is_empty());
    }
}
