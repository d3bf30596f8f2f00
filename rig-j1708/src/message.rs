//! J1587 message structure: MID plus an ordered parameter list.

use heapless::Vec;

use crate::checksum;
use crate::pid::{PidLength, pid_length};

/// Longest legal J1708 message including MID and checksum.
pub const MAX_MESSAGE_LEN: usize = 21;
/// Shortest: just a MID and its checksum.
pub const MIN_MESSAGE_LEN: usize = 2;
/// Most parameters a 21-byte message can physically carry.
pub const MAX_PARAMS: usize = 10;
/// Parameter data cap; anything longer is truncated on parse.
pub const MAX_PARAM_DATA: usize = 8;

/// One PID-tagged parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct J1587Param {
    /// Parameter identifier.
    pub pid: u8,
    /// Raw data bytes, length per the PID's policy.
    pub data: Vec<u8, MAX_PARAM_DATA>,
}

/// A parsed J1587 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct J1708Message {
    /// Source (message identifier).
    pub mid: u8,
    /// Parameters in wire order. Truncation at the end of the message stops
    /// the list at the last complete parameter.
    pub params: Vec<J1587Param, MAX_PARAMS>,
    /// The full raw message including checksum.
    pub raw: Vec<u8, MAX_MESSAGE_LEN>,
    /// Whether the trailing checksum held.
    pub checksum_valid: bool,
    /// Arrival time of the final byte.
    pub timestamp_ms: u64,
}

/// Errors from [`parse`] and [`build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// Fewer than [`MIN_MESSAGE_LEN`] bytes.
    TooShort,
    /// More than [`MAX_MESSAGE_LEN`] bytes.
    TooLong,
    /// The checksum did not sum to zero.
    BadChecksum,
}

/// Parse a complete raw message (MID .. checksum).
pub fn parse(raw: &[u8], timestamp_ms: u64) -> Result<J1708Message, MessageError> {
    if raw.len() < MIN_MESSAGE_LEN {
        return Err(MessageError::TooShort);
    }
    if raw.len() > MAX_MESSAGE_LEN {
        return Err(MessageError::TooLong);
    }

    let checksum_valid = checksum::validate(raw);
    if !checksum_valid {
        return Err(MessageError::BadChecksum);
    }

    let mut msg = J1708Message {
        mid: raw[0],
        params: Vec::new(),
        raw: Vec::from_slice(raw).map_err(|_| MessageError::TooLong)?,
        checksum_valid,
        timestamp_ms,
    };

    // Everything between the MID and the checksum is parameters.
    let body_end = raw.len() - 1;
    let mut offset = 1;
    while offset < body_end && msg.params.len() < MAX_PARAMS {
        let pid = raw[offset];
        offset += 1;

        let len = match pid_length(pid) {
            PidLength::Fixed(n) => usize::from(n),
            PidLength::Variable => {
                if offset >= body_end {
                    break;
                }
                let n = usize::from(raw[offset]);
                offset += 1;
                n
            }
        };

        if offset + len > body_end {
            // Not enough bytes for this parameter; keep what parsed so far.
            break;
        }

        let take = len.min(MAX_PARAM_DATA);
        let mut data = Vec::new();
        // take <= MAX_PARAM_DATA, so this push cannot fail.
        let _ = data.extend_from_slice(&raw[offset..offset + take]);
        offset += len;

        // The unconditional push is safe: MAX_PARAMS leaves the loop first.
        let _ = msg.params.push(J1587Param { pid, data });
    }

    Ok(msg)
}

/// Build a message from a MID and parameter list, appending the checksum.
///
/// Length-prefix bytes are inserted for PIDs whose catalogue entry is
/// variable, mirroring what [`parse`] expects.
pub fn build(
    mid: u8,
    params: &[(u8, &[u8])],
    out: &mut [u8],
) -> Result<usize, MessageError> {
    let mut len = 0;

    push_byte(out, &mut len, mid)?;
    for &(pid, data) in params {
        push_byte(out, &mut len, pid)?;
        if pid_length(pid) == PidLength::Variable {
            push_byte(out, &mut len, data.len() as u8)?;
        }
        for &byte in data {
            push_byte(out, &mut len, byte)?;
        }
    }
    let ck = checksum::calculate(&out[..len]);
    push_byte(out, &mut len, ck)?;
    Ok(len)
}

fn push_byte(out: &mut [u8], len: &mut usize, byte: u8) -> Result<(), MessageError> {
    if *len >= out.len() || *len >= MAX_MESSAGE_LEN {
        return Err(MessageError::TooLong);
    }
    out[*len] = byte;
    *len += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips() {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let len = build(128, &[(110, &[212])], &mut buf).unwrap();
        assert_eq!(len, 4);

        let msg = parse(&buf[..len], 42).unwrap();
        assert_eq!(msg.mid, 128);
        assert!(msg.checksum_valid);
        assert_eq!(msg.params.len(), 1);
        assert_eq!(msg.params[0].pid, 110);
        assert_eq!(msg.params[0].data.as_slice(), &[212]);
        assert_eq!(msg.timestamp_ms, 42);
    }

    #[test]
    fn mixed_widths_parse_in_order() {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let len = build(
            128,
            &[(84, &[120]), (190, &[0x70, 0x17]), (96, &[150])],
            &mut buf,
        )
        .unwrap();

        let msg = parse(&buf[..len], 0).unwrap();
        let pids: heapless::Vec<u8, 8> = msg.params.iter().map(|p| p.pid).collect();
        assert_eq!(pids.as_slice(), &[84, 190, 96]);
        assert_eq!(msg.params[1].data.as_slice(), &[0x70, 0x17]);
    }

    #[test]
    fn variable_pid_gets_a_length_prefix() {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let len = build(128, &[(194, &[0x6E, 0x01, 0x64, 0x03])], &mut buf).unwrap();
        // MID + PID + length byte + 4 data + checksum.
        assert_eq!(len, 8);
        assert_eq!(buf[2], 4);

        let msg = parse(&buf[..len], 0).unwrap();
        assert_eq!(msg.params[0].pid, 194);
        assert_eq!(msg.params[0].data.len(), 4);
    }

    #[test]
    fn truncated_parameter_stops_the_list() {
        // PID 190 wants two bytes but only one remains before the checksum.
        let body = [128u8, 84, 120, 190, 0x70];
        let mut raw = heapless::Vec::<u8, 21>::new();
        raw.extend_from_slice(&body).unwrap();
        raw.push(crate::checksum::calculate(&body)).unwrap();

        let msg = parse(&raw, 0).unwrap();
        assert_eq!(msg.params.len(), 1);
        assert_eq!(msg.params[0].pid, 84);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let len = build(128, &[(84, &[120])], &mut buf).unwrap();
        buf[len - 1] ^= 0x55;
        assert_eq!(parse(&buf[..len], 0), Err(MessageError::BadChecksum));
    }

    #[test]
    fn length_bounds_are_enforced() {
        assert_eq!(parse(&[128], 0), Err(MessageError::TooShort));
        assert_eq!(parse(&[0u8; 22], 0), Err(MessageError::TooLong));

        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let big = [0u8; 19];
        assert_eq!(
            build(128, &[(233, &big)], &mut buf),
            Err(MessageError::TooLong)
        );
    }

    #[test]
    fn mid_and_checksum_only_is_a_legal_empty_message() {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let len = build(140, &[], &mut buf).unwrap();
        assert_eq!(len, 2);
        let msg = parse(&buf[..len], 0).unwrap();
        assert_eq!(msg.mid, 140);
        assert!(msg.params.is_empty());
    }
}
