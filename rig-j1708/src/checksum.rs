//! J1708 modulo-256 checksum.
//!
//! The checksum byte is chosen so that the sum of every byte in the
//! message, checksum included, is zero modulo 256.

/// Compute the checksum to append to `data`.
pub fn calculate(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum.wrapping_neg()
}

/// Validate a complete message (final byte is the checksum).
pub fn validate(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}
