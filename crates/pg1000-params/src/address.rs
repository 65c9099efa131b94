//! Three-byte exclusive addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest value representable by three 7-bit bytes.
const LINEAR_LIMIT: u32 = 1 << 21;

/// A location in the instrument's memory map: three 7-bit bytes, most significant first.
///
/// Exclusive addresses count in base 128, so `00-00-7F` is followed by `00-01-00`.
/// The same encoding carries RQ1 byte counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SysExAddress {
    pub msb: u8,
    pub mid: u8,
    pub lsb: u8,
}

impl SysExAddress {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(msb: u8, mid: u8, lsb: u8) -> Self {
        Self { msb, mid, lsb }
    }

    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    #[inline]
    pub const fn bytes(&self) -> [u8; 3] {
        [self.msb, self.mid, self.lsb]
    }

    /// All three bytes are data bytes (high bit clear).
    #[inline]
    pub const fn is_valid(&self) -> bool {
        (self.msb | self.mid | self.lsb) & 0x80 == 0
    }

    #[inline]
    pub const fn to_linear(&self) -> u32 {
        ((self.msb as u32 & 0x7F) << 14) | ((self.mid as u32 & 0x7F) << 7) | (self.lsb as u32 & 0x7F)
    }

    pub const fn from_linear(linear: u32) -> Option<Self> {
        if linear >= LINEAR_LIMIT {
            return None;
        }
        Some(Self::new(
            (linear >> 14) as u8 & 0x7F,
            (linear >> 7) as u8 & 0x7F,
            linear as u8 & 0x7F,
        ))
    }

    /// The address `n` bytes further on, with 7-bit carry.
    pub const fn offset(&self, n: u32) -> Option<Self> {
        Self::from_linear(self.to_linear() + n)
    }
}

impl fmt::Display for SysExAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.msb, self.mid, self.lsb)
    }
}

impl From<[u8; 3]> for SysExAddress {
    fn from(bytes: [u8; 3]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_conversion() {
        assert_eq!(SysExAddress::new(0x00, 0x03, 0x25).to_linear(), 421);
        assert_eq!(
            SysExAddress::from_linear(421),
            Some(SysExAddress::new(0x00, 0x03, 0x25))
        );
        assert_eq!(SysExAddress::from_linear(1 << 21), None);
    }

    #[test]
    fn test_offset_carries_at_128() {
        let base = SysExAddress::new(0x00, 0x00, 0x7F);
        assert_eq!(base.offset(1), Some(SysExAddress::new(0x00, 0x01, 0x00)));
        assert_eq!(
            SysExAddress::new(0x00, 0x01, 0x40).offset(0x3F),
            Some(SysExAddress::new(0x00, 0x01, 0x7F))
        );
        assert_eq!(SysExAddress::new(0x7F, 0x7F, 0x7F).offset(1), None);
    }

    #[test]
    fn test_validity_and_display() {
        assert!(SysExAddress::new(0x00, 0x02, 0x40).is_valid());
        assert!(!SysExAddress::new(0x80, 0x00, 0x00).is_valid());
        assert_eq!(SysExAddress::new(0x00, 0x02, 0x4A).to_string(), "00-02-4A");
    }
}
