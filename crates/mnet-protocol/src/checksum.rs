//! M-NET additive checksum
//!
//! The checksum byte is chosen so that the 8-bit wrapping sum of every byte
//! from the role byte through the checksum itself is zero.

/// Running 8-bit additive sum over the bytes of the current frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum {
    sum: u8,
}

impl Checksum {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new accumulator from a single carried-over byte
    pub fn seeded(byte: u8) -> Self {
        Self { sum: byte }
    }

    /// Clear the running sum
    pub fn reset(&mut self) {
        self.sum = 0;
    }

    /// Add a byte, mod 256
    pub fn add(&mut self, byte: u8) {
        self.sum = self.sum.wrapping_add(byte);
    }

    /// True iff the running sum is zero mod 256
    pub fn is_valid(&self) -> bool {
        self.sum == 0
    }

    /// Current running sum
    pub fn sum(&self) -> u8 {
        self.sum
    }
}

/// Wrapping sum of a byte slice
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum byte that makes `bytes` followed by it sum to zero
pub fn complement(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(sum(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_is_valid() {
        assert!(Checksum::new().is_valid());
    }

    #[test]
    fn test_get_setpoint_frame() {
        // BD 01 02 7F 02 25 01 sums to 0x67
        let body = [0xBD, 0x01, 0x02, 0x7F, 0x02, 0x25, 0x01];
        assert_eq!(sum(&body), 0x67);
        assert_eq!(complement(&body), 0x99);

        let mut acc = Checksum::new();
        for b in body {
            acc.add(b);
        }
        assert!(!acc.is_valid());
        acc.add(0x99);
        assert!(acc.is_valid());
    }

    #[test]
    fn test_reset_and_seed() {
        let mut acc = Checksum::seeded(0x42);
        assert_eq!(acc.sum(), 0x42);
        acc.reset();
        assert_eq!(acc, Checksum::new());
    }

    proptest! {
        #[test]
        fn complement_always_validates(body in prop::collection::vec(any::<u8>(), 0..26)) {
            let mut acc = Checksum::new();
            for &b in &body {
                acc.add(b);
            }
            acc.add(complement(&body));
            prop_assert!(acc.is_valid());
        }
    }
}
