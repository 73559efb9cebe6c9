//! Rolling fingerprint used to tag and verify copy operations
//!
//! For every byte the 32-bit state is rotated left by two bits and the byte
//! is XORed into the low end. The value detects a mismatched source file; it
//! offers no protection against deliberate tampering.

/// Order-sensitive 32-bit fingerprint accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u32);

impl Checksum {
    /// Create an accumulator with the initial state of zero
    pub fn new() -> Self {
        Self(0)
    }

    /// Fold `bytes` into the state, in order
    pub fn update(&mut self, bytes: &[u8]) {
        self.0 = update(self.0, bytes);
    }

    /// Current fingerprint value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Fold `bytes` into `state` and return the new state
pub fn update(state: u32, bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(state, |acc, &b| acc.rotate_left(2) ^ u32::from(b))
}

/// Fingerprint of a whole span, starting from state zero
pub fn checksum(bytes: &[u8]) -> u32 {
    update(0, bytes)
}
