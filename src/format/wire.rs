//! Binary patch wire format definitions
//!
//! ```text
//! header  : "bdiff02\x1A" | source_len: u32 LE | dest_len: u32 LE
//! insert  : '+' | len: u32 LE | len raw bytes
//! copy    : '@' | offset: u32 LE | length: u32 LE | fingerprint: u32 LE
//! ```
//!
//! The stream ends at end of input; there is no terminator record.

use bytes::{Buf, BufMut};

/// Format tag at the start of every binary patch
pub const MAGIC: [u8; 8] = *b"bdiff02\x1A";

/// Size of the fixed header
pub const HEADER_LEN: usize = 16;

/// Size of a copy record after its opcode
pub const COPY_RECORD_LEN: usize = 12;

/// Size of an insert length after its opcode
pub const INSERT_LEN_LEN: usize = 4;

/// Binary patch operations
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Literal bytes follow
    Insert = b'+',
    /// Copy from the source file
    Copy = b'@',
}

impl Opcode {
    /// Convert from byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            b'+' => Some(Self::Insert),
            b'@' => Some(Self::Copy),
            _ => None,
        }
    }

    /// Convert to byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Fixed-size body of a copy operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRecord {
    /// Offset in the source file
    pub offset: u32,
    /// Number of bytes to copy
    pub length: u32,
    /// Checksum of the copied bytes
    pub fingerprint: u32,
}

impl CopyRecord {
    /// Append the record to `buf`
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.offset);
        buf.put_u32_le(self.length);
        buf.put_u32_le(self.fingerprint);
    }

    /// Decode a record
    pub fn decode(raw: &[u8; COPY_RECORD_LEN]) -> Self {
        let mut cursor = &raw[..];
        Self {
            offset: cursor.get_u32_le(),
            length: cursor.get_u32_le(),
            fingerprint: cursor.get_u32_le(),
        }
    }

    /// Exclusive end offset in the source file
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// Decode a little-endian `u32`
pub fn decode_u32(raw: [u8; 4]) -> u32 {
    u32::from_le_bytes(raw)
}
