//! Binary patch format
//!
//! See [`wire`](super::wire) for the record layout.
//!
//! # Example
//! ```
//! use bdiff::format::{BinaryFormat, FormatStrategy, PatchHeader};
//!
//! let mut out = Vec::new();
//! let mut format = BinaryFormat::new(&mut out);
//! format.write_header(&PatchHeader::new(0, 2)).unwrap();
//! format.write_insert(b"hi").unwrap();
//! format.finish().unwrap();
//!
//! assert_eq!(&out[16..], b"+\x02\x00\x00\x00hi");
//! ```

use super::wire::{CopyRecord, Opcode};
use super::{FormatStrategy, PatchHeader};
use crate::diff::CopySpan;
use bytes::{BufMut, BytesMut};
use std::io::{self, Write};

/// Binary encoder writing to any [`Write`]
pub struct BinaryFormat<W: Write> {
    inner: W,
    scratch: BytesMut,
}

impl<W: Write> BinaryFormat<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            scratch: BytesMut::with_capacity(16),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn flush_scratch(&mut self) -> io::Result<()> {
        let chunk = self.scratch.split();
        self.inner.write_all(&chunk)
    }
}

fn wire_u32(value: usize, what: &str) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} {value} exceeds 32-bit patch field"),
        )
    })
}

impl<W: Write> FormatStrategy for BinaryFormat<W> {
    fn write_header(&mut self, header: &PatchHeader) -> io::Result<()> {
        self.inner.write_all(&header.to_bytes())
    }

    fn write_insert(&mut self, data: &[u8]) -> io::Result<()> {
        // Insert format: ['+', len(4B LE), data...]
        self.scratch.put_u8(Opcode::Insert.as_u8());
        self.scratch.put_u32_le(wire_u32(data.len(), "insert length")?);
        self.flush_scratch()?;
        self.inner.write_all(data)
    }

    fn write_copy(&mut self, span: &CopySpan, _data: &[u8]) -> io::Result<()> {
        // Copy format: ['@', offset(4B LE), length(4B LE), fingerprint(4B LE)]
        let record = CopyRecord {
            offset: wire_u32(span.source_offset, "copy offset")?,
            length: wire_u32(span.length, "copy length")?,
            fingerprint: span.fingerprint,
        };
        self.scratch.put_u8(Opcode::Copy.as_u8());
        record.encode(&mut self.scratch);
        self.flush_scratch()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    fn span(source_offset: usize, dest_offset: usize, data: &[u8]) -> CopySpan {
        CopySpan {
            source_offset,
            dest_offset,
            length: data.len(),
            fingerprint: checksum(data),
        }
    }

    #[test]
    fn test_insert_wire_format() {
        let mut out = Vec::new();
        let mut format = BinaryFormat::new(&mut out);
        format.write_insert(b"test").unwrap();
        format.finish().unwrap();

        let expected = vec![
            b'+', // INSERT
            0x04, 0x00, 0x00, 0x00, // length = 4 (32-bit little-endian)
            b't', b'e', b's', b't', // data
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_copy_wire_format() {
        let mut out = Vec::new();
        let mut format = BinaryFormat::new(&mut out);
        let copied = b"AB";
        format.write_copy(&span(0x0100, 3, copied), copied).unwrap();

        assert_eq!(out.len(), 1 + 12);
        assert_eq!(out[0], b'@');
        assert_eq!(&out[1..5], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(&out[5..9], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&out[9..13], &checksum(copied).to_le_bytes());
    }

    #[test]
    fn test_header_then_operations() {
        let mut out = Vec::new();
        let mut format = BinaryFormat::new(&mut out);
        format.write_header(&PatchHeader::new(10, 7)).unwrap();
        format.write_copy(&span(2, 0, b"cdef"), b"cdef").unwrap();
        format.write_insert(b"xyz").unwrap();
        format.finish().unwrap();

        assert_eq!(out.len(), 16 + 13 + 5 + 3);
        assert_eq!(&out[..8], b"bdiff02\x1A");
        assert_eq!(out[16], b'@');
        assert_eq!(out[29], b'+');
        assert_eq!(&out[34..], b"xyz");
    }

    #[test]
    fn test_empty_insert_is_encoded() {
        let mut out = Vec::new();
        BinaryFormat::new(&mut out).write_insert(b"").unwrap();
        assert_eq!(out, vec![b'+', 0, 0, 0, 0]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_copy_offset_rejected() {
        let mut out = Vec::new();
        let mut format = BinaryFormat::new(&mut out);
        let bad = CopySpan {
            source_offset: u32::MAX as usize + 1,
            dest_offset: 0,
            length: 1,
            fingerprint: 0,
        };
        let err = format.write_copy(&bad, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(format.into_inner().is_empty());
    }
}
