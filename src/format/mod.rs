//! Patch encodings
//!
//! The encoder produces one abstract operation stream; a [`FormatStrategy`]
//! decides how it is written out. The strategy is picked once per run from
//! [`PatchFormat`](crate::PatchFormat).

use crate::diff::CopySpan;
use bytes::{Buf, BufMut};
use std::io;

pub mod binary;
pub mod text;
pub mod wire;

pub use binary::BinaryFormat;
pub use text::{TextFormat, TextStyle};

/// Serialiser for the operation stream
pub trait FormatStrategy {
    /// Write the patch header
    fn write_header(&mut self, header: &PatchHeader) -> io::Result<()>;

    /// Write an insert of `data`
    fn write_insert(&mut self, data: &[u8]) -> io::Result<()>;

    /// Write a copy; `data` is the copied span as it appears in the new buffer
    fn write_copy(&mut self, span: &CopySpan, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    fn finish(&mut self) -> io::Result<()>;
}

/// Names shown in text patch headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels<'a> {
    /// Old file name
    pub old: &'a str,
    /// New file name
    pub new: &'a str,
}

impl Default for Labels<'_> {
    fn default() -> Self {
        Self {
            old: "old",
            new: "new",
        }
    }
}

/// Lengths announced at the start of a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchHeader {
    /// Length of the source (old) file
    pub source_len: u32,
    /// Length of the destination (new) file
    pub dest_len: u32,
}

impl PatchHeader {
    /// Create a header
    pub fn new(source_len: u32, dest_len: u32) -> Self {
        Self {
            source_len,
            dest_len,
        }
    }

    /// Binary encoding: magic followed by both lengths, little-endian
    pub fn to_bytes(&self) -> [u8; wire::HEADER_LEN] {
        let mut raw = [0u8; wire::HEADER_LEN];
        let mut buf = &mut raw[..];
        buf.put_slice(&wire::MAGIC);
        buf.put_u32_le(self.source_len);
        buf.put_u32_le(self.dest_len);
        raw
    }

    /// Decode a binary header, returning `None` when the magic does not match
    pub fn parse(raw: &[u8; wire::HEADER_LEN]) -> Option<Self> {
        let (magic, mut lengths) = raw.split_at(wire::MAGIC.len());
        if magic != &wire::MAGIC[..] {
            return None;
        }
        Some(Self {
            source_len: lengths.get_u32_le(),
            dest_len: lengths.get_u32_le(),
        })
    }
}
