//! Greedy delta encoder
//!
//! The encoder walks the new buffer once, left to right. At each position it
//! asks the matcher for the nearest qualifying match; bytes skipped on the way
//! become an insert, the match becomes a copy. Accepted matches are never
//! revisited.

use super::matcher::{self, BestMatch};
use super::{DiffError, SuffixIndex, check_len};
use crate::checksum::checksum;
use crate::format::binary::BinaryFormat;
use crate::format::text::{TextFormat, TextStyle};
use crate::format::{FormatStrategy, Labels, PatchHeader};
use crate::{DiffConfig, PatchFormat};
use bytes::Bytes;
use std::io::Write;
use std::ops::Range;
use tracing::{debug, info, trace};

/// A span copied from the old buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySpan {
    /// Offset in the old buffer
    pub source_offset: usize,
    /// Offset in the new buffer
    pub dest_offset: usize,
    /// Number of bytes
    pub length: usize,
    /// Checksum of the copied bytes
    pub fingerprint: u32,
}

impl CopySpan {
    /// Range covered in the new buffer
    pub fn dest_range(&self) -> Range<usize> {
        self.dest_offset..self.dest_offset + self.length
    }
}

/// One step of the delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Literal bytes carried in the patch
    Insert {
        /// Offset in the new buffer
        dest_offset: usize,
        /// Bytes to insert
        data: Bytes,
    },
    /// Bytes taken from the old buffer
    Copy(CopySpan),
}

impl Operation {
    /// Number of output bytes this operation produces
    pub fn len(&self) -> usize {
        match self {
            Self::Insert { data, .. } => data.len(),
            Self::Copy(span) => span.length,
        }
    }

    /// Whether the operation produces no output
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters for one encoding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Insert operations emitted
    pub inserts: usize,
    /// Copy operations emitted
    pub copies: usize,
    /// Literal bytes carried in the patch
    pub inserted_bytes: usize,
    /// Bytes taken from the old buffer
    pub copied_bytes: usize,
}

enum Step {
    Insert(Range<usize>),
    Copy(CopySpan),
}

/// Delta encoder
#[derive(Debug, Clone, Default)]
pub struct DiffEncoder {
    config: DiffConfig,
}

impl DiffEncoder {
    /// Create an encoder with the given configuration
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Encoder configuration
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compute the abstract operation stream turning `old` into `new`
    pub fn operations(&self, old: &[u8], new: &Bytes) -> Result<Vec<Operation>, DiffError> {
        let index = SuffixIndex::build(old)?;
        let mut ops = Vec::new();
        self.walk(&index, old, new, |step| {
            ops.push(match step {
                Step::Insert(range) => Operation::Insert {
                    dest_offset: range.start,
                    data: new.slice(range),
                },
                Step::Copy(span) => Operation::Copy(span),
            });
            Ok(())
        })?;
        Ok(ops)
    }

    /// Encode the delta in the configured format and write it to `writer`
    ///
    /// # Arguments
    /// * `old` - Buffer the patch copies from
    /// * `new` - Buffer the patch reconstructs
    /// * `labels` - File names shown in text headers; ignored by the binary format
    /// * `writer` - Destination for the encoded patch
    ///
    /// # Returns
    /// Operation counts for the run
    ///
    /// # Errors
    /// Returns [`DiffError::InputTooLarge`] if either buffer exceeds the 32-bit
    /// header fields, [`DiffError::OutOfMemory`] if the index cannot be
    /// allocated, and [`DiffError::Write`] if `writer` fails
    pub fn encode<W: Write>(
        &self,
        old: &[u8],
        new: &[u8],
        labels: Labels<'_>,
        writer: W,
    ) -> Result<EncodeSummary, DiffError> {
        match self.config.format {
            PatchFormat::Binary => self.encode_with(old, new, &mut BinaryFormat::new(writer)),
            PatchFormat::Filtered => self.encode_with(
                old,
                new,
                &mut TextFormat::new(writer, TextStyle::Filtered, labels),
            ),
            PatchFormat::Quoted => self.encode_with(
                old,
                new,
                &mut TextFormat::new(writer, TextStyle::Quoted, labels),
            ),
        }
    }

    /// Encode the delta into an in-memory buffer
    pub fn encode_to_bytes(
        &self,
        old: &[u8],
        new: &[u8],
        labels: Labels<'_>,
    ) -> Result<Bytes, DiffError> {
        let mut out = Vec::new();
        self.encode(old, new, labels, &mut out)?;
        Ok(Bytes::from(out))
    }

    /// Encode the delta through an explicit format strategy
    pub fn encode_with<S: FormatStrategy>(
        &self,
        old: &[u8],
        new: &[u8],
        strategy: &mut S,
    ) -> Result<EncodeSummary, DiffError> {
        let header = PatchHeader::new(
            check_len("old file", old.len())?,
            check_len("new file", new.len())?,
        );

        info!("block sorting old file");
        let index = SuffixIndex::build(old)?;

        info!("generating patch");
        strategy.write_header(&header).map_err(DiffError::Write)?;

        let mut summary = EncodeSummary::default();
        self.walk(&index, old, new, |step| {
            match step {
                Step::Insert(range) => {
                    summary.inserts += 1;
                    summary.inserted_bytes += range.len();
                    strategy.write_insert(&new[range])
                }
                Step::Copy(span) => {
                    summary.copies += 1;
                    summary.copied_bytes += span.length;
                    strategy.write_copy(&span, &new[span.dest_range()])
                }
            }
            .map_err(DiffError::Write)
        })?;
        strategy.finish().map_err(DiffError::Write)?;

        debug!(
            format = %self.config.format,
            inserts = summary.inserts,
            copies = summary.copies,
            inserted_bytes = summary.inserted_bytes,
            copied_bytes = summary.copied_bytes,
            "patch generated"
        );
        info!("done");
        Ok(summary)
    }

    fn walk<F>(
        &self,
        index: &SuffixIndex,
        old: &[u8],
        new: &[u8],
        mut emit: F,
    ) -> Result<(), DiffError>
    where
        F: FnMut(Step) -> Result<(), DiffError>,
    {
        let min_len = usize::from(self.config.min_match_length);
        let mut cursor = 0;

        // invariant: new[..cursor] is fully described by the emitted steps
        while cursor < new.len() {
            let Some(BestMatch { skip, found }) =
                matcher::best_match(index, old, &new[cursor..], min_len)
            else {
                trace!(dest_offset = cursor, len = new.len() - cursor, "trailing insert");
                emit(Step::Insert(cursor..new.len()))?;
                break;
            };

            if skip > 0 {
                trace!(dest_offset = cursor, len = skip, "insert");
                emit(Step::Insert(cursor..cursor + skip))?;
            }

            let dest_offset = cursor + skip;
            let span = CopySpan {
                source_offset: found.source_offset,
                dest_offset,
                length: found.length,
                fingerprint: checksum(&new[dest_offset..dest_offset + found.length]),
            };
            trace!(
                source_offset = span.source_offset,
                dest_offset,
                len = span.length,
                "copy"
            );
            emit(Step::Copy(span))?;
            cursor = dest_offset + found.length;
        }

        Ok(())
    }
}
