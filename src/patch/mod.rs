//! Patch application
//!
//! Replays a binary patch against the source file. Copies are read from the
//! source with seek plus bounded reads and verified against the fingerprint
//! recorded at diff time; inserts are streamed straight from the patch. The
//! output is staged in a temporary file and renamed onto the destination only
//! once the whole patch has been applied and every length check passed.

use crate::ErrorKind;
use crate::checksum::Checksum;
use crate::format::PatchHeader;
use crate::format::wire::{
    self, COPY_RECORD_LEN, CopyRecord, HEADER_LEN, INSERT_LEN_LEN, Opcode,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

mod staging;

use staging::StagedFile;

/// Errors that can occur while applying a patch
#[derive(Debug, Error)]
pub enum PatchError {
    /// Header missing or magic mismatch
    #[error("patch not in BINARY format")]
    NotBinaryFormat,

    /// Opening the patch file failed
    #[error("{}: {source}", path.display())]
    OpenPatch {
        /// Patch path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Opening the source file failed
    #[error("{}: {source}", path.display())]
    OpenSource {
        /// Source path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Reading the patch stream failed
    #[error("error reading patch file: {0}")]
    ReadPatch(#[source] io::Error),

    /// Reading the source file failed
    #[error("error reading source file: {0}")]
    ReadSource(#[source] io::Error),

    /// Source file ended inside a copied span
    #[error(
        "error reading source file: unexpected end of data in {length} bytes at offset {offset}"
    )]
    SourceTruncated {
        /// Copy offset
        offset: u32,
        /// Copy length
        length: u32,
    },

    /// Seeking in the source file failed
    #[error("seek on source file failed: {0}")]
    Seek(#[source] io::Error),

    /// Writing the output failed
    #[error("error writing temporary file: {0}")]
    WriteOutput(#[source] io::Error),

    /// Destination path is empty
    #[error("empty destination file name")]
    EmptyDestination,

    /// Staging file could not be created
    #[error("can't create temporary file in {}: {source}", dir.display())]
    CreateTemp {
        /// Directory the staging file was created in
        dir: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Staging file could not be renamed onto the destination
    #[error("can't rename temporary file to {}: {source}", path.display())]
    Rename {
        /// Destination path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Patch stream ended inside a record
    #[error("patch garbled - unexpected end of data")]
    UnexpectedEnd,

    /// Copy parameters outside the announced source length
    #[error("patch garbled - invalid change request (offset {offset}, length {length})")]
    InvalidCopy {
        /// Copy offset
        offset: u32,
        /// Copy length
        length: u32,
        /// Source length from the header
        source_len: u32,
    },

    /// Unknown opcode byte
    #[error("patch garbled - invalid section `{}'", escaped(.0))]
    InvalidSection(u8),

    /// Operations produce more bytes than the header announced
    #[error("patch garbled - patch file longer than announced in header")]
    LongerThanAnnounced,

    /// Patch ended before producing the announced length
    #[error("patch garbled - destination file shorter than announced in header by {missing}")]
    ShorterThanAnnounced {
        /// Bytes still owed when the patch ended
        missing: u64,
    },

    /// Copied bytes do not match the recorded fingerprint
    #[error("source file does not match patch (copy of {length} bytes at offset {offset})")]
    SourceMismatch {
        /// Copy offset
        offset: u32,
        /// Copy length
        length: u32,
        /// Fingerprint recorded in the patch
        expected: u32,
        /// Fingerprint of the bytes read
        actual: u32,
    },
}

impl PatchError {
    /// Failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotBinaryFormat => ErrorKind::Format,
            Self::OpenPatch { .. }
            | Self::OpenSource { .. }
            | Self::ReadPatch(_)
            | Self::ReadSource(_)
            | Self::SourceTruncated { .. }
            | Self::Seek(_)
            | Self::WriteOutput(_)
            | Self::EmptyDestination
            | Self::CreateTemp { .. }
            | Self::Rename { .. } => ErrorKind::Io,
            Self::UnexpectedEnd
            | Self::InvalidCopy { .. }
            | Self::InvalidSection(_)
            | Self::LongerThanAnnounced
            | Self::ShorterThanAnnounced { .. } => ErrorKind::CorruptPatch,
            Self::SourceMismatch { .. } => ErrorKind::Integrity,
        }
    }
}

/// Applier configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Size of the bounded copy buffer
    pub buffer_size: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// Outcome of a successful application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Source length announced in the header
    pub source_len: u32,
    /// Destination length announced in the header (and produced)
    pub dest_len: u32,
    /// Copy operations applied
    pub copies: usize,
    /// Insert operations applied
    pub inserts: usize,
}

/// Applies binary patches
#[derive(Debug, Clone, Default)]
pub struct PatchApplier {
    options: ApplyOptions,
}

impl PatchApplier {
    /// Create an applier with the given options
    pub fn new(options: ApplyOptions) -> Self {
        Self { options }
    }

    /// Apply `patch` to the file at `source`, atomically replacing `dest`.
    ///
    /// `dest` may equal `source`. On any error the destination is left
    /// untouched and the staging file is removed.
    ///
    /// # Arguments
    /// * `patch` - Binary patch stream
    /// * `source` - File the patch was generated against
    /// * `dest` - File to create or replace
    ///
    /// # Errors
    /// Returns [`PatchError::NotBinaryFormat`] for a missing or foreign header,
    /// a corrupt-patch variant for malformed records or length mismatches,
    /// [`PatchError::SourceMismatch`] when copied bytes fail their checksum,
    /// and an I/O variant when opening, reading, staging or renaming fails
    pub fn apply<P: Read>(
        &self,
        patch: P,
        source: &Path,
        dest: &Path,
    ) -> Result<ApplySummary, PatchError> {
        let mut patch = BufReader::new(patch);
        let header = read_header(&mut patch)?;

        let source_file = File::open(source).map_err(|e| PatchError::OpenSource {
            path: source.to_path_buf(),
            source: e,
        })?;
        let staged = StagedFile::create_for(dest)?;

        let summary = {
            let mut out = BufWriter::with_capacity(self.options.buffer_size, staged.file());
            let summary = self.apply_body(header, &mut patch, source_file, &mut out)?;
            out.flush().map_err(PatchError::WriteOutput)?;
            summary
        };

        staged.copy_permissions_from(if dest.exists() { dest } else { source });
        staged.commit(dest)?;
        debug!(dest = %dest.display(), len = summary.dest_len, "patch committed");
        Ok(summary)
    }

    /// Apply `patch` to `source`, writing the result to `out`.
    ///
    /// Nothing is committed anywhere; on error `out` holds partial output.
    pub fn apply_streams<P, S, W>(
        &self,
        patch: P,
        source: S,
        mut out: W,
    ) -> Result<ApplySummary, PatchError>
    where
        P: Read,
        S: Read + Seek,
        W: Write,
    {
        let mut patch = BufReader::new(patch);
        let header = read_header(&mut patch)?;
        let summary = self.apply_body(header, &mut patch, source, &mut out)?;
        out.flush().map_err(PatchError::WriteOutput)?;
        Ok(summary)
    }

    fn apply_body<P, S, W>(
        &self,
        header: PatchHeader,
        patch: &mut P,
        mut source: S,
        out: &mut W,
    ) -> Result<ApplySummary, PatchError>
    where
        P: Read,
        S: Read + Seek,
        W: Write,
    {
        debug!(
            source_len = header.source_len,
            dest_len = header.dest_len,
            "applying patch"
        );

        let mut summary = ApplySummary {
            source_len: header.source_len,
            dest_len: header.dest_len,
            ..Default::default()
        };
        let mut remaining = i64::from(header.dest_len);
        let mut buf = vec![0u8; self.options.buffer_size.max(1)];

        while let Some(op) = next_opcode(patch)? {
            match Opcode::from_u8(op) {
                Some(Opcode::Copy) => {
                    let mut raw = [0u8; COPY_RECORD_LEN];
                    read_record(patch, &mut raw)?;
                    let record = CopyRecord::decode(&raw);
                    validate_copy(&record, header.source_len)?;
                    claim(&mut remaining, record.length)?;

                    trace!(
                        offset = record.offset,
                        length = record.length,
                        "copy"
                    );
                    source
                        .seek(SeekFrom::Start(u64::from(record.offset)))
                        .map_err(PatchError::Seek)?;
                    let actual = transfer(&mut source, out, record.length, &mut buf).map_err(
                        |e| match e {
                            TransferError::Eof => PatchError::SourceTruncated {
                                offset: record.offset,
                                length: record.length,
                            },
                            TransferError::Read(e) => PatchError::ReadSource(e),
                            TransferError::Write(e) => PatchError::WriteOutput(e),
                        },
                    )?;
                    if actual != record.fingerprint {
                        return Err(PatchError::SourceMismatch {
                            offset: record.offset,
                            length: record.length,
                            expected: record.fingerprint,
                            actual,
                        });
                    }
                    summary.copies += 1;
                }
                Some(Opcode::Insert) => {
                    let mut raw = [0u8; INSERT_LEN_LEN];
                    read_record(patch, &mut raw)?;
                    let length = wire::decode_u32(raw);
                    claim(&mut remaining, length)?;

                    trace!(length, "insert");
                    transfer(patch, out, length, &mut buf).map_err(|e| match e {
                        TransferError::Eof => PatchError::UnexpectedEnd,
                        TransferError::Read(e) => PatchError::ReadPatch(e),
                        TransferError::Write(e) => PatchError::WriteOutput(e),
                    })?;
                    summary.inserts += 1;
                }
                None => return Err(PatchError::InvalidSection(op)),
            }
        }

        if remaining != 0 {
            return Err(PatchError::ShorterThanAnnounced {
                missing: remaining as u64,
            });
        }

        debug!(
            copies = summary.copies,
            inserts = summary.inserts,
            "patch applied"
        );
        Ok(summary)
    }
}

fn escaped(byte: &u8) -> std::ascii::EscapeDefault {
    std::ascii::escape_default(*byte)
}

fn read_header<R: Read>(patch: &mut R) -> Result<PatchHeader, PatchError> {
    let mut raw = [0u8; HEADER_LEN];
    patch.read_exact(&mut raw).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PatchError::NotBinaryFormat,
        _ => PatchError::ReadPatch(e),
    })?;
    PatchHeader::parse(&raw).ok_or(PatchError::NotBinaryFormat)
}

/// Next opcode byte, or `None` at a clean end of stream
fn next_opcode<R: Read>(patch: &mut R) -> Result<Option<u8>, PatchError> {
    let mut byte = [0u8; 1];
    loop {
        match patch.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PatchError::ReadPatch(e)),
        }
    }
}

fn read_record<R: Read>(patch: &mut R, raw: &mut [u8]) -> Result<(), PatchError> {
    patch.read_exact(raw).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => PatchError::UnexpectedEnd,
        _ => PatchError::ReadPatch(e),
    })
}

fn validate_copy(record: &CopyRecord, source_len: u32) -> Result<(), PatchError> {
    if record.length == 0
        || record.offset > source_len
        || record.length > source_len
        || record.end() > u64::from(source_len)
    {
        return Err(PatchError::InvalidCopy {
            offset: record.offset,
            length: record.length,
            source_len,
        });
    }
    Ok(())
}

/// Reserve `length` bytes of the announced output, failing before any write
/// that would overrun it
fn claim(remaining: &mut i64, length: u32) -> Result<(), PatchError> {
    *remaining -= i64::from(length);
    if *remaining < 0 {
        return Err(PatchError::LongerThanAnnounced);
    }
    Ok(())
}

enum TransferError {
    Eof,
    Read(io::Error),
    Write(io::Error),
}

/// Copy exactly `amount` bytes from `input` to `out` in bounded chunks,
/// returning the checksum of the bytes moved
fn transfer<R, W>(
    input: &mut R,
    out: &mut W,
    amount: u32,
    buf: &mut [u8],
) -> Result<u32, TransferError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut left = amount as usize;
    let mut checksum = Checksum::new();
    while left > 0 {
        let now = left.min(buf.len());
        let chunk = &mut buf[..now];
        input.read_exact(chunk).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => TransferError::Eof,
            _ => TransferError::Read(e),
        })?;
        out.write_all(chunk).map_err(TransferError::Write)?;
        checksum.update(chunk);
        left -= now;
    }
    Ok(checksum.value())
}
