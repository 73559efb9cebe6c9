//! Delta generation

use crate::ErrorKind;
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod encoder;
pub mod matcher;
pub mod suffix;

pub use encoder::{CopySpan, DiffEncoder, EncodeSummary, Operation};
pub use matcher::{BestMatch, Match};
pub use suffix::SuffixIndex;

/// Errors that can occur while generating a delta
#[derive(Debug, Error)]
pub enum DiffError {
    /// An allocation could not be satisfied
    #[error("virtual memory exhausted ({what}, {bytes} bytes)")]
    OutOfMemory {
        /// What was being allocated
        what: &'static str,
        /// Requested size
        bytes: usize,
    },

    /// Input does not fit the 32-bit length fields of the patch header
    #[error("{what} is too large for the patch format: {len} bytes (max {max})")]
    InputTooLarge {
        /// Which input
        what: &'static str,
        /// Actual length
        len: usize,
        /// Largest representable length
        max: u32,
    },

    /// Reading an input file failed
    #[error("{}: {source}", path.display())]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Creating the patch output file failed
    #[error("{}: {source}", path.display())]
    CreateOutput {
        /// Output path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Writing the patch failed
    #[error("error writing patch: {0}")]
    Write(#[source] io::Error),

    /// Minimum match length outside `1..=32767`
    #[error("number out of range on command line: {0} (expected 1..=32767)")]
    InvalidMinMatch(u64),

    /// Unparseable number
    #[error("malformed number on command line: `{0}'")]
    MalformedNumber(String),

    /// Unknown output format name
    #[error("invalid format specification: `{0}'")]
    InvalidFormat(String),
}

impl DiffError {
    /// Failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfMemory { .. } | Self::InputTooLarge { .. } => ErrorKind::Resource,
            Self::Read { .. } | Self::CreateOutput { .. } | Self::Write(_) => ErrorKind::Io,
            Self::InvalidMinMatch(_) | Self::MalformedNumber(_) | Self::InvalidFormat(_) => {
                ErrorKind::Usage
            }
        }
    }
}

/// Read a whole file into memory.
///
/// Capacity is reserved up front so an oversized input reports
/// [`DiffError::OutOfMemory`] instead of aborting the process.
pub fn load_file(path: &Path) -> Result<Bytes, DiffError> {
    let read_err = |source| DiffError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let hint = file
        .metadata()
        .ok()
        .and_then(|m| usize::try_from(m.len()).ok())
        .unwrap_or(0);

    let mut data = Vec::new();
    data.try_reserve_exact(hint)
        .map_err(|_| DiffError::OutOfMemory {
            what: "file buffer",
            bytes: hint,
        })?;
    file.read_to_end(&mut data).map_err(read_err)?;

    tracing::debug!(path = %path.display(), len = data.len(), "loaded file");
    Ok(Bytes::from(data))
}

/// Check that a buffer length fits a 32-bit header field
pub(crate) fn check_len(what: &'static str, len: usize) -> Result<u32, DiffError> {
    u32::try_from(len).map_err(|_| DiffError::InputTooLarge {
        what,
        len,
        max: u32::MAX,
    })
}
