//! # bdiff
//!
//! Binary delta generation and application. `bdiff` compares an old and a new
//! byte buffer and emits a patch made of "copy from old" and "insert literal"
//! operations; `bpatch` replays that patch against the old file to rebuild the
//! new one.
//!
//! ## Core Components
//!
//! - [`SuffixIndex`] - sorted suffix offsets of the old buffer
//! - [`DiffEncoder`] - greedy left-to-right delta generation
//! - [`FormatStrategy`] - binary, filtered-text and quoted-text serialisers
//! - [`PatchApplier`] - checksummed, all-or-nothing patch application
//! - [`DiffConfig`] - encoder configuration
//!
//! ## Example Usage
//!
//! ```rust
//! use bdiff::{DiffConfig, DiffEncoder, PatchApplier, PatchFormat};
//! use std::io::Cursor;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let old = b"The quick brown fox jumps over the lazy dog".to_vec();
//! let new = b"The quick brown fox leaps over the lazy dog".to_vec();
//!
//! let config = DiffConfig::default()
//!     .with_format(PatchFormat::Binary)
//!     .with_min_match_length(8)?;
//! let patch = DiffEncoder::new(config).encode_to_bytes(&old, &new, Default::default())?;
//!
//! let mut rebuilt = Vec::new();
//! PatchApplier::default().apply_streams(&patch[..], Cursor::new(&old), &mut rebuilt)?;
//! assert_eq!(rebuilt, new);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

use std::str::FromStr;
use thiserror::Error;

pub mod checksum;
pub mod diff;
pub mod format;
pub mod logging;
pub mod patch;

pub use diff::{DiffEncoder, DiffError, Operation, SuffixIndex};
pub use format::{FormatStrategy, Labels, PatchHeader};
pub use patch::{ApplyOptions, ApplySummary, PatchApplier, PatchError};

/// Default minimum length of a copied span
pub const DEFAULT_MIN_MATCH_LENGTH: u16 = 24;

/// Largest accepted minimum match length
pub const MAX_MIN_MATCH_LENGTH: u16 = 0x7FFF;

/// Supported patch encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchFormat {
    /// Compact binary stream, the only format `bpatch` reads
    Binary,
    /// Text rendering with non-printable bytes shown as `.`
    Filtered,
    /// Text rendering with non-printable bytes octal-escaped
    #[default]
    Quoted,
}

impl PatchFormat {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Filtered => "filtered",
            Self::Quoted => "quoted",
        }
    }
}

impl FromStr for PatchFormat {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(Self::Binary),
            "filter" | "filtered" => Ok(Self::Filtered),
            "quoted" => Ok(Self::Quoted),
            _ => Err(DiffError::InvalidFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for PatchFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for delta generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffConfig {
    /// Shortest span emitted as a copy operation
    pub min_match_length: u16,
    /// Output encoding
    pub format: PatchFormat,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            min_match_length: DEFAULT_MIN_MATCH_LENGTH,
            format: PatchFormat::default(),
        }
    }
}

impl DiffConfig {
    /// Set the minimum match length, rejecting values outside `1..=32767`
    pub fn with_min_match_length(mut self, length: u64) -> Result<Self, DiffError> {
        if length == 0 || length > u64::from(MAX_MIN_MATCH_LENGTH) {
            return Err(DiffError::InvalidMinMatch(length));
        }
        self.min_match_length = length as u16;
        Ok(self)
    }

    /// Set the output encoding
    pub fn with_format(mut self, format: PatchFormat) -> Self {
        self.format = format;
        self
    }
}

/// Parse a minimum match length the way the command line accepts it.
///
/// Decimal, `0x`-prefixed hexadecimal and `0`-prefixed octal are accepted.
pub fn parse_min_match_length(text: &str) -> Result<u16, DiffError> {
    let malformed = || DiffError::MalformedNumber(text.to_string());
    let trimmed = text.trim();
    let (digits, radix) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (hex, 16)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        (&trimmed[1..], 8)
    } else {
        (trimmed, 10)
    };
    if digits.is_empty() {
        return Err(malformed());
    }
    let value = u64::from_str_radix(digits, radix).map_err(|_| malformed())?;
    DiffConfig::default()
        .with_min_match_length(value)
        .map(|config| config.min_match_length)
}

/// Failure categories shared by every error type in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed command-line input
    Usage,
    /// Allocation failure or input exceeding format limits
    Resource,
    /// Open, read, write, seek or rename failure
    Io,
    /// Patch header is not the binary format
    Format,
    /// Malformed patch body
    CorruptPatch,
    /// Source file differs from the one the patch was made against
    Integrity,
}

/// Top-level error surfaced by the command-line tools
#[derive(Debug, Error)]
pub enum BdiffError {
    /// Command-line usage error
    #[error("{0}")]
    Usage(String),

    /// Delta generation failed
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Patch application failed
    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl BdiffError {
    /// Failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Diff(e) => e.kind(),
            Self::Patch(e) => e.kind(),
        }
    }
}

impl From<clap::Error> for BdiffError {
    /// Keep the first line of clap's rendering, without its `error: ` tag
    fn from(err: clap::Error) -> Self {
        let rendered = err.to_string();
        let line = rendered.lines().next().unwrap_or_default();
        Self::Usage(line.strip_prefix("error: ").unwrap_or(line).trim().to_string())
    }
}
