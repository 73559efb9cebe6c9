//! Staging file for patch output
//!
//! Output is written to a temporary file in the destination's directory and
//! renamed onto the destination only on commit. Dropping an uncommitted
//! [`StagedFile`] deletes it, so every error path leaves the destination as
//! it was.

use super::PatchError;
use std::fs::{self, File};
use std::path::Path;
use tempfile::NamedTempFile;

pub(crate) struct StagedFile {
    file: NamedTempFile,
}

impl StagedFile {
    /// Create the staging file next to `dest`
    pub(crate) fn create_for(dest: &Path) -> Result<Self, PatchError> {
        if dest.as_os_str().is_empty() {
            return Err(PatchError::EmptyDestination);
        }
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let file = tempfile::Builder::new()
            .prefix(".bpatch-")
            .tempfile_in(dir)
            .map_err(|source| PatchError::CreateTemp {
                dir: dir.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %file.path().display(), "staging output");
        Ok(Self { file })
    }

    pub(crate) fn file(&self) -> &File {
        self.file.as_file()
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Give the output the permissions of `like`, if it exists
    pub(crate) fn copy_permissions_from(&self, like: &Path) {
        let result = fs::metadata(like).and_then(|m| self.file().set_permissions(m.permissions()));
        if let Err(e) = result {
            tracing::debug!(path = %like.display(), error = %e, "permissions not copied");
        }
    }

    /// Atomically move the staged output onto `dest`
    pub(crate) fn commit(self, dest: &Path) -> Result<(), PatchError> {
        self.file
            .persist(dest)
            .map(drop)
            .map_err(|e| PatchError::Rename {
                path: dest.to_path_buf(),
                source: e.error,
            })
    }
}
