//! Sorted suffix index over the old buffer
//!
//! Every offset `0..len` names the suffix starting there. The index holds
//! those offsets ordered so that the suffixes compare in ascending byte
//! order, with a suffix that is a proper prefix of another sorting first.
//! Offsets are distinct, so no two suffixes ever compare equal.
//!
//! Construction is an in-place heap sort driven by a direct suffix
//! comparison: `O(N log N)` comparisons of up to `O(N)` bytes each.

use super::DiffError;
use std::cmp::Ordering;
use std::mem;

/// Offsets of an old buffer, sorted by the suffix each one starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixIndex {
    offsets: Vec<usize>,
}

impl SuffixIndex {
    /// Build the index for `data`.
    ///
    /// An empty buffer yields an empty index.
    ///
    /// # Errors
    /// Returns [`DiffError::OutOfMemory`] if the offset array cannot be allocated
    pub fn build(data: &[u8]) -> Result<Self, DiffError> {
        let mut offsets = Vec::new();
        offsets
            .try_reserve_exact(data.len())
            .map_err(|_| DiffError::OutOfMemory {
                what: "suffix index",
                bytes: data.len().saturating_mul(mem::size_of::<usize>()),
            })?;
        offsets.extend(0..data.len());

        heap_sort(&mut offsets, data);
        tracing::debug!(len = offsets.len(), "built suffix index");
        Ok(Self { offsets })
    }

    /// Number of indexed suffixes
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether the indexed buffer was empty
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Sorted offsets
    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }
}

/// Order two suffixes of `data`
fn compare_suffixes(data: &[u8], a: usize, b: usize) -> Ordering {
    data[a..].cmp(&data[b..])
}

fn heap_sort(offsets: &mut [usize], data: &[u8]) {
    let n = offsets.len();
    for start in (0..n / 2).rev() {
        sift_down(offsets, start, n, data);
    }
    for end in (1..n).rev() {
        offsets.swap(0, end);
        sift_down(offsets, 0, end, data);
    }
}

/// Restore the max-heap property for the subtree at `root` within `offsets[..end]`
fn sift_down(offsets: &mut [usize], mut root: usize, end: usize, data: &[u8]) {
    let value = offsets[root];
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            break;
        }
        if child + 1 < end
            && compare_suffixes(data, offsets[child], offsets[child + 1]) == Ordering::Less
        {
            child += 1;
        }
        if compare_suffixes(data, value, offsets[child]) == Ordering::Greater {
            break;
        }
        offsets[root] = offsets[child];
        root = child;
    }
    offsets[root] = value;
}
