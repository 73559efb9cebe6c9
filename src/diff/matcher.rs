//! Longest-match lookup against a [`SuffixIndex`]
//!
//! [`search`] walks the index the way a binary search for the probe's
//! insertion point would and remembers the longest common prefix seen on
//! that path. Only `O(log N)` suffixes are sampled, so the result is the
//! longest match *on the search path*, not necessarily the longest match in
//! the buffer. The offset it lands on is written into the patch, so the walk
//! order and tie handling here determine the exact output bytes.

use super::SuffixIndex;

/// A span of the old buffer sharing a prefix with the probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Match {
    /// Offset of the span in the old buffer
    pub source_offset: usize,
    /// Length of the shared prefix, zero when nothing matched
    pub length: usize,
}

impl Match {
    /// Whether no usable match was found
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// A qualifying match found some distance into the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    /// Probe bytes skipped before the match starts
    pub skip: usize,
    /// The match itself
    pub found: Match,
}

/// Find the longest prefix of `probe` shared with a suffix on the search path.
///
/// At most `max_len` bytes of the probe are considered.
pub fn search(index: &SuffixIndex, data: &[u8], probe: &[u8], max_len: usize) -> Match {
    let offsets = index.as_slice();
    let mut best = Match::default();
    if offsets.is_empty() {
        return best;
    }

    let max_len = max_len.min(probe.len());
    let mut first = 0usize;
    let mut last = offsets.len() - 1;

    while first <= last {
        let mid = first + (last - first) / 2;
        let candidate = &data[offsets[mid]..];
        let limit = candidate.len().min(max_len);
        let common = common_prefix(&candidate[..limit], &probe[..limit]);

        if common > best.length {
            best = Match {
                source_offset: offsets[mid],
                length: common,
            };
        }

        if common == limit || candidate[common] < probe[common] {
            first = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            last = mid - 1;
        }
    }

    best
}

/// Scan forward through `probe` for the first position with a match of at
/// least `min_len` bytes.
///
/// Returns `None` when the probe is exhausted without a qualifying match.
pub fn best_match(
    index: &SuffixIndex,
    data: &[u8],
    probe: &[u8],
    min_len: usize,
) -> Option<BestMatch> {
    let min_len = min_len.max(1);
    (0..probe.len()).find_map(|skip| {
        let rest = &probe[skip..];
        let found = search(index, data, rest, rest.len());
        (found.length >= min_len).then_some(BestMatch { skip, found })
    })
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
