//! Grouping of row indices into contiguous runs.
//!
//! Structural removals are announced once per run, so removing N adjacent
//! rows costs one notification instead of N.

/// An inclusive range of row indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a range holds at least one row.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Groups ascending indices into maximal runs of consecutive values.
///
/// Duplicates are folded into the run they belong to.
pub fn contiguous_runs(sorted: &[usize]) -> Vec<RowRange> {
    let mut runs = Vec::new();
    let mut iter = sorted.iter().copied();
    let Some(first) = iter.next() else {
        return runs;
    };

    let (mut start, mut prev) = (first, first);
    for cur in iter {
        debug_assert!(cur >= prev, "indices must be sorted");
        if cur <= prev + 1 {
            prev = prev.max(cur);
        } else {
            runs.push(RowRange::new(start, prev));
            start = cur;
            prev = cur;
        }
    }
    runs.push(RowRange::new(start, prev));
    runs
}
