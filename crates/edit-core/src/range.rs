//! Cursor and selection ranges.
//!
//! A [`TextRange`] is one cursor: an anchor and a caret, both character
//! offsets into the document. A [`TextRangeSet`] is the ordered collection
//! of all simultaneous cursors (the primary selection, or an auxiliary set
//! such as search matches), kept sorted and non-overlapping.
//!
//! While the document mutates under a set, [`TextRangeSet::change_spatial`]
//! shifts every range so it keeps pointing at the same text. A batch of
//! structural edits can be bracketed with
//! [`begin_changes`](TextRangeSet::begin_changes) /
//! [`end_changes`](TextRangeSet::end_changes), which guarantees stable
//! index-based access during the batch and exactly one normalization at the
//! matching end.

/// One cursor or selection: an anchor and a caret.
///
/// The anchor is the fixed side of a selection, the caret the moving side;
/// either may be the smaller offset. An empty range (`anchor == caret`) is a
/// plain caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    anchor: usize,
    caret: usize,
}

impl TextRange {
    /// Creates a range with the given anchor and caret.
    pub fn new(anchor: usize, caret: usize) -> Self {
        Self { anchor, caret }
    }

    /// The anchor offset.
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// The caret offset.
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// The smaller of anchor and caret.
    pub fn min(&self) -> usize {
        self.anchor.min(self.caret)
    }

    /// The larger of anchor and caret.
    pub fn max(&self) -> usize {
        self.anchor.max(self.caret)
    }

    /// The number of characters covered by the range.
    pub fn length(&self) -> usize {
        self.max() - self.min()
    }

    /// Returns `true` if the range is a plain caret.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.caret
    }

    /// Sets both coordinates.
    pub fn set(&mut self, anchor: usize, caret: usize) {
        self.anchor = anchor;
        self.caret = caret;
    }

    /// Moves the caret, leaving the anchor in place.
    pub fn set_caret(&mut self, caret: usize) {
        self.caret = caret;
    }

    /// Moves the anchor, leaving the caret in place.
    pub fn set_anchor(&mut self, anchor: usize) {
        self.anchor = anchor;
    }

    /// Collapses the range onto its caret.
    pub fn collapse(&mut self) {
        self.anchor = self.caret;
    }
}

/// Maps one coordinate through a `replace(offset, removed, inserted)` edit.
///
/// Positions before the edit stay put, positions at or past the removed span
/// shift by the length delta, and positions inside the removed span collapse
/// to its start.
fn adjusted_position(pos: usize, offset: usize, removed: usize, inserted: usize) -> usize {
    if pos < offset {
        pos
    } else if pos >= offset + removed {
        pos - removed + inserted
    } else {
        offset
    }
}

/// The ordered set of all simultaneous cursors/selections of one holder.
///
/// Outside a change-bracket every mutation re-normalizes the set: ranges are
/// sorted ascending by their smaller offset, overlapping ranges are merged
/// to their union, and exact duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRangeSet {
    ranges: Vec<TextRange>,
    change_depth: usize,
}

impl TextRangeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding a single range.
    pub fn with_range(anchor: usize, caret: usize) -> Self {
        let mut set = Self::new();
        set.add_range(anchor, caret);
        set
    }

    /// Number of ranges in the set.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Returns `true` if the set holds no ranges.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The range at the given index. Panics when the index is out of
    /// bounds: a bad index is a caller-contract breach, not a recoverable
    /// condition.
    pub fn range(&self, index: usize) -> TextRange {
        self.ranges[index]
    }

    /// Mutable access to the range at the given index. Same contract as
    /// [`range`](Self::range). The caller is responsible for keeping the
    /// set normalized (or for holding a change-bracket open).
    pub fn range_mut(&mut self, index: usize) -> &mut TextRange {
        &mut self.ranges[index]
    }

    /// All ranges, in order.
    pub fn ranges(&self) -> &[TextRange] {
        &self.ranges
    }

    /// Adds a range to the set.
    pub fn add_range(&mut self, anchor: usize, caret: usize) {
        self.ranges.push(TextRange::new(anchor, caret));
        self.normalize_when_unbracketed();
    }

    /// Removes the range at the given index.
    pub fn remove_range(&mut self, index: usize) {
        self.ranges.remove(index);
    }

    /// Replaces the range at the given index.
    pub fn set_range(&mut self, index: usize, anchor: usize, caret: usize) {
        self.ranges[index] = TextRange::new(anchor, caret);
        self.normalize_when_unbracketed();
    }

    /// Drops all ranges.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Replaces the whole set with a single range.
    pub fn reset_to_range(&mut self, anchor: usize, caret: usize) {
        self.ranges.clear();
        self.ranges.push(TextRange::new(anchor, caret));
    }

    /// Opens a change-bracket. While at least one bracket is open,
    /// mutations do not normalize the set, so indices handed out before a
    /// structural edit stay valid during the batch.
    pub fn begin_changes(&mut self) {
        self.change_depth += 1;
    }

    /// Closes the innermost change-bracket. The outermost close runs the
    /// single deferred normalization. Closing without a matching
    /// [`begin_changes`](Self::begin_changes) is an invariant violation.
    pub fn end_changes(&mut self) {
        assert!(
            self.change_depth > 0,
            "end_changes called without a matching begin_changes"
        );
        self.change_depth -= 1;
        if self.change_depth == 0 {
            self.normalize();
        }
    }

    /// Returns `true` while a change-bracket is open.
    pub fn is_changing(&self) -> bool {
        self.change_depth > 0
    }

    /// Adjusts every range for a `replace(offset, removed, inserted)` edit
    /// of the underlying document.
    ///
    /// Fanning this notification out to every live set observing an edit is
    /// the document coordinator's job, not this type's.
    pub fn change_spatial(&mut self, offset: usize, removed: usize, inserted: usize) {
        for range in &mut self.ranges {
            range.anchor = adjusted_position(range.anchor, offset, removed, inserted);
            range.caret = adjusted_position(range.caret, offset, removed, inserted);
        }
        self.normalize_when_unbracketed();
    }

    fn normalize_when_unbracketed(&mut self) {
        if self.change_depth == 0 {
            self.normalize();
        }
    }

    /// Sorts the ranges ascending and merges overlapping ones.
    ///
    /// Merging is by strict overlap; ranges that merely touch stay
    /// separate, so multiple carets never collapse into each other just by
    /// being adjacent. Exact duplicates are dropped. A merged range is
    /// canonicalized with the caret at its end.
    pub fn normalize(&mut self) {
        self.ranges
            .sort_by_key(|r| (r.min(), r.max(), r.caret(), r.anchor()));

        let mut merged: Vec<TextRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            let Some(last) = merged.last_mut() else {
                merged.push(range);
                continue;
            };

            if range.min() < last.max() {
                // Merge to the union; caret goes to the end.
                let min = last.min().min(range.min());
                let max = last.max().max(range.max());
                *last = TextRange::new(min, max);
            } else if range.min() == last.min() && range.max() == last.max() {
                // Exact duplicate - drop.
            } else {
                merged.push(range);
            }
        }
        self.ranges = merged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_min_max_length() {
        let range = TextRange::new(7, 3);
        assert_eq!(range.min(), 3);
        assert_eq!(range.max(), 7);
        assert_eq!(range.length(), 4);
        assert!(!range.is_empty());
        assert!(TextRange::new(5, 5).is_empty());
    }

    #[test]
    fn test_collapse() {
        let mut range = TextRange::new(2, 8);
        range.collapse();
        assert_eq!(range, TextRange::new(8, 8));
    }

    #[test]
    fn test_add_range_sorts() {
        let mut set = TextRangeSet::new();
        set.add_range(10, 12);
        set.add_range(0, 2);
        set.add_range(5, 5);
        assert_eq!(set.range_count(), 3);
        assert_eq!(set.range(0).min(), 0);
        assert_eq!(set.range(1).min(), 5);
        assert_eq!(set.range(2).min(), 10);
    }

    #[test]
    fn test_overlapping_ranges_merge() {
        let mut set = TextRangeSet::new();
        set.add_range(0, 5);
        set.add_range(3, 8);
        assert_eq!(set.range_count(), 1);
        assert_eq!(set.range(0).min(), 0);
        assert_eq!(set.range(0).max(), 8);
    }

    #[test]
    fn test_touching_ranges_stay_separate() {
        let mut set = TextRangeSet::new();
        set.add_range(0, 5);
        set.add_range(5, 8);
        assert_eq!(set.range_count(), 2);
    }

    #[test]
    fn test_duplicate_carets_drop() {
        let mut set = TextRangeSet::new();
        set.add_range(4, 4);
        set.add_range(4, 4);
        assert_eq!(set.range_count(), 1);
    }

    #[test]
    fn test_change_spatial_shift() {
        // Replace 1 char at offset 5 with 3 chars: carets past the edit
        // shift right by 2.
        let mut set = TextRangeSet::new();
        set.add_range(2, 2);
        set.add_range(10, 10);
        set.change_spatial(5, 1, 3);
        assert_eq!(set.range(0), TextRange::new(2, 2));
        assert_eq!(set.range(1), TextRange::new(12, 12));
    }

    #[test]
    fn test_change_spatial_collapse_inside_removed_span() {
        let mut set = TextRangeSet::new();
        set.add_range(6, 6);
        set.change_spatial(4, 5, 0);
        assert_eq!(set.range(0), TextRange::new(4, 4));
    }

    #[test]
    fn test_change_spatial_clips_straddling_range() {
        // Selection [3, 8) straddles a deletion of [5, 10): the caret side
        // inside the removed span clips to the new extent.
        let mut set = TextRangeSet::new();
        set.add_range(3, 8);
        set.change_spatial(5, 5, 0);
        assert_eq!(set.range(0), TextRange::new(3, 5));
    }

    #[test]
    fn test_change_bracket_defers_normalization() {
        let mut set = TextRangeSet::new();
        set.add_range(0, 2);
        set.add_range(10, 12);

        set.begin_changes();
        set.set_range(0, 11, 13); // would merge with range 1 if normalized
        assert_eq!(set.range(0), TextRange::new(11, 13));
        assert_eq!(set.range_count(), 2);
        set.end_changes();

        assert_eq!(set.range_count(), 1);
        assert_eq!(set.range(0).min(), 10);
        assert_eq!(set.range(0).max(), 13);
    }

    #[test]
    #[should_panic(expected = "without a matching begin_changes")]
    fn test_unbalanced_end_changes_panics() {
        let mut set = TextRangeSet::new();
        set.end_changes();
    }
}
