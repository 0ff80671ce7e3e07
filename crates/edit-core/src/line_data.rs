//! Per-line opaque metadata slots.
//!
//! A document carries one [`LineDataStore`] with one row per line and a
//! configurable number of fields per row. The slots are opaque to the core
//! (`Box<dyn Any>`); consumers downcast on the way out. The store length is
//! kept equal to the document line count by the change machinery.

use std::any::Any;
use std::fmt;

/// One opaque per-line data item.
pub type LineDataItem = Box<dyn Any>;

/// One row of slots, one slot per configured field.
pub type LineDataRow = Vec<Option<LineDataItem>>;

/// Per-line metadata store: `line_count` rows of `fields_per_line` slots.
pub struct LineDataStore {
    rows: Vec<LineDataRow>,
    fields_per_line: usize,
}

impl LineDataStore {
    /// Creates a store with the given field count and one empty row per
    /// line.
    pub fn new(fields_per_line: usize, line_count: usize) -> Self {
        let mut store = Self {
            rows: Vec::new(),
            fields_per_line,
        };
        store.resize(line_count);
        store
    }

    /// Number of rows (must track the document line count).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of fields per row.
    pub fn fields_per_line(&self) -> usize {
        self.fields_per_line
    }

    /// Changes the field count. Every row is reallocated: existing fields
    /// below the new count survive, the rest are lost.
    pub fn set_fields_per_line(&mut self, count: usize) {
        for row in &mut self.rows {
            row.truncate(count);
            row.resize_with(count, || None);
        }
        self.fields_per_line = count;
    }

    /// The data item at the given line and field, if any.
    pub fn get(&self, line: usize, field: usize) -> Option<&dyn Any> {
        self.rows
            .get(line)
            .and_then(|row| row.get(field))
            .and_then(|slot| slot.as_deref())
    }

    /// Swaps the slot at the given line and field with `item`, returning
    /// the previous occupant. Line and field must be in range.
    pub fn swap(&mut self, line: usize, field: usize, item: Option<LineDataItem>) -> Option<LineDataItem> {
        let slot = &mut self.rows[line][field];
        std::mem::replace(slot, item)
    }

    /// Replaces `old_count` rows starting at `line` with the given rows,
    /// returning the removed ones.
    pub fn splice_rows(
        &mut self,
        line: usize,
        old_count: usize,
        new_rows: Vec<LineDataRow>,
    ) -> Vec<LineDataRow> {
        self.rows.splice(line..line + old_count, new_rows).collect()
    }

    /// Builds `count` empty rows sized for this store.
    pub fn empty_rows(&self, count: usize) -> Vec<LineDataRow> {
        (0..count)
            .map(|_| {
                let mut row = LineDataRow::new();
                row.resize_with(self.fields_per_line, || None);
                row
            })
            .collect()
    }

    /// Grows or shrinks the store to `line_count` rows. New rows are empty;
    /// rows cut off the end are dropped.
    pub fn resize(&mut self, line_count: usize) {
        let fields = self.fields_per_line;
        self.rows.truncate(line_count);
        self.rows.resize_with(line_count, || {
            let mut row = LineDataRow::new();
            row.resize_with(fields, || None);
            row
        });
    }
}

impl fmt::Debug for LineDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupied: usize = self
            .rows
            .iter()
            .map(|row| row.iter().filter(|slot| slot.is_some()).count())
            .sum();
        f.debug_struct("LineDataStore")
            .field("lines", &self.rows.len())
            .field("fields_per_line", &self.fields_per_line)
            .field("occupied_slots", &occupied)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store() {
        let store = LineDataStore::new(2, 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.fields_per_line(), 2);
        assert!(store.get(0, 0).is_none());
    }

    #[test]
    fn test_swap_roundtrip() {
        let mut store = LineDataStore::new(1, 2);
        let old = store.swap(1, 0, Some(Box::new(42usize)));
        assert!(old.is_none());
        assert_eq!(store.get(1, 0).unwrap().downcast_ref::<usize>(), Some(&42));

        let old = store.swap(1, 0, None);
        assert_eq!(old.unwrap().downcast_ref::<usize>(), Some(&42));
        assert!(store.get(1, 0).is_none());
    }

    #[test]
    fn test_splice_rows() {
        let mut store = LineDataStore::new(1, 3);
        store.swap(1, 0, Some(Box::new("marked".to_string())));

        // Replace line 1 with two fresh lines, as an edit splitting the
        // line would.
        let empty = store.empty_rows(2);
        let removed = store.splice_rows(1, 1, empty);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.len(), 4);
        assert!(store.get(1, 0).is_none());

        // Splice the saved row back.
        let restored = store.splice_rows(1, 2, removed);
        assert_eq!(restored.len(), 2);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.get(1, 0).unwrap().downcast_ref::<String>().unwrap(),
            "marked"
        );
    }

    #[test]
    fn test_set_fields_per_line_drops_extra_fields() {
        let mut store = LineDataStore::new(2, 2);
        store.swap(0, 1, Some(Box::new(7u32)));
        store.set_fields_per_line(1);
        assert_eq!(store.fields_per_line(), 1);
        assert!(store.get(0, 1).is_none());
        store.set_fields_per_line(3);
        assert!(store.get(0, 2).is_none());
    }
}
