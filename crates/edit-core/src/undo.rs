//! The transactional undo/redo history.
//!
//! The stack records committed top-level [`ChangeGroup`]s in chronological
//! order and keeps a cursor between the undoable past and the redoable
//! future. Groups open and close with strict nesting; the innermost close
//! at depth zero commits (or coalesces, or discards) the transaction.
//!
//! # States
//!
//! The stack is always in exactly one of: idle, recording (open-group depth
//! greater than zero), undo running, or redo running. Undo and redo running
//! are mutually exclusive and no recording happens while either is set.
//!
//! # Soft scope
//!
//! Controllers register with the stack and selection-only entries are
//! tagged to the controller that issued them. A *soft* undo/redo only
//! recognizes entries tagged to the given controller; a *hard* undo reverts
//! the next entry regardless of tag, first unwinding the trailing run of
//! tagged entries whose snapshots depend on it.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::change::{BoxedChange, Change, ChangeGroup};
use crate::document::DocumentState;

/// Identifies one registered controller for soft-scope undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(usize);

#[derive(Debug)]
struct HistoryEntry {
    group: ChangeGroup,
    coalesce_id: usize,
    scope: Option<ControllerId>,
}

/// The history state machine: recording, coalescing, soft/hard undo/redo,
/// and the persisted marker.
#[derive(Debug)]
pub struct UndoStack {
    entries: Vec<HistoryEntry>,
    /// Index of the next redoable entry; everything below it is undoable.
    cursor: usize,
    /// Cursor value considered saved, when one exists.
    persisted_index: Option<usize>,
    open_groups: Vec<ChangeGroup>,
    controllers: HashSet<ControllerId>,
    next_controller_id: usize,
    collection_enabled: bool,
    undo_running: bool,
    redo_running: bool,
}

impl UndoStack {
    /// Creates an empty stack. The initial (empty-history) state counts as
    /// persisted.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            persisted_index: Some(0),
            open_groups: Vec::new(),
            controllers: HashSet::new(),
            next_controller_id: 0,
            collection_enabled: true,
            undo_running: false,
            redo_running: false,
        }
    }

    /// Number of committed top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current cursor (next redo position).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns `true` if at least one entry can be undone.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns `true` if at least one entry can be redone.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Returns `true` while an undo is being applied.
    pub fn is_undo_running(&self) -> bool {
        self.undo_running
    }

    /// Returns `true` while a redo is being applied.
    pub fn is_redo_running(&self) -> bool {
        self.redo_running
    }

    /// Depth of currently open groups.
    pub fn group_depth(&self) -> usize {
        self.open_groups.len()
    }

    /// Returns `true` when committed groups are recorded into history.
    pub fn is_collection_enabled(&self) -> bool {
        self.collection_enabled
    }

    /// Enables or disables recording. While disabled, closing a top-level
    /// group discards it with no history effect (used by bulk/raw
    /// operations that bypass undo).
    pub fn set_collection_enabled(&mut self, enabled: bool) {
        self.collection_enabled = enabled;
    }

    /// Returns `true` when the cursor sits at the persisted marker.
    pub fn is_persisted(&self) -> bool {
        self.persisted_index == Some(self.cursor)
    }

    /// Marks the current cursor as the persisted state (or clears the
    /// marker).
    pub fn set_persisted(&mut self, persisted: bool) {
        self.persisted_index = persisted.then_some(self.cursor);
    }

    /// Registers a controller for soft-scope undo and returns its id.
    pub fn register_controller(&mut self) -> ControllerId {
        let id = ControllerId(self.next_controller_id);
        self.next_controller_id += 1;
        self.controllers.insert(id);
        id
    }

    /// Unregisters a controller. Controllers must unregister before they go
    /// away; there is no automatic weak cleanup.
    pub fn unregister_controller(&mut self, controller: ControllerId) {
        let removed = self.controllers.remove(&controller);
        assert!(removed, "unregistering a controller that was never registered");
    }

    /// Drops all history and resets the cursor. The persisted marker
    /// survives only when the cursor currently sits on it (the document
    /// content itself is untouched by a clear).
    pub fn clear(&mut self) {
        let was_persisted = self.is_persisted();
        self.entries.clear();
        self.cursor = 0;
        self.persisted_index = was_persisted.then_some(0);
        debug!("undo history cleared");
    }

    /// Opens a transaction. At depth zero this starts a new top-level
    /// entry; at greater depth the group nests inside the currently open
    /// one.
    pub fn begin_group(&mut self, group: ChangeGroup) {
        self.open_groups.push(group);
    }

    /// Hands an executed change to the innermost open group, or commits it
    /// as its own top-level entry when no group is open. Dropped silently
    /// while collection is disabled.
    pub fn give_change(&mut self, state: &mut DocumentState, change: BoxedChange, coalesce_id: usize) {
        debug_assert!(
            !self.undo_running && !self.redo_running,
            "change given to the stack while undo/redo is running"
        );
        if !self.collection_enabled {
            return;
        }
        match self.open_groups.last_mut() {
            Some(group) => group.append(state, change),
            None => {
                let mut group = ChangeGroup::new(None);
                group.append(state, change);
                self.commit(state, group, coalesce_id);
            }
        }
    }

    /// Closes the innermost group. Closing the last open group commits it
    /// as a top-level entry (coalescing into the previous entry when
    /// `coalesce_id` is non-zero and matches). Calling this with no open
    /// group is an invariant violation.
    pub fn end_group(&mut self, state: &mut DocumentState, coalesce_id: usize, flatten: bool) {
        let mut group = self
            .open_groups
            .pop()
            .expect("end_group called without a matching begin_group");
        if flatten {
            group.flatten();
        }
        match self.open_groups.last_mut() {
            Some(parent) => parent.append(state, Box::new(group)),
            None => self.commit(state, group, coalesce_id),
        }
    }

    /// Closes the innermost group and unconditionally discards it.
    ///
    /// This only suppresses recording: buffer mutations already applied by
    /// the group's changes are **not** reverted.
    pub fn end_group_and_discard(&mut self) {
        self.open_groups
            .pop()
            .expect("end_group_and_discard called without a matching begin_group");
    }

    fn commit(&mut self, state: &mut DocumentState, mut group: ChangeGroup, coalesce_id: usize) {
        if !self.collection_enabled || group.is_empty() {
            return;
        }
        group.set_coalesce_id(coalesce_id);

        let was_at_tail = self.cursor == self.entries.len();
        self.truncate_redoable();

        // Coalesce with the previous entry only when it is still the most
        // recent one and the persisted marker does not sit between the two
        // (coalescing across the saved point would make it unreachable by
        // undo).
        if coalesce_id != 0
            && was_at_tail
            && self.persisted_index != Some(self.cursor)
            && let Some(last) = self.entries.last_mut()
            && last.coalesce_id == coalesce_id
        {
            last.group.absorb(state, group);
            last.scope = last.group.controller_scope();
            trace!(entry = self.entries.len() - 1, coalesce_id, "coalesced into previous entry");
            return;
        }

        let scope = group.controller_scope();
        self.entries.push(HistoryEntry {
            group,
            coalesce_id,
            scope,
        });
        self.cursor = self.entries.len();
        trace!(entries = self.entries.len(), coalesce_id, "committed undo entry");
    }

    /// Discards every entry beyond the cursor (the standard linear-history
    /// invalidation on a new edit after undo). A persisted marker pointing
    /// into the discarded region becomes unreachable and is dropped.
    fn truncate_redoable(&mut self) {
        if self.cursor == self.entries.len() {
            return;
        }
        if let Some(persisted) = self.persisted_index
            && persisted > self.cursor
        {
            self.persisted_index = None;
        }
        self.entries.truncate(self.cursor);
        debug!(entries = self.entries.len(), "discarded redoable entries");
    }

    /// Reverts history entries below the cursor. Returns `false` when there
    /// is nothing applicable to undo.
    ///
    /// A soft undo (requires a controller) reverts the entry below the
    /// cursor only when it is tagged to that controller. A hard undo first
    /// unwinds the trailing run of controller-tagged entries, then reverts
    /// the next entry regardless of tag.
    pub fn undo(
        &mut self,
        state: &mut DocumentState,
        controller: Option<ControllerId>,
        soft: bool,
    ) -> bool {
        assert!(
            !self.undo_running && !self.redo_running,
            "undo requested while undo/redo is already running"
        );
        if let Some(id) = controller {
            assert!(self.controllers.contains(&id), "undo by unregistered controller");
        }

        if soft {
            let Some(id) = controller else {
                return false;
            };
            if self.cursor == 0 || self.entries[self.cursor - 1].scope != Some(id) {
                return false;
            }
            self.undo_running = true;
            self.cursor -= 1;
            self.entries[self.cursor].group.revert(state);
            self.undo_running = false;
            trace!(cursor = self.cursor, "soft undo");
            return true;
        }

        if self.cursor == 0 {
            return false;
        }
        self.undo_running = true;
        while self.cursor > 0 && self.entries[self.cursor - 1].scope.is_some() {
            self.cursor -= 1;
            self.entries[self.cursor].group.revert(state);
        }
        if self.cursor > 0 {
            self.cursor -= 1;
            self.entries[self.cursor].group.revert(state);
        }
        self.undo_running = false;
        trace!(cursor = self.cursor, "undo");
        true
    }

    /// Re-executes history entries at the cursor. Returns `false` when
    /// there is nothing applicable to redo. Mirror of
    /// [`undo`](Self::undo): a hard redo re-executes the next entry and,
    /// when that entry is document-scoped, the run of tagged entries
    /// recorded after it.
    pub fn redo(
        &mut self,
        state: &mut DocumentState,
        controller: Option<ControllerId>,
        soft: bool,
    ) -> bool {
        assert!(
            !self.undo_running && !self.redo_running,
            "redo requested while undo/redo is already running"
        );
        if let Some(id) = controller {
            assert!(self.controllers.contains(&id), "redo by unregistered controller");
        }

        if soft {
            let Some(id) = controller else {
                return false;
            };
            if self.cursor == self.entries.len() || self.entries[self.cursor].scope != Some(id) {
                return false;
            }
            self.redo_running = true;
            self.entries[self.cursor].group.execute(state);
            self.cursor += 1;
            self.redo_running = false;
            trace!(cursor = self.cursor, "soft redo");
            return true;
        }

        if self.cursor == self.entries.len() {
            return false;
        }
        self.redo_running = true;
        let document_scoped = self.entries[self.cursor].scope.is_none();
        self.entries[self.cursor].group.execute(state);
        self.cursor += 1;
        if document_scoped {
            while self.cursor < self.entries.len() && self.entries[self.cursor].scope.is_some() {
                self.entries[self.cursor].group.execute(state);
                self.cursor += 1;
            }
        }
        self.redo_running = false;
        trace!(cursor = self.cursor, "redo");
        true
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::TextChange;
    use crate::document::TextDocument;

    fn give_replace(doc: &mut TextDocument, offset: usize, length: usize, text: &str, coalesce_id: usize) {
        let (state, stack) = doc.split_mut();
        let mut change: BoxedChange = Box::new(TextChange::new(offset, length, text));
        change.execute(state);
        stack.give_change(state, change, coalesce_id);
    }

    #[test]
    fn test_commit_and_undo_redo() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "one", 0);
        give_replace(&mut doc, 3, 0, " two", 0);
        assert_eq!(doc.text(), "one two");

        let (state, stack) = doc.split_mut();
        assert_eq!(stack.len(), 2);
        assert!(stack.undo(state, None, false));
        assert_eq!(state.buffer.text(), "one");
        assert!(stack.undo(state, None, false));
        assert_eq!(state.buffer.text(), "");
        assert!(!stack.undo(state, None, false));

        assert!(stack.redo(state, None, false));
        assert!(stack.redo(state, None, false));
        assert_eq!(state.buffer.text(), "one two");
        assert!(!stack.redo(state, None, false));
    }

    #[test]
    fn test_coalescing_merges_entries() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 7);
        give_replace(&mut doc, 1, 0, "b", 7);
        give_replace(&mut doc, 2, 0, "c", 7);

        let (state, stack) = doc.split_mut();
        assert_eq!(stack.len(), 1);
        assert!(stack.undo(state, None, false));
        assert_eq!(state.buffer.text(), "");
    }

    #[test]
    fn test_different_coalesce_ids_do_not_merge() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 7);
        give_replace(&mut doc, 1, 0, "b", 8);
        assert_eq!(doc.undo_stack().len(), 2);
    }

    #[test]
    fn test_zero_coalesce_id_never_merges() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 0);
        give_replace(&mut doc, 1, 0, "b", 0);
        assert_eq!(doc.undo_stack().len(), 2);
    }

    #[test]
    fn test_new_commit_discards_redoable_entries() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 0);
        give_replace(&mut doc, 1, 0, "b", 0);

        let (state, stack) = doc.split_mut();
        stack.undo(state, None, false);
        assert!(stack.can_redo());

        give_replace(&mut doc, 1, 0, "c", 0);
        let (_, stack) = doc.split_mut();
        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
        assert_eq!(doc.text(), "ac");
    }

    #[test]
    fn test_persisted_marker() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 0);

        let (_state, stack) = doc.split_mut();
        stack.set_persisted(true);
        assert!(stack.is_persisted());

        give_replace(&mut doc, 1, 0, "b", 0);
        assert!(!doc.undo_stack().is_persisted());

        let (state, stack) = doc.split_mut();
        stack.undo(state, None, false);
        assert!(stack.is_persisted());
    }

    #[test]
    fn test_persisted_marker_lost_when_discarded() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 0);
        give_replace(&mut doc, 1, 0, "b", 0);
        doc.undo_stack_mut().set_persisted(true);

        let (state, stack) = doc.split_mut();
        stack.undo(state, None, false);
        // Committing now discards the entry carrying the marker.
        give_replace(&mut doc, 1, 0, "c", 0);

        let (state, stack) = doc.split_mut();
        assert!(!stack.is_persisted());
        stack.undo(state, None, false);
        assert!(!stack.is_persisted());
    }

    #[test]
    fn test_no_coalescing_across_persisted_marker() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 7);
        doc.undo_stack_mut().set_persisted(true);
        give_replace(&mut doc, 1, 0, "b", 7);

        // The second entry must stay separate so undo can reach the saved
        // state.
        let (state, stack) = doc.split_mut();
        assert_eq!(stack.len(), 2);
        stack.undo(state, None, false);
        assert!(stack.is_persisted());
        assert_eq!(state.buffer.text(), "a");
    }

    #[test]
    fn test_disabled_collection_discards() {
        let mut doc = TextDocument::new("");
        doc.undo_stack_mut().set_collection_enabled(false);
        give_replace(&mut doc, 0, 0, "a", 0);
        assert_eq!(doc.text(), "a");
        assert!(doc.undo_stack().is_empty());
    }

    #[test]
    fn test_group_nesting_commits_once() {
        let mut doc = TextDocument::new("");
        let (state, stack) = doc.split_mut();
        stack.begin_group(ChangeGroup::new(None));
        let mut change: BoxedChange = Box::new(TextChange::new(0, 0, "x"));
        change.execute(state);
        stack.give_change(state, change, 0);

        stack.begin_group(ChangeGroup::new(None));
        let mut change: BoxedChange = Box::new(TextChange::new(1, 0, "y"));
        change.execute(state);
        stack.give_change(state, change, 0);
        stack.end_group(state, 0, false);

        assert_eq!(stack.len(), 0);
        stack.end_group(state, 0, true);
        assert_eq!(stack.len(), 1);

        assert!(stack.undo(state, None, false));
        assert_eq!(state.buffer.text(), "");
    }

    #[test]
    fn test_end_group_and_discard_keeps_mutations() {
        let mut doc = TextDocument::new("");
        let (state, stack) = doc.split_mut();
        stack.begin_group(ChangeGroup::new(None));
        let mut change: BoxedChange = Box::new(TextChange::new(0, 0, "kept"));
        change.execute(state);
        stack.give_change(state, change, 0);
        stack.end_group_and_discard();

        assert_eq!(state.buffer.text(), "kept");
        assert!(stack.is_empty());
    }

    #[test]
    #[should_panic(expected = "without a matching begin_group")]
    fn test_unbalanced_end_group_panics() {
        let mut doc = TextDocument::new("");
        let (state, stack) = doc.split_mut();
        stack.end_group(state, 0, false);
    }

    #[test]
    fn test_clear_resets_history() {
        let mut doc = TextDocument::new("");
        give_replace(&mut doc, 0, 0, "a", 0);
        let stack = doc.undo_stack_mut();
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.cursor(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }
}
