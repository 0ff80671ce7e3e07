//! The document coordinator.
//!
//! [`TextDocument`] owns the buffer, the line-data store, the undo history,
//! and every live range set, and it is the only legal way to mutate any of
//! them. Every edit - single replace, multi-cursor replace, line-data give,
//! selection store - funnels through
//! [`execute_and_give_change`](TextDocument::execute_and_give_change),
//! where an optional [`DocumentFilter`] may transform or veto it before it
//! executes and lands in the history.
//!
//! # Example
//!
//! ```rust
//! use edit_core::TextDocument;
//!
//! let mut doc = TextDocument::new("hello world");
//! doc.replace(0, 5, "goodbye", 0).unwrap();
//! assert_eq!(doc.text(), "goodbye world");
//!
//! assert!(doc.undo(None, false));
//! assert_eq!(doc.text(), "hello world");
//! assert!(doc.redo(None, false));
//! assert_eq!(doc.text(), "goodbye world");
//! ```
//!
//! # Threading
//!
//! The whole core assumes exclusive execution on one logical owner thread:
//! no internal locking, nothing suspends, every operation runs to
//! completion synchronously. Mutating the buffer or a range set from
//! outside the coordinator while a group is open desynchronizes the
//! range/undo bookkeeping.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::buffer::{RopeBuffer, TextBuffer};
use crate::change::{
    BoxedChange, Change, ChangeGroup, LineDataChange, LineDataListChange, SelectionChange,
    TextChange,
};
use crate::error::EditError;
use crate::filter::{DocumentFilter, FilterHandle};
use crate::line_data::{LineDataItem, LineDataStore};
use crate::range::TextRangeSet;
use crate::undo::{ControllerId, UndoStack};

/// Identifies one range set owned by a document. Id 0 is always the
/// primary selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeSetId(pub(crate) usize);

/// Identifies one subscribed listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

/// Synchronous notification payload handed to listeners after a committed
/// mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// `old_length` characters at `offset` became `new_length` characters.
    TextChanged {
        /// Start offset of the edit.
        offset: usize,
        /// Replaced extent in characters.
        old_length: usize,
        /// Replacement extent in characters.
        new_length: usize,
    },
    /// Line-data rows changed.
    LineDataChanged {
        /// First affected line.
        line: usize,
        /// Number of rows before the change.
        old_rows: usize,
        /// Number of rows after the change.
        new_rows: usize,
    },
    /// A range set was replaced or restored wholesale.
    SelectionChanged {
        /// The affected set.
        set: RangeSetId,
    },
    /// The persisted flag flipped.
    PersistedStateChanged {
        /// The new persisted state.
        persisted: bool,
    },
}

/// A subscribed change listener.
///
/// Listeners receive events only; they have no handle back to the document,
/// so re-entering the mutating API from inside a callback is structurally
/// impossible.
pub type DocumentListener = Box<dyn FnMut(&DocumentEvent)>;

/// Executed geometry of a text replace, reported back from the edit funnel
/// for caret write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceResult {
    /// Start offset of the executed replace.
    pub offset: usize,
    /// Length of the inserted text in characters.
    pub length: usize,
    /// The caret recorded by the change, if it set one.
    pub caret: Option<usize>,
}

/// The mutable document state changes execute against: buffer, line data,
/// and every live range set.
///
/// Kept separate from the [`TextDocument`] coordinator so the undo history
/// can hold changes while they mutate the state they were recorded
/// against.
pub struct DocumentState {
    pub(crate) buffer: Box<dyn TextBuffer>,
    pub(crate) line_data: LineDataStore,
    range_sets: Vec<Option<TextRangeSet>>,
    events: Vec<DocumentEvent>,
}

impl DocumentState {
    fn new(buffer: Box<dyn TextBuffer>, fields_per_line: usize) -> Self {
        let line_count = buffer.line_count();
        Self {
            buffer,
            line_data: LineDataStore::new(fields_per_line, line_count),
            // The primary selection starts as a single caret at the
            // document start.
            range_sets: vec![Some(TextRangeSet::with_range(0, 0))],
            events: Vec::new(),
        }
    }

    /// Read access to the buffer.
    pub fn buffer(&self) -> &dyn TextBuffer {
        self.buffer.as_ref()
    }

    /// Read access to the line-data store.
    pub fn line_data(&self) -> &LineDataStore {
        &self.line_data
    }

    /// The range set with the given id. Panics on a stale or foreign id.
    pub fn range_set(&self, set: RangeSetId) -> &TextRangeSet {
        self.range_sets[set.0]
            .as_ref()
            .expect("stale range set id")
    }

    /// Mutable access to the range set with the given id. Same contract as
    /// [`range_set`](Self::range_set).
    pub fn range_set_mut(&mut self, set: RangeSetId) -> &mut TextRangeSet {
        self.range_sets[set.0]
            .as_mut()
            .expect("stale range set id")
    }

    /// Replaces `length` characters at `offset` with `text`, returning the
    /// replaced text. This is the one place buffer content changes: it
    /// shifts every live range set past the edit and queues the change
    /// event, so buffer, ranges, and notifications never drift apart.
    pub fn replace_text(&mut self, offset: usize, length: usize, text: &str) -> String {
        let new_length = text.chars().count();
        let old = self.buffer.apply_replace(offset, length, text);
        for set in self.range_sets.iter_mut().flatten() {
            set.change_spatial(offset, length, new_length);
        }
        self.events.push(DocumentEvent::TextChanged {
            offset,
            old_length: length,
            new_length,
        });
        old
    }

    /// Queues an event for dispatch after the current operation.
    pub fn push_event(&mut self, event: DocumentEvent) {
        self.events.push(event);
    }

    fn take_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }
}

/// The editing core behind one open document.
pub struct TextDocument {
    state: DocumentState,
    undo_stack: UndoStack,
    filter: Option<FilterHandle>,
    listeners: Vec<Option<DocumentListener>>,
    raw_append_start: Option<usize>,
}

impl TextDocument {
    /// Creates a document holding the given text, backed by the default
    /// rope buffer, with one line-data field per line.
    pub fn new(text: &str) -> Self {
        Self::with_buffer(Box::new(RopeBuffer::new(text)))
    }

    /// Creates a document over a caller-supplied buffer.
    pub fn with_buffer(buffer: Box<dyn TextBuffer>) -> Self {
        Self {
            state: DocumentState::new(buffer, 1),
            undo_stack: UndoStack::new(),
            filter: None,
            listeners: Vec::new(),
            raw_append_start: None,
        }
    }

    // ---- read access -------------------------------------------------

    /// Length of the document in characters.
    pub fn length(&self) -> usize {
        self.state.buffer.len()
    }

    /// Returns `true` if the document holds no text.
    pub fn is_empty(&self) -> bool {
        self.state.buffer.is_empty()
    }

    /// The complete document text.
    pub fn text(&self) -> String {
        self.state.buffer.text()
    }

    /// The `length` characters starting at `offset`. The range must lie
    /// inside the document.
    pub fn text_part(&self, offset: usize, length: usize) -> String {
        self.state.buffer.text_part(offset, length)
    }

    /// The character at `offset`, if it lies inside the document.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.length()).then(|| self.state.buffer.char_at(offset))
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.state.buffer.line_count()
    }

    /// The given line including its trailing newline, if the line exists.
    pub fn line(&self, line: usize) -> Option<String> {
        (line < self.line_count()).then(|| self.state.buffer.line(line))
    }

    /// The given line without its trailing newline, if the line exists.
    pub fn line_without_newline(&self, line: usize) -> Option<String> {
        (line < self.line_count()).then(|| self.state.buffer.line_without_newline(line))
    }

    /// Length of the given line in characters (including its newline), if
    /// the line exists.
    pub fn line_length(&self, line: usize) -> Option<usize> {
        (line < self.line_count()).then(|| self.state.buffer.line_length(line))
    }

    /// Character offset of the first character of the given line.
    pub fn offset_from_line(&self, line: usize) -> usize {
        self.state.buffer.offset_from_line(line)
    }

    /// The line containing the given offset.
    pub fn line_from_offset(&self, offset: usize) -> usize {
        self.state.buffer.line_from_offset(offset)
    }

    /// The column of the given offset within its line.
    pub fn column_from_offset(&self, offset: usize) -> usize {
        let line = self.line_from_offset(offset);
        self.state.buffer.column_from_offset_and_line(offset, line)
    }

    /// Character offset of the given line/column position (column clamped
    /// to the line length).
    pub fn offset_from_line_and_column(&self, line: usize, column: usize) -> usize {
        self.state.buffer.offset_from_line_and_column(line, column)
    }

    /// Read access to the document state.
    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    /// Read access to the undo history.
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo_stack
    }

    pub(crate) fn state_mut(&mut self) -> &mut DocumentState {
        &mut self.state
    }

    pub(crate) fn undo_stack_mut(&mut self) -> &mut UndoStack {
        &mut self.undo_stack
    }

    pub(crate) fn split_mut(&mut self) -> (&mut DocumentState, &mut UndoStack) {
        (&mut self.state, &mut self.undo_stack)
    }

    // ---- range sets --------------------------------------------------

    /// The id of the primary selection set.
    pub fn selection_set_id(&self) -> RangeSetId {
        RangeSetId(0)
    }

    /// The primary selection.
    pub fn selection(&self) -> &TextRangeSet {
        self.state.range_set(RangeSetId(0))
    }

    /// Mutable access to the primary selection.
    pub fn selection_mut(&mut self) -> &mut TextRangeSet {
        self.state.range_set_mut(RangeSetId(0))
    }

    /// Creates an empty auxiliary range set (a search-match set, an extra
    /// cursor layer) that will track document edits like the selection
    /// does.
    pub fn add_range_set(&mut self) -> RangeSetId {
        self.state.range_sets.push(Some(TextRangeSet::new()));
        RangeSetId(self.state.range_sets.len() - 1)
    }

    /// Drops an auxiliary range set. The primary selection cannot be
    /// removed.
    pub fn remove_range_set(&mut self, set: RangeSetId) {
        assert!(set.0 != 0, "the primary selection cannot be removed");
        let slot = self
            .state
            .range_sets
            .get_mut(set.0)
            .expect("invalid range set id");
        assert!(slot.is_some(), "range set removed twice");
        *slot = None;
    }

    /// The range set with the given id.
    pub fn range_set(&self, set: RangeSetId) -> &TextRangeSet {
        self.state.range_set(set)
    }

    /// Mutable access to the range set with the given id.
    pub fn range_set_mut(&mut self, set: RangeSetId) -> &mut TextRangeSet {
        self.state.range_set_mut(set)
    }

    // ---- controllers and listeners -----------------------------------

    /// Registers a controller for soft-scope undo.
    pub fn register_controller(&mut self) -> ControllerId {
        self.undo_stack.register_controller()
    }

    /// Unregisters a controller. Must be called before the controller goes
    /// away.
    pub fn unregister_controller(&mut self, controller: ControllerId) {
        self.undo_stack.unregister_controller(controller);
    }

    /// Subscribes a listener to document events. Listeners are invoked
    /// synchronously, in subscription order, after each committed
    /// mutation.
    pub fn subscribe(&mut self, listener: DocumentListener) -> ListenerId {
        self.listeners.push(Some(listener));
        ListenerId(self.listeners.len() - 1)
    }

    /// Removes a previously subscribed listener.
    pub fn unsubscribe(&mut self, listener: ListenerId) {
        let slot = self
            .listeners
            .get_mut(listener.0)
            .expect("invalid listener id");
        assert!(slot.is_some(), "listener unsubscribed twice");
        *slot = None;
    }

    fn notify(&mut self) {
        let events = self.state.take_events();
        for event in &events {
            for listener in self.listeners.iter_mut().flatten() {
                listener(event);
            }
        }
    }

    // ---- filter ------------------------------------------------------

    /// Installs a filter, transferring ownership to the document.
    pub fn give_filter(&mut self, filter: Box<dyn DocumentFilter>) {
        self.filter = Some(FilterHandle::Owned(filter));
    }

    /// Installs a filter the caller retains ownership of.
    pub fn set_filter(&mut self, filter: Rc<RefCell<dyn DocumentFilter>>) {
        self.filter = Some(FilterHandle::Shared(filter));
    }

    /// Removes the installed filter, if any.
    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Returns `true` while a filter is installed.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Runs `f` with the filter detached from the document, so the filter
    /// can call back into the editing API without re-entering itself.
    fn with_filter<R>(
        &mut self,
        f: impl FnOnce(&mut TextDocument, &mut dyn DocumentFilter) -> R,
    ) -> Option<R> {
        let mut handle = self.filter.take()?;
        let result = match &mut handle {
            FilterHandle::Owned(filter) => f(self, filter.as_mut()),
            FilterHandle::Shared(filter) => {
                let filter = Rc::clone(filter);
                let mut guard = filter.borrow_mut();
                f(self, &mut *guard)
            }
        };
        // Reinstall unless the callback swapped in a different filter.
        if self.filter.is_none() {
            self.filter = Some(handle);
        }
        Some(result)
    }

    // ---- the edit funnel ---------------------------------------------

    /// The single funnel for all edits. With a filter installed the filter
    /// decides whether and how the change applies; otherwise it executes
    /// immediately and is recorded. Returns the executed replace geometry
    /// when the applied change was a text replace.
    pub fn execute_and_give_change(
        &mut self,
        change: BoxedChange,
        coalesce_id: usize,
    ) -> Option<ReplaceResult> {
        if self.filter.is_some() {
            self.with_filter(move |doc, filter| filter.filter_change(doc, change, coalesce_id))
                .flatten()
        } else {
            self.apply_change(change, coalesce_id)
        }
    }

    /// Executes `change` and records it, bypassing the filter. Filters call
    /// this to apply their (possibly rewritten) changes; everything else
    /// goes through [`execute_and_give_change`](Self::execute_and_give_change).
    pub fn apply_change(&mut self, mut change: BoxedChange, coalesce_id: usize) -> Option<ReplaceResult> {
        // A replace that changes the line count needs a paired line-data
        // splice in the same transaction; size it before execution while
        // the old text is still in the buffer.
        let span_info = change.as_any().downcast_ref::<TextChange>().map(|tc| {
            // Before execution the change's stored length is the replaced
            // extent and its stored text the replacement.
            let start_line = self.state.buffer.line_from_offset(tc.offset);
            let old_text = self.state.buffer.text_part(tc.offset, tc.length);
            let old_span = 1 + count_newlines(&old_text);
            let new_span = 1 + count_newlines(&tc.text);
            (start_line, old_span, new_span)
        });

        change.execute(&mut self.state);

        let result = change.as_any().downcast_ref::<TextChange>().map(|tc| ReplaceResult {
            offset: tc.offset(),
            length: tc.new_length(),
            caret: tc.caret(),
        });

        let line_sync = span_info.filter(|(_, old_span, new_span)| old_span != new_span);
        let wrap = line_sync.is_some() && self.undo_stack.group_depth() == 0;
        if wrap {
            // Keep the replace and its line-data splice in one history
            // entry even when no caller group is open.
            self.undo_stack.begin_group(ChangeGroup::new(None));
        }

        self.undo_stack.give_change(&mut self.state, change, coalesce_id);
        if let Some((line, old_span, new_span)) = line_sync {
            let mut sync: BoxedChange = Box::new(LineDataListChange::new(line, old_span, new_span));
            sync.execute(&mut self.state);
            self.undo_stack.give_change(&mut self.state, sync, coalesce_id);
        }

        if wrap {
            self.undo_stack.end_group(&mut self.state, coalesce_id, true);
        }

        debug_assert_eq!(
            self.state.line_data.len(),
            self.state.buffer.line_count(),
            "line data store out of step with the buffer"
        );
        self.notify();
        result
    }

    // ---- editing API -------------------------------------------------

    /// Replaces `length` characters at `offset` with `text`. Changes with
    /// the same non-zero `coalesce_id` fold into one undo entry.
    pub fn replace(
        &mut self,
        offset: usize,
        length: usize,
        text: &str,
        coalesce_id: usize,
    ) -> Result<(), EditError> {
        let doc_length = self.length();
        if offset + length > doc_length {
            return Err(EditError::InvalidRange {
                start: offset,
                end: offset + length,
                length: doc_length,
            });
        }
        self.execute_and_give_change(Box::new(TextChange::new(offset, length, text)), coalesce_id);
        Ok(())
    }

    /// Appends text at the end of the document.
    pub fn append(&mut self, text: &str, coalesce_id: usize) -> Result<(), EditError> {
        self.replace(self.length(), 0, text, coalesce_id)
    }

    /// Replaces the complete document text (undoably).
    pub fn set_text(&mut self, text: &str) -> Result<(), EditError> {
        self.replace(0, self.length(), text, 0)
    }

    /// The composite multi-cursor edit: replaces every range of `set` with
    /// the rotating `texts` (range *i* receives `texts[i % texts.len()]`),
    /// as one undo transaction tagged to `controller`.
    ///
    /// Ranges are visited in ascending order inside a change-bracket, so
    /// later ranges stay correct while earlier edits shift offsets. Every
    /// range collapses onto the caret its replacement produced.
    pub fn replace_range_set(
        &mut self,
        set: RangeSetId,
        texts: &[&str],
        coalesce_id: usize,
        controller: Option<ControllerId>,
    ) -> Result<(), EditError> {
        if texts.is_empty() {
            return Err(EditError::EmptyTexts);
        }

        self.begin_group(controller);

        let mut texts: Vec<String> = texts.iter().map(|text| text.to_string()).collect();
        self.with_filter(|doc, filter| filter.filter_replace_range_set(doc, set, &mut texts));

        self.state.range_set_mut(set).begin_changes();

        let mut index = 0;
        loop {
            let range_count = self.state.range_set(set).range_count();
            if index >= range_count {
                break;
            }
            let range = self.state.range_set(set).range(index);
            let text = texts[index % texts.len()].clone();

            let change = TextChange::new(range.min(), range.length(), text);
            let result = self.execute_and_give_change(Box::new(change), 0);

            assert!(
                self.state.range_set(set).range_count() >= range_count,
                "range set shrank during a multi-range replace"
            );

            if let Some(result) = result {
                let caret = result.caret.unwrap_or(result.offset + result.length);
                let range = self.state.range_set_mut(set).range_mut(index);
                range.set_caret(caret);
                range.collapse();
            }
            index += 1;
        }

        self.state.range_set_mut(set).end_changes();
        self.end_group(coalesce_id, true);
        Ok(())
    }

    /// Records an undoable snapshot of the given range set, tagged to
    /// `controller`. Selection moves recorded this way participate in
    /// soft undo.
    pub fn store_selection(
        &mut self,
        set: RangeSetId,
        controller: Option<ControllerId>,
        coalesce_id: usize,
    ) {
        let snapshot = self.state.range_set(set).clone();
        self.execute_and_give_change(
            Box::new(SelectionChange::new(set, snapshot, controller)),
            coalesce_id,
        );
    }

    // ---- grouping ----------------------------------------------------

    /// Opens an undo group, optionally tagged to `controller` (the tag is
    /// what enables soft-undo scoping for selection-only transactions).
    pub fn begin_group(&mut self, controller: Option<ControllerId>) {
        self.with_filter(|doc, filter| filter.filter_begin_group(doc, controller));
        self.undo_stack.begin_group(ChangeGroup::new(controller));
    }

    /// Closes the innermost undo group. Closing the last open group
    /// commits it; see [`UndoStack::end_group`].
    pub fn end_group(&mut self, coalesce_id: usize, flatten: bool) {
        self.with_filter(|doc, filter| filter.filter_end_group(doc, coalesce_id, flatten));
        self.undo_stack.end_group(&mut self.state, coalesce_id, flatten);
        self.notify();
    }

    /// Closes the innermost undo group and discards the recording.
    /// Warning: buffer mutations already applied by the group are **not**
    /// reverted; only the history entry is suppressed.
    pub fn end_group_and_discard(&mut self) {
        self.undo_stack.end_group_and_discard();
        self.notify();
    }

    // ---- undo/redo ---------------------------------------------------

    /// Undoes the most recent applicable history entry. See
    /// [`UndoStack::undo`] for the soft/hard semantics. Returns `false`
    /// when there is nothing to undo.
    pub fn undo(&mut self, controller: Option<ControllerId>, soft: bool) -> bool {
        let persisted_before = self.is_persisted();
        let done = self.undo_stack.undo(&mut self.state, controller, soft);
        self.emit_persisted_flip(persisted_before);
        self.notify();
        done
    }

    /// Re-applies the next history entry. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self, controller: Option<ControllerId>, soft: bool) -> bool {
        let persisted_before = self.is_persisted();
        let done = self.undo_stack.redo(&mut self.state, controller, soft);
        self.emit_persisted_flip(persisted_before);
        self.notify();
        done
    }

    /// Returns `true` while an undo is being applied.
    pub fn is_undo_running(&self) -> bool {
        self.undo_stack.is_undo_running()
    }

    /// Returns `true` while a redo is being applied.
    pub fn is_redo_running(&self) -> bool {
        self.undo_stack.is_redo_running()
    }

    /// Returns `true` while either an undo or a redo is being applied.
    pub fn is_undo_or_redo_running(&self) -> bool {
        self.is_undo_running() || self.is_redo_running()
    }

    // ---- persistence marker ------------------------------------------

    /// Returns `true` when the history cursor sits at the state last
    /// marked persisted.
    pub fn is_persisted(&self) -> bool {
        self.undo_stack.is_persisted()
    }

    /// Marks (or unmarks) the current state as persisted.
    pub fn set_persisted(&mut self, persisted: bool) {
        let before = self.is_persisted();
        self.undo_stack.set_persisted(persisted);
        self.emit_persisted_flip(before);
        self.notify();
    }

    fn emit_persisted_flip(&mut self, persisted_before: bool) {
        let persisted = self.is_persisted();
        if persisted != persisted_before {
            self.state
                .push_event(DocumentEvent::PersistedStateChanged { persisted });
        }
    }

    // ---- undo collection ---------------------------------------------

    /// Returns `true` when committed groups are recorded into history.
    pub fn is_collection_enabled(&self) -> bool {
        self.undo_stack.is_collection_enabled()
    }

    /// Enables or disables undo recording (bulk/raw operations disable it
    /// and accept the history gap).
    pub fn set_collection_enabled(&mut self, enabled: bool) {
        self.undo_stack.set_collection_enabled(enabled);
    }

    // ---- line data ---------------------------------------------------

    /// The opaque data item at the given line and field, if any.
    pub fn line_data(&self, line: usize, field: usize) -> Option<&dyn Any> {
        self.state.line_data.get(line, field)
    }

    /// Stores an opaque data item at the given line and field (undoably).
    pub fn give_line_data(
        &mut self,
        line: usize,
        field: usize,
        data: LineDataItem,
    ) -> Result<(), EditError> {
        let count = self.line_count();
        if line >= count {
            return Err(EditError::InvalidLine { line, count });
        }
        let fields = self.state.line_data.fields_per_line();
        if field >= fields {
            return Err(EditError::InvalidField {
                field,
                count: fields,
            });
        }
        self.execute_and_give_change(Box::new(LineDataChange::new(line, field, Some(data))), 0);
        Ok(())
    }

    /// Number of line-data fields per line.
    pub fn line_data_fields_per_line(&self) -> usize {
        self.state.line_data.fields_per_line()
    }

    /// Changes the number of line-data fields per line.
    ///
    /// This reallocates every row and **empties the undo stack**: recorded
    /// changes hold rows shaped for the old field count and can no longer
    /// be replayed.
    pub fn set_line_data_fields_per_line(&mut self, count: usize) {
        self.state.line_data.set_fields_per_line(count);
        self.undo_stack.clear();
        debug!(fields = count, "line data field count changed, history dropped");
    }

    // ---- raw append mode ---------------------------------------------

    /// Enters raw append mode: text is streamed straight onto the buffer
    /// end with undo collection disabled and no per-chunk events.
    pub fn raw_append_begin(&mut self) {
        assert!(
            self.raw_append_start.is_none(),
            "raw append mode is already active"
        );
        self.undo_stack.set_collection_enabled(false);
        self.raw_append_start = Some(self.length());
        self.state.buffer.raw_append_begin();
    }

    /// Appends a chunk in raw append mode.
    pub fn raw_append(&mut self, text: &str) {
        debug_assert!(
            self.raw_append_start.is_some(),
            "raw_append called outside raw append mode"
        );
        self.state.buffer.raw_append(text);
    }

    /// Leaves raw append mode: re-enables undo collection, grows the
    /// line-data store, and fires a single change event covering the whole
    /// appended span.
    pub fn raw_append_end(&mut self) {
        let start = self
            .raw_append_start
            .take()
            .expect("raw_append_end called without raw_append_begin");
        self.state.buffer.raw_append_end();
        self.state.line_data.resize(self.state.buffer.line_count());
        let appended = self.length() - start;
        self.state.push_event(DocumentEvent::TextChanged {
            offset: start,
            old_length: 0,
            new_length: appended,
        });
        self.undo_stack.set_collection_enabled(true);
        self.notify();
    }
}

impl std::fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDocument")
            .field("length", &self.length())
            .field("line_count", &self.line_count())
            .field("history", &self.undo_stack.len())
            .field("filter", &self.filter)
            .finish()
    }
}

fn count_newlines(text: &str) -> usize {
    text.chars().filter(|ch| *ch == '\n').count()
}
