//! The change algebra: atomic, revertible edit records.
//!
//! Every mutation of a document is represented as a [`Change`]:
//!
//! - [`TextChange`] - a region replace (optionally carrying a resulting
//!   caret)
//! - [`LineDataListChange`] - a line-data row splice paired with a
//!   line-count-changing edit
//! - [`LineDataChange`] - a single line-data slot update
//! - [`SelectionChange`] - a snapshot of one range set, making selection
//!   moves themselves undoable
//! - [`ChangeGroup`] - an ordered, nestable composite treated as one
//!   undo/redo transaction
//!
//! Changes execute against the document state, revert to the exact prior
//! state, and may merge with a later change so a burst of small edits
//! becomes one undo-visible step. Ownership always transfers wholesale: a
//! boxed change moves into the group or history slot holding it, and
//! [`Change::merge`] either consumes the candidate or hands it back.

use std::any::Any;
use std::fmt;

use crate::document::{DocumentEvent, DocumentState, RangeSetId};
use crate::line_data::LineDataRow;
use crate::range::TextRangeSet;
use crate::undo::ControllerId;

/// A change, boxed for storage in groups and the history.
pub type BoxedChange = Box<dyn Change>;

/// An atomic, revertible edit record.
pub trait Change: fmt::Debug {
    /// Applies the change to the document state. Must be safely
    /// re-appliable after a revert (redo re-executes recorded changes).
    fn execute(&mut self, state: &mut DocumentState);

    /// Exact inverse of [`execute`](Self::execute).
    fn revert(&mut self, state: &mut DocumentState);

    /// Tries to fold `candidate` into `self`.
    ///
    /// On success the candidate is consumed and `self` now represents the
    /// union of both changes. On failure `self` is untouched and the
    /// candidate is handed back. Both changes must already be executed.
    fn merge(&mut self, state: &mut DocumentState, candidate: BoxedChange) -> Result<(), BoxedChange> {
        let _ = state;
        Err(candidate)
    }

    /// The controller whose local scope this change belongs to, or `None`
    /// for a document-scoped (content) change. Soft undo only recognizes
    /// controller-scoped entries.
    fn controller_scope(&self) -> Option<ControllerId> {
        None
    }

    /// Returns `true` for [`ChangeGroup`].
    fn is_group(&self) -> bool {
        false
    }

    /// Upcast for downcasting to a concrete change type.
    fn as_any(&self) -> &dyn Any;

    /// Consuming upcast, used to dissolve nested groups.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Shared geometry for changes that span a range in an array (text changes
/// span character ranges, line-data changes span line ranges).
///
/// The accessors describe the *executed* state: `offset()` is the region
/// start, `new_length()` the extent the change currently occupies, and
/// `old_length()` the extent it replaced.
pub(crate) trait RangedChange {
    fn offset(&self) -> usize;
    fn old_length(&self) -> usize;
    fn new_length(&self) -> usize;

    /// Non-zero intersection between this change's current extent and the
    /// candidate's replaced extent.
    fn is_overlapped_by(&self, other: &dyn RangedChange) -> bool {
        self.offset() < other.offset() + other.old_length()
            && other.offset() < self.offset() + self.new_length()
    }

    /// Overlapping or adjacent, which is what allows two consecutive edits
    /// to coalesce into one undo entry.
    ///
    /// The boundary rule is asymmetric on purpose: a zero-length insertion
    /// exactly at the end of this change touches (so continued typing keeps
    /// extending one undo step), while an insertion at the start does not.
    /// This matches long-observed editor behavior; keep it exactly.
    fn is_touched_by(&self, other: &dyn RangedChange) -> bool {
        self.is_overlapped_by(other)
            || other.offset() == self.offset() + self.new_length()
            || (other.old_length() > 0 && other.offset() + other.old_length() == self.offset())
    }
}

/// Takes the first `count` characters of `text`, split at a character
/// boundary.
fn char_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Drops the first `count` characters of `text`.
fn char_suffix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// A plain region replace: `length` characters at `offset` become `text`.
///
/// Execution swaps state: afterwards `text` holds the *replaced* text and
/// `length` the *new* region length, which makes [`revert`](Change::revert)
/// the very same swap and re-execution (redo) naturally idempotent.
pub struct TextChange {
    pub(crate) offset: usize,
    pub(crate) length: usize,
    pub(crate) text: String,
    pub(crate) caret: Option<usize>,
}

impl TextChange {
    /// Creates a replace of `length` characters at `offset` with `text`.
    pub fn new(offset: usize, length: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            text: text.into(),
            caret: None,
        }
    }

    /// Creates a replace that also records the caret position it should
    /// leave behind.
    pub fn with_caret(offset: usize, length: usize, text: impl Into<String>, caret: usize) -> Self {
        let mut change = Self::new(offset, length, text);
        change.caret = Some(caret);
        change
    }

    /// The region start offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The stored text: replacement text before execution, replaced (old)
    /// text after.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The stored region length: the replaced extent before execution, the
    /// replacement extent after. Filters rebuild changes from this and
    /// [`text`](Self::text).
    pub fn length(&self) -> usize {
        self.length
    }

    /// The resulting caret, when one was recorded.
    pub fn caret(&self) -> Option<usize> {
        self.caret
    }

    /// Extent the change currently occupies (valid once executed).
    pub fn new_length(&self) -> usize {
        self.length
    }

    /// Extent the change replaced (valid once executed).
    pub fn old_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Applies the replace and swaps the stored text/length with what it
    /// displaced. Calling this twice is a no-op pair, which is exactly what
    /// execute/revert need.
    fn swap_apply(&mut self, state: &mut DocumentState) {
        let new_length = self.text.chars().count();
        let old = state.replace_text(self.offset, self.length, &self.text);
        self.text = old;
        self.length = new_length;
    }
}

impl RangedChange for TextChange {
    fn offset(&self) -> usize {
        self.offset
    }

    fn old_length(&self) -> usize {
        self.old_length()
    }

    fn new_length(&self) -> usize {
        self.length
    }
}

impl Change for TextChange {
    fn execute(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn revert(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn merge(&mut self, state: &mut DocumentState, candidate: BoxedChange) -> Result<(), BoxedChange> {
        let _ = state;
        let touched = match candidate.as_any().downcast_ref::<TextChange>() {
            Some(other) => self.is_touched_by(other),
            None => false,
        };
        if !touched {
            return Err(candidate);
        }
        let other = candidate
            .into_any()
            .downcast::<TextChange>()
            .expect("checked");

        // Both changes are executed, so `self` occupies
        // [offset, offset + length) of the current document and `other.text`
        // holds the text it displaced from the in-between state.
        let (o1, n1) = (self.offset, self.length);
        let (o2, b_new) = (other.offset, other.length);
        let b_old = other.old_length();

        // Old text of the union region: the parts of the candidate's old
        // text lying outside this change's inserted span come from the
        // original document; the overlapping part was this change's own
        // insertion and is represented by the already-stored old text.
        let left = if o2 < o1 {
            char_prefix(&other.text, o1 - o2)
        } else {
            ""
        };
        let right = if o2 + b_old > o1 + n1 {
            char_suffix(&other.text, (o1 + n1).saturating_sub(o2))
        } else {
            ""
        };
        let mut old_text = String::with_capacity(left.len() + self.text.len() + right.len());
        old_text.push_str(left);
        old_text.push_str(&self.text);
        old_text.push_str(right);

        let offset = o1.min(o2);
        let end_self = (o1 + n1 + b_new) as isize - b_old as isize;
        let end_other = (o2 + b_new) as isize;
        let new_length = end_self.max(end_other) as usize - offset;

        self.offset = offset;
        self.length = new_length;
        self.text = old_text;
        // The most recent caret wins.
        self.caret = other.caret;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for TextChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextChange")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("text", &self.text)
            .field("caret", &self.caret)
            .finish()
    }
}

/// Splices line-data rows alongside an edit that changed the line count:
/// `length` rows at `line` are replaced by `new_length` fresh rows, and the
/// displaced rows are kept for revert.
pub struct LineDataListChange {
    line: usize,
    length: usize,
    new_length: usize,
    old_rows: Vec<LineDataRow>,
}

impl LineDataListChange {
    /// Creates a splice of `length` rows at `line` into `new_length` rows.
    pub fn new(line: usize, length: usize, new_length: usize) -> Self {
        Self {
            line,
            length,
            new_length,
            old_rows: Vec::new(),
        }
    }

    /// The first affected line.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl RangedChange for LineDataListChange {
    fn offset(&self) -> usize {
        self.line
    }

    fn old_length(&self) -> usize {
        self.length
    }

    fn new_length(&self) -> usize {
        self.new_length
    }
}

impl Change for LineDataListChange {
    fn execute(&mut self, state: &mut DocumentState) {
        let fresh = state.line_data.empty_rows(self.new_length);
        self.old_rows = state.line_data.splice_rows(self.line, self.length, fresh);
        state.push_event(DocumentEvent::LineDataChanged {
            line: self.line,
            old_rows: self.length,
            new_rows: self.new_length,
        });
    }

    fn revert(&mut self, state: &mut DocumentState) {
        let saved = std::mem::take(&mut self.old_rows);
        state.line_data.splice_rows(self.line, self.new_length, saved);
        state.push_event(DocumentEvent::LineDataChanged {
            line: self.line,
            old_rows: self.new_length,
            new_rows: self.length,
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for LineDataListChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineDataListChange")
            .field("line", &self.line)
            .field("length", &self.length)
            .field("new_length", &self.new_length)
            .field("saved_rows", &self.old_rows.len())
            .finish()
    }
}

/// Sets one opaque line-data slot, keeping the previous occupant for
/// revert. Execute and revert are both a slot swap.
pub struct LineDataChange {
    line: usize,
    field: usize,
    data: Option<crate::line_data::LineDataItem>,
}

impl LineDataChange {
    /// Creates a slot update for the given line and field.
    pub fn new(line: usize, field: usize, data: Option<crate::line_data::LineDataItem>) -> Self {
        Self { line, field, data }
    }

    fn swap_apply(&mut self, state: &mut DocumentState) {
        let incoming = self.data.take();
        self.data = state.line_data.swap(self.line, self.field, incoming);
        state.push_event(DocumentEvent::LineDataChanged {
            line: self.line,
            old_rows: 1,
            new_rows: 1,
        });
    }
}

impl Change for LineDataChange {
    fn execute(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn revert(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for LineDataChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineDataChange")
            .field("line", &self.line)
            .field("field", &self.field)
            .field("occupied", &self.data.is_some())
            .finish()
    }
}

/// An undoable snapshot of one range set.
///
/// Execute and revert both swap the stored snapshot with the live set, so a
/// round trip restores the selection exactly as it was when the snapshot
/// was taken.
#[derive(Debug)]
pub struct SelectionChange {
    set: RangeSetId,
    ranges: TextRangeSet,
    controller: Option<ControllerId>,
}

impl SelectionChange {
    /// Creates a snapshot change for the given set, tagged to the issuing
    /// controller (the tag is what soft undo scopes on).
    pub fn new(set: RangeSetId, ranges: TextRangeSet, controller: Option<ControllerId>) -> Self {
        Self {
            set,
            ranges,
            controller,
        }
    }

    fn swap_apply(&mut self, state: &mut DocumentState) {
        std::mem::swap(&mut self.ranges, state.range_set_mut(self.set));
        state.push_event(DocumentEvent::SelectionChanged { set: self.set });
    }
}

impl Change for SelectionChange {
    fn execute(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn revert(&mut self, state: &mut DocumentState) {
        self.swap_apply(state);
    }

    fn merge(&mut self, state: &mut DocumentState, candidate: BoxedChange) -> Result<(), BoxedChange> {
        let _ = state;
        // Only the final selection state matters for undo: a later snapshot
        // of the same set folds away completely, keeping the earliest
        // stored state for revert. Snapshots of different sets (and content
        // changes) never fold.
        match candidate.as_any().downcast_ref::<SelectionChange>() {
            Some(other) if other.set == self.set => Ok(()),
            _ => Err(candidate),
        }
    }

    fn controller_scope(&self) -> Option<ControllerId> {
        self.controller
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// An ordered, nestable sequence of changes treated as one undo/redo
/// transaction.
#[derive(Debug)]
pub struct ChangeGroup {
    children: Vec<BoxedChange>,
    coalesce_id: usize,
    controller: Option<ControllerId>,
}

impl ChangeGroup {
    /// Creates an empty group, optionally tagged to the controller that
    /// opened it.
    pub fn new(controller: Option<ControllerId>) -> Self {
        Self {
            children: Vec::new(),
            coalesce_id: 0,
            controller,
        }
    }

    /// The coalesce id assigned when the group was committed (0 means the
    /// group never merges with a sibling entry).
    pub fn coalesce_id(&self) -> usize {
        self.coalesce_id
    }

    pub(crate) fn set_coalesce_id(&mut self, coalesce_id: usize) {
        self.coalesce_id = coalesce_id;
    }

    /// The controller that opened the group, if any.
    pub fn controller(&self) -> Option<ControllerId> {
        self.controller
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the group holds no changes.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Adds an executed change to the group. The last child gets a chance
    /// to absorb it first; only on merge failure does the change become a
    /// new child. This is what collapses a sequence of operations inside
    /// one transaction into minimal undo-visible steps.
    pub fn append(&mut self, state: &mut DocumentState, change: BoxedChange) {
        let candidate = match self.children.last_mut() {
            Some(last) => match last.merge(state, change) {
                Ok(()) => return,
                Err(candidate) => candidate,
            },
            None => change,
        };
        self.children.push(candidate);
    }

    /// Moves every child of `other` into this group, child merge rules
    /// applying as in [`append`](Self::append). Used when a later group
    /// coalesces into an earlier history entry.
    pub fn absorb(&mut self, state: &mut DocumentState, other: ChangeGroup) {
        for child in other.children {
            self.append(state, child);
        }
    }

    /// Replaces a group-of-groups with one flat child list, preserving
    /// execution order. Helper-opened sub-groups then add no undo
    /// granularity of their own.
    pub fn flatten(&mut self) {
        if !self.children.iter().any(|c| c.is_group()) {
            return;
        }
        let mut flat: Vec<BoxedChange> = Vec::with_capacity(self.children.len());
        for child in self.children.drain(..) {
            if child.is_group() {
                let mut group = child
                    .into_any()
                    .downcast::<ChangeGroup>()
                    .expect("is_group");
                group.flatten();
                flat.append(&mut group.children);
            } else {
                flat.push(child);
            }
        }
        self.children = flat;
    }
}

impl Change for ChangeGroup {
    fn execute(&mut self, state: &mut DocumentState) {
        // Order matters: later children assume the offsets produced by
        // earlier ones.
        for child in &mut self.children {
            child.execute(state);
        }
    }

    fn revert(&mut self, state: &mut DocumentState) {
        for child in self.children.iter_mut().rev() {
            child.revert(state);
        }
    }

    fn controller_scope(&self) -> Option<ControllerId> {
        // A group is controller-scoped only when every child is scoped to
        // the same controller; any content change makes it document-scoped.
        let mut scope = None;
        for child in &self.children {
            match child.controller_scope() {
                None => return None,
                Some(id) => match scope {
                    None => scope = Some(id),
                    Some(seen) if seen != id => return None,
                    Some(_) => {}
                },
            }
        }
        scope
    }

    fn is_group(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
