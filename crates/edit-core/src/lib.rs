#![warn(missing_docs)]
//! Edit Core - Headless Rich-Text Editing Kernel
//!
//! # Overview
//!
//! `edit-core` is the editing engine behind a desktop rich-text editor
//! component: multi-cursor editing, full undo/redo, and atomic composite
//! edits over a mutable text buffer, usable by any UI shell. It does not
//! render, tokenize, or handle input; a frontend drives it through the
//! [`TextDocument`] API and observes it through synchronous change events.
//!
//! # Core Features
//!
//! - **Change Algebra**: every edit is an atomic, revertible [`Change`];
//!   adjacent compatible changes merge so a typing burst is one undo step
//! - **Transactional History**: nestable [`ChangeGroup`]s, group-level
//!   coalescing, a persisted ("saved state") marker, and soft undo scoped
//!   to one controller
//! - **Multi-Cursor Model**: ordered, non-overlapping [`TextRangeSet`]s
//!   that stay consistent while the text under them mutates
//! - **Pluggable Storage**: the [`TextBuffer`] capability with a
//!   rope-backed default ([`RopeBuffer`])
//! - **Edit Filtering**: an optional [`DocumentFilter`] may rewrite,
//!   split, or veto any edit before it applies
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TextDocument (coordinator + edit funnel)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  UndoStack (transactions, coalescing)       │  ← History
//! ├─────────────────────────────────────────────┤
//! │  Change Algebra (execute/revert/merge)      │  ← Edit Records
//! ├─────────────────────────────────────────────┤
//! │  TextRangeSet (multi-cursor geometry)       │  ← Selection Model
//! ├─────────────────────────────────────────────┤
//! │  TextBuffer / LineDataStore (capabilities)  │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use edit_core::TextDocument;
//!
//! let mut doc = TextDocument::new("fn main() {}\n");
//!
//! // A plain replace; equal non-zero coalesce ids fold consecutive edits
//! // into one undo step.
//! doc.replace(3, 4, "run", 0).unwrap();
//! assert_eq!(doc.text(), "fn run() {}\n");
//!
//! assert!(doc.undo(None, false));
//! assert_eq!(doc.text(), "fn main() {}\n");
//! ```
//!
//! ## Multi-cursor editing
//!
//! ```rust
//! use edit_core::TextDocument;
//!
//! let mut doc = TextDocument::new("aaa bbb ccc");
//! let selection = doc.selection_set_id();
//! doc.selection_mut().reset_to_range(0, 0);
//! doc.selection_mut().add_range(4, 4);
//! doc.selection_mut().add_range(8, 8);
//!
//! // Texts rotate across the cursors; the whole pass is one undo entry.
//! doc.replace_range_set(selection, &["1:", "2:"], 0, None).unwrap();
//! assert_eq!(doc.text(), "1:aaa 2:bbb 1:ccc");
//!
//! assert!(doc.undo(None, false));
//! assert_eq!(doc.text(), "aaa bbb ccc");
//! ```
//!
//! # Module Description
//!
//! - [`buffer`] - the [`TextBuffer`] capability and the rope-backed default
//! - [`range`] - cursor/selection ranges and spatial adjustment
//! - [`change`] - the change algebra (execute, revert, merge, group)
//! - [`undo`] - the transactional undo/redo history
//! - [`line_data`] - per-line opaque metadata slots
//! - [`document`] - the coordinator and public editing API
//! - [`filter`] - the edit filter capability
//! - [`error`] - validation errors of the editing surface
//!
//! # Threading
//!
//! Single-threaded by design: every mutating entry point assumes exclusive
//! execution on one logical owner thread. There is no internal locking and
//! no operation suspends or blocks.

pub mod buffer;
pub mod change;
pub mod document;
pub mod error;
pub mod filter;
pub mod line_data;
pub mod range;
pub mod undo;

pub use buffer::{RopeBuffer, TextBuffer};
pub use change::{
    BoxedChange, Change, ChangeGroup, LineDataChange, LineDataListChange, SelectionChange,
    TextChange,
};
pub use document::{
    DocumentEvent, DocumentListener, DocumentState, ListenerId, RangeSetId, ReplaceResult,
    TextDocument,
};
pub use error::EditError;
pub use filter::{DocumentFilter, FilterHandle};
pub use line_data::{LineDataItem, LineDataRow, LineDataStore};
pub use range::{TextRange, TextRangeSet};
pub use undo::{ControllerId, UndoStack};
