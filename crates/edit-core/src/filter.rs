//! Document filter capability.
//!
//! A filter is an optional strategy object sitting in front of the
//! document's single edit funnel. It sees every change before it applies
//! and may pass it through unchanged, rewrite it, split it into several
//! changes, or veto it entirely. A vetoed or rewritten request is not an
//! error: the filter's transformed request simply *is* the request.
//!
//! Installation uses an ownership-tagged handle: a filter is either moved
//! into the document ([`TextDocument::give_filter`]) or shared with it
//! while the caller retains ownership ([`TextDocument::set_filter`]) -
//! never both through the same field.
//!
//! [`TextDocument::give_filter`]: crate::TextDocument::give_filter
//! [`TextDocument::set_filter`]: crate::TextDocument::set_filter

use std::cell::RefCell;
use std::rc::Rc;

use crate::change::BoxedChange;
use crate::document::{RangeSetId, ReplaceResult, TextDocument};
use crate::undo::ControllerId;

/// Intercepts document edits before they apply.
///
/// The default implementations pass everything through untouched, so a
/// filter only overrides the hooks it cares about. While a hook runs, the
/// filter is detached from the document; applying further changes from
/// inside a hook will not re-enter the filter.
pub trait DocumentFilter {
    /// Decides whether and how `change` applies.
    ///
    /// The default applies the change as-is via
    /// [`TextDocument::apply_change`]. Return `None` without applying
    /// anything to veto, or build different changes and apply those to
    /// rewrite.
    fn filter_change(
        &mut self,
        document: &mut TextDocument,
        change: BoxedChange,
        coalesce_id: usize,
    ) -> Option<ReplaceResult> {
        document.apply_change(change, coalesce_id)
    }

    /// Adjusts the texts of a multi-range replace before the pass starts.
    fn filter_replace_range_set(
        &mut self,
        document: &mut TextDocument,
        set: RangeSetId,
        texts: &mut Vec<String>,
    ) {
        let _ = (document, set, texts);
    }

    /// Observes the opening of an undo group.
    fn filter_begin_group(&mut self, document: &mut TextDocument, controller: Option<ControllerId>) {
        let _ = (document, controller);
    }

    /// Observes the closing of an undo group.
    fn filter_end_group(&mut self, document: &mut TextDocument, coalesce_id: usize, flatten: bool) {
        let _ = (document, coalesce_id, flatten);
    }
}

/// How the document holds its filter: moved in, or borrowed from a caller
/// that retains ownership.
pub enum FilterHandle {
    /// The document owns the filter exclusively.
    Owned(Box<dyn DocumentFilter>),
    /// The caller retains the filter; the document holds a shared handle.
    Shared(Rc<RefCell<dyn DocumentFilter>>),
}

impl std::fmt::Debug for FilterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterHandle::Owned(_) => f.write_str("FilterHandle::Owned"),
            FilterHandle::Shared(_) => f.write_str("FilterHandle::Shared"),
        }
    }
}
