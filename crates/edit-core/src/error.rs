//! Error type for the validated document entry points.
//!
//! Offsets, ranges, and line numbers arriving from outside the crate are
//! validated at the [`crate::TextDocument`] surface and rejected with an
//! [`EditError`]. Internal contract breaches (mismatched group nesting, a
//! range index out of bounds, a range set shrinking mid-pass) are not
//! recoverable conditions and panic instead.

use thiserror::Error;

/// Errors produced by the document editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("invalid offset {offset} (document length {length})")]
    /// A character offset lies past the end of the document.
    InvalidOffset {
        /// The rejected offset.
        offset: usize,
        /// The document length at the time of the call.
        length: usize,
    },

    #[error("invalid range {start}..{end} (document length {length})")]
    /// A character range lies (partly) outside the document.
    InvalidRange {
        /// Inclusive start character offset.
        start: usize,
        /// Exclusive end character offset.
        end: usize,
        /// The document length at the time of the call.
        length: usize,
    },

    #[error("invalid line {line} (line count {count})")]
    /// A line number lies past the last line.
    InvalidLine {
        /// The rejected line number.
        line: usize,
        /// The line count at the time of the call.
        count: usize,
    },

    #[error("invalid line data field {field} (fields per line {count})")]
    /// A line data field index lies past the configured field count.
    InvalidField {
        /// The rejected field index.
        field: usize,
        /// The configured number of fields per line.
        count: usize,
    },

    #[error("replacement text list may not be empty")]
    /// A multi-range replace was given no texts to rotate through.
    EmptyTexts,
}
