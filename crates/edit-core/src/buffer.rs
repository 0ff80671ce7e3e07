//! Text buffer capability.
//!
//! The editing core never talks to a concrete storage type directly: every
//! buffer access goes through the [`TextBuffer`] trait, so a UI shell can
//! plug in its own storage. All coordinates are **character offsets**
//! (Unicode scalar values) and all ranges are half-open.
//!
//! [`RopeBuffer`] is the default implementation, backed by [`ropey::Rope`],
//! which indexes by character natively and gives O(log n) line access.

use ropey::Rope;

/// Storage capability consumed by the document coordinator.
///
/// Contract: offsets and line numbers passed to these methods must be valid
/// for the current content; implementations are free to panic on
/// out-of-bounds arguments (the coordinator validates caller input before it
/// gets here).
pub trait TextBuffer {
    /// Length of the buffer in characters.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer contains no text.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character at the given offset.
    fn char_at(&self, offset: usize) -> char;

    /// The complete buffer content.
    fn text(&self) -> String;

    /// The `length` characters starting at `offset`.
    fn text_part(&self, offset: usize, length: usize) -> String;

    /// Number of lines. An empty buffer has one (empty) line.
    fn line_count(&self) -> usize;

    /// The given line including its trailing newline (if any).
    fn line(&self, line: usize) -> String;

    /// The given line without its trailing newline.
    fn line_without_newline(&self, line: usize) -> String;

    /// Length of the given line in characters, including its trailing
    /// newline (if any).
    fn line_length(&self, line: usize) -> usize;

    /// Character offset of the first character of the given line.
    ///
    /// A line number at or past the line count yields the buffer length.
    fn offset_from_line(&self, line: usize) -> usize;

    /// The line containing the given offset. An offset at the buffer end
    /// yields the last line.
    fn line_from_offset(&self, offset: usize) -> usize;

    /// The column of `offset` within `line`. The offset must lie on the
    /// given line.
    fn column_from_offset_and_line(&self, offset: usize, line: usize) -> usize;

    /// Character offset of the given line/column position. The column is
    /// clamped to the line length.
    fn offset_from_line_and_column(&self, line: usize, column: usize) -> usize;

    /// Replaces `length` characters at `offset` with `text` and returns the
    /// replaced text.
    fn apply_replace(&mut self, offset: usize, length: usize, text: &str) -> String;

    /// Enters raw append mode: content is streamed straight onto the end of
    /// the buffer with no per-edit bookkeeping.
    fn raw_append_begin(&mut self);

    /// Appends text at the buffer end. Only valid in raw append mode.
    fn raw_append(&mut self, text: &str);

    /// Leaves raw append mode.
    fn raw_append_end(&mut self);
}

/// Default [`TextBuffer`] backed by a [`ropey::Rope`].
#[derive(Debug, Clone)]
pub struct RopeBuffer {
    rope: Rope,
    raw_appending: bool,
}

impl RopeBuffer {
    /// Creates a buffer holding the given text.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            raw_appending: false,
        }
    }

    /// Creates an empty buffer.
    pub fn empty() -> Self {
        Self::new("")
    }
}

impl TextBuffer for RopeBuffer {
    fn len(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: usize) -> char {
        self.rope.char(offset)
    }

    fn text(&self) -> String {
        self.rope.to_string()
    }

    fn text_part(&self, offset: usize, length: usize) -> String {
        self.rope.slice(offset..offset + length).to_string()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line(&self, line: usize) -> String {
        self.rope.line(line).to_string()
    }

    fn line_without_newline(&self, line: usize) -> String {
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        if text.ends_with('\r') {
            text.pop();
        }
        text
    }

    fn line_length(&self, line: usize) -> usize {
        self.rope.line(line).len_chars()
    }

    fn offset_from_line(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        self.rope.line_to_char(line)
    }

    fn line_from_offset(&self, offset: usize) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    fn column_from_offset_and_line(&self, offset: usize, line: usize) -> usize {
        offset - self.rope.line_to_char(line)
    }

    fn offset_from_line_and_column(&self, line: usize, column: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(line);
        let line_len = if line + 1 < self.rope.len_lines() {
            // -1 for the newline separating the lines.
            self.rope.line_to_char(line + 1) - line_start - 1
        } else {
            self.rope.len_chars() - line_start
        };
        line_start + column.min(line_len)
    }

    fn apply_replace(&mut self, offset: usize, length: usize, text: &str) -> String {
        debug_assert!(
            !self.raw_appending,
            "apply_replace called while raw append mode is active"
        );
        let old = self.rope.slice(offset..offset + length).to_string();
        self.rope.remove(offset..offset + length);
        self.rope.insert(offset, text);
        old
    }

    fn raw_append_begin(&mut self) {
        self.raw_appending = true;
    }

    fn raw_append(&mut self, text: &str) {
        debug_assert!(self.raw_appending, "raw_append called outside raw append mode");
        self.rope.insert(self.rope.len_chars(), text);
    }

    fn raw_append_end(&mut self) {
        self.raw_appending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buffer = RopeBuffer::new("Hello, World!");
        assert_eq!(buffer.text(), "Hello, World!");
        assert_eq!(buffer.len(), 13);
        assert_eq!(buffer.char_at(7), 'W');
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = RopeBuffer::empty();
        assert!(buffer.is_empty());
        assert_eq!(buffer.line_count(), 1);
    }

    #[test]
    fn test_apply_replace_returns_old_text() {
        let mut buffer = RopeBuffer::new("Hello, World!");
        let old = buffer.apply_replace(7, 5, "Rust");
        assert_eq!(old, "World");
        assert_eq!(buffer.text(), "Hello, Rust!");
    }

    #[test]
    fn test_apply_replace_insert_and_delete() {
        let mut buffer = RopeBuffer::new("abc");
        assert_eq!(buffer.apply_replace(1, 0, "xy"), "");
        assert_eq!(buffer.text(), "axybc");
        assert_eq!(buffer.apply_replace(0, 3, ""), "axy");
        assert_eq!(buffer.text(), "bc");
    }

    #[test]
    fn test_line_access() {
        let buffer = RopeBuffer::new("one\ntwo\nthree");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line(0), "one\n");
        assert_eq!(buffer.line_without_newline(0), "one");
        assert_eq!(buffer.line_without_newline(2), "three");
        assert_eq!(buffer.line_length(0), 4);
        assert_eq!(buffer.line_length(2), 5);
    }

    #[test]
    fn test_offset_line_conversions() {
        let buffer = RopeBuffer::new("ABC\nDEF\nGHI");
        assert_eq!(buffer.offset_from_line(0), 0);
        assert_eq!(buffer.offset_from_line(1), 4);
        assert_eq!(buffer.offset_from_line(2), 8);
        assert_eq!(buffer.offset_from_line(9), 11);

        assert_eq!(buffer.line_from_offset(0), 0);
        assert_eq!(buffer.line_from_offset(5), 1);
        assert_eq!(buffer.line_from_offset(11), 2);

        assert_eq!(buffer.column_from_offset_and_line(5, 1), 1);
        assert_eq!(buffer.offset_from_line_and_column(1, 2), 6);
        // Column clamps to the line length.
        assert_eq!(buffer.offset_from_line_and_column(0, 99), 3);
    }

    #[test]
    fn test_text_part_utf8() {
        let buffer = RopeBuffer::new("héllo wörld");
        assert_eq!(buffer.text_part(0, 5), "héllo");
        assert_eq!(buffer.text_part(6, 5), "wörld");
    }

    #[test]
    fn test_raw_append() {
        let mut buffer = RopeBuffer::new("start");
        buffer.raw_append_begin();
        buffer.raw_append(" middle");
        buffer.raw_append(" end");
        buffer.raw_append_end();
        assert_eq!(buffer.text(), "start middle end");
    }
}
