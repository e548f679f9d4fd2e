//! Text buffer abstraction for field storage.
//!
//! The `TextBuffer` trait provides a common interface for text storage,
//! allowing a field to work with backends other than the local rope.

use std::ops::Range;

/// A text buffer that supports efficient editing.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
pub trait TextBuffer {
    /// Total length in chars (Unicode scalar values).
    fn len_chars(&self) -> usize;

    /// Insert text at char offset. Offsets past the end append.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range. The range is clipped to the buffer.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Replace the whole content.
    fn set_content(&mut self, text: &str) {
        self.replace(0..self.len_chars(), text);
    }

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;
}

/// Ropey-backed text buffer for one field.
#[derive(Clone, Default)]
pub struct FieldRope {
    rope: ropey::Rope,
}

impl FieldRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextBuffer for FieldRope {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        let at = char_offset.min(self.rope.len_chars());
        self.rope.insert(at, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let len = self.rope.len_chars();
        let end = char_range.end.min(len);
        let start = char_range.start.min(end);
        if start < end {
            self.rope.remove(start..end);
        }
    }

    fn set_content(&mut self, text: &str) {
        self.rope = ropey::Rope::from_str(text);
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl std::fmt::Debug for FieldRope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FieldRope").field(&self.rope.to_string()).finish()
    }
}
