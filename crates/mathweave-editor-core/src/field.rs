//! One editable math line and its undo history.
//!
//! A [`MathField`] owns its text, caret and snapshot history. Edits go
//! through a [`FieldEditor`], which pairs the field with the [`LineSink`]
//! every change is reported to. Keeping the sink out of the field means the
//! line map stays owned by the session while each field still keeps its own
//! history.

use std::ops::Range;

use web_time::Instant;

use crate::text::{FieldRope, TextBuffer};
use crate::types::FieldId;
use crate::undo::{HistoryConfig, SnapshotHistory, UndoManager};

/// Receives the latest value of a field after every change.
pub trait LineSink {
    /// Record `value` for `id`. Returns whether the stored value changed.
    fn set_line(&mut self, id: FieldId, value: &str) -> bool;
}

impl LineSink for () {
    fn set_line(&mut self, _id: FieldId, _value: &str) -> bool {
        false
    }
}

/// What a single edit did to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    /// Char offset where the edit happened.
    pub at: usize,
    pub inserted_len: usize,
    pub deleted_len: usize,
    pub len_after: usize,
    /// Whether a history snapshot was taken for this edit.
    pub recorded: bool,
}

/// An editable math line.
#[derive(Debug, Clone)]
pub struct MathField {
    id: FieldId,
    buffer: FieldRope,
    caret: usize,
    history: SnapshotHistory,
    /// Set while an undo/redo result is written back.
    restoring: bool,
    attached: bool,
}

impl MathField {
    /// Empty field with no history yet. Call [`seed`](Self::seed) before use.
    pub fn new(id: FieldId, history: HistoryConfig) -> Self {
        Self {
            id,
            buffer: FieldRope::new(),
            caret: 0,
            history: SnapshotHistory::new(history),
            restoring: false,
            attached: false,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn value(&self) -> String {
        self.buffer.to_string()
    }

    pub fn buffer(&self) -> &FieldRope {
        &self.buffer
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Move the caret, clamped to the content.
    pub fn set_caret(&mut self, offset: usize) {
        self.caret = offset.min(self.buffer.len_chars());
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Write the initial value, report it, and take a forced snapshot.
    ///
    /// Seeding again (for example when the last line is cleared instead of
    /// removed) keeps earlier history and appends the new baseline.
    pub fn seed(&mut self, initial: &str, lines: &mut impl LineSink) {
        self.buffer.set_content(initial);
        self.caret = self.buffer.len_chars();
        lines.set_line(self.id, initial);
        self.history.push_snapshot(initial, true);
    }

    /// Pair this field with the sink its changes are reported to.
    pub fn bind<'a, S: LineSink>(&'a mut self, lines: &'a mut S) -> FieldEditor<'a, S> {
        FieldEditor {
            field: self,
            lines,
            now: None,
        }
    }
}

/// A field bound to its line sink for the duration of an edit.
pub struct FieldEditor<'a, S: LineSink> {
    field: &'a mut MathField,
    lines: &'a mut S,
    now: Option<Instant>,
}

impl<'a, S: LineSink> FieldEditor<'a, S> {
    /// Use `now` instead of the wall clock for debounce decisions.
    pub fn at(mut self, now: Instant) -> Self {
        self.now = Some(now);
        self
    }

    pub fn field(&self) -> &MathField {
        self.field
    }

    /// Replace the whole value, as if the user retyped it.
    pub fn set_value(&mut self, value: &str) -> FieldEdit {
        let deleted_len = self.field.buffer.len_chars();
        self.field.buffer.set_content(value);
        let inserted_len = self.field.buffer.len_chars();
        self.field.caret = inserted_len;
        self.finish(0, inserted_len, deleted_len)
    }

    /// Insert `text` at the caret and move the caret past it.
    pub fn write(&mut self, text: &str) -> FieldEdit {
        let at = self.field.caret;
        self.insert(at, text)
    }

    /// Insert `text` at a char offset. Offsets past the end append.
    pub fn insert(&mut self, offset: usize, text: &str) -> FieldEdit {
        let at = offset.min(self.field.buffer.len_chars());
        self.field.buffer.insert(at, text);
        let inserted_len = text.chars().count();
        self.field.caret = at + inserted_len;
        self.finish(at, inserted_len, 0)
    }

    /// Delete a char range. The range is clipped to the content.
    pub fn delete(&mut self, range: Range<usize>) -> FieldEdit {
        let len = self.field.buffer.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.field.buffer.delete(start..end);
        self.field.caret = start;
        self.finish(start, 0, end - start)
    }

    /// Replace a char range with `text`.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> FieldEdit {
        let len = self.field.buffer.len_chars();
        let end = range.end.min(len);
        let start = range.start.min(end);
        self.field.buffer.replace(start..end, text);
        let inserted_len = text.chars().count();
        self.field.caret = start + inserted_len;
        self.finish(start, inserted_len, end - start)
    }

    /// Delete the char before the caret.
    pub fn backspace(&mut self) -> Option<FieldEdit> {
        let caret = self.field.caret;
        if caret == 0 {
            return None;
        }
        Some(self.delete(caret - 1..caret))
    }

    /// Change notification: report the value and, unless a history step is
    /// being written back, offer it to the history.
    fn finish(&mut self, at: usize, inserted_len: usize, deleted_len: usize) -> FieldEdit {
        let value = self.field.buffer.to_string();
        self.lines.set_line(self.field.id, &value);
        let recorded = if self.field.restoring {
            false
        } else {
            let now = self.now.unwrap_or_else(Instant::now);
            self.field.history.push_snapshot_at(&value, false, now)
        };
        FieldEdit {
            at,
            inserted_len,
            deleted_len,
            len_after: self.field.buffer.len_chars(),
            recorded,
        }
    }

    fn restore(&mut self, value: String) {
        self.field.restoring = true;
        self.set_value(&value);
        self.field.restoring = false;
        tracing::trace!(target: "mathweave::history", field = %self.field.id, "restored snapshot");
    }
}

impl<S: LineSink> UndoManager for FieldEditor<'_, S> {
    fn can_undo(&self) -> bool {
        self.field.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.field.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        match self.field.history.undo().map(str::to_owned) {
            Some(value) => {
                self.restore(value);
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.field.history.redo().map(str::to_owned) {
            Some(value) => {
                self.restore(value);
                true
            }
            None => false,
        }
    }

    fn clear_history(&mut self) {
        self.field.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    struct Recorder(HashMap<FieldId, String>, usize);

    impl LineSink for Recorder {
        fn set_line(&mut self, id: FieldId, value: &str) -> bool {
            self.1 += 1;
            self.0.insert(id, value.to_owned()).as_deref() != Some(value)
        }
    }

    const STEP: Duration = Duration::from_millis(300);

    fn seeded(value: &str, lines: &mut Recorder) -> MathField {
        let mut field = MathField::new(FieldId::new(0), HistoryConfig::default());
        field.seed(value, lines);
        field
    }

    #[test]
    fn test_seed_reports_and_snapshots() {
        let mut lines = Recorder::default();
        let field = seeded("x=1", &mut lines);
        assert_eq!(lines.0[&field.id()], "x=1");
        assert_eq!(field.history().entries(), &["x=1".to_string()]);
        assert_eq!(field.caret(), 3);
    }

    #[test]
    fn test_insert_moves_caret_and_reports() {
        let mut lines = Recorder::default();
        let mut field = seeded("a+b", &mut lines);
        field.set_caret(1);
        let edit = field.bind(&mut lines).at(Instant::now() + STEP).write("^2");
        assert_eq!(edit.at, 1);
        assert_eq!(edit.inserted_len, 2);
        assert!(edit.recorded);
        assert_eq!(field.value(), "a^2+b");
        assert_eq!(field.caret(), 3);
        assert_eq!(lines.0[&field.id()], "a^2+b");
    }

    #[test]
    fn test_undo_restores_without_pushing() {
        let mut lines = Recorder::default();
        let mut field = seeded("", &mut lines);
        let t0 = Instant::now();
        field.bind(&mut lines).at(t0 + STEP).set_value("a");
        field.bind(&mut lines).at(t0 + STEP * 2).set_value("ab");
        assert_eq!(field.history().len(), 3);

        let mut editor = field.bind(&mut lines).at(t0 + STEP * 3);
        assert!(editor.undo());
        assert_eq!(field.value(), "a");
        assert_eq!(lines.0[&field.id()], "a");
        // write-back must not add an entry or drop the redo branch
        assert_eq!(field.history().len(), 3);
        assert!(field.history().can_redo());

        assert!(field.bind(&mut lines).redo());
        assert_eq!(field.value(), "ab");
        assert!(!field.bind(&mut lines).redo());
    }

    #[test]
    fn test_fast_typing_collapses_into_one_step() {
        let mut lines = Recorder::default();
        let mut field = seeded("", &mut lines);
        let t0 = Instant::now();
        field.bind(&mut lines).at(t0 + STEP).write("a");
        for (i, c) in ["b", "c", "d"].into_iter().enumerate() {
            let now = t0 + STEP + Duration::from_millis(50 * (i as u64 + 1));
            let edit = field.bind(&mut lines).at(now).write(c);
            assert!(!edit.recorded);
        }
        assert_eq!(field.value(), "abcd");
        // every keystroke still reaches the line map
        assert_eq!(lines.0[&field.id()], "abcd");
        assert_eq!(field.history().entries(), &["", "a"].map(String::from));
    }

    #[test]
    fn test_backspace_and_clipped_delete() {
        let mut lines = Recorder::default();
        let mut field = seeded("abc", &mut lines);
        let edit = field.bind(&mut lines).backspace().unwrap();
        assert_eq!(edit.deleted_len, 1);
        assert_eq!(field.value(), "ab");

        field.bind(&mut lines).delete(1..40);
        assert_eq!(field.value(), "a");
        assert_eq!(field.caret(), 1);

        field.set_caret(0);
        assert!(field.bind(&mut lines).backspace().is_none());
    }

    #[test]
    fn test_reseed_appends_baseline() {
        let mut lines = Recorder::default();
        let mut field = seeded("x", &mut lines);
        field.seed("", &mut lines);
        assert_eq!(field.value(), "");
        assert_eq!(field.history().entries(), &["x", ""].map(String::from));
        assert!(field.bind(&mut ()).undo());
        assert_eq!(field.value(), "x");
    }
}
