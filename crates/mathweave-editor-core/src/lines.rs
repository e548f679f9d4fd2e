//! Lines of a session: splitting and joining the stored string, the line map
//! of latest values, and the ordered store of live fields.

use std::collections::HashMap;

use crate::error::SessionError;
use crate::field::{LineSink, MathField};
use crate::types::{FieldId, FieldIdAllocator};
use crate::undo::HistoryConfig;

/// Separator written between lines when a session is saved.
pub const LINE_JOIN: &str = r"\\";

/// Split a stored LaTeX string into editable lines.
///
/// A run of two or more backslashes is a line break. When the run has odd
/// length, one backslash is kept as the first character of the next line.
/// `\n` and `\r\n` also break lines. Empty input yields one empty line.
pub fn split_lines(input: &str) -> Vec<String> {
    if input.is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let mut run = 1;
                while chars.next_if_eq(&'\\').is_some() {
                    run += 1;
                }
                if run == 1 {
                    current.push('\\');
                } else {
                    lines.push(std::mem::take(&mut current));
                    if run % 2 == 1 {
                        current.push('\\');
                    }
                }
            }
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    lines.push(current);
    lines
}

/// Join line values with the LaTeX line break.
pub fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.push_str(LINE_JOIN);
        }
        out.push_str(line.as_ref());
    }
    out
}

/// Latest value of every live line, keyed by line id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    values: HashMap<FieldId, String>,
}

impl LineMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: FieldId) -> Option<&str> {
        self.values.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn remove(&mut self, id: FieldId) -> Option<String> {
        self.values.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.values().map(String::as_str)
    }

    /// Values in `order`. Ids missing from the map contribute an empty line.
    pub fn ordered<'a>(&'a self, order: &'a [FieldId]) -> impl Iterator<Item = &'a str> + 'a {
        order.iter().map(|id| self.get(*id).unwrap_or(""))
    }
}

impl LineSink for LineMap {
    fn set_line(&mut self, id: FieldId, value: &str) -> bool {
        match self.values.get_mut(&id) {
            Some(existing) if existing == value => false,
            Some(existing) => {
                value.clone_into(existing);
                true
            }
            None => {
                self.values.insert(id, value.to_owned());
                true
            }
        }
    }
}

/// What [`LineStore::remove_line`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The line is gone.
    Removed,
    /// It was the only line, so it was cleared instead.
    Cleared,
}

/// Ordered list of live fields.
///
/// Every structural change keeps the store and the [`LineMap`] passed in
/// over the same set of ids.
#[derive(Debug)]
pub struct LineStore {
    order: Vec<FieldId>,
    fields: HashMap<FieldId, MathField>,
    ids: FieldIdAllocator,
    history: HistoryConfig,
}

impl LineStore {
    pub fn new(history: HistoryConfig) -> Self {
        Self {
            order: Vec::new(),
            fields: HashMap::new(),
            ids: FieldIdAllocator::default(),
            history,
        }
    }

    /// Drop every field and create one per value, in order.
    pub fn seed<S: AsRef<str>>(&mut self, values: &[S], lines: &mut LineMap) {
        self.clear(lines);
        for value in values {
            self.add_line(value.as_ref(), lines);
        }
    }

    /// Append a new field seeded with `initial`.
    pub fn add_line(&mut self, initial: &str, lines: &mut LineMap) -> FieldId {
        let id = self.ids.next();
        let mut field = MathField::new(id, self.history);
        field.seed(initial, lines);
        self.order.push(id);
        self.fields.insert(id, field);
        id
    }

    /// Insert a new field right after `after`.
    pub fn insert_after(
        &mut self,
        after: FieldId,
        initial: &str,
        lines: &mut LineMap,
    ) -> Result<FieldId, SessionError> {
        let pos = self.position(after).ok_or(SessionError::UnknownField(after))?;
        let id = self.add_line(initial, lines);
        // add_line appended; move it into place
        self.order.pop();
        self.order.insert(pos + 1, id);
        Ok(id)
    }

    /// Remove a field. The last remaining field is cleared instead.
    pub fn remove_line(&mut self, id: FieldId, lines: &mut LineMap) -> Result<Removal, SessionError> {
        let pos = self.position(id).ok_or(SessionError::UnknownField(id))?;
        if self.order.len() == 1 {
            if let Some(field) = self.fields.get_mut(&id) {
                field.seed("", lines);
            }
            return Ok(Removal::Cleared);
        }
        self.order.remove(pos);
        self.fields.remove(&id);
        lines.remove(id);
        Ok(Removal::Removed)
    }

    /// Move a field to `index` (clamped to the end).
    pub fn move_line(&mut self, id: FieldId, index: usize) -> Result<(), SessionError> {
        let pos = self.position(id).ok_or(SessionError::UnknownField(id))?;
        let id = self.order.remove(pos);
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        Ok(())
    }

    /// Replace the order wholesale. `order` must be a permutation of the
    /// current ids.
    pub fn reorder(&mut self, order: Vec<FieldId>) -> Result<(), SessionError> {
        if order.len() != self.order.len() {
            return Err(SessionError::BadOrder);
        }
        let mut seen = std::collections::HashSet::with_capacity(order.len());
        for id in &order {
            if !self.fields.contains_key(id) || !seen.insert(*id) {
                return Err(SessionError::BadOrder);
            }
        }
        self.order = order;
        Ok(())
    }

    pub fn order(&self) -> &[FieldId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    pub fn position(&self, id: FieldId) -> Option<usize> {
        self.order.iter().position(|x| *x == id)
    }

    pub fn field(&self, id: FieldId) -> Option<&MathField> {
        self.fields.get(&id)
    }

    pub fn field_mut(&mut self, id: FieldId) -> Option<&mut MathField> {
        self.fields.get_mut(&id)
    }

    /// Fields in display order.
    pub fn iter(&self) -> impl Iterator<Item = &MathField> {
        self.order.iter().filter_map(|id| self.fields.get(id))
    }

    pub fn clear(&mut self, lines: &mut LineMap) {
        self.order.clear();
        self.fields.clear();
        lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(s: &str) -> Vec<String> {
        split_lines(s)
    }

    #[test]
    fn split_empty_is_one_empty_line() {
        assert_eq!(split(""), vec![String::new()]);
    }

    #[test]
    fn split_on_double_backslash() {
        assert_eq!(split(r"a=1\\b=2"), vec!["a=1", "b=2"]);
    }

    #[test]
    fn split_odd_run_keeps_one_backslash() {
        assert_eq!(split(r"a\\\alpha"), vec!["a", r"\alpha"]);
    }

    #[test]
    fn split_even_run_of_four() {
        assert_eq!(split(r"a\\\\b"), vec!["a", "b"]);
    }

    #[test]
    fn split_single_backslash_is_content() {
        assert_eq!(split(r"\frac{1}{2}"), vec![r"\frac{1}{2}"]);
    }

    #[test]
    fn split_on_newlines() {
        assert_eq!(split("a\nb\r\nc"), vec!["a", "b", "c"]);
        assert_eq!(split("a\\\\"), vec!["a", ""]);
    }

    #[test]
    fn join_uses_latex_break() {
        assert_eq!(join_lines(["x=1", "y=2", "z=3"]), r"x=1\\y=2\\z=3");
        assert_eq!(join_lines(Vec::<String>::new()), "");
    }

    #[test]
    fn line_map_reports_changes_only() {
        let mut map = LineMap::new();
        let id = FieldId::new(3);
        assert!(map.set_line(id, "a"));
        assert!(!map.set_line(id, "a"));
        assert!(map.set_line(id, "b"));
        assert_eq!(map.get(id), Some("b"));
    }

    #[test]
    fn store_and_map_track_same_ids() {
        let mut map = LineMap::new();
        let mut store = LineStore::new(HistoryConfig::default());
        store.seed(&["a", "b", "c"], &mut map);
        assert_eq!(store.len(), 3);
        assert_eq!(map.len(), 3);

        let b = store.order()[1];
        assert_eq!(store.remove_line(b, &mut map), Ok(Removal::Removed));
        assert_eq!(map.len(), 2);
        assert!(!map.contains(b));
        for id in store.order() {
            assert!(map.contains(*id));
        }
    }

    #[test]
    fn removing_last_line_clears_it() {
        let mut map = LineMap::new();
        let mut store = LineStore::new(HistoryConfig::default());
        store.seed(&["x"], &mut map);
        let only = store.order()[0];
        assert_eq!(store.remove_line(only, &mut map), Ok(Removal::Cleared));
        assert_eq!(store.order(), &[only]);
        assert_eq!(map.get(only), Some(""));
    }

    #[test]
    fn ids_are_not_reused_after_reseed() {
        let mut map = LineMap::new();
        let mut store = LineStore::new(HistoryConfig::default());
        store.seed(&["a"], &mut map);
        let first = store.order()[0];
        store.seed(&["b"], &mut map);
        assert_ne!(store.order()[0], first);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_after_and_move() {
        let mut map = LineMap::new();
        let mut store = LineStore::new(HistoryConfig::default());
        store.seed(&["a", "c"], &mut map);
        let a = store.order()[0];
        let b = store.insert_after(a, "b", &mut map).unwrap();
        assert_eq!(map.ordered(store.order()).collect::<Vec<_>>(), ["a", "b", "c"]);

        store.move_line(b, 99).unwrap();
        assert_eq!(map.ordered(store.order()).collect::<Vec<_>>(), ["a", "c", "b"]);
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let mut map = LineMap::new();
        let mut store = LineStore::new(HistoryConfig::default());
        store.seed(&["a", "b"], &mut map);
        let ids = store.order().to_vec();
        assert_eq!(store.reorder(vec![ids[0], ids[0]]), Err(SessionError::BadOrder));
        assert_eq!(store.reorder(vec![ids[0]]), Err(SessionError::BadOrder));
        store.reorder(vec![ids[1], ids[0]]).unwrap();
        assert_eq!(store.order(), &[ids[1], ids[0]]);
    }
}
