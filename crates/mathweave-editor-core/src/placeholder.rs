//! Placeholder tokens (`⟦M1⟧`) and their expansion for display.
//!
//! Lines store matrices as short tokens so the editable text stays small.
//! A token is the label between `⟦` and `⟧`, optionally wrapped as
//! `\text{⟦M1⟧}`. A token preceded by an odd run of backslashes is escaped
//! and left alone.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::matrix::MatrixMap;
use crate::types::MatrixRecord;

pub const TOKEN_OPEN: char = '⟦';
pub const TOKEN_CLOSE: char = '⟧';

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\text\{⟦(?P<wrapped>M\d+)⟧\}|⟦(?P<bare>M\d+)⟧").unwrap()
});

/// Anything that can find a matrix by its label.
pub trait MatrixLookup {
    fn lookup(&self, label: &str) -> Option<&MatrixRecord>;
}

impl MatrixLookup for MatrixMap {
    fn lookup(&self, label: &str) -> Option<&MatrixRecord> {
        self.values().find(|rec| rec.label == label)
    }
}

impl<T: MatrixLookup + ?Sized> MatrixLookup for &T {
    fn lookup(&self, label: &str) -> Option<&MatrixRecord> {
        (**self).lookup(label)
    }
}

/// Token text for a label.
pub fn placeholder_token(label: &str) -> String {
    format!("{TOKEN_OPEN}{label}{TOKEN_CLOSE}")
}

/// One token found in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Byte range of the whole match, wrapper included.
    pub range: Range<usize>,
    pub label: &'a str,
    /// Whether the token was written as `\text{⟦…⟧}`.
    pub wrapped: bool,
}

/// Iterator over the unescaped tokens in a string.
pub struct Placeholders<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Placeholders<'a> {
    type Item = Placeholder<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos <= self.text.len() {
            let caps = PLACEHOLDER_RE.captures_at(self.text, self.pos)?;
            let whole = caps.get(0)?;
            if is_escaped(self.text, whole.start()) {
                // retry one char further so an inner bare token can still match
                let step = self.text[whole.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.pos = whole.start() + step;
                continue;
            }
            self.pos = whole.end();
            let (label, wrapped) = match caps.name("wrapped") {
                Some(m) => (m, true),
                None => (caps.name("bare")?, false),
            };
            return Some(Placeholder {
                range: whole.range(),
                label: &self.text[label.range()],
                wrapped,
            });
        }
        None
    }
}

/// All unescaped tokens in `text`, left to right.
pub fn placeholders(text: &str) -> Placeholders<'_> {
    Placeholders { text, pos: 0 }
}

/// Odd number of backslashes directly before `at`.
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

/// Labels referenced by any of the given line values.
pub fn used_labels<'a>(values: impl IntoIterator<Item = &'a str>) -> BTreeSet<SmolStr> {
    values
        .into_iter()
        .flat_map(placeholders)
        .map(|p| SmolStr::new(p.label))
        .collect()
}

/// LaTeX for a bracketed matrix.
pub fn bmatrix(cells: &[Vec<String>]) -> String {
    let body = cells
        .iter()
        .map(|row| row.join(" & "))
        .collect::<Vec<_>>()
        .join(r" \\ ");
    format!(r"\begin{{bmatrix}}{body}\end{{bmatrix}}")
}

/// Marker shown in place of a token whose matrix is not registered.
pub fn missing_marker(label: &str) -> String {
    format!(r"\text{{[missing {label}]}}")
}

/// Replace every token with its matrix, or a missing marker.
pub fn resolve_for_display(text: &str, matrices: &impl MatrixLookup) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in placeholders(text) {
        out.push_str(&text[last..token.range.start]);
        match matrices.lookup(token.label) {
            Some(rec) => out.push_str(&bmatrix(&rec.cells)),
            None => {
                tracing::debug!(target: "mathweave::render", label = token.label, "missing matrix for token");
                out.push_str(&missing_marker(token.label));
            }
        }
        last = token.range.end;
    }
    out.push_str(&text[last..]);
    out
}
