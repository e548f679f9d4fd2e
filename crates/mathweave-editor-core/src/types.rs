//! Core identifiers and the matrix record shape shared with the host document.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Upper bound for matrix rows and columns unless configured otherwise.
pub const MAX_MATRIX_DIM: usize = 10;

/// Stable identifier of one editable line. Assigned at creation, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u64);

impl FieldId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line-{}", self.0)
    }
}

/// Hands out [`FieldId`]s in creation order.
#[derive(Debug, Default)]
pub(crate) struct FieldIdAllocator {
    next: u64,
}

impl FieldIdAllocator {
    pub(crate) fn next(&mut self) -> FieldId {
        let id = FieldId::new(self.next);
        self.next += 1;
        id
    }
}

/// Stable matrix identifier, independent of the display label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixId(SmolStr);

impl MatrixId {
    /// Fresh random id.
    pub fn generate() -> Self {
        Self(SmolStr::new(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MatrixId {
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl fmt::Display for MatrixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named grid of cell strings, as persisted in the host's matrices map.
///
/// `cells` is row-major and always exactly `rows` × `cols`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub id: MatrixId,
    /// Display token such as `M1`; unique within a session.
    pub label: SmolStr,
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<Vec<String>>,
}

impl MatrixRecord {
    /// Empty record of the given size. Dimensions are clamped to `[1, max_dim]`.
    pub fn empty(id: MatrixId, label: impl Into<SmolStr>, rows: usize, cols: usize, max_dim: usize) -> Self {
        let rows = clamp_dim(rows, max_dim);
        let cols = clamp_dim(cols, max_dim);
        Self {
            id,
            label: label.into(),
            rows,
            cols,
            cells: resize_cells(rows, cols, &[]),
        }
    }

    /// Re-derive the grid for new dimensions, keeping overlapping cells.
    pub fn resize(&mut self, rows: usize, cols: usize, max_dim: usize) {
        self.rows = clamp_dim(rows, max_dim);
        self.cols = clamp_dim(cols, max_dim);
        self.cells = resize_cells(self.rows, self.cols, &self.cells);
    }

    /// Numeric suffix of the label (`M12` → 12), or 0 if it has none.
    pub fn label_index(&self) -> u64 {
        label_index(&self.label)
    }

    /// Enforce the rectangular invariant on a record that came from outside
    /// (persisted attributes may carry ragged rows or stale dimensions).
    pub fn normalized(mut self, max_dim: usize) -> Self {
        self.resize(self.rows, self.cols, max_dim);
        self
    }
}

/// Numeric suffix of a label of the form `M<digits>`. Labels without one,
/// or with a suffix past `u64::MAX`, give 0.
pub fn label_index(label: &str) -> u64 {
    label
        .strip_prefix('M')
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Label for the n-th matrix of a session.
pub fn label_for_index(index: u64) -> SmolStr {
    smol_str::format_smolstr!("M{index}")
}

/// Clamp a requested dimension into `[1, max_dim]`.
pub fn clamp_dim(n: usize, max_dim: usize) -> usize {
    n.clamp(1, max_dim.max(1))
}

/// Build a `rows` × `cols` grid, copying cells that exist in `existing` at the
/// same row/column and filling the rest with empty strings.
pub fn resize_cells(rows: usize, cols: usize, existing: &[Vec<String>]) -> Vec<Vec<String>> {
    (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| {
                    existing
                        .get(r)
                        .and_then(|row| row.get(c))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

/// Whether a math node sits in a block of its own or inline within text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathMode {
    Inline,
    #[default]
    Block,
}
