//! Matrix registry and the matrix sub-editor draft.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use smol_str::SmolStr;

use crate::error::SessionError;
use crate::placeholder::MatrixLookup;
use crate::types::{FieldId, MatrixId, MatrixRecord, clamp_dim, label_for_index, resize_cells};

/// Matrices as persisted on a host node, keyed by id.
pub type MatrixMap = BTreeMap<MatrixId, MatrixRecord>;

/// Matrices known to the open session plus the label index.
#[derive(Debug, Clone)]
pub struct MatrixRegistry {
    records: MatrixMap,
    by_label: HashMap<SmolStr, MatrixId>,
    next_index: u64,
    max_dim: usize,
}

impl MatrixRegistry {
    pub fn new(max_dim: usize) -> Self {
        Self {
            records: MatrixMap::new(),
            by_label: HashMap::new(),
            next_index: 1,
            max_dim,
        }
    }

    /// Replace the contents with a persisted map.
    ///
    /// Records are re-keyed by their own id and normalized to a rectangular
    /// grid. The label counter resumes after the highest `M<n>` seen, or at
    /// 1 when there is none.
    pub fn seed(&mut self, persisted: impl IntoIterator<Item = (MatrixId, MatrixRecord)>) {
        self.clear();
        let mut highest = 0;
        for (_key, record) in persisted {
            let record = record.normalized(self.max_dim);
            highest = highest.max(record.label_index());
            self.by_label.insert(record.label.clone(), record.id.clone());
            self.records.insert(record.id.clone(), record);
        }
        self.next_index = highest.checked_add(1).unwrap_or(1);
        tracing::debug!(
            target: "mathweave::matrix",
            count = self.records.len(),
            next = self.next_index,
            "seeded matrices"
        );
    }

    /// Register a new empty matrix under the next free label.
    pub fn insert(&mut self, rows: usize, cols: usize) -> &MatrixRecord {
        let label = self.allocate_label();
        let id = MatrixId::generate();
        let record = MatrixRecord::empty(id.clone(), label.clone(), rows, cols, self.max_dim);
        tracing::debug!(target: "mathweave::matrix", %label, rows = record.rows, cols = record.cols, "inserted matrix");
        self.by_label.insert(label, id.clone());
        self.records.entry(id).or_insert(record)
    }

    /// Advance the counter past labels already in use. The counter restarts
    /// at 1 after `u64::MAX`.
    fn allocate_label(&mut self) -> SmolStr {
        loop {
            let label = label_for_index(self.next_index);
            self.next_index = self.next_index.checked_add(1).unwrap_or(1);
            if !self.by_label.contains_key(&label) {
                return label;
            }
        }
    }

    /// Update an existing matrix. Its label and id never change.
    pub fn edit(
        &mut self,
        id: &MatrixId,
        rows: usize,
        cols: usize,
        cells: &[Vec<String>],
    ) -> Result<&MatrixRecord, SessionError> {
        let max_dim = self.max_dim;
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownMatrix(id.to_string()))?;
        record.rows = clamp_dim(rows, max_dim);
        record.cols = clamp_dim(cols, max_dim);
        record.cells = resize_cells(record.rows, record.cols, cells);
        Ok(&*record)
    }

    pub fn get(&self, id: &MatrixId) -> Option<&MatrixRecord> {
        self.records.get(id)
    }

    pub fn get_by_label(&self, label: &str) -> Option<&MatrixRecord> {
        self.by_label.get(label).and_then(|id| self.records.get(id))
    }

    /// Label the next inserted matrix will get.
    pub fn next_label(&self) -> SmolStr {
        let mut index = self.next_index;
        loop {
            let label = label_for_index(index);
            if !self.by_label.contains_key(&label) {
                return label;
            }
            index = index.checked_add(1).unwrap_or(1);
        }
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn max_dim(&self) -> usize {
        self.max_dim
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &MatrixRecord> {
        self.records.values()
    }

    /// Records whose label is in `used`, ready to persist.
    pub fn retain_used(&self, used: &BTreeSet<SmolStr>) -> MatrixMap {
        self.records
            .iter()
            .filter(|(_, rec)| used.contains(&rec.label))
            .map(|(id, rec)| (id.clone(), rec.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.by_label.clear();
        self.next_index = 1;
    }
}

impl MatrixLookup for MatrixRegistry {
    fn lookup(&self, label: &str) -> Option<&MatrixRecord> {
        self.get_by_label(label)
    }
}

/// Where a committed new matrix's token goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertTarget {
    pub field: FieldId,
    pub caret: usize,
}

/// Working copy held by the matrix sub-editor until commit or cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixDraft {
    editing: Option<MatrixId>,
    target: Option<InsertTarget>,
    rows: usize,
    cols: usize,
    cells: Vec<Vec<String>>,
    max_dim: usize,
}

impl MatrixDraft {
    /// Draft for a new matrix.
    pub fn new(rows: usize, cols: usize, max_dim: usize, target: Option<InsertTarget>) -> Self {
        let rows = clamp_dim(rows, max_dim);
        let cols = clamp_dim(cols, max_dim);
        Self {
            editing: None,
            target,
            rows,
            cols,
            cells: resize_cells(rows, cols, &[]),
            max_dim,
        }
    }

    /// Draft pre-filled from an existing record.
    pub fn for_record(record: &MatrixRecord, max_dim: usize) -> Self {
        let rows = clamp_dim(record.rows, max_dim);
        let cols = clamp_dim(record.cols, max_dim);
        Self {
            editing: Some(record.id.clone()),
            target: None,
            rows,
            cols,
            cells: resize_cells(rows, cols, &record.cells),
            max_dim,
        }
    }

    /// Id of the matrix being edited, or `None` for a new one.
    pub fn editing(&self) -> Option<&MatrixId> {
        self.editing.as_ref()
    }

    pub fn target(&self) -> Option<InsertTarget> {
        self.target
    }

    /// Drop the insertion target, e.g. when its field is removed.
    pub(crate) fn forget_target(&mut self) {
        self.target = None;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Vec<String>] {
        &self.cells
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.set_size(rows, self.cols);
    }

    pub fn set_cols(&mut self, cols: usize) {
        self.set_size(self.rows, cols);
    }

    /// Resize, keeping cells that still fit.
    pub fn set_size(&mut self, rows: usize, cols: usize) {
        self.rows = clamp_dim(rows, self.max_dim);
        self.cols = clamp_dim(cols, self.max_dim);
        self.cells = resize_cells(self.rows, self.cols, &self.cells);
    }

    /// Set one cell. Returns false when out of range.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value.into();
                true
            }
            None => false,
        }
    }
}
