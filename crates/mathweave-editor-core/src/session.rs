//! Editing session for one math node.
//!
//! A session is seeded from a node's stored LaTeX and matrices, lets the user
//! edit it line by line, and produces a [`SavePayload`] on save. Nothing in
//! here writes to the host node; the payload is handed back through the
//! bridge (see [`crate::bridge`]).

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use mathweave_common::EditorConfig;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::SessionError;
use crate::field::{FieldEditor, MathField};
use crate::lines::{LineMap, LineStore, Removal, join_lines, split_lines};
use crate::matrix::{InsertTarget, MatrixDraft, MatrixMap, MatrixRegistry};
use crate::placeholder::{bmatrix, placeholder_token, resolve_for_display, used_labels};
use crate::registry::ActiveFieldRegistry;
use crate::types::{FieldId, MatrixId, MatrixRecord, label_index};
use crate::undo::{HistoryConfig, UndoManager};

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a [`MathSession`].
///
/// `Seeding`, `Saving` and `Cancelling` are passed through inside a single
/// call; callers only ever observe `Editing` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Seeding,
    Editing,
    Saving,
    Cancelling,
}

impl SessionState {
    /// Returns true if edits are accepted.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Seeding | Self::Editing)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Seeding => "seeding",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Cancelling => "cancelling",
        }
    }
}

/// What a session hands back to the host on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    pub latex: String,
    pub matrices: MatrixMap,
}

/// Ticket for an asynchronous field engine load.
///
/// Only valid for the session and field it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMount {
    epoch: u64,
    field: FieldId,
}

impl FieldMount {
    pub fn field(&self) -> FieldId {
        self.field
    }
}

/// One row of the matrix sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixPreview {
    pub id: MatrixId,
    pub label: SmolStr,
    pub rows: usize,
    pub cols: usize,
    /// Bracketed-matrix LaTeX of the cells.
    pub latex: String,
}

/// State of an open editor for one math node.
#[derive(Debug)]
pub struct MathSession {
    config: EditorConfig,
    state: SessionState,
    epoch: u64,
    store: LineStore,
    lines: LineMap,
    /// Order last reported by the store.
    line_order: Vec<FieldId>,
    matrices: MatrixRegistry,
    active: ActiveFieldRegistry,
    used: BTreeSet<SmolStr>,
    draft: Option<MatrixDraft>,
}

impl MathSession {
    /// Open a session over a node's stored value.
    pub fn open(config: &EditorConfig, latex: &str, matrices: MatrixMap) -> Self {
        let mut session = Self {
            config: config.clone(),
            state: SessionState::Seeding,
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            store: LineStore::new(HistoryConfig::from(config)),
            lines: LineMap::new(),
            line_order: Vec::new(),
            matrices: MatrixRegistry::new(config.max_matrix_dim),
            active: ActiveFieldRegistry::new(),
            used: BTreeSet::new(),
            draft: None,
        };

        let values = split_lines(latex);
        session.store.seed(&values, &mut session.lines);
        session.matrices.seed(matrices);
        session.report_order();
        session.refresh_used();
        session.state = SessionState::Editing;

        tracing::info!(
            target: "mathweave::session",
            epoch = session.epoch,
            lines = session.line_order.len(),
            matrices = session.matrices.len(),
            "session opened"
        );
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(SessionError::NotOpen)
        }
    }

    // === Lines ===

    pub fn lines(&self) -> &LineMap {
        &self.lines
    }

    /// Line ids in display order.
    pub fn line_order(&self) -> &[FieldId] {
        &self.line_order
    }

    /// Current line values in display order.
    pub fn line_values(&self) -> Vec<&str> {
        self.lines.ordered(&self.line_order).collect()
    }

    pub fn field(&self, id: FieldId) -> Option<&MathField> {
        self.store.field(id)
    }

    fn report_order(&mut self) {
        if self.line_order != self.store.order() {
            self.line_order = self.store.order().to_vec();
            tracing::trace!(target: "mathweave::session", order = ?self.line_order, "line order");
        }
    }

    fn refresh_used(&mut self) {
        self.used = used_labels(self.lines.values());
    }

    /// Append a line.
    pub fn add_line(&mut self, initial: &str) -> Result<FieldId, SessionError> {
        self.ensure_open()?;
        let id = self.store.add_line(initial, &mut self.lines);
        self.report_order();
        self.refresh_used();
        Ok(id)
    }

    /// Insert a line directly below `after`.
    pub fn insert_line_after(&mut self, after: FieldId, initial: &str) -> Result<FieldId, SessionError> {
        self.ensure_open()?;
        let id = self.store.insert_after(after, initial, &mut self.lines)?;
        self.report_order();
        self.refresh_used();
        Ok(id)
    }

    /// Remove a line. The only remaining line is cleared instead.
    pub fn remove_line(&mut self, id: FieldId) -> Result<Removal, SessionError> {
        self.ensure_open()?;
        let removal = self.store.remove_line(id, &mut self.lines)?;
        if removal == Removal::Removed {
            // teardown wins over a stale active pointer
            self.active.release(id);
            if let Some(draft) = self.draft.as_mut()
                && draft.target().is_some_and(|t| t.field == id)
            {
                draft.forget_target();
            }
        }
        self.report_order();
        self.refresh_used();
        Ok(removal)
    }

    pub fn move_line(&mut self, id: FieldId, index: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.store.move_line(id, index)?;
        self.report_order();
        Ok(())
    }

    pub fn reorder(&mut self, order: Vec<FieldId>) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.store.reorder(order)?;
        self.report_order();
        Ok(())
    }

    // === Field editing ===

    /// Run an edit against one field. The line map and used labels are
    /// updated afterwards.
    pub fn edit_field<R>(
        &mut self,
        id: FieldId,
        edit: impl FnOnce(&mut FieldEditor<'_, LineMap>) -> R,
    ) -> Result<R, SessionError> {
        self.ensure_open()?;
        let field = self.store.field_mut(id).ok_or(SessionError::UnknownField(id))?;
        let mut editor = field.bind(&mut self.lines);
        let out = edit(&mut editor);
        self.refresh_used();
        Ok(out)
    }

    /// Replace a line's value.
    pub fn set_line(&mut self, id: FieldId, value: &str) -> Result<(), SessionError> {
        self.edit_field(id, |f| {
            f.set_value(value);
        })
    }

    pub fn set_caret(&mut self, id: FieldId, offset: usize) -> Result<(), SessionError> {
        self.ensure_open()?;
        let field = self.store.field_mut(id).ok_or(SessionError::UnknownField(id))?;
        field.set_caret(offset);
        Ok(())
    }

    /// Focus-in or pointer-down on a field.
    pub fn focus(&mut self, id: FieldId) -> Result<(), SessionError> {
        self.ensure_open()?;
        if !self.store.contains(id) {
            return Err(SessionError::UnknownField(id));
        }
        self.active.set_active(id);
        Ok(())
    }

    pub fn active_field(&self) -> Option<FieldId> {
        self.active.active()
    }

    /// Write `text` at the active field's caret. No-op without an active field.
    pub fn write_to_active(&mut self, text: &str) -> Result<bool, SessionError> {
        let Some(id) = self.active.active() else {
            return Ok(false);
        };
        self.edit_field(id, |f| {
            f.write(text);
        })?;
        Ok(true)
    }

    /// Undo on the active field. No-op without one.
    pub fn undo(&mut self) -> bool {
        match self.active.active() {
            Some(id) => self.edit_field(id, |f| f.undo()).unwrap_or(false),
            None => false,
        }
    }

    /// Redo on the active field. No-op without one.
    pub fn redo(&mut self) -> bool {
        match self.active.active() {
            Some(id) => self.edit_field(id, |f| f.redo()).unwrap_or(false),
            None => false,
        }
    }

    // === Async engine load ===

    /// Issue a ticket for loading the engine of `id`.
    pub fn mount_field(&self, id: FieldId) -> Result<FieldMount, SessionError> {
        self.ensure_open()?;
        if !self.store.contains(id) {
            return Err(SessionError::UnknownField(id));
        }
        Ok(FieldMount {
            epoch: self.epoch,
            field: id,
        })
    }

    /// Complete an engine load. Stale tickets (other session, removed field,
    /// closed session) are discarded. Returns whether the load was applied.
    pub fn attach_engine(&mut self, mount: FieldMount) -> bool {
        let live = self.state.is_open() && mount.epoch == self.epoch;
        match self.store.field_mut(mount.field) {
            Some(field) if live => {
                field.set_attached(true);
                self.active.set_active(mount.field);
                true
            }
            _ => {
                tracing::debug!(
                    target: "mathweave::session",
                    field = %mount.field,
                    "discarding stale engine load"
                );
                false
            }
        }
    }

    // === Matrices ===

    pub fn matrices(&self) -> &MatrixRegistry {
        &self.matrices
    }

    /// Labels referenced by any current line.
    pub fn used_labels(&self) -> &BTreeSet<SmolStr> {
        &self.used
    }

    /// Register an empty matrix under the next label.
    pub fn insert_matrix(&mut self, rows: usize, cols: usize) -> Result<MatrixRecord, SessionError> {
        self.ensure_open()?;
        Ok(self.matrices.insert(rows, cols).clone())
    }

    /// Replace an existing matrix's shape and cells.
    pub fn edit_matrix(
        &mut self,
        id: &MatrixId,
        rows: usize,
        cols: usize,
        cells: &[Vec<String>],
    ) -> Result<MatrixRecord, SessionError> {
        self.ensure_open()?;
        Ok(self.matrices.edit(id, rows, cols, cells)?.clone())
    }

    /// Write the token for `label` at `target`, or at the active field's
    /// caret when no target is given. Returns false when there is nowhere to
    /// write.
    pub fn commit_insertion(&mut self, label: &str, target: Option<InsertTarget>) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let target = match target {
            Some(t) => Some(t),
            None => self.active.active().and_then(|id| {
                self.store.field(id).map(|f| InsertTarget {
                    field: id,
                    caret: f.caret(),
                })
            }),
        };
        let Some(target) = target.filter(|t| self.store.contains(t.field)) else {
            tracing::debug!(target: "mathweave::matrix", label, "no field to receive matrix token");
            return Ok(false);
        };
        let token = placeholder_token(label);
        self.edit_field(target.field, |f| {
            f.insert(target.caret, &token);
        })?;
        self.active.set_active(target.field);
        Ok(true)
    }

    /// Open the matrix sub-editor for a new matrix, remembering where the
    /// active field's caret is.
    pub fn start_insert_matrix(&mut self, preset: Option<(usize, usize)>) -> Result<&MatrixDraft, SessionError> {
        self.ensure_open()?;
        let (rows, cols) =
            preset.unwrap_or((self.config.default_matrix_rows, self.config.default_matrix_cols));
        let target = self.active.active().and_then(|id| {
            self.store.field(id).map(|f| InsertTarget {
                field: id,
                caret: f.caret(),
            })
        });
        let max_dim = self.matrices.max_dim();
        Ok(&*self.draft.insert(MatrixDraft::new(rows, cols, max_dim, target)))
    }

    /// Open the matrix sub-editor on an existing matrix. Unknown labels leave
    /// the sub-editor closed.
    pub fn start_edit_matrix(&mut self, label: &str) -> Result<Option<&MatrixDraft>, SessionError> {
        self.ensure_open()?;
        let Some(record) = self.matrices.get_by_label(label) else {
            return Ok(None);
        };
        let draft = MatrixDraft::for_record(record, self.matrices.max_dim());
        Ok(Some(&*self.draft.insert(draft)))
    }

    pub fn draft(&self) -> Option<&MatrixDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut MatrixDraft> {
        self.draft.as_mut()
    }

    /// Commit the sub-editor. A new matrix gets the next label and its token
    /// is written at the remembered caret; an edited one keeps its label and
    /// no token is written.
    pub fn commit_matrix(&mut self) -> Result<MatrixRecord, SessionError> {
        self.ensure_open()?;
        let draft = self.draft.take().ok_or(SessionError::NoMatrixDraft)?;
        match draft.editing() {
            Some(id) => self.edit_matrix(id, draft.rows(), draft.cols(), draft.cells()),
            None => {
                let id = self.matrices.insert(draft.rows(), draft.cols()).id.clone();
                let record = self.edit_matrix(&id, draft.rows(), draft.cols(), draft.cells())?;
                self.commit_insertion(&record.label, draft.target())?;
                Ok(record)
            }
        }
    }

    /// Close the sub-editor without changes.
    pub fn cancel_matrix(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Referenced matrices for the sidebar, in label order.
    pub fn visible_matrices(&self) -> Vec<MatrixPreview> {
        let mut visible: Vec<_> = self
            .matrices
            .records()
            .filter(|rec| self.used.contains(&rec.label))
            .map(|rec| MatrixPreview {
                id: rec.id.clone(),
                label: rec.label.clone(),
                rows: rec.rows,
                cols: rec.cols,
                latex: bmatrix(&rec.cells),
            })
            .collect();
        visible.sort_by(|a, b| {
            label_index(&a.label)
                .cmp(&label_index(&b.label))
                .then_with(|| a.label.cmp(&b.label))
        });
        visible
    }

    /// All lines joined and expanded, as a preview would show them.
    pub fn preview_latex(&self) -> String {
        resolve_for_display(&join_lines(self.line_values()), &self.matrices)
    }

    // === Close ===

    /// Build the payload and close. Matrices no longer referenced by any
    /// line are dropped.
    pub fn save(&mut self) -> Result<SavePayload, SessionError> {
        self.ensure_open()?;
        self.state = SessionState::Saving;
        let values = self.line_values();
        let used = used_labels(values.iter().copied());
        let latex = join_lines(values);
        let matrices = self.matrices.retain_used(&used);
        let pruned = self.matrices.len() - matrices.len();
        tracing::info!(
            target: "mathweave::session",
            epoch = self.epoch,
            kept = matrices.len(),
            pruned,
            "session saved"
        );
        self.close();
        Ok(SavePayload { latex, matrices })
    }

    /// Close without producing a payload.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.state = SessionState::Cancelling;
        tracing::info!(target: "mathweave::session", epoch = self.epoch, "session cancelled");
        self.close();
        Ok(())
    }

    fn close(&mut self) {
        self.store.clear(&mut self.lines);
        self.line_order.clear();
        self.matrices.clear();
        self.active.clear();
        self.used.clear();
        self.draft = None;
        self.state = SessionState::Closed;
    }
}
