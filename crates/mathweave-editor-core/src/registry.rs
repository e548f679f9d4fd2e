//! Which line receives session-level undo, redo and matrix insertion.

use crate::types::FieldId;

/// Points at the most recently focused line, if any.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveFieldRegistry {
    active: Option<FieldId>,
}

impl ActiveFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` active. The last call wins.
    pub fn set_active(&mut self, id: FieldId) {
        if self.active != Some(id) {
            tracing::trace!(target: "mathweave::session", field = %id, "active field");
        }
        self.active = Some(id);
    }

    pub fn active(&self) -> Option<FieldId> {
        self.active
    }

    pub fn is_active(&self, id: FieldId) -> bool {
        self.active == Some(id)
    }

    /// Clear the pointer if it refers to `id`. Returns whether it did.
    pub fn release(&mut self, id: FieldId) -> bool {
        if self.active == Some(id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }
}
