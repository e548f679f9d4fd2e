//! mathweave-editor-core: framework-free logic for the multi-line math editor.
//!
//! This crate provides:
//! - `MathField` - one editable line with its own snapshot undo history
//! - `LineStore` / `LineMap` - ordered fields and the authoritative line values
//! - `MatrixRegistry` - matrix records addressed by `⟦M<n>⟧` placeholders
//! - `MathSession` - the seed/edit/save lifecycle for one node
//! - `SessionController` + bridge - request/response between nodes and the editor
//! - `MathNode` - document-side block and inline math nodes

pub mod actions;
pub mod bridge;
pub mod controller;
pub mod error;
pub mod execute;
pub mod field;
pub mod lines;
pub mod matrix;
pub mod node;
pub mod placeholder;
pub mod registry;
pub mod render;
pub mod session;
pub mod text;
pub mod types;
pub mod undo;

pub use actions::{
    EditorCommand, Key, KeyCombo, KeydownResult, MATRIX_PRESETS, Modifiers, TOOLBAR,
    ToolbarSection, ToolbarToken, command_for_key, matrix_preset_label, toolbar_command,
};
pub use bridge::{BridgeHandle, EditOutcome, ModalBridge, OpenRequest, PendingEdit, channel};
pub use controller::SessionController;
pub use error::SessionError;
pub use execute::{execute_command, handle_keydown};
pub use field::{FieldEdit, FieldEditor, LineSink, MathField};
pub use lines::{LINE_JOIN, LineMap, LineStore, Removal, join_lines, split_lines};
pub use matrix::{InsertTarget, MatrixDraft, MatrixMap, MatrixRegistry};
pub use node::{Alignment, MathNode, NodeKind};
pub use placeholder::{
    MatrixLookup, Placeholder, placeholder_token, placeholders, resolve_for_display, used_labels,
};
pub use registry::ActiveFieldRegistry;
pub use render::{MathRenderer, PulldownRenderer};
pub use session::{FieldMount, MathSession, MatrixPreview, SavePayload, SessionState};
pub use smol_str::SmolStr;
pub use text::{FieldRope, TextBuffer};
pub use types::{FieldId, MathMode, MatrixId, MatrixRecord};
pub use undo::{HistoryConfig, SnapshotHistory, UndoManager};
