//! Error types for editing session operations.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::FieldId;

/// Errors that can occur while driving an editing session.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    /// An editing operation arrived while no session is open.
    #[error("no editing session is open")]
    #[diagnostic(code(mathweave::session::not_open))]
    NotOpen,

    /// The line id does not belong to the current session.
    #[error("unknown line {0}")]
    #[diagnostic(code(mathweave::session::unknown_field))]
    UnknownField(FieldId),

    /// No matrix with that id or label is registered.
    #[error("unknown matrix {0}")]
    #[diagnostic(code(mathweave::session::unknown_matrix))]
    UnknownMatrix(String),

    /// Matrix commit or cell edit without an open matrix sub-editor.
    #[error("no matrix draft is open")]
    #[diagnostic(code(mathweave::session::no_matrix_draft))]
    NoMatrixDraft,

    /// A reorder request was not a permutation of the current lines.
    #[error("line order does not match the current lines")]
    #[diagnostic(
        code(mathweave::session::bad_order),
        help("pass every current line id exactly once")
    )]
    BadOrder,

    /// The editor side of the bridge is gone.
    #[error("math editor is not running")]
    #[diagnostic(code(mathweave::session::editor_gone))]
    EditorGone,

    /// The host dropped its end of the save channel before the reply.
    #[error("host is no longer waiting for this edit")]
    #[diagnostic(code(mathweave::session::host_gone))]
    HostGone,
}

impl From<SessionError> for mathweave_common::MathweaveError {
    fn from(e: SessionError) -> Self {
        mathweave_common::MathweaveError::Session(e.to_string())
    }
}
