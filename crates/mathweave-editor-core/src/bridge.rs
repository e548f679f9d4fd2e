//! Typed channel between host nodes and the math editor.
//!
//! A node asks for an edit with [`BridgeHandle::request_edit`]. The request
//! carries a one-shot reply sender; the editor answers it on save and drops
//! it on cancel, so the host sees exactly one of "saved with this payload"
//! or "closed without a write".

use smol_str::SmolStr;
use tokio::sync::{mpsc, oneshot};

use crate::error::SessionError;
use crate::matrix::MatrixMap;
use crate::session::SavePayload;
use crate::types::MathMode;

/// A node's request to open the editor on its content.
#[derive(Debug)]
pub struct OpenRequest {
    pub node_id: SmolStr,
    pub mode: MathMode,
    pub latex: String,
    pub matrices: MatrixMap,
    pub(crate) reply: oneshot::Sender<SavePayload>,
}

/// Host-side sender. Cheap to clone; one per document is typical.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<OpenRequest>,
}

/// Editor-side receiver, owned by the [`SessionController`](crate::controller::SessionController).
#[derive(Debug)]
pub struct ModalBridge {
    rx: mpsc::UnboundedReceiver<OpenRequest>,
}

/// Create a connected handle and receiver.
pub fn channel() -> (BridgeHandle, ModalBridge) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BridgeHandle { tx }, ModalBridge { rx })
}

impl BridgeHandle {
    /// Ask the editor to open on a node. The returned [`PendingEdit`]
    /// resolves once the session is saved or closed.
    pub fn request_edit(
        &self,
        node_id: impl Into<SmolStr>,
        mode: MathMode,
        latex: impl Into<String>,
        matrices: MatrixMap,
    ) -> Result<PendingEdit, SessionError> {
        let (reply, rx) = oneshot::channel();
        let node_id = node_id.into();
        let request = OpenRequest {
            node_id: node_id.clone(),
            mode,
            latex: latex.into(),
            matrices,
            reply,
        };
        self.tx.send(request).map_err(|_| SessionError::EditorGone)?;
        tracing::debug!(target: "mathweave::bridge", %node_id, ?mode, "open requested");
        Ok(PendingEdit { node_id, rx })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ModalBridge {
    /// Take the next queued request without waiting.
    pub fn try_next(&mut self) -> Option<OpenRequest> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next request. `None` once every handle is dropped.
    pub async fn next(&mut self) -> Option<OpenRequest> {
        self.rx.recv().await
    }
}

/// How an edit ended, from the host's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The editor has not answered yet.
    Pending,
    /// Write this back to the node.
    Saved(SavePayload),
    /// Closed without saving. The node must not change.
    Cancelled,
}

/// Host-side handle for one outstanding edit.
#[derive(Debug)]
pub struct PendingEdit {
    node_id: SmolStr,
    rx: oneshot::Receiver<SavePayload>,
}

impl PendingEdit {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Check for an answer without waiting.
    pub fn try_outcome(&mut self) -> EditOutcome {
        match self.rx.try_recv() {
            Ok(payload) => EditOutcome::Saved(payload),
            Err(oneshot::error::TryRecvError::Empty) => EditOutcome::Pending,
            Err(oneshot::error::TryRecvError::Closed) => EditOutcome::Cancelled,
        }
    }

    /// Wait for the answer.
    pub async fn outcome(self) -> EditOutcome {
        match self.rx.await {
            Ok(payload) => EditOutcome::Saved(payload),
            Err(_) => EditOutcome::Cancelled,
        }
    }
}
