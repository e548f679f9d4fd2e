//! Editor-side driver that turns bridge requests into sessions.
//!
//! The controller owns at most one [`MathSession`] at a time plus the reply
//! sender of the request that opened it. UI layers call [`poll`](SessionController::poll)
//! on their event loop tick and forward user intent to the session.

use mathweave_common::EditorConfig;
use smol_str::SmolStr;
use tokio::sync::oneshot;

use crate::bridge::{BridgeHandle, ModalBridge, OpenRequest, channel};
use crate::error::SessionError;
use crate::session::{MathSession, SavePayload, SessionState};
use crate::types::MathMode;

/// The node an open session belongs to.
#[derive(Debug)]
struct OpenEdit {
    node_id: SmolStr,
    mode: MathMode,
    reply: oneshot::Sender<SavePayload>,
}

/// Owns the editor end of the bridge and the open session, if any.
#[derive(Debug)]
pub struct SessionController {
    config: EditorConfig,
    bridge: ModalBridge,
    session: Option<MathSession>,
    open: Option<OpenEdit>,
}

impl SessionController {
    /// Controller plus the handle hosts use to reach it.
    pub fn new(config: EditorConfig) -> (Self, BridgeHandle) {
        let (handle, bridge) = channel();
        (Self::with_bridge(config, bridge), handle)
    }

    pub fn with_bridge(config: EditorConfig, bridge: ModalBridge) -> Self {
        Self {
            config,
            bridge,
            session: None,
            open: None,
        }
    }

    /// Drain queued requests. Only the newest one is opened; older ones are
    /// answered as cancelled. Returns whether a session was opened.
    pub fn poll(&mut self) -> bool {
        let mut latest = None;
        while let Some(request) = self.bridge.try_next() {
            if let Some(skipped) = latest.replace(request) {
                tracing::debug!(target: "mathweave::session", node_id = %skipped.node_id, "superseded before opening");
            }
        }
        match latest {
            Some(request) => {
                self.open(request);
                true
            }
            None => false,
        }
    }

    /// Wait for the next request and open it. Returns false once every
    /// bridge handle has been dropped.
    pub async fn next_request(&mut self) -> bool {
        match self.bridge.next().await {
            Some(request) => {
                self.open(request);
                true
            }
            None => false,
        }
    }

    /// Open a session for `request`, cancelling any session already open.
    pub fn open(&mut self, request: OpenRequest) {
        if let Some(previous) = self.open.take() {
            tracing::debug!(
                target: "mathweave::session",
                previous = %previous.node_id,
                next = %request.node_id,
                "replacing open session"
            );
            if let Some(mut session) = self.session.take()
                && let Err(e) = session.cancel()
            {
                tracing::debug!(target: "mathweave::session", error = %e, "previous session already closed");
            }
        }
        let OpenRequest {
            node_id,
            mode,
            latex,
            matrices,
            reply,
        } = request;
        self.session = Some(MathSession::open(&self.config, &latex, matrices));
        self.open = Some(OpenEdit {
            node_id,
            mode,
            reply,
        });
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(MathSession::state)
            .unwrap_or_default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Node id and mode of the open session.
    pub fn editing(&self) -> Option<(&str, MathMode)> {
        self.open.as_ref().map(|o| (o.node_id.as_str(), o.mode))
    }

    pub fn session(&self) -> Option<&MathSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut MathSession> {
        self.session.as_mut()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Save the open session and send the payload to the requesting node.
    pub fn save(&mut self) -> Result<SavePayload, SessionError> {
        let open = self.open.take().ok_or(SessionError::NotOpen)?;
        let mut session = self.session.take().ok_or(SessionError::NotOpen)?;
        let payload = session.save()?;
        if open.reply.send(payload.clone()).is_err() {
            tracing::warn!(target: "mathweave::session", node_id = %open.node_id, "host dropped before save");
            return Err(SessionError::HostGone);
        }
        Ok(payload)
    }

    /// Close the open session without writing anything back.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        let open = self.open.take().ok_or(SessionError::NotOpen)?;
        let mut session = self.session.take().ok_or(SessionError::NotOpen)?;
        session.cancel()?;
        // dropping the reply is what the host observes as "no write"
        drop(open);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EditOutcome;
    use crate::matrix::MatrixMap;

    #[test]
    fn poll_opens_latest_request() {
        let (mut controller, handle) = SessionController::new(EditorConfig::default());
        let mut first = handle
            .request_edit("a", MathMode::Block, "1", MatrixMap::new())
            .unwrap();
        let _second = handle
            .request_edit("b", MathMode::Inline, "2", MatrixMap::new())
            .unwrap();

        assert!(controller.poll());
        assert_eq!(controller.editing(), Some(("b", MathMode::Inline)));
        assert_eq!(first.try_outcome(), EditOutcome::Cancelled);
        assert!(!controller.poll());
    }

    #[test]
    fn replacing_an_already_closed_session_still_opens_the_next() {
        let (mut controller, handle) = SessionController::new(EditorConfig::default());
        let mut first = handle
            .request_edit("a", MathMode::Block, "1", MatrixMap::new())
            .unwrap();
        controller.poll();
        controller.session_mut().unwrap().cancel().unwrap();

        let _second = handle
            .request_edit("b", MathMode::Inline, "2", MatrixMap::new())
            .unwrap();
        assert!(controller.poll());
        assert_eq!(controller.editing(), Some(("b", MathMode::Inline)));
        assert!(controller.state().is_open());
        assert_eq!(controller.session().unwrap().line_values(), ["2"]);
        assert_eq!(first.try_outcome(), EditOutcome::Cancelled);
    }

    #[test]
    fn closed_controller_rejects_save_and_cancel() {
        let (mut controller, _handle) = SessionController::new(EditorConfig::default());
        assert_eq!(controller.state(), SessionState::Closed);
        assert_eq!(controller.save(), Err(SessionError::NotOpen));
        assert_eq!(controller.cancel(), Err(SessionError::NotOpen));
    }

    #[test]
    fn save_after_host_dropped_reports_host_gone() {
        let (mut controller, handle) = SessionController::new(EditorConfig::default());
        let pending = handle
            .request_edit("a", MathMode::Block, "1", MatrixMap::new())
            .unwrap();
        controller.poll();
        drop(pending);
        assert_eq!(controller.save(), Err(SessionError::HostGone));
        assert!(!controller.is_open());
    }
}
