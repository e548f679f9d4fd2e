//! Command execution against the open session.
//!
//! `execute_command` is the single dispatch point shared by toolbar buttons,
//! keybindings and scripted hosts.

use crate::actions::{EditorCommand, KeyCombo, KeydownResult, command_for_key};
use crate::controller::SessionController;
use crate::error::SessionError;

/// Execute a command.
///
/// Returns `Ok(true)` if the command changed something. Field commands
/// without an active field are no-ops, not errors.
pub fn execute_command(
    controller: &mut SessionController,
    command: &EditorCommand,
) -> Result<bool, SessionError> {
    tracing::trace!(target: "mathweave::session", ?command, "execute");
    match command {
        EditorCommand::Save => return controller.save().map(|_| true),
        EditorCommand::Cancel => return controller.cancel().map(|_| true),
        _ => {}
    }
    let session = controller.session_mut().ok_or(SessionError::NotOpen)?;
    match command {
        EditorCommand::Insert(latex) => session.write_to_active(latex),
        EditorCommand::Undo => Ok(session.undo()),
        EditorCommand::Redo => Ok(session.redo()),
        EditorCommand::NewLine => {
            let id = session.add_line("")?;
            session.focus(id)?;
            Ok(true)
        }
        EditorCommand::RemoveLine(id) => session.remove_line(*id).map(|_| true),
        EditorCommand::StartInsertMatrix { rows, cols } => session
            .start_insert_matrix(Some((*rows, *cols)))
            .map(|_| true),
        EditorCommand::Save | EditorCommand::Cancel => Ok(false),
    }
}

/// Route a keydown through the bindings.
pub fn handle_keydown(
    controller: &mut SessionController,
    combo: &KeyCombo,
) -> Result<KeydownResult, SessionError> {
    let Some(command) = command_for_key(combo) else {
        return Ok(KeydownResult::NotHandled);
    };
    execute_command(controller, &command)?;
    Ok(KeydownResult::Handled)
}

#[cfg(test)]
mod tests {
    use mathweave_common::EditorConfig;

    use super::*;
    use crate::actions::{Key, Modifiers, toolbar_command};
    use crate::bridge::EditOutcome;
    use crate::matrix::MatrixMap;
    use crate::types::MathMode;

    fn open(latex: &str) -> (SessionController, crate::bridge::PendingEdit) {
        let config = EditorConfig {
            debounce_ms: 0,
            ..Default::default()
        };
        let (mut controller, handle) = SessionController::new(config);
        let pending = handle
            .request_edit("n", MathMode::Block, latex, MatrixMap::new())
            .unwrap();
        controller.poll();
        (controller, pending)
    }

    fn values(controller: &SessionController) -> Vec<String> {
        controller
            .session()
            .unwrap()
            .line_values()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn insert_without_active_field_is_noop() {
        let (mut controller, _pending) = open("x");
        let cmd = toolbar_command("plus").unwrap();
        assert_eq!(execute_command(&mut controller, &cmd), Ok(false));
        assert_eq!(values(&controller), ["x"]);
    }

    #[test]
    fn new_line_becomes_active_and_receives_inserts() {
        let (mut controller, _pending) = open("x");
        assert_eq!(execute_command(&mut controller, &EditorCommand::NewLine), Ok(true));
        let cmd = EditorCommand::Insert(r"\pi ".into());
        assert_eq!(execute_command(&mut controller, &cmd), Ok(true));
        assert_eq!(values(&controller), ["x", r"\pi "]);

        assert_eq!(execute_command(&mut controller, &EditorCommand::Undo), Ok(true));
        assert_eq!(values(&controller), ["x", ""]);
    }

    #[test]
    fn save_and_cancel_close_the_session() {
        let (mut controller, mut pending) = open("x");
        assert_eq!(execute_command(&mut controller, &EditorCommand::Save), Ok(true));
        assert!(matches!(pending.try_outcome(), EditOutcome::Saved(p) if p.latex == "x"));
        assert_eq!(
            execute_command(&mut controller, &EditorCommand::Undo),
            Err(SessionError::NotOpen)
        );

        let (mut controller, mut pending) = open("x");
        let escape = KeyCombo::new(Key::Escape);
        assert_eq!(handle_keydown(&mut controller, &escape), Ok(KeydownResult::Handled));
        assert_eq!(pending.try_outcome(), EditOutcome::Cancelled);
    }

    #[test]
    fn unbound_key_is_not_handled() {
        let (mut controller, _pending) = open("x");
        let combo = KeyCombo::with_modifiers(Key::character("q"), Modifiers::CTRL);
        assert_eq!(
            handle_keydown(&mut controller, &combo),
            Ok(KeydownResult::NotHandled)
        );
    }

    #[test]
    fn start_insert_matrix_opens_draft() {
        let (mut controller, _pending) = open("x");
        let cmd = EditorCommand::StartInsertMatrix { rows: 3, cols: 3 };
        assert_eq!(execute_command(&mut controller, &cmd), Ok(true));
        let draft = controller.session().unwrap().draft().unwrap();
        assert_eq!((draft.rows(), draft.cols()), (3, 3));
    }
}
