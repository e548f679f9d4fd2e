//! Editor commands and their keyboard bindings.
//!
//! Commands are the semantic operations of the math editor, decoupled from
//! how they are triggered (toolbar button, keybinding, host script).

use smol_str::SmolStr;

use crate::types::FieldId;

/// All session-level editor commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    /// Write a LaTeX snippet at the active field's caret.
    Insert(String),

    /// Undo on the active field.
    Undo,

    /// Redo on the active field.
    Redo,

    /// Append a new line and focus it.
    NewLine,

    /// Remove a line (the last one is cleared instead).
    RemoveLine(FieldId),

    /// Open the matrix sub-editor for a new matrix.
    StartInsertMatrix { rows: usize, cols: usize },

    /// Save the session and close.
    Save,

    /// Close without saving.
    Cancel,
}

/// Key values for keyboard input.
///
/// Only the keys the math editor binds are named; everything else keeps its
/// DOM key value in `Character`, or is `Unidentified`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    Enter,
    Escape,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "" | "Unidentified" => Self::Unidentified,
            other => Self::Character(other.into()),
        }
    }

    /// Case-insensitive match against a single character key.
    fn is_char(&self, c: char) -> bool {
        match self {
            Self::Character(s) => {
                let mut chars = s.chars();
                matches!((chars.next(), chars.next()), (Some(k), None) if k.eq_ignore_ascii_case(&c))
            }
            _ => false,
        }
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META_SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: true,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Get the primary modifier + Shift for the platform.
    pub fn primary_shift(is_mac: bool) -> Self {
        if is_mac {
            Self::META_SHIFT
        } else {
            Self::CTRL_SHIFT
        }
    }

    /// Ctrl or Cmd held. Either counts on every platform.
    pub fn has_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key combination for triggering a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary(is_mac),
        }
    }

    pub fn primary_shift(key: Key, is_mac: bool) -> Self {
        Self {
            key,
            modifiers: Modifiers::primary_shift(is_mac),
        }
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let the field handle it.
    NotHandled,
}

/// Look up the command bound to a key combination.
///
/// - Ctrl/Cmd+Z: undo
/// - Ctrl/Cmd+Shift+Z, Ctrl/Cmd+Y: redo
/// - Enter: new line
/// - Escape: cancel
pub fn command_for_key(combo: &KeyCombo) -> Option<EditorCommand> {
    let mods = combo.modifiers;
    if mods.has_primary() {
        if combo.key.is_char('z') {
            return Some(if mods.shift {
                EditorCommand::Redo
            } else {
                EditorCommand::Undo
            });
        }
        if combo.key.is_char('y') {
            return Some(EditorCommand::Redo);
        }
        return None;
    }
    match combo.key {
        Key::Enter if !mods.shift && !mods.alt => Some(EditorCommand::NewLine),
        Key::Escape => Some(EditorCommand::Cancel),
        _ => None,
    }
}

/// Matrix sizes offered by the toolbar.
pub const MATRIX_PRESETS: [(usize, usize); 3] = [(2, 2), (3, 3), (4, 4)];

/// A toolbar button: what it is called and what it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolbarToken {
    pub label: &'static str,
    pub latex: &'static str,
}

/// A group of toolbar buttons.
#[derive(Debug, Clone, Copy)]
pub struct ToolbarSection {
    pub name: &'static str,
    pub tokens: &'static [ToolbarToken],
}

impl ToolbarSection {
    pub fn find(&self, label: &str) -> Option<&ToolbarToken> {
        self.tokens.iter().find(|t| t.label == label)
    }
}

const fn tok(label: &'static str, latex: &'static str) -> ToolbarToken {
    ToolbarToken { label, latex }
}

pub const TOOLBAR: &[ToolbarSection] = &[
    ToolbarSection {
        name: "operators",
        tokens: &[
            tok("plus", "+"),
            tok("minus", "-"),
            tok("multiply", r"\times "),
            tok("dot", r"\cdot "),
            tok("divide", r"\div "),
            tok("plus-minus", r"\pm "),
            tok("minus-plus", r"\mp "),
        ],
    },
    ToolbarSection {
        name: "relations",
        tokens: &[
            tok("equals", "="),
            tok("not equal", r"\neq "),
            tok("less than", "<"),
            tok("greater than", ">"),
            tok("leq", r"\leq "),
            tok("geq", r"\geq "),
        ],
    },
    ToolbarSection {
        name: "structures",
        tokens: &[
            tok("square root", r"\sqrt{}"),
            tok("cube root", r"\sqrt[3]{}"),
            tok("nth root", r"\sqrt[{}]{}"),
            tok("power", "^{}"),
            tok("subscript", "_{}"),
            tok("fraction", r"\frac{}{}"),
            tok("binomial", r"\binom{}{}"),
        ],
    },
    ToolbarSection {
        name: "delimiters",
        tokens: &[
            tok("parentheses", r"\left( \right)"),
            tok("brackets", r"\left[ \right]"),
            tok("braces", r"\left\{ \right\}"),
            tok("absolute value", r"\left| \right|"),
            tok("norm", r"\left\lVert \right\rVert"),
            tok("floor", r"\left\lfloor \right\rfloor"),
            tok("ceil", r"\left\lceil \right\rceil"),
        ],
    },
    ToolbarSection {
        name: "functions",
        tokens: &[
            tok("sin", r"\sin "),
            tok("cos", r"\cos "),
            tok("tan", r"\tan "),
            tok("arcsin", r"\arcsin "),
            tok("arccos", r"\arccos "),
            tok("arctan", r"\arctan "),
            tok("log", r"\log "),
            tok("log base", r"\log_{} "),
            tok("natural log", r"\ln "),
            tok("exp", "e^{}"),
        ],
    },
    ToolbarSection {
        name: "symbols",
        tokens: &[
            tok("pi", r"\pi "),
            tok("theta", r"\theta "),
            tok("alpha", r"\alpha "),
            tok("beta", r"\beta "),
            tok("lambda", r"\lambda "),
            tok("mu", r"\mu "),
            tok("infinity", r"\infty "),
        ],
    },
    ToolbarSection {
        name: "calculus",
        tokens: &[
            tok("sum", r"\sum_{}^{} "),
            tok("product", r"\prod_{}^{} "),
            tok("limit", r"\lim_{x \to } "),
            tok("integral", r"\int_{}^{} "),
            tok("double integral", r"\iint_{}^{} "),
            tok("triple integral", r"\iiint_{}^{} "),
            tok("derivative", r"\frac{d}{dx}\left( \right)"),
            tok("partial derivative", r"\frac{\partial}{\partial x}\left( \right)"),
            tok("nabla", r"\nabla "),
            tok("evaluated bar", r"\Big|_{a}^{b}"),
            tok("dx", r"\,dx"),
        ],
    },
    ToolbarSection {
        name: "arrows",
        tokens: &[
            tok("to", r"\to "),
            tok("implies", r"\implies "),
            tok("iff", r"\iff "),
            tok("mapsto", r"\mapsto "),
        ],
    },
    ToolbarSection {
        name: "accents",
        tokens: &[
            tok("vector", r"\vec {}"),
            tok("hat", r"\hat{}"),
            tok("bar", r"\bar{}"),
            tok("tilde", r"\tilde{}"),
            tok("overline", r"\overline{}"),
            tok("underline", r"\underline{}"),
        ],
    },
    ToolbarSection {
        name: "sets",
        tokens: &[
            tok("reals", "ℝ "),
            tok("naturals", "ℕ "),
            tok("integers", "ℤ "),
            tok("rationals", "ℚ "),
            tok("complex", "ℂ "),
        ],
    },
];

/// Toolbar label of a matrix preset button, e.g. `matrix-3x3`.
pub fn matrix_preset_label(rows: usize, cols: usize) -> String {
    format!("matrix-{rows}x{cols}")
}

/// Command for a toolbar button, looked up by label across all sections.
/// Matrix preset buttons open the matrix sub-editor at their size.
pub fn toolbar_command(label: &str) -> Option<EditorCommand> {
    if let Some(&(rows, cols)) = MATRIX_PRESETS
        .iter()
        .find(|(rows, cols)| matrix_preset_label(*rows, *cols) == label)
    {
        return Some(EditorCommand::StartInsertMatrix { rows, cols });
    }
    TOOLBAR
        .iter()
        .find_map(|section| section.find(label))
        .map(|t| EditorCommand::Insert(t.latex.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combo(key: &str, modifiers: Modifiers) -> KeyCombo {
        KeyCombo::with_modifiers(Key::from_dom(key), modifiers)
    }

    #[test]
    fn undo_redo_bindings_on_both_platforms() {
        for is_mac in [false, true] {
            let z = KeyCombo::primary(Key::character("z"), is_mac);
            let shift_z = KeyCombo::primary_shift(Key::character("Z"), is_mac);
            let y = KeyCombo::primary(Key::character("y"), is_mac);
            assert_eq!(command_for_key(&z), Some(EditorCommand::Undo));
            assert_eq!(command_for_key(&shift_z), Some(EditorCommand::Redo));
            assert_eq!(command_for_key(&y), Some(EditorCommand::Redo));
        }
    }

    #[test]
    fn ctrl_counts_on_mac_too() {
        assert_eq!(
            command_for_key(&combo("z", Modifiers::CTRL)),
            Some(EditorCommand::Undo)
        );
        assert_eq!(
            command_for_key(&combo("z", Modifiers::META)),
            Some(EditorCommand::Undo)
        );
    }

    #[test]
    fn plain_keys() {
        assert_eq!(
            command_for_key(&combo("Enter", Modifiers::NONE)),
            Some(EditorCommand::NewLine)
        );
        assert_eq!(
            command_for_key(&combo("Escape", Modifiers::NONE)),
            Some(EditorCommand::Cancel)
        );
        assert_eq!(command_for_key(&combo("z", Modifiers::NONE)), None);
        assert_eq!(command_for_key(&combo("x", Modifiers::CTRL)), None);
    }

    #[test]
    fn toolbar_lookup() {
        assert_eq!(
            toolbar_command("fraction"),
            Some(EditorCommand::Insert(r"\frac{}{}".into()))
        );
        assert_eq!(toolbar_command("nope"), None);
        assert!(TOOLBAR.iter().all(|s| !s.tokens.is_empty()));
    }

    #[test]
    fn matrix_presets_open_sub_editor() {
        for (rows, cols) in MATRIX_PRESETS {
            assert_eq!(
                toolbar_command(&matrix_preset_label(rows, cols)),
                Some(EditorCommand::StartInsertMatrix { rows, cols })
            );
        }
        assert_eq!(toolbar_command("matrix-5x5"), None);
    }

    #[test]
    fn unbound_named_keys_stay_characters() {
        assert_eq!(Key::from_dom("Backspace"), Key::character("Backspace"));
        assert_eq!(command_for_key(&combo("Tab", Modifiers::NONE)), None);
        assert_eq!(Key::from_dom(""), Key::Unidentified);
    }
}
