//! Rendering traits for the editor.
//!
//! The core never links a math engine directly. Anything that turns expanded
//! LaTeX into HTML implements [`MathRenderer`]; [`PulldownRenderer`] is the
//! default, backed by `mathweave-renderer`.

use mathweave_renderer::{Layout, MathResult, render_math};

use crate::types::MathMode;

/// Renders fully expanded LaTeX (no placeholder tokens left).
///
/// Implementations must not fail: malformed input comes back as
/// [`MathResult::Error`] with displayable HTML.
pub trait MathRenderer {
    fn render(&self, latex: &str, mode: MathMode) -> MathResult;
}

/// MathML through pulldown-latex.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownRenderer;

impl MathRenderer for PulldownRenderer {
    fn render(&self, latex: &str, mode: MathMode) -> MathResult {
        let layout = match mode {
            MathMode::Inline => Layout::Inline,
            MathMode::Block => Layout::Block,
        };
        render_math(latex, layout)
    }
}

/// Unit type implementation - echoes the source, for headless use.
impl MathRenderer for () {
    fn render(&self, latex: &str, _mode: MathMode) -> MathResult {
        MathResult::Success(latex.to_owned())
    }
}

impl<T: MathRenderer> MathRenderer for &T {
    fn render(&self, latex: &str, mode: MathMode) -> MathResult {
        (*self).render(latex, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recording(std::cell::RefCell<Vec<(String, MathMode)>>);

    impl MathRenderer for Recording {
        fn render(&self, latex: &str, mode: MathMode) -> MathResult {
            self.0.borrow_mut().push((latex.to_owned(), mode));
            MathResult::Success(String::new())
        }
    }

    #[test]
    fn test_pulldown_uses_display_mode_for_blocks() {
        let block = PulldownRenderer.render("x", MathMode::Block);
        let inline = PulldownRenderer.render("x", MathMode::Inline);
        assert!(block.html().contains("<math"));
        assert!(inline.html().contains("<math"));
        assert_ne!(block, inline);
    }

    #[test]
    fn test_reference_impl_forwards() {
        fn via<R: MathRenderer>(renderer: R) -> MathResult {
            renderer.render("a", MathMode::Inline)
        }
        let rec = Recording(Default::default());
        via(&rec);
        assert_eq!(rec.0.borrow().as_slice(), &[("a".to_string(), MathMode::Inline)]);
    }

    #[test]
    fn test_unit_impl_echoes() {
        assert_eq!(().render("y", MathMode::Block), MathResult::Success("y".into()));
    }
}
