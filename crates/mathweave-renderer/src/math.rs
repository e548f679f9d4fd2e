//! Expanded LaTeX → MathML, with an escaped source span when it can't be
//! rendered.

use std::fmt::{self, Write as _};

use pulldown_cmark_escape::escape_html;
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
};

const ERROR_CLASS: &str = "mathweave-error";
const EMPTY_CLASS: &str = "mathweave-empty";

/// How a node sits in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Layout {
    #[default]
    Inline,
    Block,
}

impl Layout {
    pub fn css_class(self) -> &'static str {
        match self {
            Layout::Inline => "mathweave-inline",
            Layout::Block => "mathweave-block",
        }
    }
}

impl From<Layout> for DisplayMode {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Inline => DisplayMode::Inline,
            Layout::Block => DisplayMode::Block,
        }
    }
}

/// Outcome of rendering one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathResult {
    /// MathML for the node.
    Success(String),
    /// The source could not be rendered. `html` shows it escaped, with
    /// `message` as the hover text.
    Error { html: String, message: String },
}

impl MathResult {
    /// HTML to insert into the page, whichever way rendering went.
    pub fn html(&self) -> &str {
        match self {
            MathResult::Success(html) | MathResult::Error { html, .. } => html,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            MathResult::Success(html) | MathResult::Error { html, .. } => html,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MathResult::Error { .. })
    }
}

/// Render `latex`, which must already have its matrix placeholders
/// expanded. Blank input gives an empty span so the node stays clickable.
pub fn render_math(latex: &str, layout: Layout) -> MathResult {
    if latex.trim().is_empty() {
        return MathResult::Success(format!(
            r#"<span class="{EMPTY_CLASS} {}"></span>"#,
            layout.css_class()
        ));
    }

    let storage = Storage::new();
    let events: Vec<_> = Parser::new(latex, &storage).collect();
    if let Some(message) = parse_errors(&events) {
        tracing::warn!(
            target: "mathweave::render",
            error = %message,
            source_len = latex.len(),
            "latex failed to parse, rendering fallback"
        );
        return failure(latex, message, layout);
    }

    let config = RenderConfig {
        display_mode: layout.into(),
        ..Default::default()
    };
    let mut mathml = String::new();
    match push_mathml(&mut mathml, events.into_iter(), config) {
        Ok(()) => MathResult::Success(mathml),
        Err(e) => {
            tracing::warn!(target: "mathweave::render", error = %e, "mathml output failed");
            failure(latex, e.to_string(), layout)
        }
    }
}

/// Every parse error in `events`, joined. Repeats of the same message
/// are reported once.
fn parse_errors<T, E: fmt::Display>(events: &[Result<T, E>]) -> Option<String> {
    let mut messages: Vec<String> = Vec::new();
    for err in events.iter().filter_map(|e| e.as_ref().err()) {
        let message = err.to_string();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }
    (!messages.is_empty()).then(|| messages.join("; "))
}

fn failure(latex: &str, message: String, layout: Layout) -> MathResult {
    let mut html = String::new();
    if write_error_span(&mut html, latex, &message, layout).is_err() {
        html = format!(r#"<span class="{ERROR_CLASS} {}"></span>"#, layout.css_class());
    }
    MathResult::Error { html, message }
}

fn write_error_span(out: &mut String, latex: &str, message: &str, layout: Layout) -> fmt::Result {
    write!(out, r#"<span class="{ERROR_CLASS} {}" role="img" title=""#, layout.css_class())?;
    escape_html(&mut *out, message)?;
    out.push_str(r#""><code>"#);
    escape_html(&mut *out, latex)?;
    out.push_str("</code></span>");
    Ok(())
}
