//! Error types shared across mathweave crates.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use std::borrow::Cow;

/// Main error type for mathweave operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum MathweaveError {
    /// Parse error with source location
    #[error(transparent)]
    #[diagnostic_source]
    Parse(#[from] ParseError),

    /// Serialization/deserialization error
    #[error(transparent)]
    #[diagnostic_source]
    Serde(#[from] SerDeError),

    /// IO error
    #[error(transparent)]
    #[diagnostic(code(mathweave::io))]
    Io(#[from] std::io::Error),

    /// Editing session error
    #[error("session error: {0}")]
    #[diagnostic(code(mathweave::session))]
    Session(String),

    /// Invalid configuration value
    #[error("invalid configuration: {key} = {value:?} ({reason})")]
    #[diagnostic(code(mathweave::config))]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse error with source code location information
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("parse error: {}", self.kind)]
#[diagnostic(code(mathweave::parse))]
pub struct ParseError {
    #[diagnostic_source]
    kind: ParseErrorKind,
    #[source_code]
    src: NamedSource<Cow<'static, str>>,
    #[label("error")]
    err_location: SourceSpan,
    err_line_col: Option<(usize, usize)>,
    #[help]
    advice: Option<String>,
}

impl ParseError {
    /// Attach the source text the error was produced from, so the report can
    /// point at the offending line.
    pub fn with_source(self, src: NamedSource<Cow<'static, str>>) -> Self {
        let location = match self.err_line_col {
            Some((line, column)) => SourceSpan::new(
                SourceOffset::from_location(src.inner(), line, column),
                self.err_location.len(),
            ),
            None => self.err_location,
        };
        Self {
            kind: self.kind,
            src,
            err_location: location,
            err_line_col: self.err_line_col,
            advice: self.advice,
        }
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    /// Line and column (1-based) reported by the parser, if known.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        self.err_line_col
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error(transparent)]
    SerdeError(#[from] SerDeError),
    #[error("malformed math node: {0}")]
    MalformedNode(Cow<'static, str>),
}

/// Serialization/deserialization errors
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SerDeError {
    #[error(transparent)]
    #[diagnostic(code(mathweave::serde::json))]
    Json(#[from] serde_json::Error),
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        let line = err.line();
        let column = err.column();
        let location = SourceSpan::new(SourceOffset::from_location("", line, column), 0);
        Self {
            kind: ParseErrorKind::SerdeError(SerDeError::Json(err)),
            src: NamedSource::new(Cow::Borrowed("json"), Cow::Borrowed("")),
            err_location: location,
            advice: None,
            err_line_col: Some((line, column)),
        }
    }
}

impl ParseError {
    pub fn malformed(what: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: ParseErrorKind::MalformedNode(what.into()),
            src: NamedSource::new(Cow::Borrowed("node"), Cow::Borrowed("")),
            err_location: SourceSpan::new(0.into(), 0),
            err_line_col: None,
            advice: None,
        }
    }
}

/// Parse a JSON document, producing a [`ParseError`] that points into `src`.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    name: &str,
    src: &str,
) -> Result<T, ParseError> {
    serde_json::from_str(src).map_err(|e| {
        ParseError::from(e).with_source(NamedSource::new(
            Cow::Owned(name.to_string()),
            Cow::Owned(src.to_string()),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Sample {
        latex: String,
    }

    #[test]
    fn json_error_keeps_line_and_column() {
        let src = "{\n  \"latex\": 12\n}";
        let err = parse_json::<Sample>("node.json", src).unwrap_err();
        let (line, _col) = err.line_col().expect("serde_json always reports a location");
        assert_eq!(line, 2);
        assert!(matches!(err.kind(), ParseErrorKind::SerdeError(_)));
    }

    #[test]
    fn valid_json_parses() {
        let sample: Sample = parse_json("node.json", r#"{"latex":"x"}"#).unwrap();
        assert_eq!(sample.latex, "x");
    }

    #[test]
    fn parse_error_converts_into_top_level() {
        let err: MathweaveError = ParseError::malformed("missing latex").into();
        assert!(err.to_string().contains("missing latex"));
    }
}
