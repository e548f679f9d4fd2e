use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MathweaveError, parse_json};

/// Tunables for the math editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of snapshots kept per field.
    pub history_cap: usize,
    /// Minimum time between two non-forced snapshots, in milliseconds.
    pub debounce_ms: u64,
    /// Upper bound for matrix rows and columns.
    pub max_matrix_dim: usize,
    /// Size of a matrix created without a preset.
    pub default_matrix_rows: usize,
    pub default_matrix_cols: usize,
    /// Content of a freshly inserted math block.
    pub default_block_latex: String,
    /// Content of a freshly inserted inline math node.
    pub default_inline_latex: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_cap: 200,
            debounce_ms: 250,
            max_matrix_dim: 10,
            default_matrix_rows: 2,
            default_matrix_cols: 2,
            default_block_latex: r"x = \square".to_owned(),
            default_inline_latex: r"x=\square".to_owned(),
        }
    }
}

impl EditorConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// - `MATHWEAVE_HISTORY_CAP`
    /// - `MATHWEAVE_DEBOUNCE_MS`
    /// - `MATHWEAVE_MAX_MATRIX_DIM`
    pub fn from_env() -> Result<Self, MathweaveError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Split out from [`from_env`](Self::from_env)
    /// so it can be driven without touching the process environment.
    pub fn overlay(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, MathweaveError> {
        if let Some(v) = lookup("MATHWEAVE_HISTORY_CAP") {
            self.history_cap = parse_positive("MATHWEAVE_HISTORY_CAP", &v)?;
        }
        if let Some(v) = lookup("MATHWEAVE_DEBOUNCE_MS") {
            self.debounce_ms = v.trim().parse().map_err(|e| MathweaveError::Config {
                key: "MATHWEAVE_DEBOUNCE_MS",
                value: v.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = lookup("MATHWEAVE_MAX_MATRIX_DIM") {
            self.max_matrix_dim = parse_positive("MATHWEAVE_MAX_MATRIX_DIM", &v)?;
        }
        self.validate()
    }

    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json_str(src: &str) -> Result<Self, MathweaveError> {
        let config: Self = parse_json("config.json", src)?;
        config.validate()
    }

    /// Read a JSON config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MathweaveError> {
        let src = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading editor config");
        Self::from_json_str(&src)
    }

    fn validate(self) -> Result<Self, MathweaveError> {
        if self.history_cap == 0 {
            return Err(MathweaveError::Config {
                key: "historyCap",
                value: "0".into(),
                reason: "must keep at least one snapshot".into(),
            });
        }
        if self.max_matrix_dim == 0 {
            return Err(MathweaveError::Config {
                key: "maxMatrixDim",
                value: "0".into(),
                reason: "matrices need at least one row and column".into(),
            });
        }
        Ok(self)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, MathweaveError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(MathweaveError::Config {
            key,
            value: value.to_owned(),
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(MathweaveError::Config {
            key,
            value: value.to_owned(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_editor_behaviour() {
        let config = EditorConfig::default();
        assert_eq!(config.history_cap, 200);
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.max_matrix_dim, 10);
        assert_eq!(config.default_block_latex, r"x = \square");
    }

    #[test]
    fn overlay_reads_overrides() {
        let config = EditorConfig::default()
            .overlay(|key| match key {
                "MATHWEAVE_HISTORY_CAP" => Some("50".into()),
                "MATHWEAVE_DEBOUNCE_MS" => Some(" 0 ".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.history_cap, 50);
        assert_eq!(config.debounce_ms, 0);
        assert_eq!(config.max_matrix_dim, 10);
    }

    #[test]
    fn overlay_rejects_zero_cap() {
        let err = EditorConfig::default()
            .overlay(|key| (key == "MATHWEAVE_HISTORY_CAP").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, MathweaveError::Config { key: "MATHWEAVE_HISTORY_CAP", .. }));
    }

    #[test]
    fn json_keeps_missing_defaults() {
        let config = EditorConfig::from_json_str(r#"{"historyCap": 10}"#).unwrap();
        assert_eq!(config.history_cap, 10);
        assert_eq!(config.debounce_ms, 250);
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"maxMatrixDim": 4}}"#).unwrap();
        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.max_matrix_dim, 4);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = EditorConfig::from_json_str("{ historyCap: }").unwrap_err();
        assert!(matches!(err, MathweaveError::Parse(_)));
    }
}
