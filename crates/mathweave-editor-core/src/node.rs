//! Math nodes as stored in the host document.
//!
//! A node keeps the LaTeX with placeholder tokens plus the matrices those
//! tokens refer to. It is persisted as `data-*` attributes on a `div`
//! (block) or `span` (inline), and as JSON for tooling.

use mathweave_common::{EditorConfig, ParseError};
use mathweave_renderer::MathResult;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::bridge::{BridgeHandle, PendingEdit};
use crate::error::SessionError;
use crate::matrix::MatrixMap;
use crate::placeholder::resolve_for_display;
use crate::render::MathRenderer;
use crate::session::SavePayload;
use crate::types::MathMode;

pub const BLOCK_TYPE: &str = "math-block";
pub const INLINE_TYPE: &str = "math-inline";

/// Horizontal placement of a math block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }

    /// Parse an attribute value. Unknown values fall back to left.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "center" => Self::Center,
            "right" => Self::Right,
            _ => Self::Left,
        }
    }
}

/// Block or inline, with the block-only alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Block { alignment: Alignment },
    Inline,
}

impl NodeKind {
    pub fn mode(&self) -> MathMode {
        match self {
            Self::Block { .. } => MathMode::Block,
            Self::Inline => MathMode::Inline,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Block { .. } => BLOCK_TYPE,
            Self::Inline => INLINE_TYPE,
        }
    }
}

/// A math node in the host document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NodeRecord", into = "NodeRecord")]
pub struct MathNode {
    pub id: SmolStr,
    pub kind: NodeKind,
    /// LaTeX with placeholder tokens, lines joined with `\\`.
    pub latex: String,
    pub matrices: MatrixMap,
}

fn fresh_id() -> SmolStr {
    SmolStr::new(uuid::Uuid::new_v4().to_string())
}

impl MathNode {
    pub fn block(latex: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            kind: NodeKind::Block {
                alignment: Alignment::Left,
            },
            latex: latex.into(),
            matrices: MatrixMap::new(),
        }
    }

    pub fn inline(latex: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            kind: NodeKind::Inline,
            latex: latex.into(),
            matrices: MatrixMap::new(),
        }
    }

    /// New block with the configured starter content.
    pub fn default_block(config: &EditorConfig) -> Self {
        Self::block(config.default_block_latex.clone())
    }

    /// New inline node with the configured starter content.
    pub fn default_inline(config: &EditorConfig) -> Self {
        Self::inline(config.default_inline_latex.clone())
    }

    pub fn mode(&self) -> MathMode {
        self.kind.mode()
    }

    pub fn alignment(&self) -> Option<Alignment> {
        match self.kind {
            NodeKind::Block { alignment } => Some(alignment),
            NodeKind::Inline => None,
        }
    }

    /// Change a block's alignment. Returns false for inline nodes.
    pub fn set_alignment(&mut self, alignment: Alignment) -> bool {
        match &mut self.kind {
            NodeKind::Block { alignment: current } => {
                *current = alignment;
                true
            }
            NodeKind::Inline => false,
        }
    }

    /// Take a saved session's result. Id and alignment are kept.
    pub fn apply_save(&mut self, payload: SavePayload) {
        tracing::debug!(
            target: "mathweave::node",
            id = %self.id,
            matrices = payload.matrices.len(),
            "applying save"
        );
        self.latex = payload.latex;
        self.matrices = payload.matrices;
    }

    /// LaTeX with every token replaced by its matrix.
    pub fn expanded_latex(&self) -> String {
        resolve_for_display(&self.latex, &self.matrices)
    }

    /// Source handed to the renderer: blocks wrap non-empty content in a
    /// `gathered` environment so `\\` breaks lines.
    pub fn render_source(&self) -> String {
        let expanded = self.expanded_latex();
        match self.kind {
            NodeKind::Block { .. } if !expanded.is_empty() => {
                format!(r"\begin{{gathered}}{expanded}\end{{gathered}}")
            }
            _ => expanded,
        }
    }

    /// Render for display. Never fails; errors come back as HTML.
    pub fn render(&self, renderer: &impl MathRenderer) -> MathResult {
        renderer.render(&self.render_source(), self.mode())
    }

    /// Ask the editor to open on this node.
    pub fn request_edit(&self, bridge: &BridgeHandle) -> Result<PendingEdit, SessionError> {
        bridge.request_edit(self.id.clone(), self.mode(), self.latex.clone(), self.matrices.clone())
    }

    /// `data-*` attributes for the host element.
    pub fn to_html_attrs(&self) -> Vec<(&'static str, String)> {
        let matrices = serde_json::to_string(&self.matrices).unwrap_or_else(|e| {
            tracing::warn!(target: "mathweave::node", error = %e, "matrices did not serialize");
            "{}".to_owned()
        });
        let mut attrs = vec![
            ("data-type", self.kind.type_name().to_owned()),
            ("data-id", self.id.to_string()),
            ("data-latex", self.latex.clone()),
            ("data-matrices", matrices),
        ];
        if let Some(alignment) = self.alignment() {
            attrs.push(("data-alignment", alignment.as_str().to_owned()));
        }
        attrs
    }

    /// Read a node back from element attributes.
    ///
    /// `data-type` must name a math node. A missing id gets a fresh one, a
    /// missing or unreadable `data-matrices` becomes an empty map and a
    /// missing alignment is left.
    pub fn from_html_attrs<'a>(
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ParseError> {
        let mut node_type = None;
        let mut record = NodeRecord::default();
        for (name, value) in attrs {
            match name {
                "data-type" => node_type = Some(value),
                "data-id" if !value.is_empty() => record.id = Some(SmolStr::new(value)),
                "data-latex" => record.latex = value.to_owned(),
                "data-matrices" => record.matrices = parse_matrices_attr(value),
                "data-alignment" => record.alignment = Some(Alignment::from_attr(value)),
                _ => {}
            }
        }
        record.node_type = match node_type {
            Some(BLOCK_TYPE) => NodeType::MathBlock,
            Some(INLINE_TYPE) => NodeType::MathInline,
            Some(other) => {
                return Err(ParseError::malformed(format!("unknown data-type {other:?}")));
            }
            None => return Err(ParseError::malformed("missing data-type")),
        };
        Ok(record.into())
    }
}

fn parse_matrices_attr(raw: &str) -> MatrixMap {
    if raw.is_empty() {
        return MatrixMap::new();
    }
    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(target: "mathweave::node", error = %e, "unreadable data-matrices, using empty map");
            MatrixMap::new()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum NodeType {
    #[default]
    MathBlock,
    MathInline,
}

/// Flat JSON shape of a node.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<SmolStr>,
    #[serde(default)]
    latex: String,
    #[serde(default)]
    matrices: MatrixMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alignment: Option<Alignment>,
}

impl From<NodeRecord> for MathNode {
    fn from(record: NodeRecord) -> Self {
        let kind = match record.node_type {
            NodeType::MathBlock => NodeKind::Block {
                alignment: record.alignment.unwrap_or_default(),
            },
            NodeType::MathInline => NodeKind::Inline,
        };
        Self {
            id: record.id.unwrap_or_else(fresh_id),
            kind,
            latex: record.latex,
            matrices: record.matrices,
        }
    }
}

impl From<MathNode> for NodeRecord {
    fn from(node: MathNode) -> Self {
        let (node_type, alignment) = match node.kind {
            NodeKind::Block { alignment } => (NodeType::MathBlock, Some(alignment)),
            NodeKind::Inline => (NodeType::MathInline, None),
        };
        Self {
            node_type,
            id: Some(node.id),
            latex: node.latex,
            matrices: node.matrices,
            alignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatrixId, MatrixRecord};

    fn with_matrix() -> MathNode {
        let rec = MatrixRecord {
            id: MatrixId::from("idA"),
            label: "M1".into(),
            rows: 2,
            cols: 2,
            cells: vec![
                vec!["1".into(), "2".into()],
                vec!["3".into(), "4".into()],
            ],
        };
        let mut node = MathNode::block("A=⟦M1⟧");
        node.id = "n1".into();
        node.matrices.insert(rec.id.clone(), rec);
        node
    }

    #[test]
    fn defaults_from_config() {
        let config = EditorConfig::default();
        assert_eq!(MathNode::default_block(&config).latex, r"x = \square");
        assert_eq!(MathNode::default_inline(&config).latex, r"x=\square");
        assert_ne!(MathNode::block("").id, MathNode::block("").id);
    }

    #[test]
    fn block_source_is_gathered() {
        insta::assert_snapshot!(
            with_matrix().render_source(),
            @r"\begin{gathered}A=\begin{bmatrix}1 & 2 \\ 3 & 4\end{bmatrix}\end{gathered}"
        );
        assert_eq!(MathNode::block("").render_source(), "");
    }

    #[test]
    fn inline_source_is_not_wrapped() {
        let node = MathNode::inline("⟦M7⟧");
        assert_eq!(node.render_source(), r"\text{[missing M7]}");
    }

    #[test]
    fn render_uses_node_mode() {
        let node = MathNode::inline("x");
        assert_eq!(node.render(&()), MathResult::Success("x".into()));
        let html = with_matrix().render(&crate::render::PulldownRenderer);
        assert!(!html.is_error());
    }

    #[test]
    fn html_attrs_round_trip() {
        let mut node = with_matrix();
        node.set_alignment(Alignment::Center);
        let attrs = node.to_html_attrs();
        let back =
            MathNode::from_html_attrs(attrs.iter().map(|(k, v)| (*k, v.as_str()))).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn html_attrs_defaults() {
        let node = MathNode::from_html_attrs([
            ("data-type", "math-block"),
            ("data-latex", "y"),
            ("data-matrices", "{not json"),
        ])
        .unwrap();
        assert_eq!(node.alignment(), Some(Alignment::Left));
        assert!(node.matrices.is_empty());
        assert!(!node.id.is_empty());
        assert_eq!(node.latex, "y");
    }

    #[test]
    fn html_attrs_require_math_type() {
        assert!(MathNode::from_html_attrs([("data-type", "paragraph")]).is_err());
        assert!(MathNode::from_html_attrs([("data-latex", "x")]).is_err());
    }

    #[test]
    fn inline_has_no_alignment() {
        let mut node = MathNode::inline("x");
        assert!(!node.set_alignment(Alignment::Right));
        assert!(
            !node
                .to_html_attrs()
                .iter()
                .any(|(k, _)| *k == "data-alignment")
        );
    }

    #[test]
    fn apply_save_keeps_identity() {
        let mut node = with_matrix();
        node.set_alignment(Alignment::Right);
        node.apply_save(SavePayload {
            latex: "z".into(),
            matrices: MatrixMap::new(),
        });
        assert_eq!(node.id, "n1");
        assert_eq!(node.alignment(), Some(Alignment::Right));
        assert_eq!(node.latex, "z");
        assert!(node.matrices.is_empty());
    }

    #[test]
    fn json_shape() {
        let node = with_matrix();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "math-block");
        assert_eq!(json["alignment"], "left");
        assert_eq!(json["matrices"]["idA"]["label"], "M1");
        let back: MathNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }
}
