//! Clipboard payloads: markdown text plus a structured list of node ids.

use pulldown_cmark::{Event, Parser, Tag};
use tracing::error;

use crate::models::NodeId;
use crate::tree::TreeNode;
use crate::{Error, Result};

use super::logseq;

/// MIME type of the node id payload.
pub const NODE_IDS_MIME: &str = "application/x-canopy-node-ids";

/// What the application puts on, or reads from, the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardContents {
    pub text: String,
    /// Raw [`NODE_IDS_MIME`] payload, when present.
    pub node_ids: Option<String>,
}

impl ClipboardContents {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            node_ids: None,
        }
    }
}

/// Encode node ids as a JSON array of strings.
pub fn encode_node_ids(ids: &[NodeId]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

/// Decode the node id payload. A malformed payload is logged and rejected.
pub fn decode_node_ids(payload: &str) -> Result<Vec<NodeId>> {
    serde_json::from_str::<Vec<NodeId>>(payload).map_err(|err| {
        error!(error = %err, "rejected clipboard node id payload");
        Error::Parse(format!("invalid clipboard node id payload: {err}"))
    })
}

/// Whether the text contains a markdown list.
pub fn looks_like_outline(text: &str) -> bool {
    Parser::new(text).any(|event| matches!(event, Event::Start(Tag::List(_))))
}

/// Trees for pasted plain text: a Logseq outline when it looks like one and
/// parses, otherwise one node per non-empty line.
pub fn parse_text(text: &str) -> Vec<TreeNode> {
    if looks_like_outline(text) {
        if let Some(trees) = logseq::parse(text) {
            return trees;
        }
    }
    logseq::plain_lines(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_payload() {
        let ids = vec![NodeId::new("a"), NodeId::new("b")];
        let payload = encode_node_ids(&ids).unwrap();
        assert_eq!(payload, r#"["a","b"]"#);
        assert_eq!(decode_node_ids(&payload).unwrap(), ids);
    }

    #[test]
    fn test_bad_payload_rejected() {
        assert!(matches!(decode_node_ids("{\"a\":1}"), Err(Error::Parse(_))));
        assert!(matches!(decode_node_ids("[1, 2]"), Err(Error::Parse(_))));
        assert!(matches!(decode_node_ids("[\"\"]"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_outline_detection() {
        assert!(looks_like_outline("- one\n- two\n"));
        assert!(!looks_like_outline("one\ntwo\n"));
    }

    #[test]
    fn test_parse_text() {
        let outline = parse_text("- one\n  - two\n");
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].children().len(), 1);

        let lines = parse_text("first line\n\n- not really an outline\nsecond\n");
        let titles: Vec<_> = lines.iter().filter_map(TreeNode::title).collect();
        assert_eq!(titles, vec!["first line", "- not really an outline", "second"]);
    }
}
