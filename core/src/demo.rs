//! Content written into a fresh save file.

use crate::graph::Graph;
use crate::models::{Checkbox, DocId, FieldId, NodeId, Timestamp};
use crate::tree::{flatten, TreeNode};
use crate::Result;

const STATUS_FIELD: &str = "demo-status-field";
const SHORTCUTS: &str = "demo-shortcuts";

fn task(title: &str, checkbox: Checkbox) -> TreeNode {
    TreeNode::Node {
        id: None,
        title: title.to_string(),
        checkbox: Some(checkbox),
        expanded: None,
        history: None,
        tags: Vec::new(),
        children: Vec::new(),
    }
}

/// The demo outline as an authored tree.
pub fn demo_tree() -> TreeNode {
    let shortcuts = TreeNode::Node {
        id: Some(NodeId::new(SHORTCUTS)),
        title: "Editing".to_string(),
        checkbox: None,
        expanded: Some(true),
        history: None,
        tags: Vec::new(),
        children: vec![
            TreeNode::text("Enter splits a node at the caret"),
            TreeNode::text("Backspace at the start merges into the row above"),
            TreeNode::text("Tab indents, Shift+Tab outdents"),
        ],
    };

    TreeNode::text("Home").with_children(vec![
        TreeNode::text("Welcome").with_children(vec![
            TreeNode::text("Every row is a node; nodes nest without limit"),
            TreeNode::text("The same node can appear in several places as a link"),
        ]),
        shortcuts,
        TreeNode::text("Tasks").with_children(vec![
            TreeNode::Field {
                id: Some(FieldId::new(STATUS_FIELD)),
                title: "Status".to_string(),
            },
            task("Try cycling a checkbox", Checkbox::Unchecked),
            task("Work in progress", Checkbox::Indeterminate),
            task("Read the welcome notes", Checkbox::Checked).with_children(vec![
                TreeNode::Property {
                    id: None,
                    field_id: FieldId::new(STATUS_FIELD),
                    expanded: None,
                    children: vec![TreeNode::text("Done")],
                },
            ]),
            TreeNode::NodeLink {
                id: DocId::new(SHORTCUTS),
                expanded: Some(false),
            },
        ]),
    ])
}

/// A fresh graph holding the demo outline.
pub fn demo_graph(now: Timestamp) -> Result<Graph> {
    flatten(&demo_tree(), now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::integrity;

    #[test]
    fn test_demo_graph_is_valid() {
        let graph = demo_graph(1_000).unwrap();
        integrity::validate(&graph).unwrap();
        assert!(integrity::check(&graph).is_empty());
        assert_eq!(graph.links_to(&DocId::new(SHORTCUTS)).len(), 1);
        assert!(graph.field(&FieldId::new(STATUS_FIELD)).is_ok());
    }
}
