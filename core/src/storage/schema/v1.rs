//! Version 1: checkbox states are wrapped in `{ "type": "checkbox", "state" }`
//! objects and the open page is a bare node id.

use serde::{Deserialize, Serialize};

use super::v2;
use crate::models::{Checkbox, ChildRef, CheckboxEntry, DocId, Field, History as CurrentHistory, NodeId, Property, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WrappedCheckbox {
    Checkbox { state: Checkbox },
}

impl WrappedCheckbox {
    pub fn state(self) -> Checkbox {
        match self {
            WrappedCheckbox::Checkbox { state } => state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
    #[serde(default)]
    pub checkbox: Vec<(Timestamp, Option<WrappedCheckbox>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub id: NodeId,
    pub title: String,
    pub owner_id: Option<DocId>,
    #[serde(default)]
    pub checkbox: Option<WrappedCheckbox>,
    #[serde(default)]
    pub content: Vec<ChildRef>,
    pub history: History,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Doc {
    Node(TextNode),
    Property(Property),
    Field(Field),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub v: u32,
    #[serde(default)]
    pub opened_node: Option<NodeId>,
    pub nodes: Vec<Doc>,
}

fn migrate_node(node: TextNode) -> v2::TextNode {
    v2::TextNode {
        id: node.id,
        title: node.title,
        owner_id: node.owner_id,
        checkbox: node.checkbox.map(WrappedCheckbox::state),
        content: node.content,
        history: CurrentHistory {
            created_time: node.history.created_time,
            last_modified_time: node.history.last_modified_time,
            checkbox: node
                .history
                .checkbox
                .into_iter()
                .map(|(at, state)| CheckboxEntry(at, state.map(WrappedCheckbox::state)))
                .collect(),
        },
    }
}

/// Unwrap every checkbox state.
pub fn migrate(file: SaveFile) -> v2::SaveFile {
    v2::SaveFile {
        v: 2,
        opened_node: file.opened_node,
        nodes: file
            .nodes
            .into_iter()
            .map(|doc| match doc {
                Doc::Node(node) => v2::Doc::Node(migrate_node(node)),
                Doc::Property(property) => v2::Doc::Property(property),
                Doc::Field(field) => v2::Doc::Field(field),
            })
            .collect(),
    }
}
