//! Version 2: bare tri-state checkboxes, no tags yet.

use serde::{Deserialize, Serialize};

use super::v3;
use crate::models::{self, Checkbox, ChildRef, DocId, Field, History, NodeId, Property};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub id: NodeId,
    pub title: String,
    pub owner_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkbox: Option<Checkbox>,
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

/// Add the (empty) tag collections.
pub fn migrate(file: SaveFile) -> v3::SaveFile {
    v3::SaveFile {
        v: 3,
        opened_node: file.opened_node,
        nodes: file
            .nodes
            .into_iter()
            .map(|doc| match doc {
                Doc::Node(node) => models::Doc::Node(models::TextNode {
                    id: node.id,
                    title: node.title,
                    owner_id: node.owner_id,
                    checkbox: node.checkbox,
                    content: node.content,
                    history: node.history,
                    tags: Vec::new(),
                }),
                Doc::Property(property) => models::Doc::Property(property),
                Doc::Field(field) => models::Doc::Field(field),
            })
            .collect(),
        tags: Vec::new(),
    }
}
