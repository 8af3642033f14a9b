//! Version 3: tags on nodes plus the tag table.

use serde::{Deserialize, Serialize};

use super::v4;
use crate::models::{CurrentView, Doc, NodeId, Tag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub v: u32,
    #[serde(default)]
    pub opened_node: Option<NodeId>,
    pub nodes: Vec<Doc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// `openedNode` becomes a node-typed `currentView`.
pub fn migrate(file: SaveFile) -> v4::SaveFile {
    v4::SaveFile {
        v: 4,
        current_view: file
            .opened_node
            .map(|node_id| CurrentView::Node { node_id }),
        debug_mode: None,
        nodes: file.nodes,
        tags: file.tags,
    }
}
