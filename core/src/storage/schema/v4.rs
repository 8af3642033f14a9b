//! Version 4, the current shape: a polymorphic `currentView` and an optional
//! debug flag.

use serde::{Deserialize, Serialize};

use crate::graph::{integrity, Graph};
use crate::models::{CurrentView, Doc, Tag};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFile {
    pub v: u32,
    #[serde(default)]
    pub current_view: Option<CurrentView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_mode: Option<bool>,
    pub nodes: Vec<Doc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl SaveFile {
    /// Snapshot a graph for writing.
    pub fn from_graph(graph: &Graph, current_view: Option<CurrentView>, debug_mode: bool) -> Self {
        Self {
            v: super::CURRENT_VERSION,
            current_view,
            debug_mode: debug_mode.then_some(true),
            nodes: graph.docs().cloned().collect(),
            tags: graph.tags().cloned().collect(),
        }
    }

    /// Rebuild the graph, failing on any hard integrity violation.
    pub fn to_graph(&self) -> Result<Graph> {
        let graph = Graph::from_parts(self.nodes.iter().cloned(), self.tags.iter().cloned());
        integrity::validate(&graph)?;
        Ok(graph)
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode.unwrap_or(false)
    }
}
