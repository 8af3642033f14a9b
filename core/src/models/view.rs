use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::{DocId, NodeId, TagId};
use crate::{Error, Result};

/// One rendered occurrence of a doc: the doc plus the chain of ancestor docs
/// it is displayed under, stored root-to-leaf.
///
/// Views are plain values. Two views are equal when their id chains are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeView {
    path: Vec<DocId>,
}

impl NodeView {
    /// A view with no parent.
    pub fn root(node_id: impl Into<DocId>) -> Self {
        Self {
            path: vec![node_id.into()],
        }
    }

    /// Build a view from a root-to-leaf id chain.
    pub fn from_path(path: Vec<DocId>) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidInput("node view path is empty".to_string()));
        }
        Ok(Self { path })
    }

    /// The view of `child` nested under this view.
    pub fn child(&self, child: impl Into<DocId>) -> Self {
        let mut path = self.path.clone();
        path.push(child.into());
        Self { path }
    }

    pub fn node_id(&self) -> &DocId {
        // `path` is never empty.
        &self.path[self.path.len() - 1]
    }

    pub fn parent(&self) -> Option<NodeView> {
        if self.path.len() < 2 {
            return None;
        }
        Some(Self {
            path: self.path[..self.path.len() - 1].to_vec(),
        })
    }

    pub fn parent_id(&self) -> Option<&DocId> {
        self.path.len().checked_sub(2).map(|index| &self.path[index])
    }

    pub fn has_parent(&self) -> bool {
        self.path.len() > 1
    }

    /// Number of ancestors above the node.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn path(&self) -> &[DocId] {
        &self.path
    }

    /// True when some doc occurs twice in the ancestor chain, meaning this
    /// occurrence was reached through a link cycle.
    pub fn is_recursive(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.path.len());
        self.path.iter().any(|id| !seen.insert(id))
    }

    /// Whether `other` is this view or nested below it.
    pub fn contains(&self, other: &NodeView) -> bool {
        other.path.len() >= self.path.len() && other.path[..self.path.len()] == self.path[..]
    }
}

impl fmt::Display for NodeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.path {
            if !first {
                f.write_str("/")?;
            }
            f.write_str(id.as_str())?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for NodeView {
    type Err = Error;

    /// Parse `ancestorId/.../parentId/nodeId`.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidInput("empty node view string".to_string()));
        }
        let path = s
            .split('/')
            .map(|segment| {
                if segment.is_empty() {
                    Err(Error::InvalidInput(format!(
                        "node view has an empty segment: {s}"
                    )))
                } else {
                    Ok(DocId::new(segment))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_path(path)
    }
}

/// What the main pane is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurrentView {
    Node {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },
    Tag {
        #[serde(rename = "tagId")]
        tag_id: TagId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(ids: &[&str]) -> NodeView {
        NodeView::from_path(ids.iter().map(|id| DocId::new(*id)).collect()).unwrap()
    }

    #[test]
    fn test_string_round_trip() {
        let v = view(&["root", "a", "b"]);
        assert_eq!(v.to_string(), "root/a/b");
        assert_eq!("root/a/b".parse::<NodeView>().unwrap(), v);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!("".parse::<NodeView>().is_err());
        assert!("a//b".parse::<NodeView>().is_err());
    }

    #[test]
    fn test_parent_chain() {
        let v = view(&["root", "a", "b"]);
        assert_eq!(v.node_id().as_str(), "b");
        assert_eq!(v.parent_id().map(|id| id.as_str()), Some("a"));
        assert_eq!(v.parent().unwrap(), view(&["root", "a"]));
        assert!(NodeView::root(DocId::new("root")).parent().is_none());
        assert_eq!(v.depth(), 2);
    }

    #[test]
    fn test_is_recursive() {
        assert!(!view(&["root", "a", "b"]).is_recursive());
        assert!(view(&["root", "a", "b", "a"]).is_recursive());
        assert!(view(&["a", "a"]).is_recursive());
    }

    #[test]
    fn test_contains() {
        let parent = view(&["root", "a"]);
        assert!(parent.contains(&view(&["root", "a", "b"])));
        assert!(parent.contains(&parent));
        assert!(!parent.contains(&view(&["root", "b"])));
    }

    #[test]
    fn test_current_view_json() {
        let current = CurrentView::Node {
            node_id: NodeId::new("n1"),
        };
        let json = serde_json::to_string(&current).unwrap();
        assert_eq!(json, r#"{"type":"node","nodeId":"n1"}"#);
    }
}
