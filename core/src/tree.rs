//! Nested, author-friendly trees and their conversion to and from the graph.
//!
//! Trees are what clipboard payloads, imports, demo content and debug dumps
//! are written in. Ids are optional; missing ones are generated on flatten.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::graph::{integrity, Graph};
use crate::models::{
    Checkbox, ChildRef, Doc, DocId, DocKind, Field, FieldId, History, NodeId, Property, PropertyId,
    TagId, TextNode, Timestamp,
};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeNode {
    Node {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NodeId>,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checkbox: Option<Checkbox>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expanded: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        history: Option<History>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<TagId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<TreeNode>,
    },
    Property {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<PropertyId>,
        #[serde(rename = "fieldId")]
        field_id: FieldId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expanded: Option<bool>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<TreeNode>,
    },
    Field {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<FieldId>,
        title: String,
    },
    /// A reference to a doc defined elsewhere, without its content.
    NodeLink {
        id: DocId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expanded: Option<bool>,
    },
}

impl TreeNode {
    /// A plain text node with no id and no children.
    pub fn text(title: impl Into<String>) -> Self {
        TreeNode::Node {
            id: None,
            title: title.into(),
            checkbox: None,
            expanded: None,
            history: None,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style child append; no-op on fields and links.
    pub fn with_children(mut self, new_children: Vec<TreeNode>) -> Self {
        match &mut self {
            TreeNode::Node { children, .. } | TreeNode::Property { children, .. } => {
                children.extend(new_children)
            }
            TreeNode::Field { .. } | TreeNode::NodeLink { .. } => {}
        }
        self
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            TreeNode::Node { title, .. } | TreeNode::Field { title, .. } => Some(title),
            TreeNode::Property { .. } | TreeNode::NodeLink { .. } => None,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Node { children, .. } | TreeNode::Property { children, .. } => children,
            TreeNode::Field { .. } | TreeNode::NodeLink { .. } => &[],
        }
    }

    fn kind(&self) -> Option<DocKind> {
        match self {
            TreeNode::Node { .. } => Some(DocKind::Node),
            TreeNode::Property { .. } => Some(DocKind::Property),
            TreeNode::Field { .. } => Some(DocKind::Field),
            TreeNode::NodeLink { .. } => None,
        }
    }
}

/// Accumulates flattened docs before they touch a graph.
struct Flattener<'g> {
    existing: Option<&'g Graph>,
    docs: BTreeMap<DocId, Doc>,
    now: Timestamp,
}

impl Flattener<'_> {
    fn claim(&self, id: &DocId) -> Result<()> {
        if self.docs.contains_key(id) || self.existing.is_some_and(|graph| graph.contains(id)) {
            return Err(Error::Integrity(format!("doc {id} is defined twice")));
        }
        Ok(())
    }

    /// A text node whose id is already in the target graph stands for that
    /// node, so it becomes a link and its nested content is not re-created.
    fn existing_node(&self, tree: &TreeNode) -> Option<ChildRef> {
        let TreeNode::Node {
            id: Some(id),
            expanded,
            ..
        } = tree
        else {
            return None;
        };
        let doc_id = id.to_doc();
        let graph = self.existing?;
        if !graph.contains(&doc_id) {
            return None;
        }
        debug!(doc = %doc_id, "node already in the graph; linking it");
        Some(ChildRef {
            node_id: doc_id,
            expanded: *expanded,
        })
    }

    /// Flatten one tree node owned by `owner`, returning the reference the
    /// owner should hold.
    fn flatten(&mut self, tree: &TreeNode, owner: Option<(&DocId, DocKind)>) -> Result<ChildRef> {
        if let Some(child_ref) = self.existing_node(tree) {
            return Ok(child_ref);
        }
        if let (Some((owner_id, owner_kind)), Some(kind)) = (owner, tree.kind()) {
            if !owner_kind.can_own(kind) {
                return Err(Error::Integrity(format!(
                    "{owner_kind} {owner_id} cannot own a {kind}"
                )));
            }
        }
        match tree {
            TreeNode::Node {
                id,
                title,
                checkbox,
                expanded,
                history,
                tags,
                children,
            } => {
                crate::graph::check_title(title)?;
                let id = id.clone().unwrap_or_else(NodeId::generate);
                let doc_id = id.to_doc();
                self.claim(&doc_id)?;
                let mut node = TextNode::with_id(id, title.clone(), owner.map(|(o, _)| o.clone()), self.now);
                node.checkbox = *checkbox;
                node.tags = tags.clone();
                if let Some(history) = history {
                    node.history = history.clone();
                }
                // Reserve the id before descending so children can't reuse it.
                self.docs.insert(doc_id.clone(), node.clone().into());
                node.content = self.flatten_children(children, &doc_id, DocKind::Node)?;
                self.docs.insert(doc_id.clone(), node.into());
                Ok(ChildRef {
                    node_id: doc_id,
                    expanded: *expanded,
                })
            }
            TreeNode::Property {
                id,
                field_id,
                expanded,
                children,
            } => {
                let (owner_id, _) = owner.ok_or_else(|| {
                    Error::Integrity("property without an owning text node".to_string())
                })?;
                let id = id.clone().unwrap_or_else(PropertyId::generate);
                let doc_id = id.to_doc();
                self.claim(&doc_id)?;
                let mut property = Property::new(owner_id.retag(), field_id.clone(), self.now);
                property.id = id;
                self.docs.insert(doc_id.clone(), property.clone().into());
                let values = self.flatten_children(children, &doc_id, DocKind::Property)?;
                property.content.extend(values);
                self.docs.insert(doc_id.clone(), property.into());
                Ok(ChildRef {
                    node_id: doc_id,
                    expanded: *expanded,
                })
            }
            TreeNode::Field { id, title } => {
                let (owner_id, _) = owner.ok_or_else(|| {
                    Error::Integrity("field without an owning text node".to_string())
                })?;
                crate::graph::check_title(title)?;
                let mut field = Field::new(owner_id.retag(), title.clone(), self.now);
                if let Some(id) = id {
                    field.id = id.clone();
                }
                let doc_id = field.id.to_doc();
                self.claim(&doc_id)?;
                self.docs.insert(doc_id.clone(), field.into());
                Ok(ChildRef::new(doc_id))
            }
            TreeNode::NodeLink { id, expanded } => Ok(ChildRef {
                node_id: id.clone(),
                expanded: *expanded,
            }),
        }
    }

    fn flatten_children(
        &mut self,
        children: &[TreeNode],
        owner_id: &DocId,
        owner_kind: DocKind,
    ) -> Result<Vec<ChildRef>> {
        let mut refs: Vec<ChildRef> = Vec::with_capacity(children.len());
        for child in children {
            let child_ref = self.flatten(child, Some((owner_id, owner_kind)))?;
            if let Some(kind) = self.kind_of(&child_ref.node_id) {
                if !owner_kind.can_contain(kind) {
                    return Err(Error::Integrity(format!(
                        "{owner_kind} {owner_id} cannot contain a {kind}"
                    )));
                }
            }
            if refs.iter().any(|existing| existing.node_id == child_ref.node_id) {
                continue;
            }
            refs.push(child_ref);
        }
        Ok(refs)
    }

    fn kind_of(&self, id: &DocId) -> Option<DocKind> {
        self.docs
            .get(id)
            .map(Doc::kind)
            .or_else(|| self.existing.and_then(|graph| graph.doc(id).ok().map(Doc::kind)))
    }

    /// Every property must point at a field that exists somewhere.
    fn check_fields(&self) -> Result<()> {
        for doc in self.docs.values() {
            if let Doc::Property(property) = doc {
                let field = property.field_id.to_doc();
                if self.kind_of(&field) != Some(DocKind::Field) {
                    return Err(Error::Integrity(format!(
                        "property {} refers to unknown field {field}",
                        property.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Flatten a whole tree into a new graph; the tree's top node becomes the root.
pub fn flatten(tree: &TreeNode, now: Timestamp) -> Result<Graph> {
    if tree.kind() != Some(DocKind::Node) {
        return Err(Error::Integrity("the root of a tree must be a text node".to_string()));
    }
    let mut flattener = Flattener {
        existing: None,
        docs: BTreeMap::new(),
        now,
    };
    flattener.flatten(tree, None)?;
    flattener.check_fields()?;
    let graph = Graph::from_parts(flattener.docs.into_values(), Vec::new());
    integrity::validate(&graph)?;
    Ok(graph)
}

/// Flatten `trees` into an existing graph as children of `parent_id`,
/// starting at `index`. Returns the ids of the inserted top-level docs.
///
/// Nothing is inserted unless every tree flattens cleanly.
pub fn flatten_into(
    graph: &mut Graph,
    trees: &[TreeNode],
    parent_id: &DocId,
    index: usize,
    now: Timestamp,
) -> Result<Vec<DocId>> {
    let parent_kind = graph.doc(parent_id)?.kind();
    let mut flattener = Flattener {
        existing: Some(&*graph),
        docs: BTreeMap::new(),
        now,
    };
    let refs = flattener.flatten_children(trees, parent_id, parent_kind)?;
    flattener.check_fields()?;
    let docs = flattener.docs;

    let inserted: Vec<DocId> = refs.iter().map(|child| child.node_id.clone()).collect();
    for doc in docs.into_values() {
        graph.insert(doc);
    }
    let mut at = crate::graph::clamp_index(index, graph.doc(parent_id)?);
    for child in refs {
        if graph.doc(parent_id)?.references(&child.node_id) {
            continue;
        }
        graph.insert_ref(parent_id, at, child, now)?;
        at += 1;
    }
    Ok(inserted)
}

/// Rebuild the nested tree from the graph root.
///
/// Docs not reached from the root are logged as orphans.
pub fn build_tree(graph: &Graph) -> Result<TreeNode> {
    let root = graph.root()?;
    let mut visited = HashSet::new();
    let tree = build(graph, &root.to_doc(), None, &mut visited)?;
    for id in graph.doc_ids().filter(|id| !visited.contains(*id)) {
        warn!(doc = %id, "orphaned doc is unreachable from the root");
    }
    Ok(tree)
}

/// Rebuild the tree below one doc. Content it doesn't own becomes `nodeLink`.
pub fn build_subtree(graph: &Graph, id: &DocId) -> Result<TreeNode> {
    let mut visited = HashSet::new();
    build(graph, id, None, &mut visited)
}

fn build(
    graph: &Graph,
    id: &DocId,
    expanded: Option<bool>,
    visited: &mut HashSet<DocId>,
) -> Result<TreeNode> {
    visited.insert(id.clone());
    let doc = graph.doc(id)?;
    let mut children = Vec::new();
    for child in doc.content().iter().skip(doc.reserved_slots()) {
        let owned = graph.is_owning_ref(id, &child.node_id);
        if !graph.contains(&child.node_id) {
            warn!(parent = %id, target = %child.node_id, "dangling reference kept as link");
        }
        if owned && !visited.contains(&child.node_id) {
            children.push(build(graph, &child.node_id, child.expanded, visited)?);
        } else {
            children.push(TreeNode::NodeLink {
                id: child.node_id.clone(),
                expanded: child.expanded,
            });
        }
    }

    Ok(match doc {
        Doc::Node(node) => TreeNode::Node {
            id: Some(node.id.clone()),
            title: node.title.clone(),
            checkbox: node.checkbox,
            expanded,
            history: Some(node.history.clone()),
            tags: node.tags.clone(),
            children,
        },
        Doc::Property(property) => TreeNode::Property {
            id: Some(property.id.clone()),
            field_id: property.field_id.clone(),
            expanded,
            children,
        },
        Doc::Field(field) => TreeNode::Field {
            id: Some(field.id.clone()),
            title: field.title.clone(),
        },
    })
}
