//! The flat doc graph and the engine operating on it.
//!
//! Docs live in one id-addressed map. Ownership (`ownerId`) forms a tree;
//! content references that don't match the target's owner are links and may
//! form cycles. Views are id paths over this map, never object pointers.

mod duplicate;
mod edit;
pub mod integrity;
mod mutate;
mod resolve;
mod rows;
mod tags;

pub use edit::{Focus, Selection};
pub(crate) use mutate::{check_title, clamp_index};
pub use resolve::{Backlink, DocRef, ResolvedView, ViewContext};
pub use rows::{Row, ViewState};

use std::collections::{BTreeMap, HashSet};

use crate::models::{
    Doc, DocId, DocKind, Field, FieldId, NodeId, Property, PropertyId, Tag, TagId, TextNode,
};
use crate::{Error, Result};

/// Title shown for a reference whose target no longer exists.
pub const MISSING_TITLE: &str = "(deleted node)";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    docs: BTreeMap<DocId, Doc>,
    tags: BTreeMap<TagId, Tag>,
}

impl Graph {
    /// An empty graph. Not valid until a root is inserted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding a single root node.
    pub fn with_root(title: impl Into<String>, now: i64) -> (Self, NodeId) {
        let root = TextNode::new(title, None, now);
        let id = root.id.clone();
        let mut graph = Self::new();
        graph.insert(root.into());
        (graph, id)
    }

    /// Build a graph from loose docs and tags. No validation happens here.
    pub fn from_parts(docs: impl IntoIterator<Item = Doc>, tags: impl IntoIterator<Item = Tag>) -> Self {
        Self {
            docs: docs.into_iter().map(|doc| (doc.id(), doc)).collect(),
            tags: tags.into_iter().map(|tag| (tag.id.clone(), tag)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, id: &DocId) -> bool {
        self.docs.contains_key(id)
    }

    pub fn docs(&self) -> impl Iterator<Item = &Doc> {
        self.docs.values()
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = &DocId> {
        self.docs.keys()
    }

    pub fn doc(&self, id: &DocId) -> Result<&Doc> {
        self.docs
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub(crate) fn doc_mut(&mut self, id: &DocId) -> Result<&mut Doc> {
        self.docs
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn node(&self, id: &NodeId) -> Result<&TextNode> {
        let doc = self.doc(&id.to_doc())?;
        doc.as_node().ok_or_else(|| wrong_kind(doc, DocKind::Node))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut TextNode> {
        let doc = self.doc_mut(&id.to_doc())?;
        let found = doc.kind();
        doc.as_node_mut().ok_or_else(|| Error::WrongKind {
            id: id.to_string(),
            expected: DocKind::Node,
            found,
        })
    }

    pub fn property(&self, id: &PropertyId) -> Result<&Property> {
        match self.doc(&id.to_doc())? {
            Doc::Property(property) => Ok(property),
            other => Err(wrong_kind(other, DocKind::Property)),
        }
    }

    pub fn field(&self, id: &FieldId) -> Result<&Field> {
        match self.doc(&id.to_doc())? {
            Doc::Field(field) => Ok(field),
            other => Err(wrong_kind(other, DocKind::Field)),
        }
    }

    /// Narrow an untyped id to a text node id, checking the doc kind.
    pub fn node_id(&self, id: &DocId) -> Result<NodeId> {
        self.expect_kind(id, DocKind::Node).map(|_| id.retag())
    }

    pub fn property_id(&self, id: &DocId) -> Result<PropertyId> {
        self.expect_kind(id, DocKind::Property).map(|_| id.retag())
    }

    pub fn field_id(&self, id: &DocId) -> Result<FieldId> {
        self.expect_kind(id, DocKind::Field).map(|_| id.retag())
    }

    fn expect_kind(&self, id: &DocId, expected: DocKind) -> Result<&Doc> {
        let doc = self.doc(id)?;
        if doc.kind() != expected {
            return Err(wrong_kind(doc, expected));
        }
        Ok(doc)
    }

    /// The unique doc without an owner.
    pub fn root(&self) -> Result<NodeId> {
        let mut roots = self.docs.values().filter(|doc| doc.owner_id().is_none());
        match (roots.next(), roots.next()) {
            (Some(Doc::Node(root)), None) => Ok(root.id.clone()),
            (Some(other), None) => Err(wrong_kind(other, DocKind::Node)),
            (None, _) => Err(Error::Integrity("graph has no root".to_string())),
            (Some(_), Some(_)) => Err(Error::Integrity("graph has more than one root".to_string())),
        }
    }

    /// Whether the reference from `parent` to `child` is the owning one.
    pub fn is_owning_ref(&self, parent: &DocId, child: &DocId) -> bool {
        self.docs
            .get(child)
            .and_then(Doc::owner_id)
            .is_some_and(|owner| &owner == parent)
    }

    /// Whether `ancestor` owns `id`, directly or transitively.
    pub fn owns_transitively(&self, ancestor: &DocId, id: &DocId) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.docs.get(id).and_then(Doc::owner_id);
        while let Some(owner) = current {
            if &owner == ancestor {
                return true;
            }
            if !seen.insert(owner.clone()) {
                return false;
            }
            current = self.docs.get(&owner).and_then(Doc::owner_id);
        }
        false
    }

    /// Ids of `id` and everything it owns, parents before children.
    ///
    /// Only owning references are followed, so content reached through links
    /// is left out.
    pub fn owned_subtree(&self, id: &DocId) -> Vec<DocId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(doc) = self.docs.get(&current) {
                for child in doc.content().iter().rev() {
                    if self.is_owning_ref(&current, &child.node_id) {
                        stack.push(child.node_id.clone());
                    }
                }
            }
            out.push(current);
        }
        out
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn tag(&self, id: &TagId) -> Result<&Tag> {
        self.tags
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub(crate) fn insert(&mut self, doc: Doc) {
        self.docs.insert(doc.id(), doc);
    }

    pub(crate) fn remove(&mut self, id: &DocId) -> Option<Doc> {
        self.docs.remove(id)
    }

    pub(crate) fn tags_mut(&mut self) -> &mut BTreeMap<TagId, Tag> {
        &mut self.tags
    }

    pub fn into_parts(self) -> (Vec<Doc>, Vec<Tag>) {
        (
            self.docs.into_values().collect(),
            self.tags.into_values().collect(),
        )
    }
}

fn wrong_kind(doc: &Doc, expected: DocKind) -> Error {
    Error::WrongKind {
        id: doc.id().to_string(),
        expected,
        found: doc.kind(),
    }
}
