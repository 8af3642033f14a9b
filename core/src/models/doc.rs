use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Checkbox, CheckboxEntry, DocId, FieldId, NodeId, PropertyId, TagId, Timestamp};

/// The three kinds of graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Node,
    Property,
    Field,
}

impl DocKind {
    /// Whether a doc of this kind may list a doc of `child` kind in its content.
    pub fn can_contain(self, child: DocKind) -> bool {
        match self {
            DocKind::Node => true,
            // Fields only appear in a property's key slot.
            DocKind::Property => child != DocKind::Property,
            DocKind::Field => false,
        }
    }

    /// Whether a doc of this kind may own a doc of `child` kind.
    pub fn can_own(self, child: DocKind) -> bool {
        match self {
            DocKind::Node => true,
            DocKind::Property => child == DocKind::Node,
            DocKind::Field => false,
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Node => f.write_str("node"),
            DocKind::Property => f.write_str("property"),
            DocKind::Field => f.write_str("field"),
        }
    }
}

/// A reference from a parent's content list to a child doc.
///
/// Expansion lives on the reference, so one node can be expanded in one place
/// and collapsed in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRef {
    pub node_id: DocId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
}

impl ChildRef {
    pub fn new(node_id: impl Into<DocId>) -> Self {
        Self {
            node_id: node_id.into(),
            expanded: None,
        }
    }

    pub fn with_expanded(node_id: impl Into<DocId>, expanded: bool) -> Self {
        Self {
            node_id: node_id.into(),
            expanded: Some(expanded),
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub created_time: Timestamp,
    pub last_modified_time: Timestamp,
    /// Most-recent-first log of checkbox transitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkbox: Vec<CheckboxEntry>,
}

impl History {
    pub fn new(now: Timestamp) -> Self {
        Self {
            created_time: now,
            last_modified_time: now,
            checkbox: Vec::new(),
        }
    }

    /// Bump the modification time, never moving it backwards.
    pub fn touch(&mut self, now: Timestamp) {
        self.last_modified_time = self.last_modified_time.max(now).max(self.created_time);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub id: NodeId,
    pub title: String,
    /// `None` only for the graph root.
    pub owner_id: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkbox: Option<Checkbox>,
    #[serde(default)]
    pub content: Vec<ChildRef>,
    pub history: History,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagId>,
}

impl TextNode {
    /// Create a new text node with a generated id
    pub fn new(title: impl Into<String>, owner_id: Option<DocId>, now: Timestamp) -> Self {
        Self::with_id(NodeId::generate(), title, owner_id, now)
    }

    /// Create a text node with a specific id (for import or authored trees)
    pub fn with_id(
        id: NodeId,
        title: impl Into<String>,
        owner_id: Option<DocId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            owner_id,
            checkbox: None,
            content: Vec::new(),
            history: History::new(now),
            tags: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// A field value attached to a text node.
///
/// `content[0]` is the key slot and always links to `field_id`; the values
/// are `content[1..]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: NodeId,
    pub field_id: FieldId,
    pub content: Vec<ChildRef>,
    pub history: History,
}

impl Property {
    pub fn new(owner_id: NodeId, field_id: FieldId, now: Timestamp) -> Self {
        Self {
            id: PropertyId::generate(),
            content: vec![ChildRef::new(&field_id)],
            owner_id,
            field_id,
            history: History::new(now),
        }
    }

    /// The value references, without the key slot.
    pub fn values(&self) -> &[ChildRef] {
        self.content.get(1..).unwrap_or(&[])
    }
}

/// A named field definition, owned by the text node that defines it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub owner_id: NodeId,
    pub title: String,
    pub history: History,
}

impl Field {
    pub fn new(owner_id: NodeId, title: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: FieldId::generate(),
            owner_id,
            title: title.into(),
            history: History::new(now),
        }
    }
}

/// Any graph entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Doc {
    Node(TextNode),
    Property(Property),
    Field(Field),
}

impl Doc {
    pub fn id(&self) -> DocId {
        match self {
            Doc::Node(node) => node.id.to_doc(),
            Doc::Property(property) => property.id.to_doc(),
            Doc::Field(field) => field.id.to_doc(),
        }
    }

    pub fn kind(&self) -> DocKind {
        match self {
            Doc::Node(_) => DocKind::Node,
            Doc::Property(_) => DocKind::Property,
            Doc::Field(_) => DocKind::Field,
        }
    }

    pub fn owner_id(&self) -> Option<DocId> {
        match self {
            Doc::Node(node) => node.owner_id.clone(),
            Doc::Property(property) => Some(property.owner_id.to_doc()),
            Doc::Field(field) => Some(field.owner_id.to_doc()),
        }
    }

    /// Child references. Fields have none.
    pub fn content(&self) -> &[ChildRef] {
        match self {
            Doc::Node(node) => &node.content,
            Doc::Property(property) => &property.content,
            Doc::Field(_) => &[],
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<ChildRef>> {
        match self {
            Doc::Node(node) => Some(&mut node.content),
            Doc::Property(property) => Some(&mut property.content),
            Doc::Field(_) => None,
        }
    }

    /// Index of the first reference to `id` in this doc's content.
    pub fn position_of(&self, id: &DocId) -> Option<usize> {
        self.content().iter().position(|child| &child.node_id == id)
    }

    pub fn references(&self, id: &DocId) -> bool {
        self.position_of(id).is_some()
    }

    /// Title for display; properties show their field id.
    pub fn title(&self) -> &str {
        match self {
            Doc::Node(node) => &node.title,
            Doc::Property(property) => property.field_id.as_str(),
            Doc::Field(field) => &field.title,
        }
    }

    pub fn history(&self) -> &History {
        match self {
            Doc::Node(node) => &node.history,
            Doc::Property(property) => &property.history,
            Doc::Field(field) => &field.history,
        }
    }

    pub fn history_mut(&mut self) -> &mut History {
        match self {
            Doc::Node(node) => &mut node.history,
            Doc::Property(property) => &mut property.history,
            Doc::Field(field) => &mut field.history,
        }
    }

    /// Index of the reserved key slot, if this doc has one.
    pub fn reserved_slots(&self) -> usize {
        match self {
            Doc::Property(_) => 1,
            _ => 0,
        }
    }

    pub fn as_node(&self) -> Option<&TextNode> {
        match self {
            Doc::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut TextNode> {
        match self {
            Doc::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl From<TextNode> for Doc {
    fn from(node: TextNode) -> Self {
        Doc::Node(node)
    }
}

impl From<Property> for Doc {
    fn from(property: Property) -> Self {
        Doc::Property(property)
    }
}

impl From<Field> for Doc {
    fn from(field: Field) -> Self {
        Doc::Field(field)
    }
}
