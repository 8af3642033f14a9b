use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for text node identifiers.
#[derive(Debug)]
pub enum NodeKind {}

/// Marker for property identifiers.
#[derive(Debug)]
pub enum PropertyKind {}

/// Marker for field definition identifiers.
#[derive(Debug)]
pub enum FieldKind {}

/// Marker for tag identifiers.
#[derive(Debug)]
pub enum TagKind {}

/// Marker for an identifier of any doc kind, as stored in `ownerId` and child references.
#[derive(Debug)]
pub enum AnyDoc {}

/// Opaque string identifier tagged with a kind at compile time only.
///
/// `Id<NodeKind>` and `Id<FieldKind>` cannot be compared or swapped for one
/// another. The tag has no runtime representation: serialized, every id is a
/// bare string.
pub struct Id<K> {
    raw: String,
    _kind: PhantomData<fn() -> K>,
}

pub type NodeId = Id<NodeKind>;
pub type PropertyId = Id<PropertyKind>;
pub type FieldId = Id<FieldKind>;
pub type TagId = Id<TagKind>;
pub type DocId = Id<AnyDoc>;

/// Kinds whose identifiers name a doc in the graph.
pub trait DocIdKind {}

impl DocIdKind for NodeKind {}
impl DocIdKind for PropertyKind {}
impl DocIdKind for FieldKind {}

impl<K> Id<K> {
    /// Wrap an existing identifier string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _kind: PhantomData,
        }
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }

    /// Change the kind tag. Only the graph calls this, after checking the doc kind.
    pub(crate) fn retag<K2>(&self) -> Id<K2> {
        Id::new(self.raw.clone())
    }
}

impl<K: DocIdKind> Id<K> {
    /// Erase the kind so the id can sit in a content list or `ownerId`.
    pub fn to_doc(&self) -> DocId {
        self.retag()
    }
}

impl<K: DocIdKind> From<Id<K>> for DocId {
    fn from(id: Id<K>) -> Self {
        Id::new(id.raw)
    }
}

impl<K: DocIdKind> From<&Id<K>> for DocId {
    fn from(id: &Id<K>) -> Self {
        id.to_doc()
    }
}

impl<K: DocIdKind> PartialEq<Id<K>> for DocId {
    fn eq(&self, other: &Id<K>) -> bool {
        self.raw == other.raw
    }
}

impl<K> Clone for Id<K> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<K> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Id<K> {}

impl<K> Hash for Id<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> PartialOrd for Id<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Id<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}

impl<K> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<K> Serialize for Id<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de, K> Deserialize<'de> for Id<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(serde::de::Error::custom("identifier must not be empty"));
        }
        Ok(Self::new(raw))
    }
}
