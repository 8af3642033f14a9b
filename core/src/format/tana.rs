//! Import of Tana JSON exports.
//!
//! Tana exports are a flat list of documents. Tuples become properties,
//! attribute definitions become fields, everything else a text node.
//! Inconsistent ownership is repaired and logged rather than rejected.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::graph::{integrity, Graph};
use crate::models::{ChildRef, Doc, DocId, DocKind, Field, History, Property, TextNode, Timestamp};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TanaExport {
    Wrapped { docs: Vec<TanaDoc> },
    Bare(Vec<TanaDoc>),
}

#[derive(Debug, Deserialize)]
struct TanaDoc {
    id: String,
    props: TanaProps,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TanaProps {
    created: Timestamp,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "modifiedTs")]
    modified_ts: Option<ModifiedTs>,
    #[serde(default, rename = "_docType")]
    doc_type: Option<String>,
    #[serde(default, rename = "_ownerId")]
    owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModifiedTs {
    One(Timestamp),
    Many(Vec<Timestamp>),
}

impl ModifiedTs {
    fn latest(&self) -> Option<Timestamp> {
        match self {
            ModifiedTs::One(ts) => Some(*ts),
            ModifiedTs::Many(all) => all.iter().copied().max(),
        }
    }
}

impl TanaDoc {
    fn kind(&self) -> DocKind {
        match self.props.doc_type.as_deref() {
            Some("tuple") => DocKind::Property,
            Some("attrDef") => DocKind::Field,
            _ => DocKind::Node,
        }
    }

    fn title(&self) -> String {
        self.props
            .name
            .as_deref()
            .unwrap_or_default()
            .replace(['\r', '\n'], " ")
    }

    fn history(&self) -> History {
        let mut history = History::new(self.props.created);
        if let Some(modified) = self.props.modified_ts.as_ref().and_then(ModifiedTs::latest) {
            history.touch(modified);
        }
        history
    }
}

/// Import a Tana export into a new graph.
///
/// When the export has no single text-node root, every rootless doc is
/// placed under a synthesized root titled `root_title`.
pub fn import(json: &str, root_title: &str, now: Timestamp) -> Result<Graph> {
    let export: TanaExport =
        serde_json::from_str(json).map_err(|err| Error::Parse(format!("invalid Tana export: {err}")))?;
    let docs = match export {
        TanaExport::Wrapped { docs } | TanaExport::Bare(docs) => docs,
    };
    if docs.is_empty() {
        return Err(Error::Parse("Tana export contains no documents".to_string()));
    }
    let mut seen = HashSet::new();
    for doc in &docs {
        if doc.id.is_empty() || !seen.insert(doc.id.as_str()) {
            return Err(Error::Parse(format!("duplicate or empty Tana id {:?}", doc.id)));
        }
    }

    let declared: HashMap<&str, DocKind> = docs.iter().map(|doc| (doc.id.as_str(), doc.kind())).collect();
    // A tuple is only a property if its first child is a known field.
    let kinds: HashMap<&str, DocKind> = docs
        .iter()
        .map(|doc| {
            let kind = match doc.kind() {
                DocKind::Property
                    if !doc
                        .children
                        .first()
                        .is_some_and(|first| declared.get(first.as_str()) == Some(&DocKind::Field)) =>
                {
                    DocKind::Node
                }
                kind => kind,
            };
            (doc.id.as_str(), kind)
        })
        .collect();

    let owners = resolve_owners(&docs, &kinds);
    let rootless: Vec<&str> = docs
        .iter()
        .map(|doc| doc.id.as_str())
        .filter(|id| !owners.contains_key(id))
        .collect();
    let synthesized = match rootless.as_slice() {
        [only] if kinds.get(only) == Some(&DocKind::Node) => None,
        _ => Some(TextNode::new(root_title, None, now)),
    };
    let fallback_owner = synthesized.as_ref().map(|root| root.id.to_doc());

    let mut out: Vec<Doc> = Vec::with_capacity(docs.len() + 1);
    for doc in &docs {
        let id = DocId::new(doc.id.clone());
        let owner = owners
            .get(doc.id.as_str())
            .map(|owner| DocId::new(*owner))
            .or_else(|| fallback_owner.clone());
        let children: Vec<ChildRef> = doc
            .children
            .iter()
            .filter(|child| {
                let known = kinds.contains_key(child.as_str());
                if !known {
                    debug!(parent = %doc.id, child = %child, "dropping reference to a doc outside the export");
                }
                known
            })
            .map(|child| ChildRef::new(DocId::new(child.clone())))
            .collect();

        let converted = match (kinds[doc.id.as_str()], owner) {
            (DocKind::Field, Some(owner)) => Doc::Field(Field {
                id: id.retag(),
                owner_id: owner.retag(),
                title: doc.title(),
                history: doc.history(),
            }),
            (DocKind::Property, Some(owner)) => {
                let mut property = Property::new(owner.retag(), DocId::new(doc.children[0].clone()).retag(), now);
                property.id = id.retag();
                property.content.extend(children.into_iter().skip(1));
                property.history = doc.history();
                Doc::Property(property)
            }
            (_, owner) => {
                let mut node = TextNode::with_id(id.retag(), doc.title(), owner, doc.props.created);
                node.content = children;
                node.history = doc.history();
                Doc::Node(node)
            }
        };
        out.push(converted);
    }
    if let Some(root) = synthesized {
        debug!(root = %root.id, wrapped = rootless.len(), "synthesized import root");
        out.push(root.into());
    }

    let mut graph = Graph::from_parts(out, Vec::new());
    repair_references(&mut graph, now)?;
    integrity::validate(&graph)?;
    Ok(graph)
}

/// Owners that exist, may own the doc and don't close an ownership cycle.
/// Docs missing from the result are rootless.
fn resolve_owners<'a>(docs: &'a [TanaDoc], kinds: &HashMap<&'a str, DocKind>) -> HashMap<&'a str, &'a str> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for doc in docs {
        let Some(owner) = doc.props.owner_id.as_deref() else {
            continue;
        };
        let valid = owner != doc.id
            && kinds
                .get(owner)
                .is_some_and(|owner_kind| owner_kind.can_own(kinds[doc.id.as_str()]));
        if valid {
            owners.insert(doc.id.as_str(), owner);
        } else {
            warn!(doc = %doc.id, owner = %owner, "ignoring invalid Tana owner");
        }
    }

    let in_cycle: Vec<&str> = owners
        .keys()
        .copied()
        .filter(|start| {
            let mut seen = HashSet::new();
            let mut current = owners.get(start).copied();
            while let Some(owner) = current {
                if owner == *start {
                    return true;
                }
                if !seen.insert(owner) {
                    return false;
                }
                current = owners.get(owner).copied();
            }
            false
        })
        .collect();
    for id in in_cycle {
        warn!(doc = %id, "breaking Tana ownership cycle");
        owners.remove(id);
    }
    owners
}

/// Make every owner list what it owns and drop children a parent kind
/// cannot contain.
fn repair_references(graph: &mut Graph, now: Timestamp) -> Result<()> {
    let ids: Vec<DocId> = graph.doc_ids().cloned().collect();
    for id in &ids {
        let Some(owner_id) = graph.doc(id)?.owner_id() else {
            continue;
        };
        let owner = graph.doc(&owner_id)?;
        if !owner.references(id) {
            if owner.owner_id().is_some() {
                warn!(doc = %id, owner = %owner_id, "owner did not list its child; appending");
            }
            let at = owner.content().len();
            graph.insert_ref(&owner_id, at, ChildRef::new(id.clone()), now)?;
        }
    }

    for id in &ids {
        let bad: Vec<usize> = {
            let doc = graph.doc(id)?;
            doc.content()
                .iter()
                .enumerate()
                .skip(doc.reserved_slots())
                .filter(|(_, child)| {
                    graph
                        .doc(&child.node_id)
                        .is_ok_and(|target| !doc.kind().can_contain(target.kind()))
                })
                .map(|(index, _)| index)
                .collect()
        };
        for index in bad.into_iter().rev() {
            warn!(parent = %id, index, "dropping child the parent kind cannot contain");
            graph.remove_ref_at(id, index, now)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_tree;

    #[test]
    fn test_single_root_is_kept() {
        let json = r#"{"formatVersion":1,"docs":[
            {"id":"r","props":{"created":10,"name":"Home"},"children":["a"]},
            {"id":"a","props":{"created":11,"name":"Child","_ownerId":"r","modifiedTs":[12,40]},"children":[]}
        ]}"#;
        let graph = import(json, "Imported", 100).unwrap();
        assert_eq!(graph.len(), 2);
        let root = graph.root().unwrap();
        assert_eq!(graph.node(&root).unwrap().title, "Home");
        let child = graph.doc(&DocId::new("a")).unwrap();
        assert_eq!(child.history().created_time, 11);
        assert_eq!(child.history().last_modified_time, 40);
    }

    #[test]
    fn test_rootless_docs_are_wrapped() {
        let json = r#"[
            {"id":"a","props":{"created":1,"name":"One"}},
            {"id":"b","props":{"created":2,"name":"Two\nlines"}}
        ]"#;
        let graph = import(json, "Imported", 100).unwrap();
        assert_eq!(graph.len(), 3);
        let root = graph.root().unwrap();
        let root_node = graph.node(&root).unwrap();
        assert_eq!(root_node.title, "Imported");
        assert_eq!(root_node.content.len(), 2);
        assert_eq!(graph.doc(&DocId::new("b")).unwrap().title(), "Two lines");
    }

    #[test]
    fn test_tuples_and_attr_defs() {
        let json = r#"[
            {"id":"r","props":{"created":1,"name":"Home"},"children":["f","n"]},
            {"id":"f","props":{"created":1,"name":"Status","_docType":"attrDef","_ownerId":"r"}},
            {"id":"n","props":{"created":1,"name":"Task","_ownerId":"r"},"children":["t"]},
            {"id":"t","props":{"created":1,"_docType":"tuple","_ownerId":"n"},"children":["f","v"]},
            {"id":"v","props":{"created":1,"name":"Open","_ownerId":"t"}}
        ]"#;
        let graph = import(json, "Imported", 100).unwrap();
        let property = graph.property_id(&DocId::new("t")).unwrap();
        let property = graph.property(&property).unwrap();
        assert_eq!(property.field_id.as_str(), "f");
        assert_eq!(property.values().len(), 1);
        assert!(graph.field_id(&DocId::new("f")).is_ok());
        build_tree(&graph).unwrap();
    }

    #[test]
    fn test_missing_owner_listing_is_repaired() {
        let json = r#"[
            {"id":"r","props":{"created":1,"name":"Home"}},
            {"id":"a","props":{"created":1,"name":"Lost","_ownerId":"r"}},
            {"id":"b","props":{"created":1,"name":"Loop","_ownerId":"c"}},
            {"id":"c","props":{"created":1,"name":"Loop2","_ownerId":"b"},"children":["b"]}
        ]"#;
        let graph = import(json, "Imported", 100).unwrap();
        assert!(graph.doc(&DocId::new("r")).unwrap().references(&DocId::new("a")));
        integrity::validate(&graph).unwrap();
    }

    #[test]
    fn test_malformed_export() {
        assert!(matches!(import("{}", "Imported", 1), Err(Error::Parse(_))));
        assert!(matches!(import("[]", "Imported", 1), Err(Error::Parse(_))));
        let dup = r#"[{"id":"a","props":{"created":1}},{"id":"a","props":{"created":1}}]"#;
        assert!(matches!(import(dup, "Imported", 1), Err(Error::Parse(_))));
    }
}
