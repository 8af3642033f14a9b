//! Primitive invariant-preserving mutations.
//!
//! Every operation validates its inputs before touching the graph, so a
//! returned error means nothing changed.

use tracing::debug;

use super::Graph;
use crate::models::{
    record_transition, Checkbox, ChildRef, Doc, DocId, DocKind, Field, FieldId, NodeId, Property,
    PropertyId, TextNode, Timestamp,
};
use crate::{Error, Result};

/// Clamp an insertion index past any reserved slot and to the content length.
pub(crate) fn clamp_index(index: usize, parent: &Doc) -> usize {
    index.max(parent.reserved_slots()).min(parent.content().len())
}

pub(crate) fn check_title(title: &str) -> Result<()> {
    if title.contains('\n') || title.contains('\r') {
        return Err(Error::InvalidInput(
            "title must not contain a newline".to_string(),
        ));
    }
    Ok(())
}

impl Graph {
    /// Insert a new text node owned by `owner_id` at `index_in_owner`
    /// (clamped to the owner's content length).
    pub fn create_node(
        &mut self,
        title: &str,
        owner_id: &DocId,
        index_in_owner: usize,
        checkbox: Option<Checkbox>,
        now: Timestamp,
    ) -> Result<NodeId> {
        check_title(title)?;
        let owner = self.doc(owner_id)?;
        if !owner.kind().can_own(DocKind::Node) {
            return Err(Error::Integrity(format!(
                "{} {owner_id} cannot own a text node",
                owner.kind()
            )));
        }
        let index = clamp_index(index_in_owner, owner);

        let mut node = TextNode::new(title, Some(owner_id.clone()), now);
        node.checkbox = checkbox;
        let id = node.id.clone();
        self.insert(node.into());
        self.insert_ref(owner_id, index, ChildRef::new(&id), now)?;
        debug!(node = %id, owner = %owner_id, index, "created node");
        Ok(id)
    }

    /// Define a new field on a text node, appended to its content.
    pub fn create_field(&mut self, owner_id: &NodeId, title: &str, now: Timestamp) -> Result<FieldId> {
        check_title(title)?;
        let owner_len = self.node(owner_id)?.content.len();
        let field = Field::new(owner_id.clone(), title, now);
        let id = field.id.clone();
        self.insert(field.into());
        self.insert_ref(&owner_id.to_doc(), owner_len, ChildRef::new(&id), now)?;
        Ok(id)
    }

    /// Attach a property for `field_id` to a text node. The property's key
    /// slot links to the field; values are added with `create_node`.
    pub fn create_property(
        &mut self,
        owner_id: &NodeId,
        field_id: &FieldId,
        now: Timestamp,
    ) -> Result<PropertyId> {
        let owner_len = self.node(owner_id)?.content.len();
        self.field(field_id)?;
        let property = Property::new(owner_id.clone(), field_id.clone(), now);
        let id = property.id.clone();
        self.insert(property.into());
        self.insert_ref(&owner_id.to_doc(), owner_len, ChildRef::new(&id), now)?;
        Ok(id)
    }

    /// Insert a reference to `child_id` into `parent_id`'s content.
    ///
    /// Returns `false` without changing anything when the parent already
    /// references the child.
    pub fn add_child_reference(
        &mut self,
        parent_id: &DocId,
        child_id: &DocId,
        index: usize,
        expanded: Option<bool>,
        now: Timestamp,
    ) -> Result<bool> {
        let child_kind = self.doc(child_id)?.kind();
        let parent = self.doc(parent_id)?;
        if parent.references(child_id) {
            return Ok(false);
        }
        if !parent.kind().can_contain(child_kind) {
            return Err(Error::Integrity(format!(
                "{} {parent_id} cannot contain {child_kind} {child_id}",
                parent.kind()
            )));
        }
        let index = clamp_index(index, parent);
        self.insert_ref(
            parent_id,
            index,
            ChildRef {
                node_id: child_id.clone(),
                expanded,
            },
            now,
        )?;
        Ok(true)
    }

    /// Add a link to an existing text node.
    pub fn link_node(
        &mut self,
        parent_id: &DocId,
        node_id: &NodeId,
        index: usize,
        now: Timestamp,
    ) -> Result<bool> {
        self.node(node_id)?;
        self.add_child_reference(parent_id, &node_id.to_doc(), index, None, now)
    }

    /// Remove a link reference. The owning reference can't be removed this way.
    pub fn remove_link(&mut self, parent_id: &DocId, node_id: &DocId, now: Timestamp) -> Result<()> {
        let parent = self.doc(parent_id)?;
        let index = parent.position_of(node_id).ok_or_else(|| {
            Error::Integrity(format!("{parent_id} does not reference {node_id}"))
        })?;
        if index < parent.reserved_slots() {
            return Err(Error::Integrity(format!(
                "the key slot of property {parent_id} cannot be removed"
            )));
        }
        if self.is_owning_ref(parent_id, node_id) {
            return Err(Error::Integrity(format!(
                "{parent_id} owns {node_id}; delete or move it instead of unlinking"
            )));
        }
        self.remove_ref_at(parent_id, index, now)?;
        Ok(())
    }

    /// Move the reference to `node_id` from `old_parent_id` to
    /// `new_parent_id` at `new_index`.
    ///
    /// Moving the owning reference transfers ownership; moving a link leaves
    /// the owner alone. `new_index` counts positions after the removal.
    pub fn move_node(
        &mut self,
        node_id: &DocId,
        old_parent_id: &DocId,
        new_parent_id: &DocId,
        new_index: usize,
        now: Timestamp,
    ) -> Result<()> {
        let node = self.doc(node_id)?;
        let node_kind = node.kind();
        let transfers_ownership = node.owner_id().as_ref() == Some(old_parent_id);

        let old_parent = self.doc(old_parent_id)?;
        let old_index = old_parent.position_of(node_id).ok_or_else(|| {
            Error::Integrity(format!("{old_parent_id} does not reference {node_id}"))
        })?;
        if old_index < old_parent.reserved_slots() {
            return Err(Error::Integrity(format!(
                "the key slot of property {old_parent_id} cannot be moved"
            )));
        }

        let new_parent = self.doc(new_parent_id)?;
        if !new_parent.kind().can_contain(node_kind) {
            return Err(Error::Integrity(format!(
                "{} {new_parent_id} cannot contain {node_kind} {node_id}",
                new_parent.kind()
            )));
        }
        if transfers_ownership {
            if !new_parent.kind().can_own(node_kind) {
                return Err(Error::Integrity(format!(
                    "{} {new_parent_id} cannot own {node_kind} {node_id}",
                    new_parent.kind()
                )));
            }
            if new_parent_id == node_id || self.owns_transitively(node_id, new_parent_id) {
                return Err(Error::Integrity(format!(
                    "moving {node_id} under {new_parent_id} would make it its own ancestor"
                )));
            }
        }
        let existing_in_new = if new_parent_id == old_parent_id {
            None
        } else {
            new_parent.position_of(node_id)
        };

        let moved = self.remove_ref_at(old_parent_id, old_index, now)?;
        let mut new_index = new_index;
        if let Some(existing) = existing_in_new {
            // The new parent already linked the node; the moved reference replaces it.
            self.remove_ref_at(new_parent_id, existing, now)?;
            if existing < new_index {
                new_index -= 1;
            }
        }
        let index = clamp_index(new_index, self.doc(new_parent_id)?);
        self.insert_ref(new_parent_id, index, moved, now)?;

        if transfers_ownership {
            self.set_owner(node_id, new_parent_id)?;
        }
        debug!(node = %node_id, from = %old_parent_id, to = %new_parent_id, transfers_ownership, "moved node");
        Ok(())
    }

    /// Delete `node_id` and everything it owns. Links elsewhere that point
    /// into the deleted subtree are left dangling and resolve as missing.
    pub fn delete_subtree(&mut self, node_id: &DocId, now: Timestamp) -> Result<Vec<DocId>> {
        let doc = self.doc(node_id)?;
        let owner_id = doc
            .owner_id()
            .ok_or_else(|| Error::Integrity("the root cannot be deleted".to_string()))?;
        let owner = self.doc(&owner_id)?;
        let owning_index = owner.position_of(node_id).ok_or_else(|| {
            Error::Integrity(format!("owner {owner_id} does not reference {node_id}"))
        })?;
        if let Doc::Field(_) = doc {
            if self.docs().any(|other| matches!(other, Doc::Property(p) if *node_id == p.field_id)) {
                return Err(Error::Integrity(format!(
                    "field {node_id} is still used by a property"
                )));
            }
        }

        let doomed = self.owned_subtree(node_id);
        self.remove_ref_at(&owner_id, owning_index, now)?;
        for id in &doomed {
            self.remove(id);
        }
        debug!(node = %node_id, removed = doomed.len(), "deleted subtree");
        Ok(doomed)
    }

    pub fn set_title(&mut self, node_id: &NodeId, title: &str, now: Timestamp) -> Result<()> {
        check_title(title)?;
        let node = self.node_mut(node_id)?;
        if node.title != title {
            node.title = title.to_string();
            node.history.touch(now);
        }
        Ok(())
    }

    /// Set the expansion flag on the reference from `parent_id` to `child_id`.
    pub fn set_expanded(&mut self, parent_id: &DocId, child_id: &DocId, expanded: bool) -> Result<()> {
        let parent = self.doc_mut(parent_id)?;
        let index = parent.position_of(child_id).ok_or_else(|| {
            Error::Integrity(format!("{parent_id} does not reference {child_id}"))
        })?;
        if let Some(content) = parent.content_mut() {
            content[index].expanded = Some(expanded);
        }
        Ok(())
    }

    /// Point every link to `from` at `to` instead. The owning reference of
    /// `from` is left in place. A parent that already references `to` just
    /// drops its link to `from`, and `to` never ends up referencing itself.
    pub fn redirect_backlinks(&mut self, from: &DocId, to: &DocId, now: Timestamp) -> Result<usize> {
        let to_kind = self.doc(to)?.kind();
        let links = self.links_to(from);
        for link in &links {
            let parent = self.doc(&link.parent)?;
            if link.index < parent.reserved_slots() {
                return Err(Error::Integrity(format!(
                    "the key slot of property {} cannot be relinked",
                    link.parent
                )));
            }
            if !parent.kind().can_contain(to_kind) {
                return Err(Error::Integrity(format!(
                    "{} {} cannot contain {to_kind} {to}",
                    parent.kind(),
                    link.parent
                )));
            }
        }

        for link in &links {
            let parent = self.doc_mut(&link.parent)?;
            let already = &link.parent == to || parent.references(to);
            if let Some(content) = parent.content_mut() {
                let Some(index) = content.iter().position(|child| &child.node_id == from) else {
                    continue;
                };
                if already {
                    content.remove(index);
                } else {
                    content[index].node_id = to.clone();
                }
            }
            parent.history_mut().touch(now);
        }
        Ok(links.len())
    }

    /// Set a node's checkbox, recording the transition in its history.
    pub fn set_checkbox(
        &mut self,
        node_id: &NodeId,
        state: Option<Checkbox>,
        now: Timestamp,
        debounce_ms: i64,
    ) -> Result<()> {
        let node = self.node_mut(node_id)?;
        if node.checkbox == state {
            return Ok(());
        }
        node.checkbox = state;
        record_transition(&mut node.history.checkbox, state, now, debounce_ms);
        node.history.touch(now);
        Ok(())
    }

    /// Advance the checkbox `absent -> false -> indeterminate -> true -> absent`.
    pub fn cycle_checkbox(
        &mut self,
        node_id: &NodeId,
        now: Timestamp,
        debounce_ms: i64,
    ) -> Result<Option<Checkbox>> {
        let next = Checkbox::cycle(self.node(node_id)?.checkbox);
        self.set_checkbox(node_id, next, now, debounce_ms)?;
        Ok(next)
    }

    pub(crate) fn insert_ref(
        &mut self,
        parent_id: &DocId,
        index: usize,
        child: ChildRef,
        now: Timestamp,
    ) -> Result<()> {
        let parent = self.doc_mut(parent_id)?;
        let content = parent.content_mut().ok_or_else(|| {
            Error::Integrity(format!("{parent_id} cannot hold child references"))
        })?;
        let index = index.min(content.len());
        content.insert(index, child);
        parent.history_mut().touch(now);
        Ok(())
    }

    pub(crate) fn remove_ref_at(&mut self, parent_id: &DocId, index: usize, now: Timestamp) -> Result<ChildRef> {
        let parent = self.doc_mut(parent_id)?;
        let content = parent.content_mut().ok_or_else(|| {
            Error::Integrity(format!("{parent_id} cannot hold child references"))
        })?;
        if index >= content.len() {
            return Err(Error::Integrity(format!(
                "{parent_id} has no child at index {index}"
            )));
        }
        let removed = content.remove(index);
        parent.history_mut().touch(now);
        Ok(removed)
    }

    pub(crate) fn set_owner(&mut self, id: &DocId, owner_id: &DocId) -> Result<()> {
        let owner_kind = self.doc(owner_id)?.kind();
        match self.doc_mut(id)? {
            Doc::Node(node) => node.owner_id = Some(owner_id.clone()),
            Doc::Property(property) => {
                if owner_kind != DocKind::Node {
                    return Err(Error::Integrity(format!(
                        "property {id} must be owned by a text node"
                    )));
                }
                property.owner_id = owner_id.retag();
            }
            Doc::Field(field) => {
                if owner_kind != DocKind::Node {
                    return Err(Error::Integrity(format!(
                        "field {id} must be owned by a text node"
                    )));
                }
                field.owner_id = owner_id.retag();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::integrity;
    use super::super::test_support::*;
    use super::*;

    fn sample() -> Graph {
        graph(&[
            ("root", None, &["a", "c"]),
            ("a", Some("root"), &["b"]),
            ("b", Some("a"), &[]),
            ("c", Some("root"), &["b"]),
        ])
    }

    #[test]
    fn test_create_node_clamps_index() {
        let mut g = sample();
        let new_id = g.create_node("new", &id("root"), 99, None, 2_000).unwrap();
        assert_eq!(titles(&g, "root"), vec!["A", "C", "new"]);
        let node = g.node(&new_id).unwrap();
        assert_eq!(node.owner_id, Some(id("root")));
        assert_eq!(node.history.created_time, 2_000);
        assert_eq!(g.doc(&id("root")).unwrap().history().last_modified_time, 2_000);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_create_node_rejects_bad_owner_and_title() {
        let mut g = sample();
        assert!(matches!(
            g.create_node("x", &id("ghost"), 0, None, 0),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            g.create_node("a\nb", &id("root"), 0, None, 0),
            Err(Error::InvalidInput(_))
        ));
        let field = g.create_field(&nid("root"), "Status", 0).unwrap();
        assert!(matches!(
            g.create_node("x", &field.to_doc(), 0, None, 0),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_move_owning_reference_transfers_ownership() {
        let mut g = sample();
        g.move_node(&id("b"), &id("a"), &id("root"), 0, 5).unwrap();
        assert_eq!(g.doc(&id("b")).unwrap().owner_id(), Some(id("root")));
        assert_eq!(titles(&g, "root"), vec!["B", "A", "C"]);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_move_link_keeps_owner() {
        let mut g = sample();
        g.move_node(&id("b"), &id("c"), &id("root"), 3, 5).unwrap();
        assert_eq!(g.doc(&id("b")).unwrap().owner_id(), Some(id("a")));
        assert_eq!(titles(&g, "root"), vec!["A", "C", "B"]);
        assert!(g.doc(&id("c")).unwrap().content().is_empty());
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_move_into_existing_link_merges_references() {
        let mut g = sample();
        g.move_node(&id("b"), &id("a"), &id("c"), 0, 5).unwrap();
        assert_eq!(g.doc(&id("c")).unwrap().content().len(), 1);
        assert_eq!(g.doc(&id("b")).unwrap().owner_id(), Some(id("c")));
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_move_rejects_unreferenced_and_cycles() {
        let mut g = sample();
        assert!(matches!(
            g.move_node(&id("b"), &id("root"), &id("c"), 0, 5),
            Err(Error::Integrity(_))
        ));
        let before = g.clone();
        assert!(matches!(
            g.move_node(&id("a"), &id("root"), &id("b"), 0, 5),
            Err(Error::Integrity(_))
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_add_child_reference_is_idempotent() {
        let mut g = sample();
        assert!(!g.add_child_reference(&id("c"), &id("b"), 0, None, 5).unwrap());
        assert!(g.add_child_reference(&id("c"), &id("a"), 0, Some(true), 5).unwrap());
        assert_eq!(titles(&g, "c"), vec!["A", "B"]);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_remove_link() {
        let mut g = sample();
        assert!(matches!(
            g.remove_link(&id("a"), &id("b"), 5),
            Err(Error::Integrity(_))
        ));
        g.remove_link(&id("c"), &id("b"), 5).unwrap();
        assert!(g.doc(&id("c")).unwrap().content().is_empty());
        assert!(g.contains(&id("b")));
    }

    #[test]
    fn test_delete_cascades_and_links_dangle() {
        let mut g = sample();
        let removed = g.delete_subtree(&id("a"), 5).unwrap();
        assert_eq!(removed, vec![id("a"), id("b")]);
        assert!(!g.contains(&id("a")));
        assert!(!g.contains(&id("b")));
        let c = g.doc(&id("c")).unwrap();
        assert_eq!(c.content()[0].node_id, id("b"));
        assert!(g.lookup(&c.content()[0].node_id).is_missing());
        assert_eq!(titles(&g, "c"), vec![super::super::MISSING_TITLE]);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_delete_root_fails() {
        let mut g = sample();
        assert!(g.delete_subtree(&id("root"), 5).is_err());
    }

    #[test]
    fn test_redirect_backlinks() {
        let mut g = sample();
        let redirected = g.redirect_backlinks(&id("b"), &id("a"), 5).unwrap();
        assert_eq!(redirected, 1);
        assert_eq!(g.doc(&id("c")).unwrap().content()[0].node_id, id("a"));
        assert_eq!(g.doc(&id("a")).unwrap().content()[0].node_id, id("b"));
    }

    #[test]
    fn test_property_slot_is_protected() {
        let mut g = sample();
        let field = g.create_field(&nid("root"), "Status", 5).unwrap();
        let property = g.create_property(&nid("a"), &field, 5).unwrap();
        let value = g.create_node("Open", &property.to_doc(), 0, None, 5).unwrap();
        let p = g.property(&property).unwrap();
        assert_eq!(p.content[0].node_id, field);
        assert_eq!(p.content[1].node_id, value);
        assert!(g.remove_link(&property.to_doc(), &field.to_doc(), 5).is_err());
        assert!(g
            .move_node(&field.to_doc(), &property.to_doc(), &id("c"), 0, 5)
            .is_err());
        assert!(g.delete_subtree(&field.to_doc(), 5).is_err());
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_checkbox_history() {
        let mut g = sample();
        let a = nid("a");
        g.cycle_checkbox(&a, 10_000, 1000).unwrap();
        g.cycle_checkbox(&a, 20_000, 1000).unwrap();
        let node = g.node(&a).unwrap();
        assert_eq!(node.checkbox, Some(Checkbox::Indeterminate));
        assert_eq!(node.history.checkbox.len(), 2);
        assert_eq!(node.history.checkbox[0].state(), Some(Checkbox::Indeterminate));
        assert_eq!(node.history.last_modified_time, 20_000);
    }
}
