use std::collections::HashMap;

use tracing::debug;

use super::Graph;
use crate::models::{ChildRef, Doc, DocId, NodeId, NodeView, Timestamp};
use crate::{Error, Result};

impl Graph {
    /// Clone the subtree owned by the node at `view` and insert the copy as
    /// its next sibling.
    ///
    /// Only owned descendants are copied. References from the copy to docs
    /// outside the subtree stay links to the originals.
    pub fn duplicate_subtree(&mut self, view: &NodeView, now: Timestamp) -> Result<NodeId> {
        let node_id = self.node_id(view.node_id())?;
        let owner_id = self
            .node(&node_id)?
            .owner_id
            .clone()
            .ok_or_else(|| Error::Integrity("cannot duplicate the root".to_string()))?;
        if view.parent_id() != Some(&owner_id) {
            return Err(Error::Integrity(format!(
                "cannot duplicate {node_id} through a link"
            )));
        }
        let resolved = self.resolve_view(view)?;
        let (owning_index, expanded) = resolved
            .context
            .map(|ctx| (ctx.child_index, ctx.parent.content()[ctx.child_index].expanded))
            .ok_or_else(|| Error::Integrity(format!("view {view} has no parent")))?;

        let subtree = self.owned_subtree(view.node_id());
        let fresh: HashMap<DocId, DocId> = subtree
            .iter()
            .map(|id| (id.clone(), DocId::generate()))
            .collect();
        let remap = |id: &DocId| fresh.get(id).cloned().unwrap_or_else(|| id.clone());

        let mut clones = Vec::with_capacity(subtree.len());
        for id in &subtree {
            let mut doc = self.doc(id)?.clone();
            match &mut doc {
                Doc::Node(node) => {
                    node.id = remap(id).retag();
                    node.owner_id = node.owner_id.as_ref().map(remap);
                    node.history.created_time = now;
                    node.history.last_modified_time = now;
                }
                Doc::Property(property) => {
                    property.id = remap(id).retag();
                    property.owner_id = remap(&property.owner_id.to_doc()).retag();
                    property.field_id = remap(&property.field_id.to_doc()).retag();
                    property.history.created_time = now;
                    property.history.last_modified_time = now;
                }
                Doc::Field(field) => {
                    field.id = remap(id).retag();
                    field.owner_id = remap(&field.owner_id.to_doc()).retag();
                    field.history.created_time = now;
                    field.history.last_modified_time = now;
                }
            }
            if let Some(content) = doc.content_mut() {
                for child in content.iter_mut() {
                    child.node_id = remap(&child.node_id);
                }
            }
            clones.push(doc);
        }

        // The copy keeps the original's checkbox log, so history can't be
        // younger than its newest entry.
        for doc in &mut clones {
            if let Doc::Node(node) = doc {
                if let Some(newest) = node.history.checkbox.first() {
                    node.history.touch(newest.at());
                }
            }
        }

        let copy_id: NodeId = remap(view.node_id()).retag();
        let count = clones.len();
        for doc in clones {
            self.insert(doc);
        }
        self.insert_ref(
            &owner_id,
            owning_index + 1,
            ChildRef {
                node_id: copy_id.to_doc(),
                expanded,
            },
            now,
        )?;
        debug!(original = %node_id, copy = %copy_id, docs = count, "duplicated subtree");
        Ok(copy_id)
    }
}
