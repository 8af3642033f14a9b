//! Flattening views into the rows an outliner would draw.

use std::collections::HashMap;

use super::Graph;
use crate::models::NodeView;
use crate::Result;

/// Expansion state kept per occurrence rather than on the graph.
///
/// Used for recursive views, where one child reference can't carry the
/// state of several nested occurrences at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    local: HashMap<NodeView, bool>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_expanded(&self, view: &NodeView) -> Option<bool> {
        self.local.get(view).copied()
    }

    pub fn set_local_expanded(&mut self, view: NodeView, expanded: bool) {
        self.local.insert(view, expanded);
    }

    /// Forget local state for views that no longer resolve.
    pub fn retain_valid(&mut self, graph: &Graph) {
        self.local.retain(|view, _| graph.resolve_view(view).is_ok());
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

/// One visible occurrence below a zoom root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub view: NodeView,
    /// Zero for direct children of the zoom root.
    pub depth: usize,
    /// The reference points at a deleted doc.
    pub missing: bool,
}

impl Graph {
    /// Whether the occurrence at `view` shows its children.
    ///
    /// A view without a parent is always open. Recursive occurrences read
    /// the local state (closed by default), everything else the flag on the
    /// parent's child reference.
    pub fn is_view_expanded(&self, view: &NodeView, state: &ViewState) -> bool {
        if !view.has_parent() {
            return true;
        }
        if view.is_recursive() {
            return state.local_expanded(view).unwrap_or(false);
        }
        self.resolve_view(view)
            .ok()
            .and_then(|resolved| resolved.context)
            .is_some_and(|ctx| ctx.is_expanded)
    }

    /// Expand or collapse one occurrence.
    pub fn set_view_expanded(
        &mut self,
        view: &NodeView,
        expanded: bool,
        state: &mut ViewState,
    ) -> Result<()> {
        let Some(parent_id) = view.parent_id() else {
            return Ok(());
        };
        if view.is_recursive() {
            self.resolve_view(view)?;
            state.set_local_expanded(view.clone(), expanded);
            return Ok(());
        }
        self.set_expanded(parent_id, view.node_id(), expanded)
    }

    /// Views of the displayable children of `view`. A property's key slot
    /// is skipped.
    pub fn child_views(&self, view: &NodeView) -> Vec<NodeView> {
        let Ok(doc) = self.doc(view.node_id()) else {
            return Vec::new();
        };
        doc.content()
            .iter()
            .skip(doc.reserved_slots())
            .map(|child| view.child(child.node_id.clone()))
            .collect()
    }

    /// Every visible occurrence under `root_view`, depth first.
    pub fn visible_rows(&self, root_view: &NodeView, state: &ViewState) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut stack: Vec<(NodeView, usize)> = self
            .child_views(root_view)
            .into_iter()
            .rev()
            .map(|view| (view, 0))
            .collect();
        while let Some((view, depth)) = stack.pop() {
            let missing = !self.contains(view.node_id());
            if !missing && self.is_view_expanded(&view, state) {
                stack.extend(
                    self.child_views(&view)
                        .into_iter()
                        .rev()
                        .map(|child| (child, depth + 1)),
                );
            }
            rows.push(Row {
                view,
                depth,
                missing,
            });
        }
        rows
    }

    /// The row drawn just above `view`, if any. Target of merge-backward.
    pub fn previous_visible(
        &self,
        view: &NodeView,
        root_view: &NodeView,
        state: &ViewState,
    ) -> Option<NodeView> {
        let rows = self.visible_rows(root_view, state);
        let index = rows.iter().position(|row| &row.view == view)?;
        index.checked_sub(1).map(|prev| rows[prev].view.clone())
    }

    /// The row drawn just below `view`, if any. Target of merge-forward.
    pub fn next_visible(
        &self,
        view: &NodeView,
        root_view: &NodeView,
        state: &ViewState,
    ) -> Option<NodeView> {
        let rows = self.visible_rows(root_view, state);
        let index = rows.iter().position(|row| &row.view == view)?;
        rows.get(index + 1).map(|row| row.view.clone())
    }
}
