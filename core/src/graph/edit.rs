//! Outliner editing gestures built from the primitive mutations.

use tracing::debug;

use super::Graph;
use crate::models::{ChildRef, DocId, NodeId, NodeView, Timestamp};
use crate::{Error, Result};

/// A text selection inside a node title, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

/// Where the caret should land after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub view: NodeView,
    pub selection: Selection,
}

impl Focus {
    pub fn at(view: NodeView, position: usize) -> Self {
        Self {
            view,
            selection: Selection::collapsed(position),
        }
    }
}

/// Split `title` around the character range `[start, end)`.
fn split_title(title: &str, start: usize, end: usize) -> (String, String) {
    let len = title.chars().count();
    let (start, end) = (start.min(end).min(len), start.max(end).min(len));
    let before = title.chars().take(start).collect();
    let after = title.chars().skip(end).collect();
    (before, after)
}

fn parent_view_of(view: &NodeView) -> Result<NodeView> {
    view.parent()
        .ok_or_else(|| Error::Integrity(format!("view {view} has no parent")))
}

impl Graph {
    /// Delete the selection `[sel_start, sel_end)` and split the node at that point.
    ///
    /// - At the start of a non-empty title with a view parent, an empty
    ///   sibling is inserted above instead.
    /// - Without a view parent, or when expanded with children, the text
    ///   after the caret becomes the node's first child.
    /// - Otherwise the text after the caret becomes the next sibling.
    ///
    /// Focus lands on the new node at position 0.
    pub fn split_node(
        &mut self,
        view: &NodeView,
        sel_start: usize,
        sel_end: usize,
        now: Timestamp,
    ) -> Result<Focus> {
        let node_id = self.node_id(view.node_id())?;
        let context = self
            .resolve_view(view)?
            .context
            .map(|ctx| (ctx.parent.id(), ctx.child_index, ctx.is_expanded));
        let node = self.node(&node_id)?;
        let has_children = !node.content.is_empty();
        let (before, after) = split_title(&node.title, sel_start, sel_end);

        let focus = match context {
            Some((parent_id, child_index, _)) if before.is_empty() && !after.is_empty() => {
                let new_id = self.create_node("", &parent_id, child_index, None, now)?;
                self.set_title(&node_id, &after, now)?;
                debug!(node = %node_id, new = %new_id, "inserted empty sibling above");
                Focus::at(parent_view_of(view)?.child(new_id), 0)
            }
            Some((parent_id, child_index, expanded)) if !(expanded && has_children) => {
                let new_id = self.create_node(&after, &parent_id, child_index + 1, None, now)?;
                self.set_title(&node_id, &before, now)?;
                debug!(node = %node_id, new = %new_id, "split into next sibling");
                Focus::at(parent_view_of(view)?.child(new_id), 0)
            }
            _ => {
                let new_id = self.create_node(&after, &node_id.to_doc(), 0, None, now)?;
                self.set_title(&node_id, &before, now)?;
                debug!(node = %node_id, new = %new_id, "split into first child");
                Focus::at(view.child(new_id), 0)
            }
        };
        Ok(focus)
    }

    /// Merge the node seen at `second_view` into `first_id`.
    ///
    /// The second title is appended to the first, the second node's children
    /// move to the front of the first's content, links to the second node are
    /// redirected to the first, and the second node is deleted. Returns the
    /// caret position at the seam.
    pub fn merge_nodes(
        &mut self,
        first_id: &NodeId,
        second_view: &NodeView,
        now: Timestamp,
    ) -> Result<usize> {
        let second_id = self.node_id(second_view.node_id())?;
        self.resolve_view(second_view)?;
        let first = self.node(first_id)?;
        let second = self.node(&second_id)?;
        let first_doc = first_id.to_doc();
        let second_doc = second_id.to_doc();

        if first_id == &second_id {
            return Err(Error::Integrity(format!("cannot merge {first_id} into itself")));
        }
        let second_owner = second
            .owner_id
            .clone()
            .ok_or_else(|| Error::Integrity("the root cannot be merged away".to_string()))?;
        if self.owns_transitively(&second_doc, &first_doc) {
            return Err(Error::Integrity(format!(
                "{second_id} owns {first_id}; merging would orphan it"
            )));
        }

        let seam = first.title.chars().count();
        let title = format!("{}{}", first.title, second.title);
        let second_modified = second.history.last_modified_time;
        let second_tags = second.tags.clone();
        let moved: Vec<ChildRef> = second
            .content
            .iter()
            .filter(|child| child.node_id != first_doc && !first.content.iter().any(|own| own.node_id == child.node_id))
            .cloned()
            .collect();
        let adopted: Vec<DocId> = second
            .content
            .iter()
            .filter(|child| self.is_owning_ref(&second_doc, &child.node_id))
            .map(|child| child.node_id.clone())
            .collect();

        // Links to the second node now point at the first.
        self.redirect_backlinks(&second_doc, &first_doc, now)?;

        // Drop the second node's owning reference.
        let owning_index = self.doc(&second_owner)?.position_of(&second_doc).ok_or_else(|| {
            Error::Integrity(format!("owner {second_owner} does not reference {second_id}"))
        })?;
        self.remove_ref_at(&second_owner, owning_index, now)?;

        {
            let first = self.node_mut(first_id)?;
            first.title = title;
            first.content.splice(0..0, moved);
            for tag in second_tags {
                if !first.tags.contains(&tag) {
                    first.tags.push(tag);
                }
            }
            first.history.touch(second_modified);
            first.history.touch(now);
        }
        for child in &adopted {
            if child != &first_doc && self.contains(child) {
                self.set_owner(child, &first_doc)?;
            }
        }
        self.remove(&second_doc);
        debug!(first = %first_id, second = %second_id, seam, "merged nodes");
        Ok(seam)
    }

    /// Make the node the last child of its previous sibling, which gets expanded.
    pub fn indent(&mut self, view: &NodeView, now: Timestamp) -> Result<NodeView> {
        let resolved = self.resolve_view(view)?;
        let ctx = resolved
            .context
            .ok_or_else(|| Error::Integrity(format!("view {view} has no parent to indent within")))?;
        if ctx.child_index <= ctx.parent.reserved_slots() {
            return Err(Error::InvalidInput(format!(
                "{} has no previous sibling",
                view.node_id()
            )));
        }
        let parent_id = ctx.parent.id();
        let new_parent = ctx.parent.content()[ctx.child_index - 1].node_id.clone();
        self.doc(&new_parent)?;

        self.move_node(view.node_id(), &parent_id, &new_parent, usize::MAX, now)?;
        self.set_expanded(&parent_id, &new_parent, true)?;
        Ok(parent_view_of(view)?.child(new_parent).child(view.node_id().clone()))
    }

    /// Make the node the next sibling of its view parent.
    pub fn outdent(&mut self, view: &NodeView, now: Timestamp) -> Result<NodeView> {
        let parent_view = parent_view_of(view)?;
        let grand_view = parent_view.parent().ok_or_else(|| {
            Error::InvalidInput(format!("{} is already at the top level", view.node_id()))
        })?;
        self.resolve_view(view)?;
        let parent_index = self
            .resolve_view(&parent_view)?
            .context
            .map(|ctx| ctx.child_index)
            .unwrap_or_default();
        self.move_node(
            view.node_id(),
            parent_view.node_id(),
            grand_view.node_id(),
            parent_index + 1,
            now,
        )?;
        Ok(grand_view.child(view.node_id().clone()))
    }

    /// Swap the node with its previous sibling. No-op at the top.
    pub fn move_up(&mut self, view: &NodeView, now: Timestamp) -> Result<NodeView> {
        self.shift(view, -1, now)
    }

    /// Swap the node with its next sibling. No-op at the bottom.
    pub fn move_down(&mut self, view: &NodeView, now: Timestamp) -> Result<NodeView> {
        self.shift(view, 1, now)
    }

    fn shift(&mut self, view: &NodeView, delta: isize, now: Timestamp) -> Result<NodeView> {
        let resolved = self.resolve_view(view)?;
        let Some(ctx) = resolved.context else {
            return Ok(view.clone());
        };
        let target = ctx.child_index as isize + delta;
        if target < ctx.parent.reserved_slots() as isize || target >= ctx.parent.content().len() as isize {
            return Ok(view.clone());
        }
        let parent_id = ctx.parent.id();
        self.move_node(view.node_id(), &parent_id, &parent_id, target as usize, now)?;
        Ok(view.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::integrity;
    use super::super::test_support::*;
    use super::*;

    fn outline() -> Graph {
        graph(&[
            ("root", None, &["p"]),
            ("p", Some("root"), &["a", "b"]),
            ("a", Some("p"), &[]),
            ("b", Some("p"), &["b1"]),
            ("b1", Some("b"), &[]),
        ])
    }

    fn set_title(g: &mut Graph, node: &str, title: &str) {
        g.set_title(&nid(node), title, 1_000).unwrap();
    }

    fn view(ids: &[&str]) -> NodeView {
        NodeView::from_path(ids.iter().map(|raw| id(raw)).collect()).unwrap()
    }

    #[test]
    fn test_split_at_start_inserts_empty_sibling_above() {
        let mut g = outline();
        set_title(&mut g, "a", "Hello");
        let focus = g.split_node(&view(&["root", "p", "a"]), 0, 0, 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["", "Hello", "B"]);
        assert_eq!(focus.view.parent_id(), Some(&id("p")));
        assert_eq!(g.doc(focus.view.node_id()).unwrap().title(), "");
        assert_eq!(focus.selection, Selection::collapsed(0));
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_split_mid_title_creates_next_sibling() {
        let mut g = outline();
        set_title(&mut g, "a", "HelloWorld");
        let focus = g.split_node(&view(&["root", "p", "a"]), 5, 5, 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["Hello", "World", "B"]);
        assert_eq!(g.doc(focus.view.node_id()).unwrap().title(), "World");
        assert_eq!(focus.selection.start, 0);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_split_deletes_selection_first() {
        let mut g = outline();
        set_title(&mut g, "a", "Hello big World");
        g.split_node(&view(&["root", "p", "a"]), 9, 5, 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["Hello", " World", "B"]);
    }

    #[test]
    fn test_split_expanded_with_children_goes_into_child() {
        let mut g = outline();
        g.set_expanded(&id("p"), &id("b"), true).unwrap();
        set_title(&mut g, "b", "Parent");
        let focus = g.split_node(&view(&["root", "p", "b"]), 3, 3, 2_000).unwrap();
        assert_eq!(titles(&g, "b"), vec!["ent", "B1"]);
        assert_eq!(g.node(&nid("b")).unwrap().title, "Par");
        assert_eq!(focus.view.parent_id(), Some(&id("b")));
    }

    #[test]
    fn test_split_without_view_parent_goes_into_child() {
        let mut g = outline();
        let focus = g.split_node(&view(&["p"]), 1, 1, 2_000).unwrap();
        assert_eq!(g.node(&nid("p")).unwrap().title, "P");
        assert_eq!(titles(&g, "p"), vec!["", "A", "B"]);
        assert_eq!(focus.view, view(&["p", focus.view.node_id().as_str()]));
    }

    #[test]
    fn test_split_handles_multibyte_titles() {
        let mut g = outline();
        set_title(&mut g, "a", "héllo");
        g.split_node(&view(&["root", "p", "a"]), 2, 2, 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["hé", "llo", "B"]);
    }

    #[test]
    fn test_merge_appends_title_and_moves_children() {
        let mut g = graph(&[
            ("root", None, &["a", "b", "x"]),
            ("a", Some("root"), &["a1"]),
            ("a1", Some("a"), &[]),
            ("b", Some("root"), &["b1"]),
            ("b1", Some("b"), &[]),
            ("x", Some("root"), &["b"]),
        ]);
        let seam = g.merge_nodes(&nid("a"), &view(&["root", "b"]), 5_000).unwrap();
        assert_eq!(seam, 1);
        assert_eq!(g.node(&nid("a")).unwrap().title, "AB");
        assert_eq!(titles(&g, "a"), vec!["B1", "A1"]);
        assert_eq!(g.doc(&id("b1")).unwrap().owner_id(), Some(id("a")));
        assert_eq!(g.doc(&id("x")).unwrap().content()[0].node_id, id("a"));
        assert!(!g.contains(&id("b")));
        assert_eq!(titles(&g, "root"), vec!["AB", "X"]);
        assert!(g.node(&nid("a")).unwrap().history.last_modified_time >= 5_000);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_merge_child_into_parent() {
        let mut g = outline();
        g.merge_nodes(&nid("b"), &view(&["root", "p", "b", "b1"]), 5_000).unwrap();
        assert_eq!(g.node(&nid("b")).unwrap().title, "BB1");
        assert!(g.doc(&id("b")).unwrap().content().is_empty());
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_merge_keeps_latest_modification_time() {
        let mut g = outline();
        g.set_title(&nid("b"), "later", 9_000).unwrap();
        g.merge_nodes(&nid("a"), &view(&["root", "p", "b"]), 2_000).unwrap();
        assert_eq!(g.node(&nid("a")).unwrap().history.last_modified_time, 9_000);
    }

    #[test]
    fn test_merge_rejects_owner_into_descendant() {
        let mut g = outline();
        let before = g.clone();
        assert!(g.merge_nodes(&nid("b1"), &view(&["root", "p", "b"]), 5_000).is_err());
        assert!(g.merge_nodes(&nid("a"), &view(&["a"]), 5_000).is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn test_indent_and_outdent() {
        let mut g = outline();
        let indented = g.indent(&view(&["root", "p", "b"]), 2_000).unwrap();
        assert_eq!(indented, view(&["root", "p", "a", "b"]));
        assert_eq!(g.doc(&id("b")).unwrap().owner_id(), Some(id("a")));
        assert!(g.doc(&id("p")).unwrap().content()[0].is_expanded());
        integrity::validate(&g).unwrap();

        let outdented = g.outdent(&indented, 3_000).unwrap();
        assert_eq!(outdented, view(&["root", "p", "b"]));
        assert_eq!(titles(&g, "p"), vec!["A", "B"]);
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_outdent_when_grandparent_links_node() {
        let mut g = graph(&[
            ("root", None, &["c", "p0", "p", "q"]),
            ("p0", Some("root"), &[]),
            ("p", Some("root"), &["c"]),
            ("c", Some("p"), &[]),
            ("q", Some("root"), &[]),
        ]);
        let outdented = g.outdent(&view(&["root", "p", "c"]), 2_000).unwrap();
        assert_eq!(outdented, view(&["root", "c"]));
        assert_eq!(titles(&g, "root"), vec!["P0", "P", "C", "Q"]);
        assert_eq!(g.doc(&id("c")).unwrap().owner_id(), Some(id("root")));
        integrity::validate(&g).unwrap();
    }

    #[test]
    fn test_indent_first_child_fails() {
        let mut g = outline();
        assert!(g.indent(&view(&["root", "p", "a"]), 2_000).is_err());
        assert!(g.outdent(&view(&["root", "p"]), 2_000).is_err());
    }

    #[test]
    fn test_move_up_and_down() {
        let mut g = outline();
        g.move_down(&view(&["root", "p", "a"]), 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["B", "A"]);
        g.move_down(&view(&["root", "p", "a"]), 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["B", "A"]);
        g.move_up(&view(&["root", "p", "a"]), 2_000).unwrap();
        assert_eq!(titles(&g, "p"), vec!["A", "B"]);
    }
}
