//! The editing session: one graph plus everything an editor keeps around it.
//!
//! Every gesture runs as a transaction. A failing gesture leaves the graph
//! as it was, and a finished one becomes a single undo step.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::format::{clipboard, logseq, to_outline_markdown, ClipboardContents};
use crate::graph::{integrity, Focus, Graph, Row, Selection, ViewState};
use crate::models::{Checkbox, Clock, CurrentView, DocId, NodeId, NodeView, SystemClock, TagId, Timestamp};
use crate::storage::SaveFile;
use crate::tree::flatten_into;
use crate::undo::{TransactionLabeler, UndoHistory};
use crate::{Error, Result};

pub struct Outline<C: Clock = SystemClock> {
    graph: Graph,
    config: EngineConfig,
    clock: C,
    labeler: TransactionLabeler,
    history: UndoHistory,
    view_state: ViewState,
    current_view: Option<CurrentView>,
    debug_mode: bool,
}

impl Outline<SystemClock> {
    pub fn new(graph: Graph, config: EngineConfig) -> Self {
        Self::with_clock(graph, config, SystemClock)
    }
}

impl<C: Clock> Outline<C> {
    pub fn with_clock(graph: Graph, config: EngineConfig, clock: C) -> Self {
        Self {
            graph,
            config,
            clock,
            labeler: TransactionLabeler::new(),
            history: UndoHistory::default(),
            view_state: ViewState::new(),
            current_view: None,
            debug_mode: false,
        }
    }

    /// Open a loaded save file. A current view pointing at something that no
    /// longer exists is dropped.
    pub fn from_save(file: &SaveFile, config: EngineConfig, clock: C) -> Result<Self> {
        let mut outline = Self::with_clock(file.to_graph()?, config, clock);
        outline.debug_mode = file.debug_mode();
        outline.current_view = file.current_view.clone();
        outline.repair_current_view();
        Ok(outline)
    }

    pub fn to_save(&self) -> SaveFile {
        SaveFile::from_graph(&self.graph, self.current_view.clone(), self.debug_mode)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// In debug mode every finished transaction is checked for integrity.
    pub fn set_debug_mode(&mut self, on: bool) {
        self.debug_mode = on;
    }

    pub fn current_view(&self) -> Option<&CurrentView> {
        self.current_view.as_ref()
    }

    pub fn set_current_view(&mut self, view: Option<CurrentView>) -> Result<()> {
        match &view {
            Some(CurrentView::Node { node_id }) => {
                self.graph.node(node_id)?;
            }
            Some(CurrentView::Tag { tag_id }) => {
                self.graph.tag(tag_id)?;
            }
            None => {}
        }
        self.current_view = view;
        Ok(())
    }

    fn repair_current_view(&mut self) {
        let valid = match &self.current_view {
            Some(CurrentView::Node { node_id }) => self.graph.node(node_id).is_ok(),
            Some(CurrentView::Tag { tag_id }) => self.graph.tag(tag_id).is_ok(),
            None => true,
        };
        if !valid {
            warn!(view = ?self.current_view, "current view target is gone; showing the root");
            self.current_view = None;
        }
    }

    /// The view rows are listed under: the zoomed node, or the graph root.
    pub fn zoom_root(&self) -> Result<NodeView> {
        match &self.current_view {
            Some(CurrentView::Node { node_id }) => Ok(NodeView::root(node_id)),
            _ => Ok(NodeView::root(self.graph.root()?)),
        }
    }

    /// Rows of the current view. A tag view lists the tagged nodes.
    pub fn rows(&self) -> Result<Vec<Row>> {
        if let Some(CurrentView::Tag { tag_id }) = &self.current_view {
            return Ok(self
                .graph
                .nodes_with_tag(tag_id)
                .into_iter()
                .map(|id| Row {
                    view: NodeView::root(id),
                    depth: 0,
                    missing: false,
                })
                .collect());
        }
        Ok(self.graph.visible_rows(&self.zoom_root()?, &self.view_state))
    }

    /// Run `edit` as one transaction labelled `name`.
    fn transact<T>(&mut self, name: &'static str, edit: impl FnOnce(&mut Self, Timestamp) -> Result<T>) -> Result<T> {
        let outermost = !self.labeler.is_open();
        let label = self.labeler.begin();
        let before = self.graph.clone();
        let now = self.clock.now();

        let result = edit(self, now).and_then(|value| {
            if outermost && self.debug_mode {
                integrity::validate(&self.graph)?;
            }
            Ok(value)
        });
        self.labeler.end();

        match result {
            Ok(value) => {
                if outermost {
                    let after = self.graph.clone();
                    self.history.record(label, name, before, after);
                }
                Ok(value)
            }
            Err(err) => {
                debug!(%label, name, error = %err, "transaction rolled back");
                self.graph = before;
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo the last transaction. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some((name, graph)) = self.history.undo() else {
            return false;
        };
        debug!(name, "undo");
        self.restore(graph);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some((name, graph)) = self.history.redo() else {
            return false;
        };
        debug!(name, "redo");
        self.restore(graph);
        true
    }

    fn restore(&mut self, graph: Graph) {
        self.graph = graph;
        self.view_state.retain_valid(&self.graph);
        self.repair_current_view();
    }

    /// Append a new child node under the node seen at `parent`.
    pub fn add_child(&mut self, parent: &NodeView, title: &str) -> Result<NodeView> {
        self.transact("add child", |outline, now| {
            let parent_id = outline.graph.node_id(parent.node_id())?;
            let id = outline
                .graph
                .create_node(title, &parent_id.to_doc(), usize::MAX, None, now)?;
            Ok(parent.child(id))
        })
    }

    pub fn set_title(&mut self, view: &NodeView, title: &str) -> Result<()> {
        self.transact("edit title", |outline, now| {
            let id = outline.graph.node_id(view.node_id())?;
            outline.graph.set_title(&id, title, now)
        })
    }

    /// Enter: split the title at the selection.
    pub fn split(&mut self, view: &NodeView, selection: Selection) -> Result<Focus> {
        self.transact("split", |outline, now| {
            outline
                .graph
                .split_node(view, selection.start, selection.end, now)
        })
    }

    /// Backspace at the start of a title: merge into the row above.
    ///
    /// Returns `None` when there is no text node above to merge into.
    pub fn merge_backward(&mut self, view: &NodeView) -> Result<Option<Focus>> {
        let root = self.zoom_root()?;
        let Some(above) = self.graph.previous_visible(view, &root, &self.view_state) else {
            return Ok(None);
        };
        let Ok(first_id) = self.graph.node_id(above.node_id()) else {
            return Ok(None);
        };
        // A link to something this node owns can't absorb it.
        if *view.node_id() == first_id || self.graph.owns_transitively(view.node_id(), &first_id.to_doc()) {
            return Ok(None);
        }
        self.transact("merge", |outline, now| {
            let seam = outline.graph.merge_nodes(&first_id, view, now)?;
            Ok(Some(Focus::at(above.clone(), seam)))
        })
    }

    /// Delete at the end of a title: pull the row below into this one.
    pub fn merge_forward(&mut self, view: &NodeView) -> Result<Option<Focus>> {
        let root = self.zoom_root()?;
        let Some(below) = self.graph.next_visible(view, &root, &self.view_state) else {
            return Ok(None);
        };
        if self.graph.node_id(below.node_id()).is_err()
            || below.node_id() == view.node_id()
            || self.graph.owns_transitively(below.node_id(), view.node_id())
        {
            return Ok(None);
        }
        let first_id = self.graph.node_id(view.node_id())?;
        self.transact("merge", |outline, now| {
            let seam = outline.graph.merge_nodes(&first_id, &below, now)?;
            Ok(Some(Focus::at(view.clone(), seam)))
        })
    }

    pub fn indent(&mut self, view: &NodeView) -> Result<NodeView> {
        self.transact("indent", |outline, now| outline.graph.indent(view, now))
    }

    pub fn outdent(&mut self, view: &NodeView) -> Result<NodeView> {
        self.transact("outdent", |outline, now| outline.graph.outdent(view, now))
    }

    pub fn move_up(&mut self, view: &NodeView) -> Result<NodeView> {
        self.transact("move", |outline, now| outline.graph.move_up(view, now))
    }

    pub fn move_down(&mut self, view: &NodeView) -> Result<NodeView> {
        self.transact("move", |outline, now| outline.graph.move_down(view, now))
    }

    /// Flip the expansion of one occurrence. Returns the new state.
    pub fn toggle_expanded(&mut self, view: &NodeView) -> Result<bool> {
        let expanded = !self.graph.is_view_expanded(view, &self.view_state);
        self.set_expanded(view, expanded)?;
        Ok(expanded)
    }

    pub fn set_expanded(&mut self, view: &NodeView, expanded: bool) -> Result<()> {
        self.transact("expand", |outline, _| {
            outline
                .graph
                .set_view_expanded(view, expanded, &mut outline.view_state)
        })
    }

    pub fn cycle_checkbox(&mut self, view: &NodeView) -> Result<Option<Checkbox>> {
        self.transact("checkbox", |outline, now| {
            let id = outline.graph.node_id(view.node_id())?;
            let debounce = outline.config.checkbox_debounce_ms;
            outline.graph.cycle_checkbox(&id, now, debounce)
        })
    }

    pub fn set_checkbox(&mut self, view: &NodeView, state: Option<Checkbox>) -> Result<()> {
        self.transact("checkbox", |outline, now| {
            let id = outline.graph.node_id(view.node_id())?;
            let debounce = outline.config.checkbox_debounce_ms;
            outline.graph.set_checkbox(&id, state, now, debounce)
        })
    }

    /// Remove the row. Through its owner this deletes the subtree; through
    /// a link only the link goes. Focus moves to the nearest row above that
    /// survives the deletion.
    pub fn delete(&mut self, view: &NodeView) -> Result<Option<Focus>> {
        let parent_id = view
            .parent_id()
            .ok_or_else(|| Error::InvalidInput("the zoomed node cannot be deleted from its own view".to_string()))?
            .clone();
        let root = self.zoom_root()?;
        let rows = self.graph.visible_rows(&root, &self.view_state);
        let above: Vec<NodeView> = match rows.iter().position(|row| &row.view == view) {
            Some(index) => rows[..index].iter().rev().map(|row| row.view.clone()).collect(),
            None => Vec::new(),
        };
        self.transact("delete", |outline, now| {
            if outline.graph.is_owning_ref(&parent_id, view.node_id()) {
                outline.graph.delete_subtree(view.node_id(), now)?;
            } else {
                outline.graph.remove_link(&parent_id, view.node_id(), now)?;
            }
            let remaining = outline.graph.visible_rows(&root, &outline.view_state);
            let target = above
                .into_iter()
                .find(|candidate| remaining.iter().any(|row| &row.view == candidate && !row.missing));
            Ok(target.map(|target| {
                let end = outline.graph.lookup(target.node_id()).title().chars().count();
                Focus::at(target, end)
            }))
        })
    }

    pub fn duplicate(&mut self, view: &NodeView) -> Result<NodeView> {
        self.transact("duplicate", |outline, now| {
            let clone = outline.graph.duplicate_subtree(view, now)?;
            let parent = view
                .parent()
                .ok_or_else(|| Error::Integrity(format!("view {view} has no parent")))?;
            Ok(parent.child(clone))
        })
    }

    /// Link an existing node under the node seen at `parent`.
    pub fn link(&mut self, parent: &NodeView, node_id: &NodeId, index: usize) -> Result<bool> {
        self.transact("link", |outline, now| {
            outline.graph.link_node(parent.node_id(), node_id, index, now)
        })
    }

    pub fn tag(&mut self, view: &NodeView, name: &str, hue: f64) -> Result<TagId> {
        self.transact("tag", |outline, now| {
            let node_id = outline.graph.node_id(view.node_id())?;
            let tag_id = outline.graph.get_or_create_tag(name, hue, now)?;
            outline.graph.tag_node(&node_id, &tag_id, now)?;
            Ok(tag_id)
        })
    }

    pub fn untag(&mut self, view: &NodeView, tag_id: &TagId) -> Result<bool> {
        self.transact("untag", |outline, now| {
            let node_id = outline.graph.node_id(view.node_id())?;
            outline.graph.untag_node(&node_id, tag_id, now)
        })
    }

    /// Delete a tag everywhere. A tag view showing it falls back to the root.
    pub fn delete_tag(&mut self, tag_id: &TagId) -> Result<()> {
        self.transact("delete tag", |outline, now| {
            outline.graph.delete_tag(tag_id, now)?;
            Ok(())
        })?;
        self.repair_current_view();
        Ok(())
    }

    /// Clipboard contents for the node at `view`: its subtree as markdown
    /// plus the node id for structural paste.
    pub fn copy(&self, view: &NodeView) -> Result<ClipboardContents> {
        let node_id = self.graph.node_id(view.node_id())?;
        Ok(ClipboardContents {
            text: to_outline_markdown(&self.graph, &node_id, self.config.markdown_flavor)?,
            node_ids: Some(clipboard::encode_node_ids(std::slice::from_ref(&node_id))?),
        })
    }

    /// Paste after the row at `view`, or into it when it has no parent.
    ///
    /// Node ids from this session are linked. Anything else is parsed as
    /// text. Returns the views of the inserted rows.
    pub fn paste(&mut self, view: &NodeView, contents: &ClipboardContents) -> Result<Vec<NodeView>> {
        let (target, index) = match view.parent() {
            Some(parent) => {
                let index = self
                    .graph
                    .resolve_view(view)?
                    .context
                    .map(|ctx| ctx.child_index + 1)
                    .unwrap_or(usize::MAX);
                (parent, index)
            }
            None => (view.clone(), usize::MAX),
        };
        let linkable = contents
            .node_ids
            .as_deref()
            .and_then(|payload| clipboard::decode_node_ids(payload).ok())
            .filter(|ids| !ids.is_empty() && ids.iter().all(|id| self.graph.node(id).is_ok()));

        self.transact("paste", |outline, now| {
            let parent_id = target.node_id().clone();
            let inserted: Vec<DocId> = match linkable {
                Some(ids) => {
                    let mut at = index;
                    let mut linked = Vec::new();
                    for id in ids {
                        if outline.graph.link_node(&parent_id, &id, at, now)? {
                            at = at.saturating_add(1);
                            linked.push(id.to_doc());
                        }
                    }
                    linked
                }
                None => {
                    let trees = clipboard::parse_text(&contents.text);
                    flatten_into(&mut outline.graph, &trees, &parent_id, index, now)?
                }
            };
            Ok(inserted.into_iter().map(|id| target.child(id)).collect())
        })
    }

    /// Import a Logseq outline as children of `parent`.
    pub fn import_logseq(&mut self, parent: &NodeView, text: &str) -> Result<Vec<NodeView>> {
        self.transact("import", |outline, now| {
            let trees = logseq::parse_or_lines(text);
            let ids = flatten_into(&mut outline.graph, &trees, parent.node_id(), usize::MAX, now)?;
            Ok(ids.into_iter().map(|id| parent.child(id)).collect())
        })
    }

    /// Import a Logseq graph directory under a new node titled after the
    /// configured import root.
    pub fn import_logseq_dir(&mut self, dir: &Path) -> Result<NodeId> {
        self.transact("import", |outline, now| {
            let root = outline.graph.root()?.to_doc();
            let title = outline.config.import_root_title.clone();
            let holder = outline.graph.create_node(&title, &root, usize::MAX, None, now)?;
            let pages = logseq::import_dir(&mut outline.graph, dir, &holder.to_doc(), now)?;
            debug!(pages = pages.len(), dir = %dir.display(), "imported logseq directory");
            Ok(holder)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ManualClock;
    use crate::tree::{flatten, TreeNode};

    fn outline(tree: TreeNode) -> (Outline<ManualClock>, NodeView) {
        let clock = ManualClock::new(1_000);
        let graph = flatten(&tree, clock.now()).unwrap();
        let root = NodeView::root(graph.root().unwrap());
        (Outline::with_clock(graph, EngineConfig::default(), clock), root)
    }

    fn child(outline: &Outline<ManualClock>, view: &NodeView, index: usize) -> NodeView {
        outline.graph().child_views(view)[index].clone()
    }

    fn title(outline: &Outline<ManualClock>, view: &NodeView) -> String {
        outline.graph().lookup(view.node_id()).title().to_string()
    }

    #[test]
    fn test_split_is_one_undo_step() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("HelloWorld")]));
        let hello = child(&outline, &root, 0);

        let focus = outline.split(&hello, Selection::collapsed(5)).unwrap();
        assert_eq!(title(&outline, &hello), "Hello");
        assert_eq!(title(&outline, &focus.view), "World");

        assert!(outline.undo());
        assert_eq!(title(&outline, &hello), "HelloWorld");
        assert_eq!(outline.graph().child_views(&root).len(), 1);
        assert!(!outline.can_undo());

        assert!(outline.redo());
        assert_eq!(outline.graph().child_views(&root).len(), 2);
    }

    #[test]
    fn test_failed_gesture_changes_nothing() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("only")]));
        let only = child(&outline, &root, 0);
        let before = outline.graph().clone();

        assert!(outline.indent(&only).is_err());
        assert!(outline.set_title(&only, "two\nlines").is_err());
        assert_eq!(outline.graph(), &before);
        assert!(!outline.can_undo());
    }

    #[test]
    fn test_merge_backward_and_forward() {
        let (mut outline, root) = outline(
            TreeNode::text("root").with_children(vec![TreeNode::text("Hello"), TreeNode::text("World"), TreeNode::text("!")]),
        );
        let hello = child(&outline, &root, 0);
        let world = child(&outline, &root, 1);

        let focus = outline.merge_backward(&world).unwrap().unwrap();
        assert_eq!(focus, Focus::at(hello.clone(), 5));
        assert_eq!(title(&outline, &hello), "HelloWorld");

        let focus = outline.merge_forward(&hello).unwrap().unwrap();
        assert_eq!(focus.selection, Selection::collapsed(10));
        assert_eq!(title(&outline, &hello), "HelloWorld!");
        assert_eq!(outline.merge_forward(&hello).unwrap(), None);
        assert_eq!(outline.merge_backward(&hello).unwrap(), None);
    }

    #[test]
    fn test_checkbox_debounce_comes_from_config() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("task")]));
        let task = child(&outline, &root, 0);

        outline.cycle_checkbox(&task).unwrap();
        outline.clock.advance(100);
        outline.cycle_checkbox(&task).unwrap();
        let node = outline.graph().node(&outline.graph().node_id(task.node_id()).unwrap()).unwrap();
        assert_eq!(node.checkbox, Some(Checkbox::Indeterminate));
        assert_eq!(node.history.checkbox.len(), 1);

        outline.clock.advance(5_000);
        assert_eq!(outline.cycle_checkbox(&task).unwrap(), Some(Checkbox::Checked));
        let node = outline.graph().node(&outline.graph().node_id(task.node_id()).unwrap()).unwrap();
        assert_eq!(node.history.checkbox.len(), 2);
    }

    #[test]
    fn test_delete_through_link_keeps_node() {
        let tree = TreeNode::text("root").with_children(vec![
            TreeNode::text("a"),
            TreeNode::text("b"),
        ]);
        let (mut outline, root) = outline(tree);
        let a = child(&outline, &root, 0);
        let b = child(&outline, &root, 1);
        let a_id = outline.graph().node_id(a.node_id()).unwrap();
        outline.link(&b, &a_id, 0).unwrap();
        let link = b.child(a_id.clone());

        outline.delete(&link).unwrap();
        assert!(outline.graph().node(&a_id).is_ok());

        let focus = outline.delete(&b).unwrap().unwrap();
        assert_eq!(focus, Focus::at(a.clone(), 1));
        assert_eq!(outline.graph().child_views(&root).len(), 1);
    }

    #[test]
    fn test_copy_then_paste_links() {
        let tree = TreeNode::text("root").with_children(vec![
            TreeNode::text("source").with_children(vec![TreeNode::text("inner")]),
            TreeNode::text("target"),
        ]);
        let (mut outline, root) = outline(tree);
        let source = child(&outline, &root, 0);
        let target = child(&outline, &root, 1);

        let contents = outline.copy(&source).unwrap();
        assert_eq!(contents.text, "- source\n  - inner\n");

        let target_child = outline.add_child(&target, "first").unwrap();
        let pasted = outline.paste(&target_child, &contents).unwrap();
        assert_eq!(pasted, vec![target.child(source.node_id().clone())]);
        assert_eq!(outline.graph().links_to(source.node_id()).len(), 1);
    }

    #[test]
    fn test_paste_text_falls_back() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("a")]));
        let a = child(&outline, &root, 0);

        let bad_payload = ClipboardContents {
            text: "- one\n  - two\n".to_string(),
            node_ids: Some("not json".to_string()),
        };
        let pasted = outline.paste(&a, &bad_payload).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(title(&outline, &pasted[0]), "one");
        assert_eq!(outline.graph().child_views(&pasted[0]).len(), 1);

        let pasted = outline.paste(&root, &ClipboardContents::plain("x\ny\n")).unwrap();
        assert_eq!(pasted.len(), 2);
        assert_eq!(outline.graph().child_views(&root).len(), 4);
        integrity::validate(outline.graph()).unwrap();
    }

    fn node(id: &str, title: &str, expanded: bool, children: Vec<TreeNode>) -> TreeNode {
        TreeNode::Node {
            id: Some(NodeId::new(id)),
            title: title.to_string(),
            checkbox: None,
            expanded: Some(expanded),
            history: None,
            tags: Vec::new(),
            children,
        }
    }

    fn link_to(id: &str) -> TreeNode {
        TreeNode::NodeLink {
            id: DocId::new(id),
            expanded: None,
        }
    }

    #[test]
    fn test_copied_text_pastes_back_into_same_graph() {
        let tree = TreeNode::text("root").with_children(vec![
            node("a", "A", true, vec![node("target", "Target", false, Vec::new())]),
            node("b", "B", true, vec![link_to("target")]),
        ]);
        let (mut outline, root) = outline(tree);
        let b = child(&outline, &root, 1);
        let copied = outline.copy(&child(&outline, &root, 0)).unwrap();
        assert!(copied.text.contains("id:: target"));
        let before = outline.graph().len();

        let pasted = outline.paste(&b, &ClipboardContents::plain(copied.text.clone())).unwrap();
        assert_eq!(pasted.len(), 1);
        assert_eq!(title(&outline, &pasted[0]), "A");
        assert_eq!(outline.graph().child_views(&pasted[0]), vec![pasted[0].child(DocId::new("target"))]);
        assert_eq!(outline.graph().len(), before + 1);

        let imported = outline.import_logseq(&b, &copied.text).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(outline.graph().len(), before + 2);
        assert_eq!(outline.graph().links_to(&DocId::new("target")).len(), 3);
        integrity::validate(outline.graph()).unwrap();
    }

    #[test]
    fn test_merge_backward_into_owned_link_is_refused() {
        let tree = TreeNode::text("root").with_children(vec![
            node("x", "X", true, vec![link_to("b1")]),
            node("b", "B", false, vec![node("b1", "B1", false, Vec::new())]),
        ]);
        let (mut outline, root) = outline(tree);
        let rows: Vec<String> = outline.rows().unwrap().iter().map(|row| title(&outline, &row.view)).collect();
        assert_eq!(rows, vec!["X", "B1", "B"]);
        let before = outline.graph().clone();

        let b = child(&outline, &root, 1);
        assert_eq!(outline.merge_backward(&b).unwrap(), None);
        assert_eq!(outline.graph(), &before);
        assert!(!outline.can_undo());
    }

    #[test]
    fn test_delete_skips_rows_that_point_into_the_deleted_subtree() {
        let tree = TreeNode::text("root").with_children(vec![
            node("c", "C", true, vec![link_to("t")]),
            node("a", "A", false, vec![node("t", "T", false, Vec::new())]),
        ]);
        let (mut outline, root) = outline(tree);
        let c = child(&outline, &root, 0);
        let a = child(&outline, &root, 1);

        let focus = outline.delete(&a).unwrap().unwrap();
        assert_eq!(focus, Focus::at(c, 1));
        assert!(outline.graph().lookup(&DocId::new("t")).is_missing());
    }

    #[test]
    fn test_tag_view_rows_and_tag_deletion() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("a"), TreeNode::text("b")]));
        let b = child(&outline, &root, 1);
        let tag = outline.tag(&b, "#work", 30.0).unwrap();
        outline
            .set_current_view(Some(CurrentView::Tag { tag_id: tag.clone() }))
            .unwrap();

        let rows = outline.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].view.node_id(), b.node_id());

        outline.delete_tag(&tag).unwrap();
        assert_eq!(outline.current_view(), None);
        assert_eq!(outline.rows().unwrap().len(), 2);
    }

    #[test]
    fn test_save_round_trip_keeps_view() {
        let (mut outline, root) = outline(TreeNode::text("root").with_children(vec![TreeNode::text("a")]));
        let a = child(&outline, &root, 0);
        let a_id = outline.graph().node_id(a.node_id()).unwrap();
        outline
            .set_current_view(Some(CurrentView::Node { node_id: a_id.clone() }))
            .unwrap();
        outline.set_debug_mode(true);

        let file = outline.to_save();
        let reopened = Outline::from_save(&file, EngineConfig::default(), ManualClock::new(0)).unwrap();
        assert_eq!(reopened.zoom_root().unwrap(), NodeView::root(a_id));
        assert!(reopened.debug_mode());
        assert_eq!(reopened.graph(), outline.graph());
    }
}
