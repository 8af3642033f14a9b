use super::{Graph, MISSING_TITLE};
use crate::models::{Doc, DocId, NodeView};
use crate::{Error, Result};

/// Structural context of a view that has a parent.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub parent: &'a Doc,
    pub child_index: usize,
    pub is_expanded: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ResolvedView<'a> {
    pub doc: &'a Doc,
    pub context: Option<ViewContext<'a>>,
}

/// A child reference resolved leniently: a dangling reference becomes `Missing`.
#[derive(Debug, Clone, Copy)]
pub enum DocRef<'a> {
    Present(&'a Doc),
    Missing(&'a DocId),
}

impl<'a> DocRef<'a> {
    pub fn title(&self) -> &'a str {
        match self {
            DocRef::Present(doc) => doc.title(),
            DocRef::Missing(_) => MISSING_TITLE,
        }
    }

    pub fn doc(&self) -> Option<&'a Doc> {
        match self {
            DocRef::Present(doc) => Some(doc),
            DocRef::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, DocRef::Missing(_))
    }
}

/// A reference to some doc from a parent's content list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlink {
    pub parent: DocId,
    pub index: usize,
    pub expanded: Option<bool>,
}

impl Graph {
    /// Resolve a view to its doc and, when it has a parent, where it sits there.
    ///
    /// A view whose parent doesn't reference the node is inconsistent and
    /// fails with an integrity error.
    pub fn resolve_view(&self, view: &NodeView) -> Result<ResolvedView<'_>> {
        let doc = self.doc(view.node_id())?;
        let Some(parent_id) = view.parent_id() else {
            return Ok(ResolvedView { doc, context: None });
        };
        let parent = self.doc(parent_id)?;
        let child_index = parent.position_of(view.node_id()).ok_or_else(|| {
            Error::Integrity(format!(
                "view {view} is inconsistent: {parent_id} does not reference {}",
                view.node_id()
            ))
        })?;
        let is_expanded = parent.content()[child_index].is_expanded();
        Ok(ResolvedView {
            doc,
            context: Some(ViewContext {
                parent,
                child_index,
                is_expanded,
            }),
        })
    }

    /// Look up a reference target without failing on dangling ids.
    pub fn lookup<'a>(&'a self, id: &'a DocId) -> DocRef<'a> {
        match self.docs.get(id) {
            Some(doc) => DocRef::Present(doc),
            None => DocRef::Missing(id),
        }
    }

    /// Every content reference pointing at `id`, in graph order.
    pub fn backlinks(&self, id: &DocId) -> Vec<Backlink> {
        self.docs
            .values()
            .flat_map(|doc| {
                let parent = doc.id();
                doc.content()
                    .iter()
                    .enumerate()
                    .filter(|(_, child)| &child.node_id == id)
                    .map(move |(index, child)| Backlink {
                        parent: parent.clone(),
                        index,
                        expanded: child.expanded,
                    })
            })
            .collect()
    }

    /// Backlinks that are links rather than the owning reference.
    pub fn links_to(&self, id: &DocId) -> Vec<Backlink> {
        self.backlinks(id)
            .into_iter()
            .filter(|backlink| !self.is_owning_ref(&backlink.parent, id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn sample() -> Graph {
        let mut g = graph(&[
            ("root", None, &["a", "c"]),
            ("a", Some("root"), &["b"]),
            ("b", Some("a"), &[]),
            ("c", Some("root"), &["b"]),
        ]);
        g.doc_mut(&id("root")).unwrap().content_mut().unwrap()[0].expanded = Some(true);
        g
    }

    #[test]
    fn test_resolve_root_view() {
        let g = sample();
        let resolved = g.resolve_view(&NodeView::root(id("root"))).unwrap();
        assert_eq!(resolved.doc.id(), id("root"));
        assert!(resolved.context.is_none());
    }

    #[test]
    fn test_resolve_context() {
        let g = sample();
        let resolved = g.resolve_view(&NodeView::root(id("root")).child(id("a"))).unwrap();
        let ctx = resolved.context.unwrap();
        assert_eq!(ctx.parent.id(), id("root"));
        assert_eq!(ctx.child_index, 0);
        assert!(ctx.is_expanded);

        let c = g.resolve_view(&NodeView::root(id("root")).child(id("c"))).unwrap();
        assert!(!c.context.unwrap().is_expanded);
    }

    #[test]
    fn test_resolve_missing_doc() {
        let g = sample();
        let err = g.resolve_view(&NodeView::root(id("ghost"))).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_resolve_inconsistent_view() {
        let g = sample();
        let bad = NodeView::root(id("c")).child(id("a"));
        assert!(matches!(g.resolve_view(&bad), Err(Error::Integrity(_))));
    }

    #[test]
    fn test_backlinks() {
        let g = sample();
        let all = g.backlinks(&id("b"));
        assert_eq!(all.len(), 2);
        let links = g.links_to(&id("b"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].parent, id("c"));
    }

    #[test]
    fn test_lookup_missing() {
        let g = sample();
        let ghost = id("ghost");
        let found = g.lookup(&ghost);
        assert!(found.is_missing());
        assert_eq!(found.title(), MISSING_TITLE);
    }
}
