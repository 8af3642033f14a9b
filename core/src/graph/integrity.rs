//! Whole-graph consistency checks.

use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use super::Graph;
use crate::models::{Doc, DocId, DocKind};
use crate::{Error, Result};

/// One broken invariant found by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoRoot,
    MultipleRoots(Vec<DocId>),
    RootNotNode(DocId),
    MissingOwner { id: DocId, owner: DocId },
    NotInOwner { id: DocId, owner: DocId },
    DuplicateOwningRef { id: DocId, owner: DocId },
    OwnershipCycle(DocId),
    KindRule { id: DocId, owner: DocId },
    PropertySlot(DocId),
    HistoryOrder(DocId),
    /// A content reference whose target is gone. Soft: renders as missing.
    DanglingLink { parent: DocId, target: DocId },
    /// A doc nothing reaches from the root. Soft: invisible but harmless.
    Unreachable(DocId),
}

impl Violation {
    /// Soft violations are logged; everything else is a hard error.
    pub fn is_soft(&self) -> bool {
        matches!(self, Violation::DanglingLink { .. } | Violation::Unreachable(_))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NoRoot => write!(f, "graph has no root"),
            Violation::MultipleRoots(ids) => {
                let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
                write!(f, "graph has several roots: {}", ids.join(", "))
            }
            Violation::RootNotNode(id) => write!(f, "root {id} is not a text node"),
            Violation::MissingOwner { id, owner } => write!(f, "{id} is owned by missing doc {owner}"),
            Violation::NotInOwner { id, owner } => write!(f, "owner {owner} does not reference {id}"),
            Violation::DuplicateOwningRef { id, owner } => {
                write!(f, "owner {owner} references {id} more than once")
            }
            Violation::OwnershipCycle(id) => write!(f, "{id} is its own ancestor"),
            Violation::KindRule { id, owner } => write!(f, "{owner} may not own {id}"),
            Violation::PropertySlot(id) => {
                write!(f, "property {id} does not link its field in the key slot")
            }
            Violation::HistoryOrder(id) => write!(f, "{id} was modified before it was created"),
            Violation::DanglingLink { parent, target } => {
                write!(f, "{parent} references missing doc {target}")
            }
            Violation::Unreachable(id) => write!(f, "{id} is unreachable from the root"),
        }
    }
}

/// Every invariant violation in the graph, hard and soft.
pub fn check(graph: &Graph) -> Vec<Violation> {
    let mut violations = Vec::new();

    let roots: Vec<&Doc> = graph.docs().filter(|doc| doc.owner_id().is_none()).collect();
    match roots.as_slice() {
        [] => violations.push(Violation::NoRoot),
        [root] if root.kind() != DocKind::Node => violations.push(Violation::RootNotNode(root.id())),
        [_] => {}
        many => violations.push(Violation::MultipleRoots(many.iter().map(|doc| doc.id()).collect())),
    }

    for doc in graph.docs() {
        let id = doc.id();
        let history = doc.history();
        if history.last_modified_time < history.created_time {
            violations.push(Violation::HistoryOrder(id.clone()));
        }
        if let Doc::Property(property) = doc {
            let slot_ok = property
                .content
                .first()
                .is_some_and(|slot| slot.node_id == property.field_id.to_doc());
            if !slot_ok {
                violations.push(Violation::PropertySlot(id.clone()));
            }
        }
        for child in doc.content() {
            if !graph.contains(&child.node_id) {
                violations.push(Violation::DanglingLink {
                    parent: id.clone(),
                    target: child.node_id.clone(),
                });
            }
        }

        let Some(owner_id) = doc.owner_id() else {
            continue;
        };
        let Ok(owner) = graph.doc(&owner_id) else {
            violations.push(Violation::MissingOwner { id, owner: owner_id });
            continue;
        };
        match owner.content().iter().filter(|child| child.node_id == id).count() {
            0 => violations.push(Violation::NotInOwner {
                id: id.clone(),
                owner: owner_id.clone(),
            }),
            1 => {}
            _ => violations.push(Violation::DuplicateOwningRef {
                id: id.clone(),
                owner: owner_id.clone(),
            }),
        }
        if !owner.kind().can_own(doc.kind()) {
            violations.push(Violation::KindRule {
                id: id.clone(),
                owner: owner_id,
            });
        }
        if graph.owns_transitively(&id, &id) {
            violations.push(Violation::OwnershipCycle(id));
        }
    }

    if let Ok(root) = graph.root() {
        let reachable: HashSet<DocId> = graph.owned_subtree(&root.to_doc()).into_iter().collect();
        let in_cycle: HashSet<DocId> = violations
            .iter()
            .filter_map(|violation| match violation {
                Violation::OwnershipCycle(id) => Some(id.clone()),
                _ => None,
            })
            .collect();
        let unreachable: Vec<Violation> = graph
            .doc_ids()
            .filter(|id| !reachable.contains(*id) && !in_cycle.contains(*id))
            .map(|id| Violation::Unreachable(id.clone()))
            .collect();
        violations.extend(unreachable);
    }
    violations
}

/// Fail on the first hard violation; soft ones are logged.
pub fn validate(graph: &Graph) -> Result<()> {
    let mut first_hard = None;
    for violation in check(graph) {
        if violation.is_soft() {
            warn!(%violation, "integrity warning");
        } else if first_hard.is_none() {
            first_hard = Some(violation);
        }
    }
    match first_hard {
        Some(violation) => Err(Error::Integrity(violation.to_string())),
        None => Ok(()),
    }
}

/// Docs that exist but are not reached by ownership from the root.
pub fn find_orphans(graph: &Graph) -> Vec<DocId> {
    check(graph)
        .into_iter()
        .filter_map(|violation| match violation {
            Violation::Unreachable(id) => Some(id),
            _ => None,
        })
        .collect()
}


#[cfg(test)]
mod mutation_sequences {
    use proptest::prelude::*;

    use super::*;
    use crate::models::NodeView;

    #[derive(Debug, Clone)]
    enum Op {
        Create(usize, usize),
        Move(usize, usize, usize, usize),
        Link(usize, usize),
        Unlink(usize, usize),
        Delete(usize),
        Merge(usize, usize),
        Split(usize, usize),
        Indent(usize),
        Outdent(usize),
        MoveUp(usize),
        Duplicate(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        let n = 0..64usize;
        prop_oneof![
            (n.clone(), n.clone()).prop_map(|(p, i)| Op::Create(p, i)),
            (n.clone(), n.clone(), n.clone(), n.clone()).prop_map(|(a, b, c, d)| Op::Move(a, b, c, d)),
            (n.clone(), n.clone()).prop_map(|(p, c)| Op::Link(p, c)),
            (n.clone(), n.clone()).prop_map(|(p, c)| Op::Unlink(p, c)),
            n.clone().prop_map(Op::Delete),
            (n.clone(), n.clone()).prop_map(|(a, b)| Op::Merge(a, b)),
            (n.clone(), 0..4usize).prop_map(|(a, at)| Op::Split(a, at)),
            n.clone().prop_map(Op::Indent),
            n.clone().prop_map(Op::Outdent),
            n.clone().prop_map(Op::MoveUp),
            n.prop_map(Op::Duplicate),
        ]
    }

    fn pick(graph: &Graph, n: usize) -> DocId {
        let ids: Vec<DocId> = graph.doc_ids().cloned().collect();
        ids[n % ids.len()].clone()
    }

    /// The view reaching `id` through owners only.
    fn owning_view(graph: &Graph, id: &DocId) -> Result<NodeView> {
        let mut path = vec![id.clone()];
        let mut current = id.clone();
        while let Some(owner) = graph.doc(&current)?.owner_id() {
            if path.len() > graph.len() {
                return Err(Error::Integrity("owner chain loops".to_string()));
            }
            path.push(owner.clone());
            current = owner;
        }
        path.reverse();
        NodeView::from_path(path)
    }

    fn apply(graph: &mut Graph, op: &Op, now: i64) -> Result<()> {
        match *op {
            Op::Create(p, i) => {
                graph.create_node("n", &pick(graph, p), i, None, now)?;
            }
            Op::Move(n, k, p, i) => {
                let node = pick(graph, n);
                let parents = graph.backlinks(&node);
                let Some(old) = parents.get(k % parents.len().max(1)) else {
                    return Ok(());
                };
                let new_parent = pick(graph, p);
                graph.move_node(&node, &old.parent.clone(), &new_parent, i, now)?;
            }
            Op::Link(p, c) => {
                let node = graph.node_id(&pick(graph, c))?;
                graph.link_node(&pick(graph, p), &node, usize::MAX, now)?;
            }
            Op::Unlink(p, c) => {
                let parent = pick(graph, p);
                let content = graph.doc(&parent)?.content();
                if content.is_empty() {
                    return Ok(());
                }
                let child = content[c % content.len()].node_id.clone();
                graph.remove_link(&parent, &child, now)?;
            }
            Op::Delete(n) => {
                graph.delete_subtree(&pick(graph, n), now)?;
            }
            Op::Merge(a, b) => {
                let first = graph.node_id(&pick(graph, a))?;
                let second = owning_view(graph, &pick(graph, b))?;
                graph.merge_nodes(&first, &second, now)?;
            }
            Op::Split(n, at) => {
                let view = owning_view(graph, &pick(graph, n))?;
                graph.split_node(&view, at, at, now)?;
            }
            Op::Indent(n) => {
                let view = owning_view(graph, &pick(graph, n))?;
                graph.indent(&view, now)?;
            }
            Op::Outdent(n) => {
                let view = owning_view(graph, &pick(graph, n))?;
                graph.outdent(&view, now)?;
            }
            Op::MoveUp(n) => {
                let view = owning_view(graph, &pick(graph, n))?;
                graph.move_up(&view, now)?;
            }
            Op::Duplicate(n) => {
                let view = owning_view(graph, &pick(graph, n))?;
                graph.duplicate_subtree(&view, now)?;
            }
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn ownership_survives_any_mutation_sequence(ops in proptest::collection::vec(op(), 0..40)) {
            let (mut graph, _) = Graph::with_root("root", 0);
            for (step, op) in ops.iter().enumerate() {
                // Rejected operations are fine; a broken graph is not.
                let _ = apply(&mut graph, op, 1_000 + step as i64);
                let hard: Vec<Violation> = check(&graph).into_iter().filter(|v| !v.is_soft()).collect();
                prop_assert!(hard.is_empty(), "after {:?}: {:?}", op, hard);
            }
        }
    }
}
