//! The MIB tree: a sparse trie of group and instance nodes keyed by OID arcs.
//!
//! Interior (group) nodes hold a sorted child table searched by binary
//! search; leaf (instance) nodes hold the handler serving everything below
//! that prefix. The arcs of a query beyond an instance node's prefix form
//! the *instance suffix* handed to the handler.

use std::sync::Arc;

use crate::handler::{InstanceHandler, NextResult};
use crate::oid::Oid;
use crate::value::Value;

/// Error returned by [`MibTree::register`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegisterError {
    /// A node already exists at the prefix.
    #[error("a node is already registered at {0}")]
    Occupied(Oid),
    /// The path to the prefix crosses an existing instance node.
    #[error("the path to {0} crosses a registered instance")]
    Blocked(Oid),
    /// The prefix is empty.
    #[error("cannot register at the tree root")]
    EmptyPrefix,
}

enum Node {
    Group(GroupNode),
    Instance(InstanceNode),
}

#[derive(Default)]
struct GroupNode {
    /// Strictly increasing sub-identifiers, parallel to `children`.
    sub_ids: Vec<u32>,
    children: Vec<Node>,
}

struct InstanceNode {
    handler: Arc<dyn InstanceHandler>,
}

/// Outcome of an exact search.
pub enum SearchOutcome {
    /// The path reached an instance node; `suffix` is the query remainder.
    Instance {
        handler: Arc<dyn InstanceHandler>,
        node_oid: Oid,
        suffix: Oid,
    },
    /// A sub-identifier was absent at a group node.
    NoSuchObject,
    /// The path ended on a group node.
    NoSuchInstance,
}

/// Outcome of a successor search within one view.
#[derive(Debug, Clone, PartialEq)]
pub enum NextOutcome {
    /// The next live instance within the view.
    Found { oid: Oid, value: Value },
    /// The walk left the view (or the tree) without finding an instance.
    EndOfView,
}

/// Sparse radix tree over registered MIB instances.
#[derive(Default)]
pub struct MibTree {
    root: GroupNode,
}

impl MibTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` as an instance node at `prefix`.
    pub fn register(
        &mut self,
        prefix: &Oid,
        handler: Arc<dyn InstanceHandler>,
    ) -> Result<(), RegisterError> {
        let arcs = prefix.arcs();
        let Some((&last, path)) = arcs.split_last() else {
            return Err(RegisterError::EmptyPrefix);
        };

        let mut node = &mut self.root;
        for &arc in path {
            let idx = match node.sub_ids.binary_search(&arc) {
                Ok(idx) => idx,
                Err(idx) => {
                    node.sub_ids.insert(idx, arc);
                    node.children.insert(idx, Node::Group(GroupNode::default()));
                    idx
                }
            };
            node = match &mut node.children[idx] {
                Node::Group(group) => group,
                Node::Instance(_) => return Err(RegisterError::Blocked(prefix.clone())),
            };
        }

        match node.sub_ids.binary_search(&last) {
            Ok(_) => Err(RegisterError::Occupied(prefix.clone())),
            Err(idx) => {
                node.sub_ids.insert(idx, last);
                node.children
                    .insert(idx, Node::Instance(InstanceNode { handler }));
                Ok(())
            }
        }
    }

    /// Detach the instance node at `prefix`, pruning group nodes left empty.
    ///
    /// Returns the handler if one was registered there. After unregistering,
    /// the tree structure is identical to what it was before the matching
    /// register call.
    pub fn unregister(&mut self, prefix: &Oid) -> Option<Arc<dyn InstanceHandler>> {
        fn remove_in(group: &mut GroupNode, arcs: &[u32]) -> Option<Arc<dyn InstanceHandler>> {
            let (&first, rest) = arcs.split_first()?;
            let idx = group.sub_ids.binary_search(&first).ok()?;

            if rest.is_empty() {
                if !matches!(group.children[idx], Node::Instance(_)) {
                    return None;
                }
                group.sub_ids.remove(idx);
                let Node::Instance(node) = group.children.remove(idx) else {
                    unreachable!("checked above");
                };
                return Some(node.handler);
            }

            let handler = match &mut group.children[idx] {
                Node::Group(child) => {
                    let handler = remove_in(child, rest)?;
                    if child.sub_ids.is_empty() {
                        group.sub_ids.remove(idx);
                        group.children.remove(idx);
                    }
                    handler
                }
                Node::Instance(_) => return None,
            };
            Some(handler)
        }

        remove_in(&mut self.root, prefix.arcs())
    }

    /// Exact search for GET and SET.
    pub fn search(&self, oid: &Oid) -> SearchOutcome {
        let mut node = &self.root;
        let arcs = oid.arcs();

        for (depth, &arc) in arcs.iter().enumerate() {
            let Ok(idx) = node.sub_ids.binary_search(&arc) else {
                return SearchOutcome::NoSuchObject;
            };
            match &node.children[idx] {
                Node::Group(group) => node = group,
                Node::Instance(instance) => {
                    return SearchOutcome::Instance {
                        handler: Arc::clone(&instance.handler),
                        node_oid: Oid::from_slice(&arcs[..=depth]),
                        suffix: Oid::from_slice(&arcs[depth + 1..]),
                    };
                }
            }
        }

        // Path ended on a group node (or the query was empty)
        SearchOutcome::NoSuchInstance
    }

    /// Lexicographic-successor search for GETNEXT and GETBULK, constrained
    /// to one view subtree.
    ///
    /// Finds the least instance OID strictly greater than `query` that lies
    /// under `view_prefix`. A query ahead of the view jumps to the view's
    /// first instance; a query past the view yields end-of-view directly.
    pub fn search_next(&self, query: &Oid, view_prefix: &Oid) -> NextOutcome {
        // A query ahead of the view jumps to the view's first instance,
        // the view prefix itself included.
        let (start, inclusive): (&Oid, bool) = if query.starts_with(view_prefix) {
            (query, false)
        } else if query < view_prefix {
            (view_prefix, true)
        } else {
            return NextOutcome::EndOfView;
        };

        match Self::next_in_group(&self.root, &Oid::empty(), Some(start.arcs()), inclusive) {
            Some((oid, value)) if oid.starts_with(view_prefix) => NextOutcome::Found { oid, value },
            _ => NextOutcome::EndOfView,
        }
    }

    // Recursive successor. `bound` carries the remaining query arcs relative
    // to `prefix`: Some(rem) means results must compare strictly greater
    // than rem (or equal, when `inclusive`); None or Some([]) takes the
    // leftmost instance.
    fn next_in_group(
        group: &GroupNode,
        prefix: &Oid,
        bound: Option<&[u32]>,
        inclusive: bool,
    ) -> Option<(Oid, Value)> {
        let (start_idx, inner_bound) = match bound {
            Some([first, rest @ ..]) => match group.sub_ids.binary_search(first) {
                Ok(idx) => (idx, Some(&rest[..])),
                Err(idx) => (idx, None),
            },
            // Exhausted bound: everything below is greater than the query
            _ => (0, None),
        };

        for idx in start_idx..group.children.len() {
            let bound = if idx == start_idx { inner_bound } else { None };
            let child_prefix = prefix.join(&[group.sub_ids[idx]]);
            let hit = match &group.children[idx] {
                Node::Group(child) => {
                    Self::next_in_group(child, &child_prefix, bound, inclusive)
                }
                Node::Instance(instance) => {
                    Self::next_in_instance(instance, &child_prefix, bound, inclusive)
                }
            };
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    fn next_in_instance(
        instance: &InstanceNode,
        prefix: &Oid,
        bound: Option<&[u32]>,
        inclusive: bool,
    ) -> Option<(Oid, Value)> {
        let after = bound.filter(|rem| !rem.is_empty()).map(Oid::from_slice);

        // Inclusive lower bound: the instance at the bound itself qualifies
        if inclusive
            && let Some(at) = after.as_ref()
            && let crate::handler::GetResult::Value(value) = instance.handler.get(at)
        {
            return Some((prefix.join(at.arcs()), value));
        }

        match instance.handler.next(after.as_ref()) {
            NextResult::Value(suffix, value) => Some((prefix.join(suffix.arcs()), value)),
            NextResult::EndOfTable => None,
        }
    }

    /// Number of registered instance nodes.
    pub fn instance_count(&self) -> usize {
        fn count(group: &GroupNode) -> usize {
            group
                .children
                .iter()
                .map(|child| match child {
                    Node::Group(g) => count(g),
                    Node::Instance(_) => 1,
                })
                .sum()
        }
        count(&self.root)
    }

    /// Number of group nodes, the root included.
    ///
    /// Together with [`instance_count`](Self::instance_count) and
    /// [`instance_prefixes`](Self::instance_prefixes) this pins down the
    /// tree structure for tests.
    pub fn group_count(&self) -> usize {
        fn count(group: &GroupNode) -> usize {
            1 + group
                .children
                .iter()
                .map(|child| match child {
                    Node::Group(g) => count(g),
                    Node::Instance(_) => 0,
                })
                .sum::<usize>()
        }
        count(&self.root)
    }

    /// All registered instance prefixes in lexicographic order.
    pub fn instance_prefixes(&self) -> Vec<Oid> {
        fn walk(group: &GroupNode, prefix: &Oid, out: &mut Vec<Oid>) {
            for (idx, child) in group.children.iter().enumerate() {
                let child_prefix = prefix.join(&[group.sub_ids[idx]]);
                match child {
                    Node::Group(g) => walk(g, &child_prefix, out),
                    Node::Instance(_) => out.push(child_prefix),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &Oid::empty(), &mut out);
        out
    }
}
