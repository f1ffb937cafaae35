//! Traversal and rewrite framework over the circuit IR
//!
//! Two visitor layers cooperate:
//!
//! - [`InnerVisitor`] walks types, expressions and aggregates.
//! - [`CircuitVisitor`] walks files, circuits, operators and declarations.
//!
//! Every hook pair follows the same convention: `preorder_*` runs before the
//! node's children and returns a [`VisitFlow`]; `postorder_*` runs after them.
//! When a preorder hook returns [`VisitFlow::SkipChildren`] neither the
//! children nor the matching postorder hook are visited. Any hook error aborts
//! the whole walk and is returned unchanged.
//!
//! [`CircuitDelegateVisitor`] lifts an inner visitor to a whole circuit,
//! [`CloneVisitor`] builds a new circuit through a [`CircuitRewrite`], and
//! [`FunctionRewriter`] / [`InnerRewriter`] compose the two for
//! expression-level rewrites. Rewrites key their old-to-new maps by node
//! identity ([`NodeKey`]) so a physically shared node is rewritten once and
//! stays shared.

pub mod circuit;
pub mod clone;
pub mod delegate;
pub mod inner;
pub mod rewrite;
pub mod stats;

use std::collections::HashMap;
use std::sync::Arc;

/// What a preorder hook wants done with the node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitFlow {
    /// Visit the children, then call the postorder hook
    #[default]
    Continue,
    /// Skip the children and the postorder hook
    SkipChildren,
}

/// Identity of a shared node: the address of its allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    /// Key of the node behind `node`
    pub fn of<T>(node: &Arc<T>) -> Self {
        NodeKey(Arc::as_ptr(node) as *const () as usize)
    }
}

/// Old-to-new map keyed by node identity.
///
/// Two structurally equal but distinct nodes map independently; two handles
/// to one node map to one answer. The old node is kept alive alongside its
/// replacement so its address cannot be reused while the map exists.
#[derive(Debug)]
pub struct RewriteMap<T> {
    entries: HashMap<NodeKey, (Arc<T>, Arc<T>)>,
}

impl<T> RewriteMap<T> {
    /// Empty map
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Replacement recorded for `old`
    pub fn get(&self, old: &Arc<T>) -> Option<&Arc<T>> {
        self.entries.get(&NodeKey::of(old)).map(|(_, new)| new)
    }

    /// Record `new` as the replacement of `old`, returning any earlier one
    pub fn insert(&mut self, old: &Arc<T>, new: Arc<T>) -> Option<Arc<T>> {
        self.entries
            .insert(NodeKey::of(old), (Arc::clone(old), new))
            .map(|(_, previous)| previous)
    }

    /// Whether `old` has been mapped
    pub fn contains(&self, old: &Arc<T>) -> bool {
        self.entries.contains_key(&NodeKey::of(old))
    }

    /// Number of mapped nodes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been mapped
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes mapped to something other than themselves
    pub fn replaced(&self) -> usize {
        self.entries
            .values()
            .filter(|(old, new)| !Arc::ptr_eq(old, new))
            .count()
    }

    /// Forget every mapping
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for RewriteMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub use circuit::{walk_circuit, walk_declaration, walk_file, walk_operator, CircuitVisitor};
pub use clone::{rebuild_with_inputs, CircuitRewrite, CloneVisitor};
pub use delegate::{visit_circuit_expressions, CircuitDelegateVisitor};
pub use inner::{walk_aggregate, walk_expr, walk_type, InnerVisitor};
pub use rewrite::{
    rewrite_functions, ExpressionTransform, FunctionRewriter, InnerRewrite, InnerRewriter,
};
pub use stats::CircuitStatistics;

#[cfg(test)]
#[path = "visit_test.rs"]
mod tests;
