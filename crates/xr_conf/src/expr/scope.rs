use crate::{NodeId, NodeTree, ResolvingNode};

use super::{EvalError, Term};
use xr_serde::Value;

/// Names of the scope variables.
pub(crate) const ROOT_NODE: &str = "r_";
pub(crate) const CURRENT_NODE: &str = "n_";
pub(crate) const FILE_ROOT_NODE: &str = "f_";

/// The node-tree side of an evaluation.
///
/// Gives expressions `r_` (root), `n_` (current node) and `f_` (root of the
/// current file), and carries the resolution chain so that nodes resolved
/// from inside an expression take part in cycle detection.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scope<'a> {
    tree: Option<&'a NodeTree>,
    current: Option<NodeId>,
    frame: Option<&'a ResolvingNode<'a>>,
}

impl<'a> Scope<'a> {
    /// A scope without a tree, for plain arithmetic.
    #[inline]
    pub const fn detached() -> Self {
        Self {
            tree: None,
            current: None,
            frame: None,
        }
    }

    #[inline]
    pub const fn new(
        tree: &'a NodeTree,
        current: Option<NodeId>,
        frame: Option<&'a ResolvingNode<'a>>,
    ) -> Self {
        Self {
            tree: Some(tree),
            current,
            frame,
        }
    }

    #[inline]
    pub fn tree(&self) -> Option<&'a NodeTree> {
        self.tree
    }

    #[inline]
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    #[inline]
    pub fn frame(&self) -> Option<&'a ResolvingNode<'a>> {
        self.frame
    }

    pub(crate) fn require_tree(&self) -> Result<&'a NodeTree, EvalError> {
        self.tree
            .ok_or_else(|| EvalError::type_error("node access requires a node tree"))
    }

    /// Resolves `id` as a dependency of the current resolution.
    pub fn resolve(&self, id: NodeId) -> Result<Value, EvalError> {
        Ok(self.require_tree()?.resolve_in(id, self.frame)?)
    }

    /// Scope variables; `None` for other names.
    pub(crate) fn lookup(&self, name: &str) -> Option<Term> {
        let tree = self.tree?;
        match name {
            ROOT_NODE => Some(Term::Node(tree.root())),
            CURRENT_NODE => self.current.map(Term::Node),
            FILE_ROOT_NODE => {
                let from = self.current.unwrap_or_else(|| tree.root());
                Some(Term::Node(tree.file_root(from)))
            }
            _ => None,
        }
    }
}
