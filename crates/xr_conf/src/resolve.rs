//! Lazy resolution of nodes into values.
//!
//! Nothing is cached; every call re-derives the value from the current shape
//! of the tree. The chain of nodes being resolved is passed down explicitly
//! as [`ResolvingNode`] frames living on the Rust stack.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use xr_serde::builtin::Tuple;
use xr_serde::{Dict, Value};

use crate::expr::{Scope, kind_name};
use crate::node::{NodeFlags, NodeId, NodeKind, NodeTree};
use crate::ConfError;

// -----------------------------------------------------------------------------
// ResolvingNode

/// One frame of the resolution chain.
#[derive(Clone, Copy, Debug)]
pub struct ResolvingNode<'a> {
    pub node: NodeId,
    pub parent: Option<&'a ResolvingNode<'a>>,
}

impl<'a> ResolvingNode<'a> {
    /// Nodes on the chain, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(Some(self), |frame| frame.parent).map(|frame| frame.node)
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.iter().any(|node| node == id)
    }
}

// -----------------------------------------------------------------------------
// Resolution

impl NodeTree {
    /// Computes the value of `id`.
    ///
    /// # Example
    ///
    /// ```
    /// use xr_conf::{ConfError, NodeTree, Value};
    ///
    /// let tree = NodeTree::new(Value::dict([
    ///     ("a", Value::from("$r_['b']")),
    ///     ("b", Value::from("$r_['a']")),
    /// ]))
    /// .unwrap();
    ///
    /// let Err(ConfError::ResolutionCycle { path }) = tree.resolve(tree.root()) else {
    ///     panic!("expected a cycle");
    /// };
    /// assert_eq!(path, ["a", "b", "a"]);
    /// ```
    #[inline]
    pub fn resolve(&self, id: NodeId) -> Result<Value, ConfError> {
        self.resolve_in(id, None)
    }

    /// Computes the value of `id` as a dependency of the nodes on `frame`.
    pub fn resolve_in(
        &self,
        id: NodeId,
        frame: Option<&ResolvingNode<'_>>,
    ) -> Result<Value, ConfError> {
        let frame = self.enter(id, frame)?;
        match &self.node(id)?.kind {
            NodeKind::Parsed { raw } => self.resolve_parsed(id, raw, &frame),
            NodeKind::List { children } => children
                .iter()
                .filter(|child| !self.has_flag(**child, NodeFlags::HIDDEN))
                .map(|child| self.resolve_in(*child, Some(&frame)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            NodeKind::Dict { children } => {
                let mut dict = Dict::with_capacity(children.len());
                for (name, key) in children {
                    let hidden = self.has_flag(*key, NodeFlags::HIDDEN)
                        || self
                            .key_value(*key)
                            .is_some_and(|value| self.has_flag(value, NodeFlags::HIDDEN));
                    if hidden {
                        continue;
                    }
                    let key_frame = self.enter(*key, Some(&frame))?;
                    dict.insert(name.clone(), self.resolve_key_value(*key, &key_frame)?);
                }
                Ok(Value::Dict(dict))
            }
            NodeKind::Key { name, .. } => {
                let value = self.resolve_key_value(id, &frame)?;
                Ok(Value::object(Tuple(alloc::vec![
                    Value::Str(name.clone()),
                    value
                ])))
            }
        }
    }

    /// Pushes `id` onto the chain, failing if it is already there.
    fn enter<'f>(
        &self,
        id: NodeId,
        frame: Option<&'f ResolvingNode<'f>>,
    ) -> Result<ResolvingNode<'f>, ConfError> {
        if let Some(frame) = frame.filter(|frame| frame.contains(id)) {
            let mut path: Vec<String> = Vec::new();
            for node in frame.iter() {
                path.push(self.qual_name(node));
                if node == id {
                    break;
                }
            }
            path.reverse();
            path.push(self.qual_name(id));
            return Err(ConfError::ResolutionCycle { path });
        }
        Ok(ResolvingNode {
            node: id,
            parent: frame,
        })
    }

    fn has_flag(&self, id: NodeId, flag: NodeFlags) -> bool {
        self.get(id).is_some_and(|node| node.flags.contains(flag))
    }

    /// Resolves the value of a key node and checks it against the key types.
    fn resolve_key_value(&self, key: NodeId, frame: &ResolvingNode<'_>) -> Result<Value, ConfError> {
        let NodeKind::Key { value, types, .. } = &self.node(key)?.kind else {
            return Err(ConfError::NotAKey {
                node: self.qual_name(key),
            });
        };
        let resolved = self.resolve_in(*value, Some(frame))?;
        if types.is_empty()
            || types
                .iter()
                .any(|ty| ty.matches(&resolved, self.serializer()))
        {
            return Ok(resolved);
        }
        Err(ConfError::TypeMismatch {
            node: self.qual_name(key),
            found: kind_name(&resolved),
            expected: types.iter().map(ToString::to_string).collect(),
        })
    }

    fn resolve_parsed(
        &self,
        id: NodeId,
        raw: &Value,
        frame: &ResolvingNode<'_>,
    ) -> Result<Value, ConfError> {
        let Value::Str(text) = raw else {
            return Ok(raw.clone());
        };
        if let Some(expr) = text.strip_prefix('$') {
            let scope = Scope::new(self, Some(id), Some(frame));
            return self
                .parser()
                .eval_value(expr, &scope)
                .map_err(|err| ConfError::from_eval(self.qual_name(id), err));
        }
        if let Some(literal) = text.strip_prefix('\\') {
            return Ok(Value::Str(String::from(literal)));
        }
        match self.interpolator() {
            Some(interpolator) => interpolator
                .interpolate(text)
                .map_err(|err| ConfError::from_eval(self.qual_name(id), err)),
            None => Ok(raw.clone()),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
