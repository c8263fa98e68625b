//! The node arena.
//!
//! A [`NodeTree`] owns every node of one configuration in a
//! [`SlotMap`]. Nodes refer to each other by [`NodeId`], so splicing a
//! subtree is an id reassignment. A node has at most one parent, and a node
//! belongs to the tree iff it is parented or it is the root.

// -----------------------------------------------------------------------------
// Modules

mod container;
mod key;
mod refs;

// -----------------------------------------------------------------------------
// Exports

pub use key::{RawKey, TypeSpec};

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use indexmap::IndexMap;
use slotmap::SlotMap;
use xr_serde::{Serializer, Value};

use crate::expr::{Parser, Scope, Term};
use crate::interp::Interpolator;
use crate::{ConfError, Environment, Modifier, ProcessEnvironment};

// -----------------------------------------------------------------------------
// Node

slotmap::new_key_type! {
    /// Stable handle of a node inside its [`NodeTree`].
    pub struct NodeId;
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Excluded from the resolved value of the parent container.
        const HIDDEN = 1 << 0;
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A leaf holding raw data. Strings may be expressions.
    Parsed { raw: Value },
    List { children: Vec<NodeId> },
    /// Children are key nodes, indexed by key name.
    Dict { children: IndexMap<String, NodeId> },
    Key {
        name: String,
        value: NodeId,
        types: Vec<TypeSpec>,
        modifiers: Vec<Modifier>,
        /// Set once the modifiers have been applied.
        modified: bool,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Parsed { .. } => "parsed",
            NodeKind::List { .. } => "list",
            NodeKind::Dict { .. } => "dict",
            NodeKind::Key { .. } => "key",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) flags: NodeFlags,
    pub(crate) parent: Option<NodeId>,
    pub(crate) source: Option<PathBuf>,
    pub(crate) kind: NodeKind,
}

impl Node {
    #[inline]
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            flags: NodeFlags::empty(),
            parent: None,
            source: None,
            kind,
        }
    }

    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The file this node was loaded from, if it is the root of one.
    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn is_key(&self) -> bool {
        matches!(self.kind, NodeKind::Key { .. })
    }
}

// -----------------------------------------------------------------------------
// TreeContext

/// The collaborators a tree evaluates with.
#[derive(Clone)]
pub(crate) struct TreeContext {
    pub parser: Arc<Parser>,
    pub serializer: Arc<Serializer>,
    pub environment: Arc<dyn Environment>,
    pub interpolator: Option<Arc<Interpolator>>,
}

impl Default for TreeContext {
    fn default() -> Self {
        Self {
            parser: Arc::new(Parser::new()),
            serializer: Arc::new(Serializer::new()),
            environment: Arc::new(ProcessEnvironment),
            interpolator: None,
        }
    }
}

// -----------------------------------------------------------------------------
// NodeTree

/// An arena holding one configuration tree.
///
/// # Example
///
/// ```
/// use xr_conf::{NodeTree, Value};
///
/// let raw = Value::List(vec![
///     Value::from("x"),
///     Value::dict([("a", Value::Int(1)), ("b", Value::List(vec![Value::Int(2), Value::Int(3)]))]),
/// ]);
/// let tree = NodeTree::new(raw).unwrap();
///
/// let two = tree.node_from_ref(tree.root(), "1.b.0").unwrap();
/// assert_eq!(tree.resolve(two).unwrap(), Value::Int(2));
/// assert_eq!(tree.qual_name(two), "1.b.0");
/// ```
pub struct NodeTree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: NodeId,
    pub(crate) context: TreeContext,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("root", &self.root)
            .field("len", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

impl NodeTree {
    /// Builds a tree with the default parser, serializer and environment.
    ///
    /// Modifiers are not applied, see [`modify`](Self::modify).
    pub fn new(raw: Value) -> Result<Self, ConfError> {
        Self::with_context(raw, TreeContext::default(), None)
    }

    pub(crate) fn with_context(
        raw: Value,
        context: TreeContext,
        source: Option<PathBuf>,
    ) -> Result<Self, ConfError> {
        let mut nodes = SlotMap::with_key();
        let placeholder = nodes.insert(Node::new(NodeKind::Parsed { raw: Value::Null }));
        let mut tree = Self {
            nodes,
            root: placeholder,
            context,
        };
        tree.root = tree.build_subtree(raw, source)?;
        tree.nodes.remove(placeholder);
        Ok(tree)
    }

    // -------------------------------------------------------------------------
    // Access

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes in the arena, detached ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, ConfError> {
        self.nodes.get(id).ok_or(ConfError::StaleNode)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ConfError> {
        self.nodes.get_mut(id).ok_or(ConfError::StaleNode)
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> Result<&NodeKind, ConfError> {
        Ok(&self.node(id)?.kind)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    #[inline]
    pub fn parser(&self) -> &Parser {
        &self.context.parser
    }

    #[inline]
    pub(crate) fn parser_mut(&mut self) -> &mut Parser {
        Arc::make_mut(&mut self.context.parser)
    }

    #[inline]
    pub fn serializer(&self) -> &Serializer {
        &self.context.serializer
    }

    #[inline]
    pub fn environment(&self) -> &dyn Environment {
        &*self.context.environment
    }

    #[inline]
    pub fn interpolator(&self) -> Option<&Interpolator> {
        self.context.interpolator.as_deref()
    }

    /// Direct children, in order. Dicts yield their key nodes, keys their
    /// value node.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::List { children }) => children.clone(),
            Some(NodeKind::Dict { children }) => children.values().copied().collect(),
            Some(NodeKind::Key { value, .. }) => alloc::vec![*value],
            _ => Vec::new(),
        }
    }

    /// The name of a key node.
    pub fn key_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Key { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The value node of a key node.
    pub fn key_value(&self, id: NodeId) -> Option<NodeId> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Key { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Goes up `levels` containers. Key nodes are skipped, so the parent of
    /// a dict value is the dict.
    pub fn up(&self, id: NodeId, levels: usize) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..levels {
            current = self.parent(current)?;
            while self.nodes.get(current)?.is_key() {
                current = self.parent(current)?;
            }
        }
        Some(current)
    }

    /// `id` and its ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(Some(id).filter(|id| self.contains(*id)), |id| {
            self.parent(*id)
        })
    }

    /// The root of the file `id` was loaded from, or the tree root.
    pub fn file_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id)
            .find(|id| self.nodes.get(*id).is_some_and(|node| node.source.is_some()))
            .unwrap_or(self.root)
    }

    /// The source file of the nearest ancestor loaded from a file.
    pub fn source_file(&self, id: NodeId) -> Option<&Path> {
        self.ancestors(id)
            .find_map(|id| self.nodes.get(id)?.source.as_deref())
    }

    /// Whether `id` or any of its ancestors is hidden. A key is also hidden
    /// through its value's flag.
    pub fn is_hidden(&self, id: NodeId) -> bool {
        let value_hidden = self
            .key_value(id)
            .and_then(|value| self.nodes.get(value))
            .is_some_and(|value| value.flags.contains(NodeFlags::HIDDEN));
        value_hidden
            || self
                .ancestors(id)
                .any(|id| self.nodes.get(id).is_some_and(|node| node.flags.contains(NodeFlags::HIDDEN)))
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<(), ConfError> {
        self.node_mut(id)?.flags.set(NodeFlags::HIDDEN, hidden);
        Ok(())
    }

    /// The ref string that addresses `id` from the root. The root is `""`.
    pub fn qual_name(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut child = id;
        while let Some(parent) = self.parent(child) {
            let Some(node) = self.nodes.get(parent) else {
                break;
            };
            match &node.kind {
                NodeKind::List { children } => {
                    if let Some(index) = children.iter().position(|c| *c == child) {
                        parts.push(index.to_string());
                    }
                }
                NodeKind::Key { name, .. } => parts.push(name.clone()),
                // Keys above `id` were named through their value.
                NodeKind::Dict { .. } if child == id => {
                    parts.push(alloc::format!("*{}", self.key_name(child).unwrap_or_default()));
                }
                NodeKind::Dict { .. } => {}
                NodeKind::Parsed { .. } => {}
            }
            child = parent;
        }
        parts.reverse();
        parts.join(".")
    }

    // -------------------------------------------------------------------------
    // Building

    /// Builds a detached subtree from raw data. The subtree root is tagged
    /// with `source`.
    pub(crate) fn build_subtree(
        &mut self,
        raw: Value,
        source: Option<PathBuf>,
    ) -> Result<NodeId, ConfError> {
        let id = self.build_node(raw)?;
        self.node_mut(id)?.source = source;
        Ok(id)
    }

    fn build_node(&mut self, raw: Value) -> Result<NodeId, ConfError> {
        match raw {
            Value::List(items) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    match self.build_node(item) {
                        Ok(child) => children.push(child),
                        Err(err) => {
                            for child in children {
                                self.drop_subtree(child);
                            }
                            return Err(err);
                        }
                    }
                }
                Ok(self.adopt(NodeKind::List { children }))
            }
            Value::Dict(entries) => {
                let mut children: IndexMap<String, NodeId> = IndexMap::with_capacity(entries.len());
                for (raw_key, value) in entries {
                    match self.build_key(&raw_key, value) {
                        Ok(key) => {
                            let name = self.key_name(key).unwrap_or_default().to_string();
                            if let Some(old) = children.insert(name, key) {
                                self.drop_subtree(old);
                            }
                        }
                        Err(err) => {
                            for child in children.into_values() {
                                self.drop_subtree(child);
                            }
                            return Err(err);
                        }
                    }
                }
                Ok(self.adopt(NodeKind::Dict { children }))
            }
            raw => Ok(self.nodes.insert(Node::new(NodeKind::Parsed { raw }))),
        }
    }

    fn build_key(&mut self, raw_key: &str, raw: Value) -> Result<NodeId, ConfError> {
        let parsed = RawKey::parse(raw_key)?;
        let (types, modifiers) = {
            let scope = Scope::new(self, None, None);
            let types = match parsed.types {
                Some(src) => self.eval_key_part(raw_key, src, &scope, TypeSpec::from_term)?,
                None => Vec::new(),
            };
            let modifiers = match parsed.modifiers {
                Some(src) => self.eval_key_part(raw_key, src, &scope, |term| match term {
                    Term::Modifier(modifier) => Some(modifier),
                    _ => None,
                })?,
                None => Vec::new(),
            };
            (types, modifiers)
        };
        let name = parsed.name.to_string();
        let value = self.build_node(raw)?;
        Ok(self.adopt(NodeKind::Key {
            name,
            value,
            types,
            modifiers,
            modified: false,
        }))
    }

    fn eval_key_part<T>(
        &self,
        raw_key: &str,
        src: &str,
        scope: &Scope<'_>,
        convert: impl Fn(Term) -> Option<T>,
    ) -> Result<Vec<T>, ConfError> {
        let term = self
            .parser()
            .eval(src, scope)
            .map_err(|err| ConfError::from_eval(raw_key.to_string(), err))?;
        term.into_items()
            .into_iter()
            .map(|item| {
                convert(item).ok_or_else(|| ConfError::InvalidRawKey {
                    raw_key: raw_key.to_string(),
                })
            })
            .collect()
    }

    /// Inserts a container node and parents its children to it.
    fn adopt(&mut self, kind: NodeKind) -> NodeId {
        let children: Vec<NodeId> = match &kind {
            NodeKind::List { children } => children.clone(),
            NodeKind::Dict { children } => children.values().copied().collect(),
            NodeKind::Key { value, .. } => alloc::vec![*value],
            NodeKind::Parsed { .. } => Vec::new(),
        };
        let id = self.nodes.insert(Node::new(kind));
        for child in children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = Some(id);
            }
        }
        id
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    pub(crate) fn sample() -> NodeTree {
        let raw = Value::List(vec![
            Value::from("x"),
            Value::dict([
                ("a", Value::Int(1)),
                ("b", Value::List(vec![Value::Int(2), Value::Int(3)])),
            ]),
        ]);
        NodeTree::new(raw).unwrap()
    }

    #[test]
    fn structure() {
        let tree = sample();
        let root = tree.root();
        assert!(matches!(tree.kind(root).unwrap(), NodeKind::List { .. }));
        assert_eq!(tree.parent(root), None);

        let children = tree.children(root);
        assert_eq!(children.len(), 2);
        let keys = tree.children(children[1]);
        assert_eq!(tree.key_name(keys[0]), Some("a"));
        assert_eq!(tree.parent(keys[0]), Some(children[1]));
        // Keys are skipped going up.
        let a = tree.key_value(keys[0]).unwrap();
        assert_eq!(tree.up(a, 1), Some(children[1]));
        assert_eq!(tree.up(a, 2), Some(root));
        assert_eq!(tree.up(a, 3), None);
    }

    #[test]
    fn qualified_names() {
        let tree = sample();
        let dict = tree.children(tree.root())[1];
        let key_b = tree.children(dict)[1];
        let b = tree.key_value(key_b).unwrap();
        let three = tree.children(b)[1];

        assert_eq!(tree.qual_name(tree.root()), "");
        assert_eq!(tree.qual_name(dict), "1");
        assert_eq!(tree.qual_name(key_b), "1.*b");
        assert_eq!(tree.qual_name(b), "1.b");
        assert_eq!(tree.qual_name(three), "1.b.1");
    }

    #[test]
    fn hidden_state_propagates() {
        let mut tree = sample();
        let dict = tree.children(tree.root())[1];
        let key_b = tree.children(dict)[1];
        let b = tree.key_value(key_b).unwrap();
        let two = tree.children(b)[0];

        assert!(!tree.is_hidden(two));
        tree.set_hidden(b, true).unwrap();
        assert!(tree.is_hidden(key_b));
        assert!(tree.is_hidden(two));
        assert!(!tree.is_hidden(dict));
    }

    #[test]
    fn typed_keys_are_parsed() {
        let raw = Value::dict([("a:(int, float):hidden", Value::Int(1))]);
        let tree = NodeTree::new(raw).unwrap();
        let key = tree.children(tree.root())[0];
        let NodeKind::Key { name, types, modifiers, .. } = tree.kind(key).unwrap() else {
            panic!("expected a key node");
        };
        assert_eq!(name, "a");
        assert_eq!(types.len(), 2);
        assert_eq!(modifiers.len(), 1);
        assert_eq!(modifiers[0].name(), "hidden");
    }

    #[test]
    fn failed_builds_leave_no_nodes() {
        let mut tree = sample();
        let len = tree.len();
        let raw = Value::List(vec![
            Value::dict([("a", Value::List(vec![Value::Int(1), Value::Int(2)]))]),
            Value::dict([("ok", Value::Int(1)), ("bad.key", Value::Int(2))]),
        ]);
        assert!(matches!(
            tree.build_subtree(raw, None),
            Err(ConfError::InvalidRawKey { .. })
        ));
        assert_eq!(tree.len(), len);

        // A later key of the same name wins, the earlier one is dropped.
        let raw = Value::dict([("a", Value::List(vec![Value::Int(1)])), ("a:int", Value::Int(2))]);
        let id = tree.build_subtree(raw, None).unwrap();
        assert_eq!(tree.len(), len + 3);
        assert_eq!(tree.children(id).len(), 1);
    }

    #[test]
    fn invalid_keys_are_rejected() {
        for raw_key in ["a.b", "a:int:1", "1a"] {
            let raw = Value::dict([(raw_key, Value::Int(1))]);
            assert!(
                matches!(NodeTree::new(raw), Err(ConfError::InvalidRawKey { .. })),
                "{raw_key}"
            );
        }
    }
}
