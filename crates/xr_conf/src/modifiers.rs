//! Key modifiers.
//!
//! Modifiers are attached to key nodes through the raw key syntax
//! (`name:types:modifiers`) and applied once per key, in order, by
//! [`NodeTree::modify`].

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use log::debug;
use xr_serde::Value;

use crate::node::{NodeId, NodeKind, NodeTree};
use crate::{ConfError, source};

// -----------------------------------------------------------------------------
// Modifier

type ModifierFn =
    dyn Fn(&mut NodeTree, NodeId) -> Result<Option<NodeId>, ConfError> + Send + Sync;

/// A transformation of a key node.
///
/// Returning `Some(node)` replaces the key for the remaining modifiers and
/// for the traversal.
#[derive(Clone)]
pub struct Modifier {
    name: Cow<'static, str>,
    func: Arc<ModifierFn>,
}

impl Modifier {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(&mut NodeTree, NodeId) -> Result<Option<NodeId>, ConfError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn apply(&self, tree: &mut NodeTree, key: NodeId) -> Result<Option<NodeId>, ConfError> {
        (self.func)(tree, key)
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Modifier").field(&self.name).finish()
    }
}

// -----------------------------------------------------------------------------
// Traversal

impl NodeTree {
    /// Applies pending key modifiers in the subtree of `id`.
    ///
    /// Children are collected before they are visited, since modifiers
    /// restructure the tree as it is walked. Each key runs its modifiers only
    /// once, however often this is called.
    pub fn modify(&mut self, id: NodeId) -> Result<(), ConfError> {
        let Some(node) = self.get(id) else {
            return Ok(());
        };
        let NodeKind::Key {
            modifiers,
            modified,
            ..
        } = &node.kind
        else {
            for child in self.children(id) {
                self.modify(child)?;
            }
            return Ok(());
        };

        let mut current = id;
        if !*modified {
            let modifiers = modifiers.clone();
            self.mark_modified(id);
            for modifier in &modifiers {
                if let Some(replacement) = modifier.apply(self, current)? {
                    self.mark_modified(replacement);
                    current = replacement;
                }
            }
        }
        match self.key_value(current) {
            Some(value) => self.modify(value),
            None => Ok(()),
        }
    }

    fn mark_modified(&mut self, key: NodeId) {
        if let Some(NodeKind::Key { modified, .. }) = self.nodes.get_mut(key).map(|n| &mut n.kind) {
            *modified = true;
        }
    }
}

// -----------------------------------------------------------------------------
// Builtin modifiers

/// Excludes the key from its dict's resolved value.
pub fn hidden() -> Modifier {
    Modifier::new("hidden", |tree, key| {
        tree.set_hidden(key, true)?;
        Ok(None)
    })
}

/// Renames the key, keeping its position.
pub fn rename(new_name: impl Into<String>) -> Modifier {
    let new_name: String = new_name.into();
    Modifier::new("rename", move |tree, key| {
        tree.rename(key, new_name.clone())?;
        Ok(None)
    })
}

/// Replaces the key's value with the content of the file it names.
///
/// Relative paths are taken against the directory of the enclosing source
/// file, or the working directory of the tree's environment.
pub fn load() -> Modifier {
    Modifier::new("load", |tree, key| {
        let old = tree.key_value(key).ok_or_else(|| ConfError::NotAKey {
            node: tree.qual_name(key),
        })?;
        let target = match tree.resolve(old)? {
            Value::Str(path) => path,
            other => {
                return Err(ConfError::LoadTarget {
                    node: tree.qual_name(key),
                    found: crate::expr::kind_name(&other),
                });
            }
        };

        let mut path = std::path::PathBuf::from(target);
        if path.is_relative() {
            let base = match tree.source_file(key).and_then(|file| file.parent()) {
                Some(dir) => dir.to_path_buf(),
                None => tree.environment().cwd(),
            };
            path = base.join(path);
        }
        let path = source::find_file(&path);
        debug!("loading `{}` into `{}`", path.display(), tree.qual_name(key));

        let raw = source::read_raw(&path)?;
        let new = tree.build_subtree(raw, Some(path))?;
        if let Err(err) = tree.key_replace_value(key, old, new) {
            tree.drop_subtree(new);
            return Err(err);
        }
        tree.drop_subtree(old);
        tree.modify(new)?;
        Ok(None)
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::path::Path;

    use super::*;
    use crate::expr::Parser;
    use crate::node::TreeContext;
    use crate::FixedEnvironment;

    fn tree_in(dir: &Path, parser: Parser, raw: Value) -> NodeTree {
        let context = TreeContext {
            parser: Arc::new(parser),
            environment: Arc::new(FixedEnvironment(dir.to_path_buf())),
            ..TreeContext::default()
        };
        let mut tree = NodeTree::with_context(raw, context, None).unwrap();
        tree.modify(tree.root()).unwrap();
        tree
    }

    #[test]
    fn load_splices_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(
            dir.path().join("sub/inner.yaml"),
            "x: 1\nleaf::load: leaf.json\ncounted::count: 2\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("sub/leaf.json"), r#"{"y": [1, 2]}"#).unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let mut parser = Parser::new();
        let counter = count.clone();
        parser
            .register(
                "count",
                Modifier::new("count", move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                }),
                false,
            )
            .unwrap();

        let mut tree = tree_in(
            dir.path(),
            parser,
            Value::dict([("a::load", Value::from("sub/inner")), ("b", Value::Int(0))]),
        );
        let root = tree.root();
        assert_eq!(
            tree.call(root, "a").unwrap(),
            Value::dict([
                ("x", Value::Int(1)),
                ("leaf", Value::dict([("y", Value::List(alloc::vec![Value::Int(1), Value::Int(2)]))])),
                ("counted", Value::Int(2)),
            ])
        );
        let a = tree.node_from_ref(root, "a").unwrap();
        assert_eq!(tree.file_root(a), a);
        assert_eq!(tree.source_file(a), Some(dir.path().join("sub/inner.yaml").as_path()));

        tree.modify(root).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let raw = Value::dict([("a::load", Value::Int(1))]);
        let mut tree = NodeTree::new(raw).unwrap();
        assert!(matches!(
            tree.modify(tree.root()),
            Err(ConfError::LoadTarget { found: "int", .. })
        ));

        let raw = Value::dict([("a::load", Value::from("nowhere"))]);
        let context = TreeContext {
            environment: Arc::new(FixedEnvironment(dir.path().to_path_buf())),
            ..TreeContext::default()
        };
        let mut tree = NodeTree::with_context(raw, context, None).unwrap();
        assert!(matches!(tree.modify(tree.root()), Err(ConfError::Load { .. })));
    }

    #[test]
    fn rename_keeps_position() {
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_in(
            dir.path(),
            Parser::new(),
            Value::dict([
                ("a", Value::Int(1)),
                ("b::rename('c')", Value::Int(2)),
                ("d::(rename('e'), hidden)", Value::Int(3)),
            ]),
        );
        assert_eq!(
            tree.resolve(tree.root()).unwrap(),
            Value::dict([("a", Value::Int(1)), ("c", Value::Int(2))])
        );
        assert_eq!(tree.call(tree.root(), "e").unwrap(), Value::Int(3));
    }

    #[test]
    fn replacements_reach_later_modifiers() {
        let mut parser = Parser::new();
        parser
            .register(
                "swap",
                Modifier::new("swap", |tree, key| {
                    let dict = tree.parent(key).ok_or(ConfError::StaleNode)?;
                    let mut scratch = NodeTree::new(Value::dict([("swapped", Value::Int(7))]))?;
                    let new_key = scratch
                        .dict_remove(scratch.root(), "swapped", false)?
                        .ok_or(ConfError::StaleNode)?;
                    let new_key = tree.graft(&scratch, new_key)?;
                    let name = String::from(tree.key_name(key).unwrap_or_default());
                    let old = tree.dict_replace(dict, &name, new_key)?;
                    tree.discard(old)?;
                    Ok(Some(new_key))
                }),
                false,
            )
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let tree = tree_in(
            dir.path(),
            parser,
            Value::dict([("a::(swap, hidden)", Value::Int(1)), ("b", Value::Int(2))]),
        );
        assert_eq!(
            tree.resolve(tree.root()).unwrap(),
            Value::dict([("b", Value::Int(2))])
        );
        assert_eq!(tree.call(tree.root(), "swapped").unwrap(), Value::Int(7));
    }
}
