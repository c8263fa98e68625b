use alloc::string::String;
use alloc::vec::Vec;

use super::{NodeId, NodeKind, NodeTree};
use crate::ConfError;

impl NodeTree {
    fn ensure_detached(&self, id: NodeId) -> Result<(), ConfError> {
        let node = self.node(id)?;
        if node.parent.is_some() || id == self.root {
            return Err(ConfError::AlreadyParented {
                node: self.qual_name(id),
            });
        }
        Ok(())
    }

    fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent;
        }
    }

    fn list_children_mut(&mut self, id: NodeId) -> Result<&mut Vec<NodeId>, ConfError> {
        if !matches!(self.kind(id)?, NodeKind::List { .. }) {
            return Err(ConfError::NotAList {
                node: self.qual_name(id),
            });
        }
        match &mut self.node_mut(id)?.kind {
            NodeKind::List { children } => Ok(children),
            _ => Err(ConfError::StaleNode),
        }
    }

    fn dict_children_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut indexmap::IndexMap<String, NodeId>, ConfError> {
        if !matches!(self.kind(id)?, NodeKind::Dict { .. }) {
            return Err(ConfError::NotADict {
                node: self.qual_name(id),
            });
        }
        match &mut self.node_mut(id)?.kind {
            NodeKind::Dict { children } => Ok(children),
            _ => Err(ConfError::StaleNode),
        }
    }

    fn require_key(&self, id: NodeId) -> Result<&str, ConfError> {
        self.node(id)?;
        self.key_name(id).ok_or_else(|| ConfError::NotAKey {
            node: self.qual_name(id),
        })
    }

    // -------------------------------------------------------------------------
    // Lists

    pub fn list_push(&mut self, list: NodeId, child: NodeId) -> Result<(), ConfError> {
        self.ensure_detached(child)?;
        self.list_children_mut(list)?.push(child);
        self.set_parent(child, Some(list));
        Ok(())
    }

    /// Inserts `child` at `index`, clamped to the list length.
    pub fn list_insert(&mut self, list: NodeId, index: usize, child: NodeId) -> Result<(), ConfError> {
        self.ensure_detached(child)?;
        let children = self.list_children_mut(list)?;
        children.insert(index.min(children.len()), child);
        self.set_parent(child, Some(list));
        Ok(())
    }

    /// Detaches and returns the child at `index`.
    pub fn list_remove(&mut self, list: NodeId, index: usize) -> Result<NodeId, ConfError> {
        let children = self.list_children_mut(list)?;
        if index >= children.len() {
            return Err(ConfError::IndexOutOfRange {
                index: index as i64,
                node: self.qual_name(list),
            });
        }
        let child = children.remove(index);
        self.set_parent(child, None);
        Ok(child)
    }

    pub fn list_remove_node(&mut self, list: NodeId, child: NodeId) -> Result<(), ConfError> {
        let children = self.list_children_mut(list)?;
        let Some(index) = children.iter().position(|c| *c == child) else {
            return Err(ConfError::NotAChild {
                child: self.qual_name(child),
                parent: self.qual_name(list),
            });
        };
        children.remove(index);
        self.set_parent(child, None);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Dicts

    /// Adds a detached key node. A key of the same name is dropped along
    /// with its subtree, and `true` is returned.
    pub fn dict_insert(&mut self, dict: NodeId, key: NodeId) -> Result<bool, ConfError> {
        let name = String::from(self.require_key(key)?);
        self.ensure_detached(key)?;
        let old = self.dict_children_mut(dict)?.insert(name, key);
        self.set_parent(key, Some(dict));
        if let Some(old) = old {
            self.drop_subtree(old);
        }
        Ok(old.is_some())
    }

    /// Detaches and returns the key `name`. A missing key is an error unless
    /// `safe` is set.
    pub fn dict_remove(
        &mut self,
        dict: NodeId,
        name: &str,
        safe: bool,
    ) -> Result<Option<NodeId>, ConfError> {
        let removed = self.dict_children_mut(dict)?.shift_remove(name);
        match removed {
            Some(key) => {
                self.set_parent(key, None);
                Ok(Some(key))
            }
            None if safe => Ok(None),
            None => Err(ConfError::MissingKey {
                name: String::from(name),
                node: self.qual_name(dict),
            }),
        }
    }

    /// Puts `new_key` where `old_name` was, keeping the position. Returns
    /// the detached old key. A different key already named like `new_key`
    /// is dropped.
    pub fn dict_replace(
        &mut self,
        dict: NodeId,
        old_name: &str,
        new_key: NodeId,
    ) -> Result<NodeId, ConfError> {
        let new_name = String::from(self.require_key(new_key)?);
        self.ensure_detached(new_key)?;
        let children = self.dict_children_mut(dict)?;
        let Some(index) = children.get_index_of(old_name) else {
            return Err(ConfError::MissingKey {
                name: String::from(old_name),
                node: self.qual_name(dict),
            });
        };
        let Some((_, old)) = children.shift_remove_index(index) else {
            return Err(ConfError::StaleNode);
        };
        if let Some(shadowed) = children.shift_remove(&new_name) {
            self.drop_subtree(shadowed);
        }
        let children = self.dict_children_mut(dict)?;
        let index = index.min(children.len());
        children.shift_insert(index, new_name, new_key);
        self.set_parent(old, None);
        self.set_parent(new_key, Some(dict));
        Ok(old)
    }

    // -------------------------------------------------------------------------
    // Keys

    /// Renames a detached key node.
    pub fn rename_key(&mut self, key: NodeId, new_name: impl Into<String>) -> Result<(), ConfError> {
        self.require_key(key)?;
        if self.node(key)?.parent.is_some() {
            return Err(ConfError::RenameWhileParented {
                node: self.qual_name(key),
            });
        }
        if let NodeKind::Key { name, .. } = &mut self.node_mut(key)?.kind {
            *name = new_name.into();
        }
        Ok(())
    }

    /// Renames a key in place. A parented key keeps its position, and a
    /// sibling already using `new_name` is dropped.
    pub fn rename(&mut self, key: NodeId, new_name: impl Into<String>) -> Result<(), ConfError> {
        let Some(dict) = self.node(key)?.parent else {
            return self.rename_key(key, new_name);
        };
        let old_name = String::from(self.require_key(key)?);
        let new_name = new_name.into();
        let index = self
            .dict_children_mut(dict)?
            .get_index_of(&old_name)
            .ok_or(ConfError::StaleNode)?;
        self.dict_remove(dict, &old_name, false)?;
        self.rename_key(key, new_name.clone())?;
        if let Some(shadowed) = self.dict_remove(dict, &new_name, true)? {
            self.drop_subtree(shadowed);
        }
        let children = self.dict_children_mut(dict)?;
        let index = index.min(children.len());
        children.shift_insert(index, new_name, key);
        self.set_parent(key, Some(dict));
        Ok(())
    }

    /// Swaps the value of `key` from `old` to the detached node `new`.
    pub fn key_replace_value(&mut self, key: NodeId, old: NodeId, new: NodeId) -> Result<(), ConfError> {
        self.require_key(key)?;
        if self.key_value(key) != Some(old) {
            return Err(ConfError::NotAChild {
                child: self.qual_name(old),
                parent: self.qual_name(key),
            });
        }
        self.ensure_detached(new)?;
        if let NodeKind::Key { value, .. } = &mut self.node_mut(key)?.kind {
            *value = new;
        }
        self.set_parent(old, None);
        self.set_parent(new, Some(key));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal

    /// Drops `id` and its subtree from the arena, detaching it from a list or
    /// dict parent first. A key's value can only be dropped once replaced.
    pub fn discard(&mut self, id: NodeId) -> Result<(), ConfError> {
        if id == self.root {
            return Err(ConfError::DetachRoot);
        }
        if let Some(parent) = self.node(id)?.parent {
            match self.kind(parent)? {
                NodeKind::List { .. } => self.list_remove_node(parent, id)?,
                NodeKind::Dict { .. } => {
                    let name = String::from(self.require_key(id)?);
                    self.dict_remove(parent, &name, false)?;
                }
                NodeKind::Parsed { .. } | NodeKind::Key { .. } => {
                    return Err(ConfError::AlreadyParented {
                        node: self.qual_name(id),
                    });
                }
            }
        }
        self.drop_subtree(id);
        Ok(())
    }

    /// Copies the subtree at `id` of `other` into this tree, detached.
    pub fn graft(&mut self, other: &NodeTree, id: NodeId) -> Result<NodeId, ConfError> {
        let node = other.node(id)?;
        let kind = match &node.kind {
            NodeKind::Parsed { raw } => NodeKind::Parsed { raw: raw.clone() },
            NodeKind::List { children } => NodeKind::List {
                children: children
                    .iter()
                    .map(|c| self.graft(other, *c))
                    .collect::<Result<_, _>>()?,
            },
            NodeKind::Dict { children } => NodeKind::Dict {
                children: children
                    .iter()
                    .map(|(name, c)| Ok((name.clone(), self.graft(other, *c)?)))
                    .collect::<Result<_, ConfError>>()?,
            },
            NodeKind::Key {
                name,
                value,
                types,
                modifiers,
                modified,
            } => NodeKind::Key {
                name: name.clone(),
                value: self.graft(other, *value)?,
                types: types.clone(),
                modifiers: modifiers.clone(),
                modified: *modified,
            },
        };
        let copy = self.adopt(kind);
        if let Some(target) = self.nodes.get_mut(copy) {
            target.flags = node.flags;
            target.source.clone_from(&node.source);
        }
        Ok(copy)
    }

    pub(crate) fn drop_subtree(&mut self, id: NodeId) {
        let mut pending = alloc::vec![id];
        while let Some(id) = pending.pop() {
            pending.extend(self.children(id));
            self.nodes.remove(id);
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;

    use xr_serde::Value;

    use super::*;
    use crate::node::tests::sample;

    fn detached_key(tree: &mut NodeTree, name: &str, value: i64) -> NodeId {
        let mut scratch = NodeTree::new(Value::dict([(name, Value::Int(value))])).unwrap();
        let dict = scratch.root();
        let key = scratch.dict_remove(dict, name, false).unwrap().unwrap();
        tree.graft(&scratch, key).unwrap()
    }

    #[test]
    fn list_mutation() {
        let mut tree = sample();
        let root = tree.root();
        let x = tree.list_remove(root, 0).unwrap();
        assert_eq!(tree.parent(x), None);
        assert_eq!(tree.children(root).len(), 1);

        tree.list_push(root, x).unwrap();
        assert_eq!(tree.call(root, "1").unwrap(), Value::from("x"));
        assert!(matches!(
            tree.list_push(root, x),
            Err(ConfError::AlreadyParented { .. })
        ));

        tree.list_remove_node(root, x).unwrap();
        tree.list_insert(root, 0, x).unwrap();
        assert_eq!(tree.call(root, "0").unwrap(), Value::from("x"));
        assert!(matches!(
            tree.list_remove_node(root, x).and_then(|()| tree.list_remove_node(root, x)),
            Err(ConfError::NotAChild { .. })
        ));
    }

    #[test]
    fn dict_mutation() {
        let mut tree = NodeTree::new(Value::dict([
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
        ]))
        .unwrap();
        let root = tree.root();

        let c = detached_key(&mut tree, "c", 3);
        assert!(!tree.dict_insert(root, c).unwrap());
        assert_eq!(tree.call(root, "c").unwrap(), Value::Int(3));

        let old_a = tree.dict_child(root, "*a").unwrap();
        let a = detached_key(&mut tree, "a", 10);
        assert!(tree.dict_insert(root, a).unwrap());
        assert!(!tree.contains(old_a));
        assert_eq!(tree.call(root, "a").unwrap(), Value::Int(10));

        let z = detached_key(&mut tree, "z", 0);
        let old_b = tree.dict_replace(root, "b", z).unwrap();
        assert_eq!(tree.key_name(old_b), Some("b"));
        assert_eq!(
            tree.resolve(root).unwrap(),
            Value::dict([("a", Value::Int(10)), ("z", Value::Int(0)), ("c", Value::Int(3))])
        );

        assert!(matches!(
            tree.dict_remove(root, "b", false),
            Err(ConfError::MissingKey { .. })
        ));
        assert_eq!(tree.dict_remove(root, "b", true).unwrap(), None);
    }

    #[test]
    fn renaming_requires_detaching() {
        let mut tree = NodeTree::new(Value::dict([("a", Value::Int(1))])).unwrap();
        let root = tree.root();
        let key = tree.dict_child(root, "*a").unwrap();
        assert!(matches!(
            tree.rename_key(key, "b"),
            Err(ConfError::RenameWhileParented { .. })
        ));

        tree.dict_remove(root, "a", false).unwrap();
        tree.rename_key(key, "b").unwrap();
        tree.dict_insert(root, key).unwrap();
        assert_eq!(tree.call(root, "b").unwrap(), Value::Int(1));
    }

    #[test]
    fn value_replacement_and_discard() {
        let mut tree = NodeTree::new(Value::dict([("a", Value::List(vec![Value::Int(1)]))])).unwrap();
        let root = tree.root();
        let key = tree.dict_child(root, "*a").unwrap();
        let old = tree.key_value(key).unwrap();
        let len = tree.len();

        let scratch = NodeTree::new(Value::Int(5)).unwrap();
        let new = tree.graft(&scratch, scratch.root()).unwrap();
        assert!(matches!(
            tree.key_replace_value(key, new, old),
            Err(ConfError::NotAChild { .. })
        ));
        assert!(matches!(tree.discard(old), Err(ConfError::AlreadyParented { .. })));

        tree.key_replace_value(key, old, new).unwrap();
        tree.discard(old).unwrap();
        assert_eq!(tree.len(), len - 1);
        assert!(!tree.contains(old));
        assert_eq!(tree.call(root, "a").unwrap(), Value::Int(5));
        assert!(matches!(tree.discard(root), Err(ConfError::DetachRoot)));
    }

    #[test]
    fn discard_follows_the_parent_kind() {
        let mut tree = NodeTree::new(Value::dict([
            ("a", Value::List(vec![Value::Int(1), Value::Int(2)])),
            ("b", Value::Int(3)),
        ]))
        .unwrap();
        let root = tree.root();
        let list = tree.key_value(tree.dict_child(root, "*a").unwrap()).unwrap();
        let len = tree.len();

        let first = tree.list_child(list, 0).unwrap();
        tree.discard(first).unwrap();
        let b = tree.dict_child(root, "*b").unwrap();
        tree.discard(b).unwrap();

        assert!(!tree.contains(first) && !tree.contains(b));
        assert_eq!(tree.len(), len - 3);
        assert_eq!(
            tree.resolve(root).unwrap(),
            Value::dict([("a", Value::List(vec![Value::Int(2)]))])
        );
    }

    #[test]
    fn replaced_keys_leave_the_arena() {
        let mut tree = NodeTree::new(Value::dict([
            ("a", Value::Int(1)),
            ("b", Value::List(vec![Value::Int(2), Value::Int(3)])),
        ]))
        .unwrap();
        let root = tree.root();
        let len = tree.len();

        for round in 0..50 {
            // Replacing `a` with a key named `b` also drops the old `b`.
            let key = detached_key(&mut tree, "b", round);
            let old = tree.dict_replace(root, "a", key).unwrap();
            tree.discard(old).unwrap();
            let key = detached_key(&mut tree, "a", round);
            assert!(!tree.dict_insert(root, key).unwrap());
            let key = detached_key(&mut tree, "a", round + 1);
            assert!(tree.dict_insert(root, key).unwrap());
        }
        assert_eq!(
            tree.resolve(root).unwrap(),
            Value::dict([("b", Value::Int(49)), ("a", Value::Int(50))])
        );
        // The list under `b` is gone; two keys with one leaf each remain.
        assert_eq!(tree.len(), len - 2);
    }
}
