use alloc::string::{String, ToString};
use std::sync::LazyLock;

use regex::Regex;
use xr_serde::Value;

use super::{NodeId, NodeKind, NodeTree};
use crate::ConfError;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.+|[^.]+").unwrap_or_else(|err| unreachable!("invalid pattern: {err}"))
});

static KEY_COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*?[A-Za-z_]\w*$").unwrap_or_else(|err| unreachable!("invalid pattern: {err}"))
});

impl NodeTree {
    /// Finds the node `ref_str` points at, relative to `id`.
    ///
    /// Components are dot-separated list indices and dict key names
    /// (`*name` for the key node itself). A run of `N` dots goes up `N - 1`
    /// containers, so `.` is `id` itself and the empty string is too.
    pub fn node_from_ref(&self, id: NodeId, ref_str: &str) -> Result<NodeId, ConfError> {
        if !self.contains(id) {
            return Err(ConfError::StaleNode);
        }
        COMPONENT
            .find_iter(ref_str)
            .try_fold(id, |node, component| {
                self.node_from_ref_component(node, component.as_str())
                    .map_err(|err| match err {
                        ConfError::InvalidRefStrComponent { component } => {
                            ConfError::InvalidRefStr {
                                ref_str: ref_str.to_string(),
                                component: Some(component),
                            }
                        }
                        err => err,
                    })
            })
    }

    /// Applies a single ref string component.
    pub fn node_from_ref_component(
        &self,
        id: NodeId,
        component: &str,
    ) -> Result<NodeId, ConfError> {
        let invalid = || ConfError::InvalidRefStrComponent {
            component: component.to_string(),
        };

        if component.bytes().all(|b| b == b'.') && !component.is_empty() {
            return self.up(id, component.len() - 1).ok_or_else(invalid);
        }
        match self.kind(id)? {
            NodeKind::List { children } if is_index(component) => {
                let index: usize = component.parse().map_err(|_| invalid())?;
                children.get(index).copied().ok_or_else(invalid)
            }
            NodeKind::Dict { children } if KEY_COMPONENT.is_match(component) => {
                let (star, name) = match component.strip_prefix('*') {
                    Some(name) => (true, name),
                    None => (false, component),
                };
                let key = children.get(name).copied().ok_or_else(invalid)?;
                if star {
                    Ok(key)
                } else {
                    self.key_value(key).ok_or_else(invalid)
                }
            }
            _ => Err(invalid()),
        }
    }

    /// Resolves the node `ref_str` points at, relative to `id`.
    pub fn call(&self, id: NodeId, ref_str: &str) -> Result<Value, ConfError> {
        let target = self.node_from_ref(id, ref_str)?;
        self.resolve(target)
    }

    /// Looks up a dict child by name. `*name` gives the key node.
    pub fn dict_child(&self, id: NodeId, name: &str) -> Result<NodeId, ConfError> {
        let NodeKind::Dict { children } = self.kind(id)? else {
            return Err(ConfError::NotADict {
                node: self.qual_name(id),
            });
        };
        let (star, bare) = match name.strip_prefix('*') {
            Some(bare) => (true, bare),
            None => (false, name),
        };
        let key = children
            .get(bare)
            .copied()
            .ok_or_else(|| ConfError::MissingKey {
                name: String::from(bare),
                node: self.qual_name(id),
            })?;
        if star {
            Ok(key)
        } else {
            self.key_value(key).ok_or(ConfError::StaleNode)
        }
    }

    /// Looks up a list child. Negative indices count from the end.
    pub fn list_child(&self, id: NodeId, index: i64) -> Result<NodeId, ConfError> {
        let NodeKind::List { children } = self.kind(id)? else {
            return Err(ConfError::NotAList {
                node: self.qual_name(id),
            });
        };
        let len = children.len() as i64;
        let position = if index < 0 { index + len } else { index };
        usize::try_from(position)
            .ok()
            .and_then(|position| children.get(position).copied())
            .ok_or_else(|| ConfError::IndexOutOfRange {
                index,
                node: self.qual_name(id),
            })
    }
}

fn is_index(component: &str) -> bool {
    component == "0"
        || (component.bytes().all(|b| b.is_ascii_digit()) && !component.starts_with('0'))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::node::tests::sample;

    #[test]
    fn refs_walk_down_and_up() {
        let tree = sample();
        let root = tree.root();

        assert_eq!(tree.call(root, "1.b.0").unwrap(), Value::Int(2));
        assert_eq!(tree.call(root, "1.a").unwrap(), Value::Int(1));
        assert_eq!(tree.node_from_ref(root, "").unwrap(), root);
        assert_eq!(tree.node_from_ref(root, ".").unwrap(), root);

        // Dots go up one container less than their count, skipping keys.
        let dict = tree.node_from_ref(root, "1").unwrap();
        assert_eq!(tree.node_from_ref(root, "1.b.0...").unwrap(), dict);
        assert_eq!(tree.node_from_ref(root, "1.b.0....").unwrap(), root);
        assert_eq!(tree.call(root, "1.a..b.1").unwrap(), Value::Int(3));
    }

    #[test]
    fn refs_invert_qualified_names() {
        let tree = sample();
        let root = tree.root();
        for ref_str in ["1", "1.a", "1.*a", "1.b", "1.b.1", "0"] {
            let node = tree.node_from_ref(root, ref_str).unwrap();
            assert_eq!(tree.qual_name(node), ref_str);
        }
        let key = tree.node_from_ref(root, "1.*b").unwrap();
        assert_eq!(tree.key_name(key), Some("b"));
    }

    #[test]
    fn invalid_refs() {
        let tree = sample();
        let root = tree.root();
        for (ref_str, component) in [
            ("2", "2"),
            ("1.c", "c"),
            ("1.b.01", "01"),
            ("..", ".."),
            ("1.b-c", "b-c"),
            ("0.a", "a"),
        ] {
            match tree.node_from_ref(root, ref_str) {
                Err(ConfError::InvalidRefStr {
                    ref_str: found,
                    component: Some(found_component),
                }) => {
                    assert_eq!(found, ref_str);
                    assert_eq!(found_component, component);
                }
                other => panic!("{ref_str}: {other:?}"),
            }
        }
        assert!(matches!(
            tree.node_from_ref_component(root, "x"),
            Err(ConfError::InvalidRefStrComponent { .. })
        ));
    }

    #[test]
    fn child_lookup() {
        let raw = Value::dict([("xs", Value::List(vec![Value::Int(1), Value::Int(2)]))]);
        let tree = NodeTree::new(raw).unwrap();
        let xs = tree.dict_child(tree.root(), "xs").unwrap();
        assert_eq!(tree.resolve(tree.list_child(xs, -1).unwrap()).unwrap(), Value::Int(2));
        assert!(matches!(
            tree.list_child(xs, 2),
            Err(ConfError::IndexOutOfRange { index: 2, .. })
        ));
        assert!(matches!(
            tree.dict_child(tree.root(), "ys"),
            Err(ConfError::MissingKey { .. })
        ));
        assert!(matches!(
            tree.list_child(tree.root(), 0),
            Err(ConfError::NotAList { .. })
        ));
    }
}
