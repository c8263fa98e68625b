use core::any::TypeId;
use core::fmt;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map keyed by [`TypeId`], hashed with [`NoOpHashState`].
///
/// Backs the "handled type → encode plugin" table of a serializer, which is
/// consulted once per encoded object.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use xr_utils::TypeIdMap;
///
/// let mut plugins = TypeIdMap::new();
/// plugins.insert(TypeId::of::<u8>(), "byte");
/// assert_eq!(plugins.get(&TypeId::of::<u8>()), Some(&"byte"));
/// assert!(!plugins.contains(&TypeId::of::<u16>()));
/// ```
pub struct TypeIdMap<V>(HashMap<TypeId, V, NoOpHashState>);

impl<V> TypeIdMap<V> {
    #[inline]
    pub const fn new() -> Self {
        Self(HashMap::with_hasher(NoOpHashState))
    }

    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.0.get(type_id)
    }

    /// Inserts `value`, returning the one it replaced.
    #[inline]
    pub fn insert(&mut self, type_id: TypeId, value: V) -> Option<V> {
        self.0.insert(type_id, value)
    }

    #[inline]
    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.0.contains_key(type_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for TypeIdMap<V> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<V: fmt::Debug> fmt::Debug for TypeIdMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_plugins_replace_earlier_ones() {
        let mut map = TypeIdMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(TypeId::of::<i64>(), "int"), None);
        assert_eq!(map.insert(TypeId::of::<i64>(), "int64"), Some("int"));
        map.insert(TypeId::of::<f64>(), "float");

        assert_eq!(map.get(&TypeId::of::<i64>()), Some(&"int64"));
        assert_eq!(map.len(), 2);
        assert!(map.clone().contains(&TypeId::of::<f64>()));
    }
}
