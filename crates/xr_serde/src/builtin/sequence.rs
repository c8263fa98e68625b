use alloc::string::String;
use alloc::vec::Vec;

use crate::{BoxError, FieldReader, Fields, TypeSerializer, Value};

const VALUE: &str = "value";

// -----------------------------------------------------------------------------
// Tuple

/// A fixed sequence that must not come back as a list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    #[inline]
    pub fn new(items: impl IntoIterator<Item = Value>) -> Self {
        Self(items.into_iter().collect())
    }
}

impl From<Vec<Value>> for Tuple {
    #[inline]
    fn from(items: Vec<Value>) -> Self {
        Self(items)
    }
}

// -----------------------------------------------------------------------------
// Set

/// An unordered collection of distinct values.
///
/// Values are only `PartialEq`, so membership is a linear scan. Iteration
/// follows insertion order; equality ignores it.
#[derive(Clone, Debug, Default)]
pub struct Set {
    items: Vec<Value>,
}

impl Set {
    #[inline]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Inserts `value`, returning `false` if an equal value was present.
    pub fn insert(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.items.push(value);
        true
    }

    #[inline]
    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Value> {
        self.items.iter()
    }

    #[inline]
    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl FromIterator<Value> for Set {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = Set::new();
        iter.into_iter().for_each(|v| {
            set.insert(v);
        });
        set
    }
}

crate::impl_object_value!(Tuple, Set);

// -----------------------------------------------------------------------------
// Plugins

pub(super) fn items_fields(key: &str, items: Vec<Value>) -> Fields {
    let mut fields = Fields::with_capacity(1);
    fields.insert(String::from(key), Value::List(items));
    fields
}

pub(super) fn read_items(fields: Fields, key: &str) -> Result<Vec<Value>, BoxError> {
    let mut reader = FieldReader::new(fields);
    let items = reader.required::<Vec<Value>>(key)?;
    reader.finish()?;
    Ok(items)
}

pub(super) fn tuple_plugin() -> TypeSerializer {
    TypeSerializer::new::<Tuple>()
        .with_signature("tuple")
        .with_encoder(|t: &Tuple| Ok(items_fields(VALUE, t.0.clone())))
        .with_constructor(|fields| read_items(fields, VALUE).map(Tuple))
}

pub(super) fn set_plugin() -> TypeSerializer {
    TypeSerializer::new::<Set>()
        .with_signature("set")
        .with_encoder(|s: &Set| Ok(items_fields(VALUE, s.items.clone())))
        .with_constructor(|fields| read_items(fields, VALUE).map(Set::from_iter))
}

/// Lists encode untagged; the tagged form is only read.
pub(super) fn list_plugin() -> TypeSerializer {
    TypeSerializer::decode_only("list")
        .with_decoder(|fields| read_items(fields, VALUE).map(Value::List))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_ignores_order_and_duplicates() {
        let a: Set = [Value::Int(1), Value::Int(2), Value::Int(1)]
            .into_iter()
            .collect();
        let b: Set = [Value::Int(2), Value::Int(1)].into_iter().collect();
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn list_plugin_rejects_extra_fields() {
        let mut fields = items_fields(VALUE, alloc::vec![Value::Null]);
        assert_eq!(
            list_plugin().decode(fields.clone()).unwrap(),
            Value::List(alloc::vec![Value::Null])
        );
        fields.insert("extra".into(), Value::Int(0));
        assert!(list_plugin().decode(fields).is_err());
    }
}
