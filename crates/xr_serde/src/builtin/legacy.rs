//! Decode-only signatures written by older releases, all with a single
//! `__value__` field.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::{BoxError, Error, FieldReader, TypeSerializer};

use super::sequence::{Set, Tuple, read_items};
use super::slice::Slice;

const VALUE: &str = "__value__";

pub(super) fn plugins() -> Vec<TypeSerializer> {
    alloc::vec![
        TypeSerializer::decode_only("builtins.tuple")
            .with_constructor(|fields| read_items(fields, VALUE).map(Tuple)),
        TypeSerializer::decode_only("builtins.set")
            .with_constructor(|fields| read_items(fields, VALUE).map(Set::from_iter)),
        TypeSerializer::decode_only("pglib.serializer.extensions.SliceSerializer")
            .with_constructor(|fields| {
                let mut reader = FieldReader::new(fields);
                let parts = reader.required::<Vec<Option<i64>>>(VALUE)?;
                reader.finish()?;
                slice_from_parts(&parts)
            }),
    ]
}

/// `slice(*parts)`: one part is the stop, two are start and stop.
fn slice_from_parts(parts: &[Option<i64>]) -> Result<Slice, BoxError> {
    match *parts {
        [stop] => Ok(Slice::new(None, stop, None)),
        [start, stop] => Ok(Slice::new(start, stop, None)),
        [start, stop, step] => Ok(Slice::new(start, stop, step)),
        _ => Err(Box::new(Error::UnexpectedValue {
            expected: "one to three slice bounds",
            found: "list",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fields, Value};

    fn decode(signature: &str, value: Value) -> Value {
        let plugin = plugins()
            .into_iter()
            .find(|p| p.signature() == signature)
            .unwrap();
        let mut fields = Fields::new();
        fields.insert(VALUE.into(), value);
        plugin.decode(fields).unwrap()
    }

    #[test]
    fn legacy_tuple_and_slice() {
        let tuple = decode("builtins.tuple", Value::List(alloc::vec![Value::Int(1)]));
        assert_eq!(tuple.downcast_ref::<Tuple>(), Some(&Tuple(alloc::vec![Value::Int(1)])));

        let slice = decode(
            "pglib.serializer.extensions.SliceSerializer",
            Value::List(alloc::vec![Value::Int(5)]),
        );
        assert_eq!(slice.downcast_ref::<Slice>(), Some(&Slice::new(None, Some(5), None)));
    }
}
