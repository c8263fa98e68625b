use alloc::string::String;

use crate::{FieldReader, Fields, TypeSerializer, Value};

const NAMES: [&str; 3] = ["start", "stop", "step"];

/// Python-style `start:stop:step` bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    #[inline]
    pub const fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    #[inline]
    fn parts(&self) -> [Option<i64>; 3] {
        [self.start, self.stop, self.step]
    }
}

crate::impl_object_value!(Slice);

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<Slice>()
        .with_signature("slice")
        .with_encoder(|s: &Slice| {
            let fields = NAMES
                .iter()
                .zip(s.parts())
                .filter_map(|(name, part)| Some((String::from(*name), Value::Int(part?))))
                .collect::<Fields>();
            Ok(fields)
        })
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let [start, stop, step] = NAMES;
            let slice = Slice::new(
                reader.optional(start)?,
                reader.optional(stop)?,
                reader.optional(step)?,
            );
            reader.finish()?;
            Ok(slice)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_missing_bounds() {
        let fields = plugin().encode(&Slice::new(None, Some(-10), Some(-2))).unwrap();
        assert_eq!(fields.keys().collect::<alloc::vec::Vec<_>>(), ["stop", "step"]);
        let back = plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<Slice>(), Some(&Slice::new(None, Some(-10), Some(-2))));
    }
}
