use alloc::string::String;
use alloc::vec::Vec;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{FieldReader, Fields, TypeSerializer, Value};

/// A byte string, written as standard base64.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl From<&[u8]> for Bytes {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

crate::impl_object_value!(Bytes);

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<Bytes>()
        .with_signature("bytes")
        .with_encoder(|b: &Bytes| {
            let mut fields = Fields::with_capacity(1);
            fields.insert(String::from("value"), Value::Str(STANDARD.encode(&b.0)));
            Ok(fields)
        })
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let text = reader.required::<String>("value")?;
            reader.finish()?;
            Ok(Bytes(STANDARD.decode(text)?))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_text() {
        let fields = plugin().encode(&Bytes::from(&b"xr"[..])).unwrap();
        assert_eq!(fields["value"], Value::Str("eHI=".into()));
        let back = plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<Bytes>(), Some(&Bytes(b"xr".to_vec())));
    }
}
