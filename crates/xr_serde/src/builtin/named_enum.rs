use alloc::string::{String, ToString};

use thiserror::Error;

use crate::{FieldReader, Fields, Object, TypeSerializer, Value};

/// A fieldless enum stored by variant name, as `{"name": "Variant"}`.
///
/// Usually derived with [`derive::NamedEnum`](crate::derive::NamedEnum).
pub trait NamedEnum: Object + Sized {
    /// Overrides the default signature (the Rust type name).
    const SIGNATURE: Option<&'static str> = None;

    fn variant_name(&self) -> &'static str;

    fn from_variant_name(name: &str) -> Option<Self>;
}

#[derive(Debug, Error)]
#[error("`{name}` is not a variant of `{type_path}`")]
pub struct UnknownVariant {
    pub name: String,
    pub type_path: &'static str,
}

impl TypeSerializer {
    /// The plugin of a [`NamedEnum`].
    pub fn named_enum<T: NamedEnum>() -> Self {
        let plugin = Self::new::<T>()
            .with_encoder(|v: &T| {
                let mut fields = Fields::with_capacity(1);
                fields.insert("name".to_string(), Value::from(v.variant_name()));
                Ok(fields)
            })
            .with_constructor(|fields| {
                let mut reader = FieldReader::new(fields);
                let name = reader.required::<String>("name")?;
                reader.finish()?;
                T::from_variant_name(&name).ok_or_else(|| {
                    UnknownVariant {
                        name,
                        type_path: core::any::type_name::<T>(),
                    }
                    .into()
                })
            });
        match T::SIGNATURE {
            Some(signature) => plugin.with_signature(signature),
            None => plugin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl NamedEnum for Color {
        fn variant_name(&self) -> &'static str {
            match self {
                Color::Red => "Red",
                Color::Blue => "Blue",
            }
        }

        fn from_variant_name(name: &str) -> Option<Self> {
            match name {
                "Red" => Some(Color::Red),
                "Blue" => Some(Color::Blue),
                _ => None,
            }
        }
    }

    #[test]
    fn by_name() {
        let plugin = TypeSerializer::named_enum::<Color>();
        let fields = plugin.encode(&Color::Blue).unwrap();
        assert_eq!(fields["name"], Value::from("Blue"));
        assert_eq!(plugin.decode(fields).unwrap(), Value::object(Color::Blue));

        let mut bad = Fields::new();
        bad.insert("name".into(), Value::from("Green"));
        let err = plugin.decode(bad).unwrap_err();
        assert!(err.downcast_ref::<UnknownVariant>().is_some());
    }
}
