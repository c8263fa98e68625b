use alloc::string::String;
use alloc::vec::Vec;

use crate::{Dict, FieldError, Fields, Registry, Roles, Serializable, TypeSerializer, Value};

/// Field naming the source type of a [`Generic`], unless configured otherwise.
pub const DEFAULT_SOURCE_CLASS_KEY: &str = "source_class";

/// What types registered with [`Registry::register_generic`] decode to: their
/// encoded fields and nothing else.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generic {
    pub fields: Dict,
}

impl Generic {
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The signature of the type this value was encoded from.
    pub fn source_class(&self) -> Option<&str> {
        self.get(DEFAULT_SOURCE_CLASS_KEY).and_then(Value::as_str)
    }
}

crate::impl_object_value!(Generic);

/// Field selection of a generic plugin.
#[derive(Clone, Debug)]
pub struct GenericOptions {
    /// Keep exactly these fields, in this order. Overrides `exclude`.
    pub only: Option<Vec<String>>,
    pub exclude: Vec<String>,
    /// `None` leaves the source type out.
    pub source_class_key: Option<String>,
}

impl Default for GenericOptions {
    fn default() -> Self {
        Self {
            only: None,
            exclude: Vec::new(),
            source_class_key: Some(String::from(DEFAULT_SOURCE_CLASS_KEY)),
        }
    }
}

impl GenericOptions {
    pub fn only<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn source_class_key(mut self, key: Option<&str>) -> Self {
        self.source_class_key = key.map(String::from);
        self
    }

    fn select(&self, mut fields: Fields) -> Result<Fields, FieldError> {
        match &self.only {
            Some(only) => only
                .iter()
                .map(|name| match fields.shift_remove(name) {
                    Some(value) => Ok((name.clone(), value)),
                    None => Err(FieldError::Missing(name.clone())),
                })
                .collect(),
            None => {
                fields.retain(|name, _| !self.exclude.contains(name));
                Ok(fields)
            }
        }
    }
}

impl TypeSerializer {
    /// An encode-only plugin writing `T` under the `generic` signature.
    ///
    /// The fields come from [`Serializable::to_fields`], filtered by
    /// `options`, after the source type's signature.
    pub fn generic<T: Serializable>(options: GenericOptions) -> Self {
        Self::new::<T>()
            .with_signature("generic")
            .with_encoder(move |value: &T| {
                let selected = options.select(value.to_fields()?)?;
                let mut fields = Fields::with_capacity(selected.len() + 1);
                if let Some(key) = &options.source_class_key {
                    fields.insert(key.clone(), Value::from(T::signature()));
                }
                fields.extend(selected);
                Ok(fields)
            })
    }
}

impl Registry {
    /// Encodes `T` as a [`Generic`]. Decoding gives back a [`Generic`], not
    /// a `T`.
    pub fn register_generic<T: Serializable>(&mut self, options: GenericOptions) -> &mut Self {
        self.add_with_roles(TypeSerializer::generic::<T>(options), Roles::ENCODE)
    }
}

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<Generic>()
        .with_signature("generic")
        .with_encoder(|g: &Generic| Ok(g.fields.clone()))
        .with_constructor(|fields| Ok(Generic { fields }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Fields {
        [("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]
            .into_iter()
            .map(|(k, v)| (String::from(k), v))
            .collect()
    }

    #[test]
    fn selection() {
        let keys = |f: Fields| f.into_keys().collect::<Vec<_>>();

        let all = GenericOptions::default().select(fields()).unwrap();
        assert_eq!(keys(all), ["a", "b", "c"]);

        let only = GenericOptions::default().only(["c", "a"]).exclude(["a"]);
        assert_eq!(keys(only.select(fields()).unwrap()), ["c", "a"]);

        let excluded = GenericOptions::default().exclude(["b"]);
        assert_eq!(keys(excluded.select(fields()).unwrap()), ["a", "c"]);

        let missing = GenericOptions::default().only(["z"]).select(fields());
        assert!(matches!(missing, Err(FieldError::Missing(name)) if name == "z"));
    }

    #[test]
    fn generic_reencodes_as_is() {
        let generic = Generic { fields: fields() };
        let encoded = plugin().encode(&generic).unwrap();
        let back = plugin().decode(encoded).unwrap();
        assert_eq!(back.downcast_ref::<Generic>(), Some(&generic));
        assert_eq!(generic.source_class(), None);
    }
}
