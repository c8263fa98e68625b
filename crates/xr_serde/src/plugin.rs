//! The type serializer protocol.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use thiserror::Error;

use crate::{BoxError, Dict, Error, FromValue, Object, Value};

/// The reserved key naming the signature of a tagged map.
pub const TYPE_KEY: &str = "__type__";

/// Named fields produced by an encoder and consumed by a decoder.
pub type Fields = Dict;

type EncodeFn = Arc<dyn Fn(&dyn Object) -> Result<Fields, BoxError> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(Fields) -> Result<Value, BoxError> + Send + Sync>;

/// The default signature of `T`: its Rust type name.
#[inline]
pub fn default_signature<T: ?Sized>() -> &'static str {
    core::any::type_name::<T>()
}

// -----------------------------------------------------------------------------
// HandledType

/// The concrete type an encode plugin is dispatched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandledType {
    id: TypeId,
    path: &'static str,
}

impl HandledType {
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            path: core::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn path(&self) -> &'static str {
        self.path
    }
}

// -----------------------------------------------------------------------------
// TypeSerializer

/// A plugin converting one Rust type to named fields and back.
///
/// A plugin without an encoder is decode-only (it still claims its
/// signature), and one without a decoder is encode-only.
///
/// # Example
///
/// ```
/// use xr_serde::{FieldReader, Fields, TypeSerializer, Value};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Celsius(f64);
///
/// let plugin = TypeSerializer::new::<Celsius>()
///     .with_signature("temp.Celsius")
///     .with_encoder(|c: &Celsius| Ok(Fields::from_iter([("deg".into(), Value::Float(c.0))])))
///     .with_constructor(|fields| {
///         let mut reader = FieldReader::new(fields);
///         let deg = reader.required::<f64>("deg")?;
///         reader.finish()?;
///         Ok(Celsius(deg))
///     });
///
/// assert_eq!(plugin.signature(), "temp.Celsius");
/// assert!(plugin.can_encode() && plugin.can_decode());
/// ```
#[derive(Clone)]
pub struct TypeSerializer {
    handled_type: Option<HandledType>,
    signature: Cow<'static, str>,
    aliases: Vec<Cow<'static, str>>,
    inheritable: bool,
    polymorphic: bool,
    encode: Option<EncodeFn>,
    decode: Option<DecodeFn>,
}

impl TypeSerializer {
    /// A plugin for `T` with the default signature and no codec functions.
    pub fn new<T: Object>() -> Self {
        Self {
            handled_type: Some(HandledType::of::<T>()),
            signature: Cow::Borrowed(default_signature::<T>()),
            aliases: Vec::new(),
            inheritable: false,
            polymorphic: false,
            encode: None,
            decode: None,
        }
    }

    /// A plugin that only claims a signature for decoding.
    pub fn decode_only(signature: impl Into<Cow<'static, str>>) -> Self {
        Self {
            handled_type: None,
            signature: signature.into(),
            aliases: Vec::new(),
            inheritable: false,
            polymorphic: false,
            encode: None,
            decode: None,
        }
    }

    /// Builds the plugin of a [`Serializable`] type.
    pub fn of<T: Serializable>() -> Self {
        Self::new::<T>()
            .with_signature(T::signature())
            .with_aliases(T::ALIASES.iter().copied())
            .inheritable(T::INHERITABLE)
            .polymorphic(T::POLYMORPHIC)
            .with_encoder::<T, _>(T::to_fields)
            .with_constructor::<T, _>(T::from_fields)
    }

    pub fn with_signature(mut self, signature: impl Into<Cow<'static, str>>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<Cow<'static, str>>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_aliases<S>(mut self, aliases: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Allows subtypes declared with
    /// [`Registry::declare_subtype`](crate::Registry::declare_subtype) to
    /// reuse this plugin.
    pub fn inheritable(mut self, inheritable: bool) -> Self {
        self.inheritable = inheritable;
        self
    }

    /// Allows the encoder to emit its own `__type__` field.
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = polymorphic;
        self
    }

    /// Sets the encoder. The plugin must handle `T`.
    pub fn with_encoder<T, F>(mut self, f: F) -> Self
    where
        T: Object,
        F: Fn(&T) -> Result<Fields, BoxError> + Send + Sync + 'static,
    {
        self.encode = Some(Arc::new(
            move |obj: &dyn Object| -> Result<Fields, BoxError> {
                match obj.downcast_ref::<T>() {
                    Some(value) => f(value),
                    None => Err(Box::new(FieldError::WrongType {
                        expected: core::any::type_name::<T>(),
                        found: obj.type_path(),
                    })),
                }
            },
        ));
        self
    }

    /// Sets a decoder that may return any value.
    pub fn with_decoder<F>(mut self, f: F) -> Self
    where
        F: Fn(Fields) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.decode = Some(Arc::new(f));
        self
    }

    /// Sets a decoder that builds a `T`.
    pub fn with_constructor<T, F>(self, f: F) -> Self
    where
        T: Object,
        F: Fn(Fields) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.with_decoder(move |fields| f(fields).map(Value::object))
    }

    /// Drops the encoder, keeping the signature claim.
    pub fn without_encoder(mut self) -> Self {
        self.encode = None;
        self
    }

    /// Drops the decoder.
    pub fn without_decoder(mut self) -> Self {
        self.decode = None;
        self
    }

    #[inline]
    pub fn handled_type(&self) -> Option<HandledType> {
        self.handled_type
    }

    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    #[inline]
    pub fn aliases(&self) -> impl ExactSizeIterator<Item = &str> {
        self.aliases.iter().map(|a| &**a)
    }

    /// The signature followed by every alias.
    pub fn signatures(&self) -> impl Iterator<Item = &str> {
        core::iter::once(self.signature()).chain(self.aliases())
    }

    #[inline]
    pub fn is_inheritable(&self) -> bool {
        self.inheritable
    }

    #[inline]
    pub fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    /// `true` if the plugin handles a type and has an encoder.
    #[inline]
    pub fn can_encode(&self) -> bool {
        self.handled_type.is_some() && self.encode.is_some()
    }

    #[inline]
    pub fn can_decode(&self) -> bool {
        self.decode.is_some()
    }

    /// Runs the encoder on `obj`.
    pub fn encode(&self, obj: &dyn Object) -> Result<Fields, BoxError> {
        match &self.encode {
            Some(encode) => encode(obj),
            None => Err(Box::new(Error::UnserializableType {
                type_path: obj.type_path(),
            })),
        }
    }

    /// Runs the decoder on already decoded fields.
    pub fn decode(&self, fields: Fields) -> Result<Value, BoxError> {
        match &self.decode {
            Some(decode) => decode(fields),
            None => Err(Box::new(Error::ExtensionMissing {
                signature: self.signature.to_string(),
            })),
        }
    }

    /// A copy of this plugin serving a declared subtype.
    ///
    /// Values are converted to the base before encoding and rebuilt from the
    /// base after decoding. The signature is the subtype's own.
    pub(crate) fn derive_for(&self, subtype: &crate::registry::Subtype) -> Self {
        let upcast = subtype.upcast;
        let downcast = subtype.downcast;
        let derived = subtype.derived;

        let encode = self.encode.clone().map(|encode| -> EncodeFn {
            Arc::new(move |obj: &dyn Object| -> Result<Fields, BoxError> {
                let base = upcast(obj).ok_or_else(|| -> BoxError {
                    Box::new(FieldError::WrongType {
                        expected: derived.path(),
                        found: obj.type_path(),
                    })
                })?;
                encode(&*base)
            })
        });

        let decode = self.decode.clone().map(|decode| -> DecodeFn {
            Arc::new(move |fields: Fields| -> Result<Value, BoxError> {
                match decode(fields)? {
                    Value::Object(base) => {
                        let found = base.type_path();
                        downcast(base).map(Value::Object).ok_or_else(|| -> BoxError {
                            Box::new(FieldError::WrongType {
                                expected: derived.path(),
                                found,
                            })
                        })
                    }
                    other => Err(Box::new(Error::unexpected(derived.path(), &other))),
                }
            })
        });

        Self {
            handled_type: Some(derived),
            signature: Cow::Borrowed(derived.path()),
            aliases: Vec::new(),
            inheritable: self.inheritable,
            polymorphic: self.polymorphic,
            encode,
            decode,
        }
    }
}

impl fmt::Debug for TypeSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSerializer")
            .field("handled_type", &self.handled_type.map(|t| t.path()))
            .field("signature", &self.signature)
            .field("aliases", &self.aliases)
            .field("inheritable", &self.inheritable)
            .field("polymorphic", &self.polymorphic)
            .field("encode", &self.encode.is_some())
            .field("decode", &self.decode.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Serializable

/// Implemented by types that describe their own plugin.
///
/// Usually derived with [`derive::Serializable`](crate::derive::Serializable).
pub trait Serializable: Object + Sized {
    /// Overrides the default signature (the Rust type name).
    const SIGNATURE: Option<&'static str> = None;
    /// Extra signatures accepted when decoding.
    const ALIASES: &'static [&'static str] = &[];
    const INHERITABLE: bool = false;
    const POLYMORPHIC: bool = false;

    /// The signature written to `__type__`.
    #[inline]
    fn signature() -> &'static str {
        Self::SIGNATURE.unwrap_or_else(default_signature::<Self>)
    }

    fn to_fields(&self) -> Result<Fields, BoxError>;

    fn from_fields(fields: Fields) -> Result<Self, BoxError>;
}

// -----------------------------------------------------------------------------
// FieldReader

/// Errors raised while reading plugin fields.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FieldError {
    #[error("Missing required field `{0}`")]
    Missing(String),

    #[error("Unexpected fields {0:?}")]
    Unexpected(Vec<String>),

    #[error("Invalid value for field `{name}`")]
    Value {
        name: String,
        #[source]
        source: Error,
    },

    #[error("Plugin for `{expected}` was given a `{found}`")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
}

/// Pops typed fields out of a decoded field map.
///
/// Call [`finish`](Self::finish) last to reject fields nobody asked for.
#[derive(Debug, Default)]
pub struct FieldReader {
    fields: Fields,
}

impl FieldReader {
    #[inline]
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    /// Removes a raw field, keeping the order of the others.
    #[inline]
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn required<T: FromValue>(&mut self, name: &str) -> Result<T, FieldError> {
        let value = self
            .take(name)
            .ok_or_else(|| FieldError::Missing(name.to_string()))?;
        convert(name, value)
    }

    /// `None` when the field is absent.
    pub fn optional<T: FromValue>(&mut self, name: &str) -> Result<Option<T>, FieldError> {
        self.take(name).map(|value| convert(name, value)).transpose()
    }

    pub fn or_default<T: FromValue + Default>(&mut self, name: &str) -> Result<T, FieldError> {
        Ok(self.optional(name)?.unwrap_or_default())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields not taken yet.
    #[inline]
    pub fn remaining(&self) -> impl ExactSizeIterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fails with [`FieldError::Unexpected`] if any field is left.
    pub fn finish(self) -> Result<(), FieldError> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(FieldError::Unexpected(self.fields.into_keys().collect()))
        }
    }

    #[inline]
    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

fn convert<T: FromValue>(name: &str, value: Value) -> Result<T, FieldError> {
    T::from_value(value).map_err(|source| FieldError::Value {
        name: name.to_string(),
        source,
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Celsius(f64);

    fn celsius_plugin() -> TypeSerializer {
        TypeSerializer::new::<Celsius>()
            .with_signature("temp.Celsius")
            .with_alias("temp.C")
            .with_encoder(|c: &Celsius| {
                let mut fields = Fields::new();
                fields.insert("deg".into(), Value::Float(c.0));
                Ok(fields)
            })
            .with_constructor(|fields| {
                let mut reader = FieldReader::new(fields);
                let deg = reader.required("deg")?;
                reader.finish()?;
                Ok(Celsius(deg))
            })
    }

    #[test]
    fn plugin_round_trip() {
        let plugin = celsius_plugin();
        let fields = plugin.encode(&Celsius(21.5)).unwrap();
        assert_eq!(fields["deg"], Value::Float(21.5));
        let value = plugin.decode(fields).unwrap();
        assert_eq!(value.downcast_ref::<Celsius>(), Some(&Celsius(21.5)));
        assert_eq!(plugin.signatures().collect::<Vec<_>>(), ["temp.Celsius", "temp.C"]);
    }

    #[test]
    fn encoder_rejects_other_types() {
        let err = celsius_plugin().encode(&1_i32).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FieldError>(),
            Some(FieldError::WrongType { found: "i32", .. })
        ));
    }

    #[test]
    fn decode_only_plugin() {
        let plugin = TypeSerializer::decode_only("legacy.Thing");
        assert!(!plugin.can_encode());
        assert!(!plugin.can_decode());
        assert_eq!(plugin.handled_type(), None);
    }

    #[test]
    fn reader_reports_problems() {
        let mut fields = Fields::new();
        fields.insert("a".into(), Value::Int(1));
        fields.insert("b".into(), Value::Str("x".into()));
        fields.insert("c".into(), Value::Null);

        let mut reader = FieldReader::new(fields);
        assert!(matches!(reader.required::<i64>("z"), Err(FieldError::Missing(n)) if n == "z"));
        assert!(matches!(reader.required::<i64>("b"), Err(FieldError::Value { .. })));
        assert_eq!(reader.optional::<i64>("a").unwrap(), Some(1));
        assert_eq!(reader.optional::<i64>("a").unwrap(), None);
        assert!(matches!(reader.finish(), Err(FieldError::Unexpected(k)) if k == ["c"]));
    }
}
