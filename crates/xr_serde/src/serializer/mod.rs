//! The round-trip codec.
//!
//! ## Encoding
//!
//! - Null, bools, ints, strings and lists map directly onto JSON. Floats must
//!   be finite.
//! - A dict is written as a plain map unless it owns a `__type__` key, in
//!   which case it is wrapped as `{"__type__": "dict", "value": {...}}`.
//! - An object is dispatched on its exact [`TypeId`] and written as
//!   `{"__type__": signature, ...fields}`.
//!
//! ## Decoding
//!
//! - A map without `__type__` is a plain dict.
//! - A map tagged `dict` is unwrapped.
//! - Any other signature (aliases included) selects a decode plugin, which is
//!   handed the recursively decoded fields.

// -----------------------------------------------------------------------------
// Modules

mod text;

// -----------------------------------------------------------------------------
// Exports

pub use text::{LoadSafe, LoadStatus};

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use serde_json::{Map, Number, Value as Json};
use xr_utils::TypeIdMap;
use xr_utils::hash::HashMap;

use crate::builtin::dict::{self, Wrapped};
use crate::registry::{Entry, Subtype};
use crate::{Dict, Error, Fields, Object, Registry, Roles, TYPE_KEY, TypeSerializer, Value};

/// The JSON kind of a plain value, for error messages.
pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "map",
    }
}

// -----------------------------------------------------------------------------
// Serializer

/// An immutable snapshot of a [`Registry`] that encodes and decodes values.
///
/// # Example
///
/// ```
/// use xr_serde::{Serializer, Value, builtin::Tuple};
///
/// let serializer = Serializer::new();
/// let value = Value::object(Tuple::new([Value::Int(1), Value::from("a")]));
///
/// let text = serializer.serialize(&value).unwrap();
/// assert_eq!(text, r#"{"__type__":"tuple","value":[1,"a"]}"#);
/// assert_eq!(serializer.deserialize(&text).unwrap(), value);
/// ```
#[derive(Clone)]
pub struct Serializer {
    encode_plugins: TypeIdMap<Arc<TypeSerializer>>,
    decode_plugins: HashMap<String, Arc<TypeSerializer>>,
}

impl Default for Serializer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// A serializer with the builtin and numeric plugins only.
    #[inline]
    pub fn new() -> Self {
        Self::from_registry(&Registry::new())
    }

    /// Snapshots `registry`.
    ///
    /// Groups are applied from the lowest precedence to the highest, so a
    /// higher group replaces the plugins it collides with. Declared subtypes
    /// without a plugin of their own then inherit one from their base.
    pub fn from_registry(registry: &Registry) -> Self {
        let mut serializer = Self {
            encode_plugins: TypeIdMap::new(),
            decode_plugins: HashMap::default(),
        };
        for group in registry.precedence().iter().rev() {
            for entry in registry.entries(*group) {
                serializer.install(entry);
            }
        }
        serializer.inherit(registry.subtypes());
        serializer
    }

    fn install(&mut self, entry: &Entry) {
        let plugin = &entry.plugin;

        if entry.roles.contains(Roles::ENCODE)
            && plugin.can_encode()
            && let Some(ty) = plugin.handled_type()
            && let Some(old) = self.encode_plugins.insert(ty.id(), plugin.clone())
        {
            log::debug!(
                "encode plugin `{}` for `{}` replaced by `{}`",
                old.signature(),
                ty.path(),
                plugin.signature(),
            );
        }

        if entry.roles.contains(Roles::DECODE) && plugin.can_decode() {
            for signature in plugin.signatures() {
                if let Some(old) = self
                    .decode_plugins
                    .insert(signature.to_string(), plugin.clone())
                    && !Arc::ptr_eq(&old, plugin)
                {
                    log::debug!("decode plugin for signature `{signature}` replaced");
                }
            }
        }
    }

    /// Synthesizes plugins for subtypes, repeating until nothing changes so
    /// that chains of subtypes resolve.
    fn inherit(&mut self, subtypes: &[Subtype]) {
        let mut pending: Vec<&Subtype> = subtypes.iter().collect();

        loop {
            let before = pending.len();
            pending.retain(|subtype| {
                let derived = subtype.derived();
                if self.encode_plugins.contains(&derived.id()) {
                    return false;
                }
                let Some(base) = self.encode_plugins.get(&subtype.base().id()) else {
                    return true;
                };
                if !base.is_inheritable() {
                    return true;
                }
                let plugin = Arc::new(base.derive_for(subtype));
                self.decode_plugins
                    .entry(plugin.signature().to_string())
                    .or_insert_with(|| plugin.clone());
                self.encode_plugins.insert(derived.id(), plugin);
                false
            });
            if pending.len() == before {
                break;
            }
        }

        for subtype in pending {
            if !self.encode_plugins.contains(&subtype.derived().id()) {
                log::warn!(
                    "subtype `{}` found no inheritable plugin through `{}`",
                    subtype.derived().path(),
                    subtype.base().path(),
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Introspection

    /// The plugin encoding values of `type_id`.
    #[inline]
    pub fn encoder_for(&self, type_id: TypeId) -> Option<&TypeSerializer> {
        self.encode_plugins.get(&type_id).map(|p| &**p)
    }

    /// The plugin decoding `signature`, aliases included.
    #[inline]
    pub fn decoder_for(&self, signature: &str) -> Option<&TypeSerializer> {
        self.decode_plugins.get(signature).map(|p| &**p)
    }

    /// The signature written for values of type `T`.
    #[inline]
    pub fn signature_of<T: 'static>(&self) -> Option<&str> {
        self.encoder_for(TypeId::of::<T>())
            .map(TypeSerializer::signature)
    }

    // -------------------------------------------------------------------------
    // Encoding

    /// Converts `value` to plain JSON data.
    pub fn encode(&self, value: &Value) -> Result<Json, Error> {
        Ok(match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or(Error::NonFiniteFloat(*f))?),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(|item| self.encode(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Dict(d) => {
                let entries = self.encode_entries(d)?;
                if d.contains_key(TYPE_KEY) {
                    dict::wrap(entries)
                } else {
                    Json::Object(entries)
                }
            }
            Value::Object(obj) => self.encode_object(&**obj)?,
        })
    }

    fn encode_entries(&self, d: &Dict) -> Result<Map<String, Json>, Error> {
        d.iter()
            .map(|(k, v)| Ok((k.clone(), self.encode(v)?)))
            .collect()
    }

    fn encode_object(&self, obj: &dyn Object) -> Result<Json, Error> {
        let plugin = self
            .encode_plugins
            .get(&obj.object_type_id())
            .ok_or(Error::UnserializableType {
                type_path: obj.type_path(),
            })?;

        let fields = plugin.encode(obj).map_err(|source| Error::Serialization {
            signature: plugin.signature().to_string(),
            source,
        })?;

        if fields.contains_key(TYPE_KEY) && !plugin.is_polymorphic() {
            return Err(Error::ReservedTypeKey {
                signature: plugin.signature().to_string(),
            });
        }

        let mut tagged = Map::with_capacity(fields.len() + 1);
        tagged.insert(TYPE_KEY.to_string(), Json::from(plugin.signature()));
        for (name, value) in &fields {
            tagged.insert(name.clone(), self.encode(value)?);
        }
        Ok(Json::Object(tagged))
    }

    // -------------------------------------------------------------------------
    // Decoding

    /// Rebuilds a value from plain JSON data.
    pub fn decode(&self, json: &Json) -> Result<Value, Error> {
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(
                items
                    .iter()
                    .map(|item| self.decode(item))
                    .collect::<Result<_, _>>()?,
            ),
            Json::Object(map) => match map.get(TYPE_KEY) {
                None => Value::Dict(self.decode_entries(map.iter())?),
                Some(Json::String(signature)) if signature == dict::SIGNATURE => {
                    self.decode_wrapped_dict(map)?
                }
                Some(Json::String(signature)) => self.decode_tagged(signature, map)?,
                Some(other) => {
                    return Err(Error::InvalidSignature {
                        found: other.to_string(),
                    });
                }
            },
        })
    }

    fn decode_entries<'a>(
        &self,
        entries: impl Iterator<Item = (&'a String, &'a Json)>,
    ) -> Result<Dict, Error> {
        entries
            .map(|(k, v)| Ok((k.clone(), self.decode(v)?)))
            .collect()
    }

    fn decode_wrapped_dict(&self, map: &Map<String, Json>) -> Result<Value, Error> {
        let entries = match dict::unwrap(map)? {
            Wrapped::Empty => Dict::new(),
            Wrapped::Map(entries) => self.decode_entries(entries.iter())?,
            Wrapped::Pairs(pairs) => {
                let mut entries = Dict::with_capacity(pairs.len());
                for pair in pairs {
                    let (key, value) = dict::split_pair(pair)?;
                    let key = match self.decode(key)? {
                        Value::Str(key) => key,
                        other => return Err(Error::unexpected("str key", &other)),
                    };
                    entries.insert(key, self.decode(value)?);
                }
                entries
            }
        };
        Ok(Value::Dict(entries))
    }

    fn decode_tagged(&self, signature: &str, map: &Map<String, Json>) -> Result<Value, Error> {
        let plugin = self
            .decode_plugins
            .get(signature)
            .ok_or_else(|| Error::ExtensionMissing {
                signature: signature.to_string(),
            })?;

        let fields: Fields = self.decode_entries(map.iter().filter(|(k, _)| *k != TYPE_KEY))?;

        plugin
            .decode(fields)
            .map_err(|source| Error::Deserialization {
                signature: signature.to_string(),
                source,
            })
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut signatures: Vec<&str> = self.decode_plugins.keys().map(String::as_str).collect();
        signatures.sort_unstable();
        f.debug_struct("Serializer")
            .field("encode_plugins", &self.encode_plugins.len())
            .field("decode_signatures", &signatures)
            .finish()
    }
}
