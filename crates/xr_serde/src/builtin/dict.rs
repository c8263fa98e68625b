//! The explicit dict form, `{"__type__": "dict", "value": ...}`.
//!
//! Only dicts owning a `__type__` key are written this way. When reading,
//! `value` may be a map or a list of `[key, value]` pairs.

use alloc::string::String;
use alloc::vec::Vec;

use serde_json::{Map, Value as Json};

use crate::serializer::json_kind;
use crate::{Error, TYPE_KEY};

pub(crate) const SIGNATURE: &str = "dict";
const VALUE: &str = "value";

/// Wraps already encoded entries.
pub(crate) fn wrap(entries: Map<String, Json>) -> Json {
    let mut tagged = Map::with_capacity(2);
    tagged.insert(String::from(TYPE_KEY), Json::from(SIGNATURE));
    tagged.insert(String::from(VALUE), Json::Object(entries));
    Json::Object(tagged)
}

/// Still-encoded entries of a wrapped dict.
pub(crate) enum Wrapped<'a> {
    Empty,
    Map(&'a Map<String, Json>),
    Pairs(&'a [Json]),
}

pub(crate) fn unwrap(tagged: &Map<String, Json>) -> Result<Wrapped<'_>, Error> {
    if tagged.keys().any(|k| k != TYPE_KEY && k != VALUE) {
        return Err(Error::InvalidDictKeys {
            found: tagged.keys().cloned().collect(),
        });
    }
    match tagged.get(VALUE) {
        None => Ok(Wrapped::Empty),
        Some(Json::Object(entries)) => Ok(Wrapped::Map(entries)),
        Some(Json::Array(pairs)) => Ok(Wrapped::Pairs(pairs)),
        Some(other) => Err(Error::UnexpectedValue {
            expected: "map or list of pairs",
            found: json_kind(other),
        }),
    }
}

/// Splits one `[key, value]` item of the pair form.
pub(crate) fn split_pair(pair: &Json) -> Result<(&Json, &Json), Error> {
    match pair.as_array().map(Vec::as_slice) {
        Some([key, value]) => Ok((key, value)),
        _ => Err(Error::UnexpectedValue {
            expected: "[key, value] pair",
            found: json_kind(pair),
        }),
    }
}
