use alloc::string::{String, ToString};
use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use xr_serde::{Serializer, Value};

use crate::ConfError;
use crate::expr::{Term, TypeName};

// -----------------------------------------------------------------------------
// RawKey

const VARNAME: &str = r"[A-Za-z_]\w*";

static RAW_KEY: LazyLock<Regex> = LazyLock::new(|| {
    let ns_varname = alloc::format!(r"{VARNAME}(?:\.{VARNAME})*");
    let single = alloc::format!(
        r#"(?:{VARNAME}|'{ns_varname}(?::{VARNAME})?'|"{ns_varname}(?::{VARNAME})?")"#
    );
    let seq = alloc::format!(r"{single}(?:\s*,\s*{single})*");
    let pattern = alloc::format!(
        r"^\s*(?P<name>{VARNAME})(?:\s*:\s*(?P<types>\(\s*{seq}\s*\)|{seq})?(?:\s*:\s*(?P<modifiers>.*?))?)?\s*$"
    );
    Regex::new(&pattern).unwrap_or_else(|err| unreachable!("invalid raw key pattern: {err}"))
});

/// A dict key in `name[:types[:modifiers]]` form, split into its parts.
///
/// ```
/// use xr_conf::RawKey;
///
/// let key = RawKey::parse("port: int : hidden").unwrap();
/// assert_eq!(key.name, "port");
/// assert_eq!(key.types, Some("int"));
/// assert_eq!(key.modifiers, Some("hidden"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawKey<'a> {
    pub name: &'a str,
    pub types: Option<&'a str>,
    pub modifiers: Option<&'a str>,
}

impl<'a> RawKey<'a> {
    pub fn parse(raw_key: &'a str) -> Result<Self, ConfError> {
        let captures = RAW_KEY
            .captures(raw_key)
            .ok_or_else(|| ConfError::InvalidRawKey {
                raw_key: raw_key.to_string(),
            })?;
        let part = |name| {
            captures
                .name(name)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
        };
        Ok(Self {
            name: part("name").unwrap_or_default(),
            types: part("types"),
            modifiers: part("modifiers"),
        })
    }
}

// -----------------------------------------------------------------------------
// TypeSpec

/// A type constraint on a key's value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSpec {
    Builtin(TypeName),
    /// A serializer signature; matches objects of the type its decoder
    /// produces.
    Signature(String),
}

impl TypeSpec {
    pub(crate) fn from_term(term: Term) -> Option<Self> {
        match term {
            Term::Type(ty) => Some(TypeSpec::Builtin(ty)),
            Term::Value(Value::Str(signature)) => Some(TypeSpec::Signature(signature)),
            _ => None,
        }
    }

    pub fn matches(&self, value: &Value, serializer: &Serializer) -> bool {
        match self {
            TypeSpec::Builtin(ty) => ty.matches(value),
            TypeSpec::Signature(signature) => {
                let Some(object) = value.as_object() else {
                    return false;
                };
                serializer
                    .decoder_for(signature)
                    .and_then(|plugin| plugin.handled_type())
                    .is_some_and(|handled| handled.id() == object.object_type_id())
            }
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Builtin(ty) => f.write_str(ty.name()),
            TypeSpec::Signature(signature) => write!(f, "'{signature}'"),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use xr_serde::builtin::Tuple;

    #[test]
    fn raw_key_forms() {
        let plain = RawKey::parse("name").unwrap();
        assert_eq!((plain.name, plain.types, plain.modifiers), ("name", None, None));

        let typed = RawKey::parse(" a : (int, 'my.pkg.Type:v2') ").unwrap();
        assert_eq!(typed.types, Some("(int, 'my.pkg.Type:v2')"));
        assert_eq!(typed.modifiers, None);

        let bare_tuple = RawKey::parse("a:int,float").unwrap();
        assert_eq!(bare_tuple.types, Some("int,float"));

        let untyped = RawKey::parse("a::(hidden, load)").unwrap();
        assert_eq!(untyped.types, None);
        assert_eq!(untyped.modifiers, Some("(hidden, load)"));

        let call = RawKey::parse("a::rename('b')").unwrap();
        assert_eq!(call.modifiers, Some("rename('b')"));
    }

    #[test]
    fn raw_key_errors() {
        for raw_key in ["", "a b", "a:(int", "a:1", "*a", "a.b"] {
            assert!(
                matches!(RawKey::parse(raw_key), Err(ConfError::InvalidRawKey { .. })),
                "{raw_key:?}"
            );
        }
    }

    #[test]
    fn signature_matching() {
        let serializer = Serializer::new();
        let tuple = Value::object(Tuple(alloc::vec![Value::Int(1)]));
        assert!(TypeSpec::Signature("tuple".into()).matches(&tuple, &serializer));
        assert!(!TypeSpec::Signature("set".into()).matches(&tuple, &serializer));
        assert!(!TypeSpec::Signature("no.such.Type".into()).matches(&tuple, &serializer));
        assert!(TypeSpec::Builtin(TypeName::Tuple).matches(&tuple, &serializer));
    }
}
