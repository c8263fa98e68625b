//! Parameter binding for constructor-style plugins.
//!
//! A type (or function) is described by its parameter list. Encoding turns
//! the bound arguments into fields, decoding binds fields back to the
//! parameters, filling defaults and collecting extras into the variadic
//! keyword parameter.
//!
//! This is the runtime behind `#[derive(Serializable)]` and `#[callable]`.
//!
//! ## Variadic keywords
//!
//! [`KwargsLevel`] controls where the variadic keyword arguments go:
//!
//! - `Root`: flattened into the fields. A name clash is an error.
//! - `Safe`: nested under the parameter name.
//! - `Auto`: flattened, unless a name clashes with another field (or with
//!   the parameter name itself), in which case all of them are nested.
//!
//! # Example
//!
//! ```
//! use xr_serde::Value;
//! use xr_serde::decorate::{BoundArgs, DecorateOptions, Param, bind_fields, encode_bound};
//!
//! const PARAMS: &[Param] = &[
//!     Param::positional("a"),
//!     Param::var_args("args"),
//!     Param::var_kwargs("kwargs"),
//! ];
//!
//! let mut bound = BoundArgs::new();
//! bound.insert("a".into(), Value::Int(1));
//! bound.insert("args".into(), Value::List(vec![Value::Int(3)]));
//! bound.insert("kwargs".into(), Value::dict([("args", Value::Int(5))]));
//!
//! let options = DecorateOptions::default();
//! let fields = encode_bound(PARAMS, &options, bound.clone()).unwrap();
//! // `args` clashes with the variadic field, so the keywords are nested.
//! assert!(fields["kwargs"].as_dict().is_some());
//! assert_eq!(bind_fields(PARAMS, &options, fields).unwrap(), bound);
//! ```

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::{BoxError, Dict, Error, Fields, FromValue, TypeSerializer, Value};

/// Arguments bound to parameter names.
///
/// The variadic positional parameter holds a [`Value::List`], the variadic
/// keyword parameter a [`Value::Dict`].
pub type BoundArgs = Dict;

// -----------------------------------------------------------------------------
// Param

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Positional,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

/// One parameter of a constructor.
#[derive(Clone, Copy, Debug)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    /// Produces the default value; `None` makes the parameter required.
    pub default: Option<fn() -> Value>,
}

impl Param {
    #[inline]
    pub const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            default: None,
        }
    }

    #[inline]
    pub const fn positional(name: &'static str) -> Self {
        Self::new(name, ParamKind::Positional)
    }

    #[inline]
    pub const fn keyword_only(name: &'static str) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    #[inline]
    pub const fn var_args(name: &'static str) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    #[inline]
    pub const fn var_kwargs(name: &'static str) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    #[inline]
    pub const fn with_default(mut self, default: fn() -> Value) -> Self {
        self.default = Some(default);
        self
    }

    #[inline]
    pub const fn is_variadic(&self) -> bool {
        matches!(self.kind, ParamKind::VarPositional | ParamKind::VarKeyword)
    }
}

// -----------------------------------------------------------------------------
// Options

/// Placement of variadic keyword arguments, see the [module docs](self).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KwargsLevel {
    Root,
    Safe,
    #[default]
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecorateOptions {
    /// Write arguments equal to their default. On by default.
    pub explicit_defaults: bool,
    pub kwargs_level: KwargsLevel,
}

impl DecorateOptions {
    pub const DEFAULT: Self = Self {
        explicit_defaults: true,
        kwargs_level: KwargsLevel::Auto,
    };
}

impl Default for DecorateOptions {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

// -----------------------------------------------------------------------------
// Errors

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindError {
    #[error("Missing required argument `{name}`")]
    MissingArgument { name: &'static str },

    #[error("Unexpected arguments {names:?}")]
    UnexpectedArgument { names: Vec<String> },

    #[error("Keyword arguments {names:?} clash with parameter fields")]
    KwargsCollision { names: Vec<String> },

    #[error("Variadic argument `{name}` must be a {expected}, found {found}")]
    InvalidVariadic {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for argument `{name}`")]
    InvalidArgument {
        name: &'static str,
        #[source]
        source: Error,
    },
}

// -----------------------------------------------------------------------------
// Encode

/// Turns bound arguments into plugin fields.
pub fn encode_bound(
    params: &[Param],
    options: &DecorateOptions,
    mut bound: BoundArgs,
) -> Result<Fields, BindError> {
    let mut fields = Fields::with_capacity(bound.len());
    let mut kwargs: Option<(&'static str, Dict)> = None;

    for param in params {
        let Some(value) = bound.shift_remove(param.name) else {
            continue;
        };
        match param.kind {
            ParamKind::Positional | ParamKind::KeywordOnly => {
                if !options.explicit_defaults && param.default.is_some_and(|d| d() == value) {
                    continue;
                }
                fields.insert(String::from(param.name), value);
            }
            ParamKind::VarPositional => match value {
                Value::List(items) if items.is_empty() => {}
                Value::List(items) => {
                    fields.insert(String::from(param.name), Value::List(items));
                }
                other => return Err(invalid_variadic(param, "list", &other)),
            },
            ParamKind::VarKeyword => match value {
                Value::Dict(d) if d.is_empty() => {}
                Value::Dict(d) => kwargs = Some((param.name, d)),
                other => return Err(invalid_variadic(param, "dict", &other)),
            },
        }
    }

    if !bound.is_empty() {
        return Err(BindError::UnexpectedArgument {
            names: bound.into_keys().collect(),
        });
    }

    let Some((name, kwargs)) = kwargs else {
        return Ok(fields);
    };

    let collisions: Vec<String> = kwargs
        .keys()
        .filter(|k| fields.contains_key(*k))
        .cloned()
        .collect();

    match options.kwargs_level {
        KwargsLevel::Root if !collisions.is_empty() => {
            return Err(BindError::KwargsCollision { names: collisions });
        }
        KwargsLevel::Root => fields.extend(kwargs),
        KwargsLevel::Safe => {
            fields.insert(String::from(name), Value::Dict(kwargs));
        }
        KwargsLevel::Auto => {
            if collisions.is_empty() && !kwargs.contains_key(name) {
                fields.extend(kwargs);
            } else {
                fields.insert(String::from(name), Value::Dict(kwargs));
            }
        }
    }
    Ok(fields)
}

// -----------------------------------------------------------------------------
// Decode

/// Binds plugin fields to parameters.
///
/// Missing defaulted arguments take their default, leftovers go to the
/// variadic keyword parameter. With [`KwargsLevel::Auto`], a single leftover
/// field named after that parameter and holding a dict is read as the nested
/// form.
pub fn bind_fields(
    params: &[Param],
    options: &DecorateOptions,
    mut fields: Fields,
) -> Result<BoundArgs, BindError> {
    let mut bound = BoundArgs::with_capacity(params.len());
    let mut var_kwargs = None;

    for param in params {
        match param.kind {
            ParamKind::Positional | ParamKind::KeywordOnly => {
                let value = match (fields.shift_remove(param.name), param.default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default(),
                    (None, None) => return Err(BindError::MissingArgument { name: param.name }),
                };
                bound.insert(String::from(param.name), value);
            }
            ParamKind::VarPositional => {
                let value = fields
                    .shift_remove(param.name)
                    .unwrap_or_else(|| Value::List(Vec::new()));
                if !matches!(value, Value::List(_)) {
                    return Err(invalid_variadic(param, "list", &value));
                }
                bound.insert(String::from(param.name), value);
            }
            ParamKind::VarKeyword => var_kwargs = Some(param),
        }
    }

    let Some(param) = var_kwargs else {
        if fields.is_empty() {
            return Ok(bound);
        }
        return Err(BindError::UnexpectedArgument {
            names: fields.into_keys().collect(),
        });
    };

    let nested = match options.kwargs_level {
        KwargsLevel::Root => false,
        KwargsLevel::Safe => true,
        KwargsLevel::Auto => {
            fields.len() == 1 && matches!(fields.get(param.name), Some(Value::Dict(_)))
        }
    };

    let kwargs = if nested {
        let value = fields.shift_remove(param.name);
        if !fields.is_empty() {
            return Err(BindError::UnexpectedArgument {
                names: fields.into_keys().collect(),
            });
        }
        match value {
            None => Dict::new(),
            Some(Value::Dict(d)) => d,
            Some(other) => return Err(invalid_variadic(param, "dict", &other)),
        }
    } else {
        fields
    };

    bound.insert(String::from(param.name), Value::Dict(kwargs));
    Ok(bound)
}

/// Removes and converts one bound argument.
pub fn take_arg<T: FromValue>(bound: &mut BoundArgs, name: &'static str) -> Result<T, BindError> {
    let value = bound
        .shift_remove(name)
        .ok_or(BindError::MissingArgument { name })?;
    T::from_value(value).map_err(|source| BindError::InvalidArgument { name, source })
}

#[cold]
fn invalid_variadic(param: &Param, expected: &'static str, found: &Value) -> BindError {
    BindError::InvalidVariadic {
        name: param.name,
        expected,
        found: found.kind(),
    }
}

// -----------------------------------------------------------------------------
// Callables

/// A decode-only plugin that binds its fields to `params` and calls `f`.
///
/// Used by `#[callable]`, which generates the parameter list and the call.
pub fn callable<F>(
    signature: impl Into<Cow<'static, str>>,
    params: &'static [Param],
    options: DecorateOptions,
    f: F,
) -> TypeSerializer
where
    F: Fn(BoundArgs) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    TypeSerializer::decode_only(signature)
        .with_decoder(move |fields| f(bind_fields(params, &options, fields)?))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn two() -> Value {
        Value::Int(2)
    }

    const PARAMS: &[Param] = &[
        Param::positional("a"),
        Param::positional("b").with_default(two),
        Param::var_args("args"),
        Param::keyword_only("c"),
        Param::var_kwargs("kwargs"),
    ];

    fn bound(args: Vec<Value>, kwargs: &[(&str, i64)]) -> BoundArgs {
        let mut bound = BoundArgs::new();
        bound.insert("a".into(), Value::Int(1));
        bound.insert("b".into(), Value::Int(2));
        bound.insert("args".into(), Value::List(args));
        bound.insert("c".into(), Value::Int(3));
        bound.insert(
            "kwargs".into(),
            Value::dict(kwargs.iter().map(|(k, v)| (*k, Value::Int(*v)))),
        );
        bound
    }

    fn keys(fields: &Fields) -> Vec<&str> {
        fields.keys().map(String::as_str).collect()
    }

    #[test]
    fn auto_nests_on_collision() {
        let options = DecorateOptions::default();
        let args = bound(vec![Value::Int(3)], &[("args", 5), ("x", 6), ("y", 7)]);
        let fields = encode_bound(PARAMS, &options, args.clone()).unwrap();
        assert_eq!(keys(&fields), ["a", "b", "args", "c", "kwargs"]);
        assert_eq!(
            fields["kwargs"],
            Value::dict([("args", Value::Int(5)), ("x", Value::Int(6)), ("y", Value::Int(7))])
        );
        assert_eq!(bind_fields(PARAMS, &options, fields).unwrap(), args);
    }

    #[test]
    fn auto_flattens_without_collision() {
        let options = DecorateOptions::default();
        let args = bound(vec![], &[("x", 6)]);
        let fields = encode_bound(PARAMS, &options, args.clone()).unwrap();
        assert_eq!(keys(&fields), ["a", "b", "c", "x"]);
        assert_eq!(bind_fields(PARAMS, &options, fields).unwrap(), args);
    }

    #[test]
    fn root_rejects_collision() {
        let options = DecorateOptions {
            kwargs_level: KwargsLevel::Root,
            ..DecorateOptions::DEFAULT
        };
        let args = bound(vec![Value::Int(3)], &[("args", 5)]);
        assert!(matches!(
            encode_bound(PARAMS, &options, args),
            Err(BindError::KwargsCollision { names }) if names == ["args"]
        ));
    }

    #[test]
    fn safe_always_nests() {
        let options = DecorateOptions {
            kwargs_level: KwargsLevel::Safe,
            ..DecorateOptions::DEFAULT
        };
        let args = bound(vec![], &[("x", 6)]);
        let fields = encode_bound(PARAMS, &options, args.clone()).unwrap();
        assert_eq!(keys(&fields), ["a", "b", "c", "kwargs"]);
        assert_eq!(bind_fields(PARAMS, &options, fields).unwrap(), args);
    }

    #[test]
    fn implicit_defaults_are_skipped() {
        let options = DecorateOptions {
            explicit_defaults: false,
            ..DecorateOptions::DEFAULT
        };
        let args = bound(vec![], &[]);
        let fields = encode_bound(PARAMS, &options, args.clone()).unwrap();
        assert_eq!(keys(&fields), ["a", "c"]);
        assert_eq!(bind_fields(PARAMS, &options, fields).unwrap(), args);
    }

    #[test]
    fn missing_and_unexpected() {
        let options = DecorateOptions::default();
        let mut fields = Fields::new();
        fields.insert("c".into(), Value::Int(3));
        assert!(matches!(
            bind_fields(PARAMS, &options, fields),
            Err(BindError::MissingArgument { name: "a" })
        ));

        let strict = &[Param::positional("a")];
        let mut fields = Fields::new();
        fields.insert("a".into(), Value::Int(1));
        fields.insert("z".into(), Value::Int(0));
        assert!(matches!(
            bind_fields(strict, &options, fields),
            Err(BindError::UnexpectedArgument { names }) if names == ["z"]
        ));
    }

    #[test]
    fn callable_plugin() {
        const ADD: &[Param] = &[Param::positional("x"), Param::positional("y")];
        let plugin = callable("math.add", ADD, DecorateOptions::DEFAULT, |mut bound| {
            let x: i64 = take_arg(&mut bound, "x")?;
            let y: i64 = take_arg(&mut bound, "y")?;
            Ok(Value::Int(x + y))
        });
        let mut fields = Fields::new();
        fields.insert("x".into(), Value::Int(2));
        fields.insert("y".into(), Value::Int(5));
        assert_eq!(plugin.decode(fields).unwrap(), Value::Int(7));
        assert!(!plugin.can_encode());
    }
}
