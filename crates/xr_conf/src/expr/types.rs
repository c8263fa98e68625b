use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Write};

use xr_serde::builtin::{Bytes, Set, Tuple};
use xr_serde::{Dict, Value};

use super::{CallArgs, EvalError, Scope};

/// The builtin types usable as casts and as key type constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeName {
    Float,
    Int,
    Bool,
    Str,
    Bytes,
    List,
    Tuple,
    Dict,
    Set,
}

impl TypeName {
    pub const ALL: [TypeName; 9] = [
        TypeName::Float,
        TypeName::Int,
        TypeName::Bool,
        TypeName::Str,
        TypeName::Bytes,
        TypeName::List,
        TypeName::Tuple,
        TypeName::Dict,
        TypeName::Set,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeName::Float => "float",
            TypeName::Int => "int",
            TypeName::Bool => "bool",
            TypeName::Str => "str",
            TypeName::Bytes => "bytes",
            TypeName::List => "list",
            TypeName::Tuple => "tuple",
            TypeName::Dict => "dict",
            TypeName::Set => "set",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Instance check. Bools count as ints.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypeName::Float => matches!(value, Value::Float(_)),
            TypeName::Int => matches!(value, Value::Int(_) | Value::Bool(_)),
            TypeName::Bool => matches!(value, Value::Bool(_)),
            TypeName::Str => matches!(value, Value::Str(_)),
            TypeName::Bytes => value.downcast_ref::<Bytes>().is_some(),
            TypeName::List => matches!(value, Value::List(_)),
            TypeName::Tuple => value.downcast_ref::<Tuple>().is_some(),
            TypeName::Dict => matches!(value, Value::Dict(_)),
            TypeName::Set => value.downcast_ref::<Set>().is_some(),
        }
    }

    /// Calls the type on `args`, e.g. `int('3')`.
    pub fn cast(self, scope: &Scope<'_>, mut args: CallArgs) -> Result<Value, EvalError> {
        if self == TypeName::Dict {
            return dict_cast(scope, args);
        }
        let value = args
            .next("x")?
            .map(|term| term.into_value(scope))
            .transpose()?;
        args.finish(self.name())?;

        let Some(value) = value else {
            return Ok(self.empty());
        };
        let fail = |value: &Value| {
            EvalError::type_error(alloc::format!(
                "cannot convert {} to {}",
                kind_name(value),
                self.name()
            ))
        };

        Ok(match self {
            TypeName::Float => Value::Float(match &value {
                Value::Float(f) => *f,
                Value::Int(i) => *i as f64,
                Value::Bool(b) => f64::from(u8::from(*b)),
                Value::Str(s) => parse_float(s.trim()).ok_or_else(|| fail(&value))?,
                _ => return Err(fail(&value)),
            }),
            TypeName::Int => Value::Int(match &value {
                Value::Int(i) => *i,
                Value::Bool(b) => i64::from(*b),
                Value::Float(f) if f.is_finite() && f.trunc().abs() < 9.2e18 => f.trunc() as i64,
                Value::Str(s) => s
                    .trim()
                    .replace('_', "")
                    .parse()
                    .map_err(|_| fail(&value))?,
                _ => return Err(fail(&value)),
            }),
            TypeName::Bool => Value::Bool(truthy(&value)),
            TypeName::Str => Value::Str(to_text(&value)),
            TypeName::Bytes => Value::object(match value {
                Value::Str(s) => Bytes(s.into_bytes()),
                Value::List(items) => Bytes(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::Int(i) => u8::try_from(*i).ok(),
                            _ => None,
                        })
                        .collect::<Option<Vec<u8>>>()
                        .ok_or_else(|| {
                            EvalError::type_error("bytes must be in range(0, 256)")
                        })?,
                ),
                Value::Object(o) if o.is::<Bytes>() => return Ok(Value::Object(o)),
                other => return Err(fail(&other)),
            }),
            TypeName::List => Value::List(items(value).map_err(|v| fail(&v))?),
            TypeName::Tuple => Value::object(Tuple(items(value).map_err(|v| fail(&v))?)),
            TypeName::Set => Value::object(
                items(value)
                    .map_err(|v| fail(&v))?
                    .into_iter()
                    .collect::<Set>(),
            ),
            TypeName::Dict => return Err(fail(&value)),
        })
    }

    fn empty(self) -> Value {
        match self {
            TypeName::Float => Value::Float(0.0),
            TypeName::Int => Value::Int(0),
            TypeName::Bool => Value::Bool(false),
            TypeName::Str => Value::Str(String::new()),
            TypeName::Bytes => Value::object(Bytes(Vec::new())),
            TypeName::List => Value::List(Vec::new()),
            TypeName::Tuple => Value::object(Tuple(Vec::new())),
            TypeName::Dict => Value::Dict(Dict::new()),
            TypeName::Set => Value::object(Set::new()),
        }
    }
}

impl fmt::Display for TypeName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        other => other.replace('_', "").parse().ok(),
    }
}

/// `dict(mapping_or_pairs, **kwargs)`
fn dict_cast(scope: &Scope<'_>, mut args: CallArgs) -> Result<Value, EvalError> {
    let source = args
        .args
        .pop_front()
        .map(|term| term.into_value(scope))
        .transpose()?;
    if !args.args.is_empty() {
        return Err(EvalError::type_error("dict expected at most 1 argument"));
    }

    let mut dict = match source {
        None => Dict::new(),
        Some(Value::Dict(dict)) => dict,
        Some(other) => {
            let mut dict = Dict::new();
            for pair in items(other).map_err(|v| {
                EvalError::type_error(alloc::format!("cannot convert {} to dict", kind_name(&v)))
            })? {
                let pair = items(pair).map_err(|_| {
                    EvalError::type_error("dict items must be key/value pairs")
                })?;
                let [Value::Str(key), value] = <[Value; 2]>::try_from(pair).map_err(|_| {
                    EvalError::type_error("dict items must be key/value pairs")
                })?
                else {
                    return Err(EvalError::type_error("dict keys must be strings"));
                };
                dict.insert(key, value);
            }
            dict
        }
    };
    for (name, term) in args.kwargs {
        dict.insert(name, term.into_value(scope)?);
    }
    Ok(Value::Dict(dict))
}

/// The items of an iterable value, or the value back if it is not one.
fn items(value: Value) -> Result<Vec<Value>, Value> {
    match value {
        Value::List(items) => Ok(items),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Dict(d) => Ok(d.into_keys().map(Value::Str).collect()),
        Value::Object(o) => match o.downcast::<Tuple>() {
            Ok(tuple) => Ok(tuple.0),
            Err(o) => match o.downcast::<Set>() {
                Ok(set) => Ok(set.into_vec()),
                Err(o) => match o.downcast::<Bytes>() {
                    Ok(bytes) => Ok(bytes.0.into_iter().map(|b| Value::Int(i64::from(b))).collect()),
                    Err(o) => Err(Value::Object(o)),
                },
            },
        },
        other => Err(other),
    }
}

/// The user-facing type name of a value.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Object(_) => TypeName::ALL
            .into_iter()
            .find(|ty| ty.matches(value))
            .map_or_else(|| value.kind(), TypeName::name),
        other => other.kind(),
    }
}

/// Python truthiness.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(l) => !l.is_empty(),
        Value::Dict(d) => !d.is_empty(),
        Value::Object(o) => {
            if let Some(tuple) = o.downcast_ref::<Tuple>() {
                !tuple.0.is_empty()
            } else if let Some(set) = o.downcast_ref::<Set>() {
                !set.is_empty()
            } else if let Some(bytes) = o.downcast_ref::<Bytes>() {
                !bytes.0.is_empty()
            } else {
                true
            }
        }
    }
}

/// Renders a value the way `str()` does: strings bare, everything else in
/// its literal form.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => {
            let mut out = String::new();
            // Writing to a `String` cannot fail.
            let _ = write_repr(&mut out, other);
            out
        }
    }
}

/// Single-quoted unless the text holds a single quote and no double quote.
fn write_str_repr(out: &mut String, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => out.write_str("\\r")?,
            c if c == quote => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c => out.write_char(c)?,
        }
    }
    out.write_char(quote)
}

fn write_float(out: &mut String, f: f64) -> fmt::Result {
    if f.is_nan() {
        out.write_str("nan")
    } else if f.is_infinite() {
        out.write_str(if f > 0.0 { "inf" } else { "-inf" })
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        write!(out, "{f:.1}")
    } else {
        write!(out, "{f}")
    }
}

fn write_items<'v>(
    out: &mut String,
    open: &str,
    close: &str,
    items: impl ExactSizeIterator<Item = &'v Value>,
) -> fmt::Result {
    let single = items.len() == 1;
    out.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_repr(out, item)?;
    }
    if single && open == "(" {
        out.write_char(',')?;
    }
    out.write_str(close)
}

fn write_repr(out: &mut String, value: &Value) -> fmt::Result {
    match value {
        Value::Null => out.write_str("None"),
        Value::Bool(true) => out.write_str("True"),
        Value::Bool(false) => out.write_str("False"),
        Value::Int(i) => write!(out, "{i}"),
        Value::Float(f) => write_float(out, *f),
        Value::Str(s) => write_str_repr(out, s),
        Value::List(items) => write_items(out, "[", "]", items.iter()),
        Value::Dict(dict) => {
            out.write_char('{')?;
            for (i, (key, value)) in dict.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_str_repr(out, key)?;
                out.write_str(": ")?;
                write_repr(out, value)?;
            }
            out.write_char('}')
        }
        Value::Object(o) => {
            if let Some(tuple) = o.downcast_ref::<Tuple>() {
                write_items(out, "(", ")", tuple.0.iter())
            } else if let Some(set) = o.downcast_ref::<Set>() {
                if set.is_empty() {
                    out.write_str("set()")
                } else {
                    write_items(out, "{", "}", set.iter())
                }
            } else {
                write!(out, "{o:?}")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn text_rendering() {
        assert_eq!(to_text(&Value::Float(3.0)), "3.0");
        assert_eq!(to_text(&Value::Bool(true)), "True");
        assert_eq!(to_text(&Value::Null), "None");
        assert_eq!(to_text(&Value::from("a")), "a");
        assert_eq!(
            to_text(&Value::List(vec![Value::Int(1), Value::from("a")])),
            "[1, 'a']"
        );
        assert_eq!(
            to_text(&Value::object(Tuple(vec![Value::Int(1)]))),
            "(1,)"
        );
    }

    #[test]
    fn instance_checks() {
        assert!(TypeName::Int.matches(&Value::Bool(true)));
        assert!(!TypeName::Float.matches(&Value::Int(1)));
        assert!(TypeName::Tuple.matches(&Value::object(Tuple(Vec::new()))));
        assert_eq!(TypeName::from_name("set"), Some(TypeName::Set));
        assert_eq!(TypeName::from_name("object"), None);
    }
}
