use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use indexmap::IndexMap;

use crate::{Error, Object, Value};

// -----------------------------------------------------------------------------
// Traits

/// Conversion of a Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Fallible conversion of a [`Value`] back into a Rust value.
///
/// Ints are accepted where floats are expected, nothing else is coerced.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, Error>;
}

// -----------------------------------------------------------------------------
// Plain values

impl IntoValue for Value {
    #[inline]
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    #[inline]
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl IntoValue for bool {
    #[inline]
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(Error::unexpected("bool", &other)),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    match i64::try_from(self) {
                        Ok(v) => Value::Int(v),
                        Err(_) => Value::Float(self as f64),
                    }
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, Error> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|_| Error::UnexpectedValue {
                            expected: stringify!($ty),
                            found: "int out of range",
                        }),
                        other => Err(Error::unexpected(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

impl_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl IntoValue for f64 {
    #[inline]
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, Error> {
        value
            .as_f64()
            .ok_or_else(|| Error::unexpected("float", &value))
    }
}

impl IntoValue for f32 {
    #[inline]
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl FromValue for f32 {
    #[inline]
    fn from_value(value: Value) -> Result<Self, Error> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl IntoValue for String {
    #[inline]
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    #[inline]
    fn into_value(self) -> Value {
        Value::Str(String::from(self))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(Error::unexpected("str", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Containers

impl<T: IntoValue> IntoValue for Option<T> {
    #[inline]
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(Error::unexpected("list", &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for IndexMap<String, T> {
    fn into_value(self) -> Value {
        Value::Dict(self.into_iter().map(|(k, v)| (k, v.into_value())).collect())
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Dict(d) => d
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(Error::unexpected("dict", &other)),
        }
    }
}

impl IntoValue for Box<dyn Object> {
    #[inline]
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for Box<dyn Object> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(Error::unexpected("object", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Objects

/// Implements [`IntoValue`] and [`FromValue`] for types carried as
/// [`Value::Object`].
#[macro_export]
macro_rules! impl_object_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::IntoValue for $ty {
                #[inline]
                fn into_value(self) -> $crate::Value {
                    $crate::Value::object(self)
                }
            }

            impl $crate::FromValue for $ty {
                fn from_value(value: $crate::Value) -> ::core::result::Result<Self, $crate::Error> {
                    match value {
                        $crate::Value::Object(o) => o
                            .downcast::<$ty>()
                            .map(|b| *b)
                            .map_err(|o| $crate::Error::UnexpectedValue {
                                expected: ::core::any::type_name::<$ty>(),
                                found: $crate::Object::type_path(&*o),
                            }),
                        other => ::core::result::Result::Err($crate::Error::UnexpectedValue {
                            expected: ::core::any::type_name::<$ty>(),
                            found: other.kind(),
                        }),
                    }
                }
            }
        )*
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_check_range() {
        assert_eq!(u8::from_value(Value::Int(255)).unwrap(), 255);
        assert!(matches!(
            u8::from_value(Value::Int(256)),
            Err(Error::UnexpectedValue { expected: "u8", .. })
        ));
        assert_eq!(u64::MAX.into_value(), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn floats_accept_ints() {
        assert_eq!(f64::from_value(Value::Int(3)).unwrap(), 3.0);
        assert!(f64::from_value(Value::Str("3".into())).is_err());
    }

    #[test]
    fn nested_containers() {
        let v = vec![Some(1_i32), None].into_value();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Null]));
        let back = Vec::<Option<i32>>::from_value(v).unwrap();
        assert_eq!(back, [Some(1), None]);
    }
}
