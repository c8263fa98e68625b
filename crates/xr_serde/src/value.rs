use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt;

use indexmap::IndexMap;

/// Insertion-ordered, string-keyed map of values.
pub type Dict = IndexMap<String, Value>;

// -----------------------------------------------------------------------------
// Object

/// A non-plain value that needs a [`TypeSerializer`](crate::TypeSerializer)
/// to be encoded.
///
/// Implemented for every `'static + Clone + PartialEq + Debug + Send + Sync`
/// type, so user types only need the usual derives.
pub trait Object: Any + Send + Sync {
    /// The Rust type name of the concrete type.
    fn type_path(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_object(&self) -> Box<dyn Object>;

    /// `true` if `other` has the same concrete type and compares equal.
    fn object_eq(&self, other: &dyn Object) -> bool;

    fn object_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> Object for T
where
    T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    #[inline]
    fn type_path(&self) -> &'static str {
        core::any::type_name::<T>()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }

    fn object_eq(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn object_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl dyn Object {
    /// The [`TypeId`] of the concrete type behind the trait object.
    #[inline]
    pub fn object_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Takes the concrete value out of the box, or gives the box back.
    pub fn downcast<T: Any>(self: Box<Self>) -> Result<Box<T>, Box<Self>> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.into_any().downcast::<T>() {
            Ok(value) => Ok(value),
            Err(_) => unreachable!("type checked above"),
        }
    }
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.object_debug(f)
    }
}

// -----------------------------------------------------------------------------
// Value

/// The in-memory value universe of the codec.
///
/// Everything except [`Value::Object`] is plain data and maps one to one onto
/// JSON. Objects are dispatched to plugins by their concrete [`TypeId`].
#[derive(Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Dict),
    Object(Box<dyn Object>),
}

impl Value {
    /// Wraps a custom value.
    #[inline]
    pub fn object<T: Object>(value: T) -> Self {
        Value::Object(Box::new(value))
    }

    /// Builds a [`Value::Dict`] from key/value pairs, keeping their order.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dict(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A short name of the variant, or the type path of an object.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Object(o) => o.type_path(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and ints widened to `f64`.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    #[inline]
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&dyn Object> {
        match self {
            Value::Object(o) => Some(&**o),
            _ => None,
        }
    }

    /// Borrows the object payload as `T`.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object()?.downcast_ref::<T>()
    }

    /// `true` if no [`Value::Object`] appears anywhere inside.
    pub fn is_plain(&self) -> bool {
        match self {
            Value::List(l) => l.iter().all(Value::is_plain),
            Value::Dict(d) => d.values().all(Value::is_plain),
            Value::Object(_) => false,
            _ => true,
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Float(f) => Value::Float(*f),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(l) => Value::List(l.clone()),
            Value::Dict(d) => Value::Dict(d.clone()),
            Value::Object(o) => Value::Object(o.clone_object()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.object_eq(&**b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => fmt::Debug::fmt(b, f),
            Value::Int(i) => fmt::Debug::fmt(i, f),
            Value::Float(x) => fmt::Debug::fmt(x, f),
            Value::Str(s) => fmt::Debug::fmt(s, f),
            Value::List(l) => f.debug_list().entries(l).finish(),
            Value::Dict(d) => f.debug_map().entries(d).finish(),
            Value::Object(o) => o.object_debug(f),
        }
    }
}

// -----------------------------------------------------------------------------
// From impls

macro_rules! impl_from_for_value {
    ($($ty:ty => |$v:ident| $expr:expr;)*) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from($v: $ty) -> Self {
                    $expr
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => |v| Value::Bool(v);
    i32 => |v| Value::Int(i64::from(v));
    i64 => |v| Value::Int(v);
    u32 => |v| Value::Int(i64::from(v));
    f64 => |v| Value::Float(v);
    &str => |v| Value::Str(String::from(v));
    String => |v| Value::Str(v);
    Vec<Value> => |v| Value::List(v);
    Dict => |v| Value::Dict(v);
    Box<dyn Object> => |v| Value::Object(v);
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: i64,
    }

    #[test]
    fn object_equality_and_downcast() {
        let a = Value::object(Point { x: 1 });
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Value::object(Point { x: 2 }));
        assert_ne!(a, Value::object(1_u8));
        assert_eq!(a.downcast_ref::<Point>(), Some(&Point { x: 1 }));
        assert!(!a.is_plain());
    }

    #[test]
    fn downcast_box() {
        let boxed: Box<dyn Object> = Box::new(Point { x: 3 });
        assert_eq!(boxed.object_type_id(), TypeId::of::<Point>());
        let boxed = boxed.downcast::<u8>().unwrap_err();
        assert_eq!(*boxed.downcast::<Point>().unwrap(), Point { x: 3 });
    }

    #[test]
    fn dict_keeps_order() {
        let v = Value::dict([("b", Value::Int(1)), ("a", Value::Int(2))]);
        let keys: Vec<_> = v.as_dict().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(v.kind(), "dict");
        assert!(v.is_plain());
    }

    #[test]
    fn debug_output() {
        let v = Value::List(vec![Value::Null, Value::from("x"), Value::from(Some(2))]);
        assert_eq!(format!("{v:?}"), r#"[Null, "x", 2]"#);
    }
}
