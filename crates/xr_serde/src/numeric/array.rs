use alloc::string::String;
use alloc::vec::Vec;

use ndarray::{ArrayD, IxDyn};

use super::{DType, NumericError};
use crate::{BoxError, FieldReader, Fields, FromValue, IntoValue, TypeSerializer, Value};

// -----------------------------------------------------------------------------
// NdArray

macro_rules! nd_array {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A dynamically shaped array of one of the [`DType`]s.
        ///
        /// Written as its dtype name and its elements as nested lists, one
        /// level per axis. A zero-dimensional array is written as a scalar.
        #[derive(Clone, Debug, PartialEq)]
        pub enum NdArray {
            $($variant(ArrayD<$ty>),)*
        }

        impl NdArray {
            pub fn dtype(&self) -> DType {
                match self {
                    $(NdArray::$variant(_) => DType::$variant,)*
                }
            }

            pub fn shape(&self) -> &[usize] {
                match self {
                    $(NdArray::$variant(a) => a.shape(),)*
                }
            }

            fn to_nested(&self) -> Value {
                match self {
                    $(NdArray::$variant(a) => nest(a.shape(), &mut a.iter().copied()),)*
                }
            }

            fn from_flat(dtype: DType, shape: &[usize], items: Vec<Value>) -> Result<Self, BoxError> {
                Ok(match dtype {
                    $(DType::$variant => NdArray::$variant(collect::<$ty>(shape, items)?),)*
                })
            }
        }

        $(
            impl From<ArrayD<$ty>> for NdArray {
                #[inline]
                fn from(array: ArrayD<$ty>) -> Self {
                    NdArray::$variant(array)
                }
            }
        )*
    };
}

nd_array! {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

crate::impl_object_value!(NdArray);

impl NdArray {
    /// Builds an array from nested lists.
    ///
    /// Without a `dtype`, all-bool data gives [`DType::Bool`], all-int data
    /// [`DType::Int64`] and any other numbers [`DType::Float64`].
    pub fn from_nested(value: Value, dtype: Option<DType>) -> Result<Self, BoxError> {
        let shape = shape_of(&value);
        let mut items = Vec::with_capacity(shape.iter().product());
        flatten(value, &shape, &mut items)?;
        let dtype = match dtype {
            Some(dtype) => dtype,
            None => infer(&items)?,
        };
        Self::from_flat(dtype, &shape, items)
    }
}

// -----------------------------------------------------------------------------
// Nesting

fn nest<T: IntoValue + Copy>(shape: &[usize], items: &mut impl Iterator<Item = T>) -> Value {
    match shape.split_first() {
        None => items.next().map_or(Value::Null, IntoValue::into_value),
        Some((len, rest)) => Value::List((0..*len).map(|_| nest(rest, items)).collect()),
    }
}

/// The shape along the first element of every level.
fn shape_of(mut value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    while let Value::List(items) = value {
        shape.push(items.len());
        match items.first() {
            Some(first) => value = first,
            None => break,
        }
    }
    shape
}

fn flatten(value: Value, shape: &[usize], out: &mut Vec<Value>) -> Result<(), NumericError> {
    match (shape.split_first(), value) {
        (None, Value::List(_)) => Err(NumericError::Ragged),
        (None, scalar) => {
            out.push(scalar);
            Ok(())
        }
        (Some((len, rest)), Value::List(items)) if items.len() == *len => {
            items.into_iter().try_for_each(|item| flatten(item, rest, out))
        }
        (Some(_), _) => Err(NumericError::Ragged),
    }
}

fn infer(items: &[Value]) -> Result<DType, NumericError> {
    let mut dtype = if items.is_empty() {
        DType::Float64
    } else {
        DType::Bool
    };
    for item in items {
        dtype = match (dtype, item) {
            (DType::Bool, Value::Bool(_)) => DType::Bool,
            (DType::Bool | DType::Int64, Value::Int(_)) => DType::Int64,
            (_, Value::Int(_) | Value::Float(_)) => DType::Float64,
            (_, other) => return Err(NumericError::Uninferable(other.kind())),
        };
    }
    Ok(dtype)
}

fn collect<T: FromValue>(shape: &[usize], items: Vec<Value>) -> Result<ArrayD<T>, BoxError> {
    let data = items
        .into_iter()
        .map(T::from_value)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(ArrayD::from_shape_vec(IxDyn(shape), data)?)
}

// -----------------------------------------------------------------------------
// Plugin

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<NdArray>()
        .with_signature("np.array")
        .with_alias("numpy.array")
        .with_encoder(|a: &NdArray| {
            let mut fields = Fields::with_capacity(2);
            fields.insert(String::from("dtype"), Value::from(a.dtype().name()));
            fields.insert(String::from("value"), a.to_nested());
            Ok(fields)
        })
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let dtype = reader.optional::<String>("dtype")?;
            let value = reader.required::<Value>("value")?;
            reader.finish()?;
            let dtype = dtype.map(|name| name.parse::<DType>()).transpose()?;
            NdArray::from_nested(value, dtype)
        })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    #[test]
    fn nested_lists_follow_the_shape() {
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 3]), (0..6).collect::<Vec<i16>>()).unwrap();
        let fields = plugin().encode(&NdArray::from(array.clone())).unwrap();
        assert_eq!(fields["dtype"], Value::from("int16"));
        assert_eq!(
            fields["value"],
            list([
                list([0.into(), 1.into(), 2.into()]),
                list([3.into(), 4.into(), 5.into()]),
            ])
        );

        let back = plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<NdArray>(), Some(&NdArray::Int16(array)));
    }

    #[test]
    fn zero_dimensional() {
        let array = NdArray::from(ArrayD::from_elem(IxDyn(&[]), 2.5_f64));
        let fields = plugin().encode(&array).unwrap();
        assert_eq!(fields["value"], Value::Float(2.5));
        let back = plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<NdArray>().unwrap().shape(), &[] as &[usize]);
    }

    #[test]
    fn dtype_is_inferred() {
        let ints = NdArray::from_nested(list([1.into(), 2.into()]), None).unwrap();
        assert_eq!(ints.dtype(), DType::Int64);

        let mixed = NdArray::from_nested(list([1.into(), 2.5.into()]), None).unwrap();
        assert_eq!(mixed.dtype(), DType::Float64);
        assert_eq!(mixed.shape(), &[2]);

        let flags = NdArray::from_nested(list([true.into(), false.into()]), None).unwrap();
        assert_eq!(flags.dtype(), DType::Bool);

        assert_eq!(NdArray::from_nested(list([]), None).unwrap().dtype(), DType::Float64);
        assert!(NdArray::from_nested(list(["x".into()]), None).is_err());
    }

    #[test]
    fn explicit_dtype_converts() {
        let array = NdArray::from_nested(list([1.into(), 2.into()]), Some(DType::Float32)).unwrap();
        assert_eq!(
            array,
            NdArray::Float32(ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap())
        );
        assert!(NdArray::from_nested(list([300.into()]), Some(DType::UInt8)).is_err());
    }

    #[test]
    fn ragged_lists_are_rejected() {
        let ragged = list([list([1.into(), 2.into()]), list([3.into()])]);
        let err = NdArray::from_nested(ragged, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<NumericError>(), Some(NumericError::Ragged)));

        let mixed_depth = list([list([1.into()]), 2.into()]);
        assert!(NdArray::from_nested(mixed_depth, None).is_err());
    }
}
