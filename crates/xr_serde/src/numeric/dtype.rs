use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use super::NumericError;
use crate::{FieldReader, Fields, TypeSerializer, Value};

/// Element type of an [`NdArray`](super::NdArray).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    pub const ALL: [DType; 11] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the canonical names, optionally quoted, plus the platform
/// defaults `int` and `float`.
impl FromStr for DType {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_matches(|c| c == '\'' || c == '"');
        match name {
            "int" => Ok(DType::Int64),
            "float" => Ok(DType::Float64),
            _ => DType::ALL
                .into_iter()
                .find(|d| d.name() == name)
                .ok_or_else(|| NumericError::UnknownDType(String::from(s))),
        }
    }
}

crate::impl_object_value!(DType);

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<DType>()
        .with_signature("numpy.dtype")
        .with_alias("np.dtype")
        .with_encoder(|d: &DType| {
            let mut fields = Fields::with_capacity(1);
            fields.insert(String::from("value"), Value::from(d.name()));
            Ok(fields)
        })
        .with_constructor(|fields| {
            let mut reader = FieldReader::new(fields);
            let name = reader.required::<String>("value")?;
            reader.finish()?;
            Ok(name.parse::<DType>()?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        for dtype in DType::ALL {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
        assert_eq!("'uint16'".parse::<DType>().unwrap(), DType::UInt16);
        assert_eq!("float".parse::<DType>().unwrap(), DType::Float64);
        assert!(matches!(
            "complex64".parse::<DType>(),
            Err(NumericError::UnknownDType(name)) if name == "complex64"
        ));
    }

    #[test]
    fn plain_name_field() {
        let fields = plugin().encode(&DType::Float32).unwrap();
        assert_eq!(fields["value"], Value::from("float32"));
        let back = plugin().decode(fields).unwrap();
        assert_eq!(back.downcast_ref::<DType>(), Some(&DType::Float32));
    }
}
