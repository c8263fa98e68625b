use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde_json::{Map, Number, Value as Json};

use crate::{Error, FieldReader, Fields, TypeSerializer, Value};

/// A plain value written as one JSON text field.
///
/// Decoding yields the plain value itself, not a `Literal`, so a literal is
/// a compact way to store nested data inside a single string.
#[derive(Clone, Debug, PartialEq)]
pub struct Literal(Value);

impl Literal {
    /// Wraps `value` after checking that its text form reads back equal.
    pub fn new(value: Value) -> Result<Self, Error> {
        let text = to_plain_json(&value)?.to_string();
        if Self::decode_text(&text)? != value {
            return Err(Error::UnexpectedValue {
                expected: "value with an invertible literal text",
                found: value.kind(),
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// The JSON text of the wrapped value.
    pub fn encode_text(&self) -> Result<String, Error> {
        Ok(to_plain_json(&self.0)?.to_string())
    }

    pub fn decode_text(text: &str) -> Result<Value, Error> {
        let json: Json = serde_json::from_str(text)?;
        Ok(from_plain_json(json))
    }
}

fn to_plain_json(value: &Value) -> Result<Json, Error> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or(Error::NonFiniteFloat(*f))?),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_plain_json).collect::<Result<_, _>>()?),
        Value::Dict(d) => Json::Object(
            d.iter()
                .map(|(k, v)| Ok((k.clone(), to_plain_json(v)?)))
                .collect::<Result<Map<_, _>, Error>>()?,
        ),
        Value::Object(_) => return Err(Error::unexpected("plain value", value)),
    })
}

fn from_plain_json(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s),
        Json::Array(items) => Value::List(items.into_iter().map(from_plain_json).collect::<Vec<_>>()),
        Json::Object(map) => Value::Dict(map.into_iter().map(|(k, v)| (k, from_plain_json(v))).collect()),
    }
}

crate::impl_object_value!(Literal);

pub(super) fn plugin() -> TypeSerializer {
    TypeSerializer::new::<Literal>()
        .with_signature("Literal")
        .with_encoder(|l: &Literal| {
            let mut fields = Fields::with_capacity(1);
            fields.insert("value".to_string(), Value::Str(l.encode_text()?));
            Ok(fields)
        })
        .with_decoder(|fields| {
            let mut reader = FieldReader::new(fields);
            let text = reader.required::<String>("value")?;
            reader.finish()?;
            Ok(Literal::decode_text(&text)?)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_to_plain_value() {
        let value = Value::List(alloc::vec![Value::Int(1), Value::Str("a".into()), Value::Float(0.5)]);
        let literal = Literal::new(value.clone()).unwrap();
        let fields = plugin().encode(&literal).unwrap();
        assert_eq!(fields["value"], Value::Str(r#"[1,"a",0.5]"#.into()));
        assert_eq!(plugin().decode(fields).unwrap(), value);
    }

    #[test]
    fn rejects_non_invertible() {
        assert!(Literal::new(Value::Float(f64::NAN)).is_err());
        assert!(Literal::new(Value::object(1_u8)).is_err());
    }
}
