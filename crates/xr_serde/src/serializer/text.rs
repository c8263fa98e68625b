use alloc::string::String;
use core::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde_json::Value as Json;

use super::Serializer;
use crate::{Error, Value};

// -----------------------------------------------------------------------------
// LoadSafe

/// Outcome of [`Serializer::load_safe`].
#[derive(Clone, Debug, PartialEq)]
pub enum LoadSafe {
    Success(Value),
    /// The file holds nothing but whitespace.
    Empty,
    /// The file does not exist.
    Missing,
}

impl LoadSafe {
    pub fn status(&self) -> LoadStatus {
        match self {
            LoadSafe::Success(_) => LoadStatus::Success,
            LoadSafe::Empty => LoadStatus::Empty,
            LoadSafe::Missing => LoadStatus::Missing,
        }
    }

    #[inline]
    pub fn into_value(self) -> Option<Value> {
        match self {
            LoadSafe::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// The status part of a [`LoadSafe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Success,
    Empty,
    Missing,
}

impl LoadStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            LoadStatus::Success => "success",
            LoadStatus::Empty => "empty",
            LoadStatus::Missing => "missing",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -----------------------------------------------------------------------------
// Text & files

impl Serializer {
    /// Encodes `value` as compact JSON text.
    pub fn serialize(&self, value: &Value) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.encode(value)?)?)
    }

    /// Encodes `value` as indented JSON text.
    pub fn serialize_pretty(&self, value: &Value) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(&self.encode(value)?)?)
    }

    pub fn deserialize(&self, text: &str) -> Result<Value, Error> {
        let json: Json = serde_json::from_str(text)?;
        self.decode(&json)
    }

    /// Writes the indented JSON text of `value`.
    pub fn write_to(&self, value: &Value, writer: impl Write) -> Result<(), Error> {
        serde_json::to_writer_pretty(writer, &self.encode(value)?)?;
        Ok(())
    }

    pub fn read_from(&self, reader: impl Read) -> Result<Value, Error> {
        let json: Json = serde_json::from_reader(reader)?;
        self.decode(&json)
    }

    /// Writes `value` to the file at `path`, replacing it.
    pub fn dump(&self, value: &Value, path: impl AsRef<Path>) -> Result<(), Error> {
        let text = self.serialize_pretty(value)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Reads a value from the file at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let text = fs::read_to_string(path)?;
        self.deserialize(&text)
    }

    /// Like [`load`](Self::load), but a missing or blank file is an outcome
    /// rather than an error.
    pub fn load_safe(&self, path: impl AsRef<Path>) -> Result<LoadSafe, Error> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::trace!("load_safe: `{}` is missing", path.display());
                return Ok(LoadSafe::Missing);
            }
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            log::trace!("load_safe: `{}` is empty", path.display());
            return Ok(LoadSafe::Empty);
        }
        let value = self.deserialize(&text)?;
        log::trace!("load_safe: `{}` loaded", path.display());
        Ok(LoadSafe::Success(value))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_safe_statuses() {
        let dir = tempfile::tempdir().unwrap();
        let serializer = Serializer::new();

        let missing = serializer.load_safe(dir.path().join("nope.json")).unwrap();
        assert_eq!(missing, LoadSafe::Missing);
        assert_eq!(missing.status().as_str(), "missing");

        let blank = dir.path().join("blank.json");
        fs::write(&blank, "  \n").unwrap();
        assert_eq!(serializer.load_safe(&blank).unwrap().status(), LoadStatus::Empty);

        let full = dir.path().join("full.json");
        let value = Value::dict([("a", Value::List(alloc::vec![Value::Int(1)]))]);
        serializer.dump(&value, &full).unwrap();
        let loaded = serializer.load_safe(&full).unwrap();
        assert_eq!(loaded.status().to_string(), "success");
        assert_eq!(loaded.into_value(), Some(value));
    }

    #[test]
    fn load_safe_keeps_syntax_errors() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        assert!(matches!(
            Serializer::new().load_safe(&broken),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn writer_and_reader() {
        let serializer = Serializer::new();
        let value = Value::from("text");
        let mut buffer = alloc::vec::Vec::new();
        serializer.write_to(&value, &mut buffer).unwrap();
        assert_eq!(serializer.read_from(buffer.as_slice()).unwrap(), value);
    }
}
