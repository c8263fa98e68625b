use alloc::string::ToString;
use core::fmt::Debug;
use std::path::{Path, PathBuf};

use serde_yaml::Value as Yaml;
use xr_serde::{Dict, Value};

use crate::ConfError;

// -----------------------------------------------------------------------------
// Environment

/// Process state the tree reads, injectable for tests.
pub trait Environment: Send + Sync + Debug {
    /// Base directory for relative paths outside of any source file.
    fn cwd(&self) -> PathBuf;
}

/// Reads the real working directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn cwd(&self) -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// A fixed working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedEnvironment(pub PathBuf);

impl Environment for FixedEnvironment {
    #[inline]
    fn cwd(&self) -> PathBuf {
        self.0.clone()
    }
}

// -----------------------------------------------------------------------------
// Raw data

/// Reads a YAML (or JSON) file into raw data.
pub(crate) fn read_raw(path: &Path) -> Result<Value, ConfError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml: Yaml = serde_yaml::from_str(&text).map_err(|source| ConfError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    yaml_to_value(yaml)
}

pub(crate) fn yaml_to_value(yaml: Yaml) -> Result<Value, ConfError> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or_else(|| ConfError::RawData {
                reason: alloc::format!("number `{n}` out of range"),
            })?),
        },
        Yaml::String(s) => Value::Str(s),
        Yaml::Sequence(items) => Value::List(
            items
                .into_iter()
                .map(yaml_to_value)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut dict = Dict::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Number(n) => n.to_string(),
                    other => {
                        return Err(ConfError::RawData {
                            reason: alloc::format!("mapping key `{other:?}` is not a string"),
                        });
                    }
                };
                dict.insert(key, yaml_to_value(value)?);
            }
            Value::Dict(dict)
        }
        Yaml::Tagged(tagged) => {
            return Err(ConfError::RawData {
                reason: alloc::format!("unsupported tag `{}`", tagged.tag),
            });
        }
    })
}

/// Finds the file `path` names, trying the `.yaml` and `.yml` extensions
/// when it does not exist as given.
pub(crate) fn find_file(path: &Path) -> PathBuf {
    if path.is_file() {
        return path.to_path_buf();
    }
    ["yaml", "yml"]
        .into_iter()
        .map(|ext| {
            let mut candidate = path.as_os_str().to_owned();
            candidate.push(".");
            candidate.push(ext);
            PathBuf::from(candidate)
        })
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| path.to_path_buf())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn yaml_conversion() {
        let yaml: Yaml = serde_yaml::from_str("a: 1\nb: [2.5, x, null, true]\n3: ~\n").unwrap();
        assert_eq!(
            yaml_to_value(yaml).unwrap(),
            Value::dict([
                ("a", Value::Int(1)),
                (
                    "b",
                    Value::List(vec![
                        Value::Float(2.5),
                        Value::from("x"),
                        Value::Null,
                        Value::Bool(true),
                    ])
                ),
                ("3", Value::Null),
            ])
        );

        let nested: Yaml = serde_yaml::from_str("? [1]\n: x\n").unwrap();
        assert!(matches!(yaml_to_value(nested), Err(ConfError::RawData { .. })));
        let tagged: Yaml = serde_yaml::from_str("!custom 1").unwrap();
        assert!(matches!(yaml_to_value(tagged), Err(ConfError::RawData { .. })));
    }

    #[test]
    fn extension_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("conf.yml"), "x: 1\n").unwrap();

        let found = find_file(&dir.path().join("conf"));
        assert_eq!(found, dir.path().join("conf.yml"));
        assert_eq!(read_raw(&found).unwrap(), Value::dict([("x", Value::Int(1))]));

        let missing = dir.path().join("missing");
        assert_eq!(find_file(&missing), missing);
        assert!(matches!(read_raw(&missing), Err(ConfError::Load { .. })));
    }

    #[test]
    fn fixed_environment() {
        let env = FixedEnvironment(PathBuf::from("/srv/app"));
        assert_eq!(env.cwd(), PathBuf::from("/srv/app"));
    }
}
