use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

/// Error type produced by plugins, kept as the source of codec errors.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

// -----------------------------------------------------------------------------
// Error

/// Errors of the round-trip codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("No encode plugin is registered for type `{type_path}`")]
    UnserializableType { type_path: &'static str },

    #[error("No decode plugin is registered for signature `{signature}`")]
    ExtensionMissing { signature: String },

    #[error("Plugin `{signature}` failed to decode its fields")]
    Deserialization {
        signature: String,
        #[source]
        source: BoxError,
    },

    #[error("Plugin `{signature}` failed to encode a value")]
    Serialization {
        signature: String,
        #[source]
        source: BoxError,
    },

    #[error("Plugin `{signature}` emitted the reserved `__type__` field without being polymorphic")]
    ReservedTypeKey { signature: String },

    #[error("Dict wrapper holds keys {found:?}, only `__type__` and `value` are allowed")]
    InvalidDictKeys { found: Vec<String> },

    #[error("The `__type__` field must be a string, found {found}")]
    InvalidSignature { found: String },

    #[error("Non-finite float {0} cannot be encoded")]
    NonFiniteFloat(f64),

    #[error("Expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[inline]
    pub(crate) fn unexpected(expected: &'static str, found: &crate::Value) -> Self {
        Error::UnexpectedValue {
            expected,
            found: found.kind(),
        }
    }
}
