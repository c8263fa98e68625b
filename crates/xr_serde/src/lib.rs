#![doc = include_str!("../README.md")]

// -----------------------------------------------------------------------------
// Extern Self

// Generated code always names `xr_serde`, so the crate must be reachable
// under that name from its own tests.
extern crate self as xr_serde;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod convert;
mod error;
mod plugin;
mod value;

pub mod builtin;
pub mod decorate;
pub mod numeric;
pub mod registry;
pub mod serializer;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports;

pub use xr_serde_derive as derive;

pub use convert::{FromValue, IntoValue};
pub use error::{BoxError, Error};
pub use plugin::{FieldError, FieldReader, Fields, HandledType, Serializable, TYPE_KEY};
pub use plugin::{TypeSerializer, default_signature};
pub use registry::{Inherits, PluginGroup, Registry, RegistryArc, Roles};
pub use serializer::{LoadSafe, LoadStatus, Serializer};
pub use value::{Dict, Object, Value};

// -----------------------------------------------------------------------------
// Tests
