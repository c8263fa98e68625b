//! Plugins for n-dimensional arrays and fixed-width time values.
//!
//! These form [`PluginGroup::Numeric`](crate::PluginGroup::Numeric), which
//! [`Registry::new`](crate::Registry::new) fills next to the builtin group.
//!
//! ## Menu
//!
//! | signature        | Rust type       | fields |
//! |------------------|-----------------|--------|
//! | `numpy.dtype`    | [`DType`]       | `value`: dtype name such as `"float32"` |
//! | `np.array`       | [`NdArray`]     | `dtype` (optional on decode), `value`: nested lists |
//! | `np.datetime64`  | [`Datetime64`]  | `args`: `[text, unit]`, or `value`: text |
//! | `np.timedelta64` | [`Timedelta64`] | `args`: `[count]` or `[count, unit]`, or `value`: count |
//!
//! `np.dtype`, `numpy.array`, `numpy.datetime64` and `numpy.timedelta64` are
//! accepted as aliases.
//!
//! ```
//! use ndarray::{ArrayD, IxDyn};
//! use xr_serde::numeric::NdArray;
//! use xr_serde::{Serializer, Value};
//!
//! let array = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1_i32, 2, 3, 4]).unwrap();
//! let serializer = Serializer::new();
//! let text = serializer.serialize(&Value::object(NdArray::from(array))).unwrap();
//! assert_eq!(
//!     text,
//!     r#"{"__type__":"np.array","dtype":"int32","value":[[1,2],[3,4]]}"#,
//! );
//! ```

// -----------------------------------------------------------------------------
// Modules

mod array;
mod dtype;
mod time;

// -----------------------------------------------------------------------------
// Exports

use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::TypeSerializer;

pub use array::NdArray;
pub use dtype::DType;
pub use time::{Datetime64, Timedelta64, TimeUnit};

/// The numeric plugin group, in registration order.
pub(crate) fn plugins() -> Vec<TypeSerializer> {
    alloc::vec![
        dtype::plugin(),
        array::plugin(),
        time::datetime64_plugin(),
        time::timedelta64_plugin(),
    ]
}

// -----------------------------------------------------------------------------
// Error

/// Errors raised by the numeric plugins.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NumericError {
    #[error("Unknown dtype `{0}`")]
    UnknownDType(String),

    #[error("Nested lists do not form a regular array")]
    Ragged,

    #[error("Cannot infer a dtype from a `{0}` element")]
    Uninferable(&'static str),

    #[error("Unknown time unit `{0}`")]
    UnknownUnit(String),

    #[error("Invalid datetime64 text `{0}`")]
    InvalidDatetime(String),

    #[error("Time value does not fit in 64 bits at unit `{0}`")]
    OutOfRange(&'static str),

    #[error("Invalid arguments: {0}")]
    Arguments(&'static str),
}
