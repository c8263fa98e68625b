//! Plugins every [`Registry::new`](crate::Registry::new) starts with.
//!
//! ## Menu
//!
//! | signature | Rust type | fields |
//! |-----------|-----------|--------|
//! | `tuple`   | [`Tuple`] | `value`: list |
//! | `set`     | [`Set`]   | `value`: list |
//! | `list`    | decode only, gives [`Value::List`](crate::Value::List) | `value`: list |
//! | `slice`   | [`Slice`] | `start`, `stop`, `step`, each omitted when `None` |
//! | `bytes`   | [`Bytes`] | `value`: base64 text |
//! | `Literal` | [`Literal`], decodes to the plain value | `value`: JSON text |
//! | `timezone` | [`FixedOffset`](chrono::FixedOffset) | `name`: `UTC` or `+HH:MM` |
//! | `datetime` | [`DateTime<FixedOffset>`](chrono::DateTime), or [`NaiveDateTime`](chrono::NaiveDateTime) without `timezone` | `value`: ISO text, `timezone` |
//! | `date`    | [`NaiveDate`](chrono::NaiveDate) | `value`: `YYYY-MM-DD` |
//! | `time`    | [`NaiveTime`](chrono::NaiveTime) | `value`: `HH:MM:SS[.fff]` |
//! | `generic` | [`Generic`] | any fields |
//!
//! Plain dicts are part of the codec itself: a dict that owns a `__type__`
//! key is written as `{"__type__": "dict", "value": {...}}`.
//!
//! Older documents are still understood through decode-only signatures:
//! `builtins.tuple`, `builtins.set` and
//! `pglib.serializer.extensions.SliceSerializer`, all carrying `__value__`.
//!
//! Enums get a plugin through [`NamedEnum`], see
//! [`TypeSerializer::named_enum`]. Any [`Serializable`](crate::Serializable)
//! can also be written as a [`Generic`], see
//! [`Registry::register_generic`](crate::Registry::register_generic).

// -----------------------------------------------------------------------------
// Modules

mod bytes;
mod datetime;
mod generic;
mod legacy;
mod literal;
mod named_enum;
mod sequence;
mod slice;

pub(crate) mod dict;

// -----------------------------------------------------------------------------
// Exports

use alloc::vec::Vec;

use crate::TypeSerializer;

pub use bytes::Bytes;
pub use datetime::DatetimeError;
pub use generic::{DEFAULT_SOURCE_CLASS_KEY, Generic, GenericOptions};
pub use literal::Literal;
pub use named_enum::{NamedEnum, UnknownVariant};
pub use sequence::{Set, Tuple};
pub use slice::Slice;

/// The builtin plugin group, in registration order.
pub(crate) fn plugins() -> Vec<TypeSerializer> {
    let mut plugins = alloc::vec![
        sequence::tuple_plugin(),
        sequence::set_plugin(),
        sequence::list_plugin(),
        slice::plugin(),
        bytes::plugin(),
        literal::plugin(),
        datetime::timezone_plugin(),
        datetime::datetime_plugin(),
        datetime::naive_datetime_plugin(),
        datetime::date_plugin(),
        datetime::time_plugin(),
        generic::plugin(),
    ];
    plugins.extend(legacy::plugins());
    plugins
}
