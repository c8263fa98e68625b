//! Items referenced by code generated in `xr_serde_derive`.

pub use crate::decorate::{BoundArgs, DecorateOptions, KwargsLevel, Param, ParamKind};
pub use crate::decorate::{bind_fields, callable, encode_bound, take_arg};
pub use crate::{BoxError, Fields, FromValue, IntoValue, Serializable, TypeSerializer, Value};
pub use crate::builtin::NamedEnum;

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use crate::registry::AutoRegisterPlugin as __AutoRegisterPlugin;
    pub use inventory;
}
