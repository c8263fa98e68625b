mod auto_register;
mod callable;
mod named_enum;
mod params;
mod serializable;

pub(crate) use callable::impl_callable;
pub(crate) use named_enum::impl_named_enum;
pub(crate) use serializable::impl_serializable;
