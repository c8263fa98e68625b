//! Plugin registration.
//!
//! ## Menu
//!
//! - [`Registry`]: ordered plugin groups plus declared subtypes. A
//!   [`Serializer`](crate::Serializer) takes an immutable snapshot of it.
//! - [`PluginGroup`]: `Builtin`, `Numeric` (arrays and time values),
//!   `Plugins` (added by the user) and `ThirdParty` (collected by
//!   `auto_register`).
//! - [`Roles`]: restricts a plugin to encoding or decoding.
//! - [`Inherits`]: lets a subtype reuse the inheritable plugin of its base.
//! - [`RegistryArc`]: a registry shared between threads.
//!
//! ## Precedence
//!
//! Groups are listed highest precedence first. When two groups claim the same
//! type or signature, the one listed first wins. Groups left out of the list
//! are not used at all.
//!
//! ## auto_register
//!
//! See [`Registry::auto_register`].
//!
//! We use [`inventory`] crate to implement static registration,
//! not all platforms support it (although major platforms do).
//! If it is not supported, the function returns `false` and registers nothing.
//!
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod lineage;
mod plugin_registry;

// -----------------------------------------------------------------------------
// Exports

pub use auto_register::AutoRegisterPlugin;
pub use lineage::{Inherits, Subtype};
pub use plugin_registry::{PluginGroup, Registry, RegistryArc, Roles};

pub(crate) use plugin_registry::Entry;
