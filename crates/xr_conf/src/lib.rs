#![doc = include_str!("../README.md")]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod builder;
mod error;
mod modifiers;
mod resolve;
mod source;

pub mod expr;
pub mod interp;
pub mod node;

// -----------------------------------------------------------------------------
// Top-level exports

pub use builder::{Config, ConfigBuilder, SharedConfig, build_node_tree};
pub use error::ConfError;
pub use modifiers::Modifier;
pub use node::{NodeFlags, NodeId, NodeKind, NodeTree, RawKey, TypeSpec};
pub use resolve::ResolvingNode;
pub use source::{Environment, FixedEnvironment, ProcessEnvironment};

pub use xr_serde::{Dict, Value};
