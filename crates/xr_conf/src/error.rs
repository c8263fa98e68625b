use alloc::string::String;
use alloc::vec::Vec;
use std::path::PathBuf;

use thiserror::Error;

use crate::expr::EvalError;

/// Errors raised while building, modifying or resolving a node tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfError {
    #[error("Resolution cycle {}", display_path(path))]
    ResolutionCycle { path: Vec<String> },

    #[error("Invalid ref string `{ref_str}`{}", display_component(component))]
    InvalidRefStr {
        ref_str: String,
        component: Option<String>,
    },

    #[error("Invalid ref string component `{component}`")]
    InvalidRefStrComponent { component: String },

    #[error("`{child}` is not a child of `{parent}`")]
    NotAChild { child: String, parent: String },

    #[error("Invalid described key syntax `{raw_key}`")]
    InvalidRawKey { raw_key: String },

    #[error("Invalid type `{found}` at `{node}`, expected one of {expected:?}")]
    TypeMismatch {
        node: String,
        found: &'static str,
        expected: Vec<String>,
    },

    #[error("Node `{node}` already has a parent")]
    AlreadyParented { node: String },

    #[error("Remove `{node}` from its parent container before renaming")]
    RenameWhileParented { node: String },

    #[error("No key `{name}` in `{node}`")]
    MissingKey { name: String, node: String },

    #[error("Index {index} out of range in `{node}`")]
    IndexOutOfRange { index: i64, node: String },

    #[error("`{node}` is not a list")]
    NotAList { node: String },

    #[error("`{node}` is not a dict")]
    NotADict { node: String },

    #[error("`{node}` is not a key")]
    NotAKey { node: String },

    #[error("The root node cannot be detached")]
    DetachRoot,

    #[error("Node no longer exists in the tree")]
    StaleNode,

    #[error("Failed to evaluate `{node}`")]
    Eval {
        node: String,
        #[source]
        source: EvalError,
    },

    #[error("The value of `{node}` must be a path string, found {found}")]
    LoadTarget { node: String, found: &'static str },

    #[error("Failed to read `{}`", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{}`", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported raw data: {reason}")]
    RawData { reason: String },
}

fn display_path(path: &[String]) -> String {
    let names: Vec<&str> = path
        .iter()
        .map(|name| if name.is_empty() { "<root>" } else { name.as_str() })
        .collect();
    names.join(" -> ")
}

fn display_component(component: &Option<String>) -> String {
    match component {
        Some(component) => alloc::format!(" at component `{component}`"),
        None => String::new(),
    }
}

impl ConfError {
    /// Unwraps node errors raised from inside an expression, so that a cycle
    /// found deep in an expression still surfaces as a cycle.
    pub(crate) fn from_eval(node: String, source: EvalError) -> Self {
        match source {
            EvalError::Node(inner) => *inner,
            source => ConfError::Eval { node, source },
        }
    }
}
