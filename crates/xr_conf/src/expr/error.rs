use alloc::boxed::Box;
use alloc::string::String;

use thiserror::Error;
use xr_serde::BoxError;

use crate::ConfError;

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    #[error("Name `{name}` undefined in parser context")]
    UndefinedFunction { name: String },

    #[error("Unsupported grammar component: {component}")]
    UnsupportedGrammarComponent { component: &'static str },

    #[error("Syntax error at {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("The input expression has length {len} > {max}")]
    ExpressionTooLong { len: usize, max: usize },

    #[error("The input expression nests deeper than {max} levels")]
    ExpressionTooDeep { max: usize },

    #[error("Integer overflow in `{op}`")]
    Overflow { op: &'static str },

    #[error("Division by zero")]
    ZeroDivision,

    #[error("{message}")]
    Type { message: String },

    #[error("`{found}` is not callable")]
    NotCallable { found: &'static str },

    #[error("A {found} does not evaluate to a value")]
    NotAValue { found: &'static str },

    #[error("A {found} has no attribute `{name}`")]
    NoAttribute { name: String, found: &'static str },

    #[error("{message}")]
    Index { message: String },

    #[error("A variable with name `{name}` already exists in the context")]
    AlreadyRegistered { name: String },

    #[error("Invalid function name `{name}`")]
    InvalidName { name: String },

    #[error("Call to `{name}` failed")]
    Call {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Node(Box<ConfError>),
}

impl From<ConfError> for EvalError {
    #[inline]
    fn from(err: ConfError) -> Self {
        EvalError::Node(Box::new(err))
    }
}

impl EvalError {
    #[cold]
    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type {
            message: message.into(),
        }
    }

    #[cold]
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            position,
        }
    }
}
