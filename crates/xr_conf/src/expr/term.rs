use alloc::borrow::Cow;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use indexmap::IndexMap;
use xr_serde::Value;
use xr_serde::builtin::Tuple;

use super::{EvalError, Scope, TypeName};
use crate::{Modifier, NodeId};

// -----------------------------------------------------------------------------
// Term

/// The result of evaluating an expression.
///
/// Besides values, expressions produce nodes (resolved lazily, only when a
/// value is needed), callables and types.
#[derive(Clone, Debug)]
pub enum Term {
    Value(Value),
    /// A tuple display; items stay terms so that `(int, float)` or
    /// `(hidden, load)` keep their meaning.
    Tuple(Vec<Term>),
    Node(NodeId),
    Function(Function),
    Modifier(Modifier),
    Type(TypeName),
}

impl Term {
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Value(v) => v.kind(),
            Term::Tuple(_) => "tuple",
            Term::Node(_) => "node",
            Term::Function(_) => "function",
            Term::Modifier(_) => "modifier",
            Term::Type(_) => "type",
        }
    }

    /// Converts to a value. Nodes are resolved, tuples become
    /// [`Tuple`] objects.
    pub fn into_value(self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        match self {
            Term::Value(value) => Ok(value),
            Term::Tuple(items) => {
                let items = items
                    .into_iter()
                    .map(|item| item.into_value(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::object(Tuple(items)))
            }
            Term::Node(id) => scope.resolve(id),
            other => Err(EvalError::NotAValue { found: other.kind() }),
        }
    }

    /// Flattens a tuple into its items, anything else into one item.
    pub fn into_items(self) -> Vec<Term> {
        match self {
            Term::Tuple(items) => items,
            other => alloc::vec![other],
        }
    }
}

impl From<Value> for Term {
    #[inline]
    fn from(value: Value) -> Self {
        Term::Value(value)
    }
}

impl From<Function> for Term {
    #[inline]
    fn from(function: Function) -> Self {
        Term::Function(function)
    }
}

impl From<Modifier> for Term {
    #[inline]
    fn from(modifier: Modifier) -> Self {
        Term::Modifier(modifier)
    }
}

impl From<TypeName> for Term {
    #[inline]
    fn from(ty: TypeName) -> Self {
        Term::Type(ty)
    }
}

// -----------------------------------------------------------------------------
// CallArgs

/// Arguments of a call.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    pub args: VecDeque<Term>,
    pub kwargs: IndexMap<String, Term>,
}

impl CallArgs {
    #[inline]
    pub fn new(args: impl IntoIterator<Item = Term>, kwargs: IndexMap<String, Term>) -> Self {
        Self {
            args: args.into_iter().collect(),
            kwargs,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Binds the next parameter, positionally or by `name`.
    pub fn next(&mut self, name: &str) -> Result<Option<Term>, EvalError> {
        let keyword = self.kwargs.shift_remove(name);
        match (self.args.pop_front(), keyword) {
            (Some(_), Some(_)) => Err(EvalError::type_error(alloc::format!(
                "got multiple values for argument `{name}`"
            ))),
            (positional, keyword) => Ok(positional.or(keyword)),
        }
    }

    /// Like [`next`](Self::next), failing when the argument is absent.
    pub fn required(&mut self, name: &str) -> Result<Term, EvalError> {
        self.next(name)?.ok_or_else(|| {
            EvalError::type_error(alloc::format!("missing required argument `{name}`"))
        })
    }

    /// Fails if any argument was not bound.
    pub fn finish(self, function: &str) -> Result<(), EvalError> {
        if !self.args.is_empty() {
            return Err(EvalError::type_error(alloc::format!(
                "`{function}` got {} unexpected positional argument(s)",
                self.args.len()
            )));
        }
        if let Some(name) = self.kwargs.keys().next() {
            return Err(EvalError::type_error(alloc::format!(
                "`{function}` got an unexpected keyword argument `{name}`"
            )));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Function

type FunctionFn = dyn Fn(&Scope<'_>, CallArgs) -> Result<Term, EvalError> + Send + Sync;

/// A callable registered in the parser context.
#[derive(Clone)]
pub struct Function {
    name: Cow<'static, str>,
    func: Arc<FunctionFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(&Scope<'_>, CallArgs) -> Result<Term, EvalError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn call(&self, scope: &Scope<'_>, args: CallArgs) -> Result<Term, EvalError> {
        (self.func)(scope, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.name).finish()
    }
}
