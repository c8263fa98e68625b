//! The restricted expression language of `$`-strings.
//!
//! Expressions are parsed by a hand-written lexer and recursive-descent
//! parser over a small Python-like grammar, then evaluated to a [`Term`].
//! Arithmetic is fixed precision (`i64`/`f64`), which keeps the cost of an
//! untrusted expression bounded; see [`Precision`].
//!
//! # Example
//!
//! ```
//! use xr_conf::expr::{Parser, Scope};
//! use xr_conf::Value;
//!
//! let parser = Parser::new();
//! let scope = Scope::detached();
//! assert_eq!(parser.eval_value("2^6", &scope).unwrap(), Value::Int(4));
//! assert_eq!(parser.eval_value("2**6", &scope).unwrap(), Value::Int(64));
//! assert_eq!(parser.eval_value("int('7') / 2", &scope).unwrap(), Value::Float(3.5));
//! ```

// -----------------------------------------------------------------------------
// Modules

mod ast;
mod builtins;
mod error;
mod eval;
mod lexer;
mod scope;
mod term;
mod types;

// -----------------------------------------------------------------------------
// Exports

pub use ast::{BinOp, Expr};
pub use error::EvalError;
pub use scope::Scope;
pub use term::{CallArgs, Function, Term};
pub use types::{TypeName, to_text};

pub(crate) use types::kind_name;

use alloc::string::String;

use xr_serde::Value;
use xr_utils::hash::HashMap;

// -----------------------------------------------------------------------------
// Parser

/// Integer arithmetic mode.
///
/// Both modes are bounded: there is no arbitrary-precision arithmetic, so an
/// expression such as `9**9**9**9` finishes immediately instead of hanging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Integer overflow is an [`EvalError::Overflow`].
    #[default]
    Checked,
    /// Integers wrap around like fixed-width machine integers.
    Wrapping,
}

/// Evaluates expressions against a context of named [`Term`]s.
#[derive(Clone, Debug)]
pub struct Parser {
    context: HashMap<String, Term>,
    max_len: usize,
    precision: Precision,
}

impl Default for Parser {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Expressions longer than this (in bytes) are rejected.
    pub const DEFAULT_MAX_EXPR_LEN: usize = 10_000;

    /// A parser with the default context: the builtin casts, `parent`,
    /// `rename`, `cwd` and the `hidden` and `load` modifiers.
    pub fn new() -> Self {
        let mut parser = Self::bare();
        builtins::install(&mut parser.context);
        parser
    }

    /// A parser with an empty context.
    pub fn bare() -> Self {
        Self {
            context: HashMap::default(),
            max_len: Self::DEFAULT_MAX_EXPR_LEN,
            precision: Precision::default(),
        }
    }

    #[inline]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    #[inline]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Adds `term` to the context under `name`.
    ///
    /// Fails with [`EvalError::AlreadyRegistered`] if the name exists and
    /// `overwrite` is not set.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        term: impl Into<Term>,
        overwrite: bool,
    ) -> Result<(), EvalError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(EvalError::InvalidName { name });
        }
        if self.context.contains_key(&name) {
            if !overwrite {
                return Err(EvalError::AlreadyRegistered { name });
            }
            log::warn!("parser context name `{name}` overwritten");
        }
        self.context.insert(name, term.into());
        Ok(())
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.context.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.context.contains_key(name)
    }

    /// Names in the context, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.context.keys().map(String::as_str)
    }

    /// Parses `expr` without evaluating it.
    pub fn parse(&self, expr: &str) -> Result<Expr, EvalError> {
        if expr.len() > self.max_len {
            return Err(EvalError::ExpressionTooLong {
                len: expr.len(),
                max: self.max_len,
            });
        }
        ast::parse(expr)
    }

    /// Evaluates `expr` to a term.
    pub fn eval(&self, expr: &str, scope: &Scope<'_>) -> Result<Term, EvalError> {
        let expr = self.parse(expr)?;
        self.eval_expr(&expr, scope)
    }

    #[inline]
    pub fn eval_expr(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Term, EvalError> {
        eval::Evaluator::new(self, scope).eval(expr)
    }

    /// Evaluates `expr` and turns the result into a value, resolving a node
    /// result.
    pub fn eval_value(&self, expr: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        self.eval(expr, scope)?.into_value(scope)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<Value, EvalError> {
        Parser::new().eval_value(src, &Scope::detached())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("2^6").unwrap(), Value::Int(4));
        assert_eq!(eval("2**6").unwrap(), Value::Int(64));
        assert_eq!(
            eval("1 + 2*3**(4^5) / (6 + -7)").unwrap(),
            Value::Float(-5.0)
        );
        assert_eq!(eval("-2**2").unwrap(), Value::Int(-4));
        assert_eq!(eval("2**-1").unwrap(), Value::Float(0.5));
        assert_eq!(eval("True + 1").unwrap(), Value::Int(2));
        assert_eq!(eval("'a' + 'b'").unwrap(), Value::from("ab"));
    }

    #[test]
    fn errors() {
        assert!(matches!(eval("1 / 0"), Err(EvalError::ZeroDivision)));
        assert!(matches!(
            eval("undefined_name + 1"),
            Err(EvalError::UndefinedFunction { name }) if name == "undefined_name"
        ));
        assert!(matches!(
            eval("1 < 2"),
            Err(EvalError::UnsupportedGrammarComponent { .. })
        ));
        assert!(matches!(eval("'a' + 1"), Err(EvalError::Type { .. })));
        assert!(matches!(eval("2.5 ^ 1"), Err(EvalError::Type { .. })));
    }

    #[test]
    fn bounded_precision() {
        assert!(matches!(eval("9**9**9**9"), Err(EvalError::Overflow { .. })));
        assert!(matches!(
            eval("9223372036854775807 + 1"),
            Err(EvalError::Overflow { .. })
        ));

        let wrapping = Parser::new().with_precision(Precision::Wrapping);
        assert_eq!(
            wrapping
                .eval_value("9223372036854775807 + 1", &Scope::detached())
                .unwrap(),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn expression_length_cap() {
        let parser = Parser::new().with_max_len(8);
        assert!(matches!(
            parser.eval_value("1 + 2 + 3 + 4", &Scope::detached()),
            Err(EvalError::ExpressionTooLong { len: 13, max: 8 })
        ));
        let long = "1+".repeat(Parser::DEFAULT_MAX_EXPR_LEN);
        assert!(matches!(
            eval(&long),
            Err(EvalError::ExpressionTooLong { .. })
        ));
    }

    #[test]
    fn nesting_depth_cap() {
        let deep = alloc::format!("{}1{}", "(".repeat(4999), ")".repeat(4999));
        assert!(deep.len() < Parser::DEFAULT_MAX_EXPR_LEN);
        assert!(matches!(
            eval(&deep),
            Err(EvalError::ExpressionTooDeep { .. })
        ));
        assert!(matches!(
            eval(&"-".repeat(9000)),
            Err(EvalError::ExpressionTooDeep { .. })
        ));
        assert_eq!(eval("((((2)) * ((3))))").unwrap(), Value::Int(6));
    }

    #[test]
    fn register() {
        let mut parser = Parser::new();
        parser.register("answer", Value::Int(42), false).unwrap();
        assert!(matches!(
            parser.register("answer", Value::Int(0), false),
            Err(EvalError::AlreadyRegistered { .. })
        ));
        parser.register("answer", Value::Int(41), true).unwrap();
        assert_eq!(
            parser.eval_value("answer + 1", &Scope::detached()).unwrap(),
            Value::Int(42)
        );
        assert!(matches!(
            parser.register("not valid", Value::Null, false),
            Err(EvalError::InvalidName { .. })
        ));
    }

    #[test]
    fn casts_and_tuples() {
        assert_eq!(eval("float(3)").unwrap(), Value::Float(3.0));
        assert_eq!(eval("int(' 12 ')").unwrap(), Value::Int(12));
        assert_eq!(eval("str(1.5)").unwrap(), Value::from("1.5"));
        assert_eq!(eval("bool('')").unwrap(), Value::Bool(false));
        assert_eq!(
            eval("(1, 'a')[1]").unwrap(),
            Value::from("a")
        );
        assert_eq!(
            eval("list((1, 2))").unwrap(),
            Value::List(alloc::vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            eval("dict(a=1)").unwrap(),
            Value::dict([("a", Value::Int(1))])
        );
    }
}
