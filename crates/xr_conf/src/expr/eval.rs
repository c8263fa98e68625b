use alloc::string::{String, ToString};
use alloc::vec::Vec;

use indexmap::IndexMap;
use xr_serde::Value;
use xr_serde::builtin::Tuple;

use super::types::kind_name;
use super::{BinOp, CallArgs, EvalError, Expr, Parser, Precision, Scope, Term};
use crate::{ConfError, NodeId, NodeKind};

/// Walks an [`Expr`] in one scope.
pub(super) struct Evaluator<'p, 's, 'a> {
    parser: &'p Parser,
    scope: &'s Scope<'a>,
}

impl<'p, 's, 'a> Evaluator<'p, 's, 'a> {
    #[inline]
    pub(super) fn new(parser: &'p Parser, scope: &'s Scope<'a>) -> Self {
        Self { parser, scope }
    }

    pub(super) fn eval(&self, expr: &Expr) -> Result<Term, EvalError> {
        Ok(match expr {
            Expr::Int(i) => Term::Value(Value::Int(*i)),
            Expr::Float(f) => Term::Value(Value::Float(*f)),
            Expr::Str(s) => Term::Value(Value::Str(s.clone())),
            Expr::Bool(b) => Term::Value(Value::Bool(*b)),
            Expr::None => Term::Value(Value::Null),
            Expr::Name(name) => self.lookup(name)?,
            Expr::Tuple(items) => Term::Tuple(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Neg(operand) => {
                let operand = self.value(operand)?;
                Term::Value(self.neg(operand)?)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                Term::Value(self.binary(*op, lhs, rhs)?)
            }
            Expr::Call { func, args, kwargs } => self.call(func, args, kwargs)?,
            Expr::Subscript { target, index } => self.subscript(target, index)?,
            Expr::Attribute { target, name } => self.attribute(target, name)?,
        })
    }

    #[inline]
    fn value(&self, expr: &Expr) -> Result<Value, EvalError> {
        self.eval(expr)?.into_value(self.scope)
    }

    fn lookup(&self, name: &str) -> Result<Term, EvalError> {
        if let Some(term) = self.scope.lookup(name) {
            return Ok(term);
        }
        self.parser
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedFunction {
                name: String::from(name),
            })
    }

    // -------------------------------------------------------------------------
    // Calls

    fn call(&self, func: &Expr, args: &[Expr], kwargs: &[(String, Expr)]) -> Result<Term, EvalError> {
        let callee = self.eval(func)?;
        let positional = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let keywords = kwargs
            .iter()
            .map(|(name, arg)| Ok((name.clone(), self.eval(arg)?)))
            .collect::<Result<IndexMap<_, _>, EvalError>>()?;
        let mut args = CallArgs::new(positional, keywords);

        match callee {
            Term::Function(function) => function.call(self.scope, args),
            Term::Type(ty) => ty.cast(self.scope, args).map(Term::Value),
            Term::Node(id) => {
                let ref_str = match args.next("ref")? {
                    None => String::from("."),
                    Some(term) => match term.into_value(self.scope)? {
                        Value::Str(ref_str) => ref_str,
                        other => {
                            return Err(EvalError::type_error(alloc::format!(
                                "ref strings must be str, not '{}'",
                                kind_name(&other)
                            )));
                        }
                    },
                };
                args.finish("node")?;
                let target = self.scope.require_tree()?.node_from_ref(id, &ref_str)?;
                self.scope.resolve(target).map(Term::Value)
            }
            other => Err(EvalError::NotCallable { found: other.kind() }),
        }
    }

    // -------------------------------------------------------------------------
    // Subscripts and attributes

    fn subscript(&self, target: &Expr, index: &Expr) -> Result<Term, EvalError> {
        let target = self.eval(target)?;
        let index = self.value(index)?;
        match target {
            Term::Node(id) => {
                let tree = self.scope.require_tree()?;
                if !matches!(tree.kind(id)?, NodeKind::List { .. } | NodeKind::Dict { .. }) {
                    // Leaves and keys are indexed through their value.
                    let value = self.scope.resolve(id)?;
                    return value_index(value, &index).map(Term::Value);
                }
                let child = match &index {
                    Value::Str(name) => tree.dict_child(id, name),
                    Value::Int(i) => tree.list_child(id, *i),
                    Value::Bool(b) => tree.list_child(id, i64::from(*b)),
                    other => {
                        return Err(EvalError::Index {
                            message: alloc::format!(
                                "node indices must be str or int, not '{}'",
                                kind_name(other)
                            ),
                        });
                    }
                };
                child.map(Term::Node).map_err(index_error)
            }
            Term::Tuple(items) => {
                let position = sequence_index(&index, items.len())?;
                items
                    .into_iter()
                    .nth(position)
                    .ok_or_else(|| out_of_range("tuple"))
            }
            Term::Value(value) => value_index(value, &index).map(Term::Value),
            other => Err(EvalError::type_error(alloc::format!(
                "'{}' object is not subscriptable",
                other.kind()
            ))),
        }
    }

    fn attribute(&self, target: &Expr, name: &str) -> Result<Term, EvalError> {
        let id = match self.eval(target)? {
            Term::Node(id) => id,
            other => {
                return Err(EvalError::NoAttribute {
                    name: String::from(name),
                    found: other.kind(),
                });
            }
        };
        let tree = self.scope.require_tree()?;
        if !tree.contains(id) {
            return Err(ConfError::StaleNode.into());
        }
        Ok(match name {
            "parent" => tree.up(id, 1).map_or(Term::Value(Value::Null), Term::Node),
            "name" => Term::Value(Value::from(node_name(tree, id).map(String::from))),
            "value" => match tree.key_value(id) {
                Some(value) => Term::Node(value),
                None => {
                    return Err(EvalError::NoAttribute {
                        name: String::from(name),
                        found: tree.kind(id)?.name(),
                    });
                }
            },
            "hidden" => Term::Value(Value::Bool(tree.is_hidden(id))),
            "qual_name" => Term::Value(Value::Str(tree.qual_name(id))),
            _ => {
                return Err(EvalError::NoAttribute {
                    name: String::from(name),
                    found: "node",
                });
            }
        })
    }

    // -------------------------------------------------------------------------
    // Arithmetic

    fn neg(&self, operand: Value) -> Result<Value, EvalError> {
        match operand {
            Value::Int(i) => self.int_op("-", i, 0, |i, _| i.checked_neg(), |i, _| i.wrapping_neg()),
            Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(EvalError::type_error(alloc::format!(
                "bad operand type for unary -: '{}'",
                kind_name(&other)
            ))),
        }
    }

    fn binary(&self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let unsupported = |lhs: &Value, rhs: &Value| {
            EvalError::type_error(alloc::format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                kind_name(lhs),
                kind_name(rhs)
            ))
        };

        if op == BinOp::Xor {
            return match (&lhs, &rhs) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a ^ b)),
                _ => match (as_int(&lhs), as_int(&rhs)) {
                    (Some(a), Some(b)) => Ok(Value::Int(a ^ b)),
                    _ => Err(unsupported(&lhs, &rhs)),
                },
            };
        }

        if op == BinOp::Add
            && let Some(joined) = concat(&lhs, &rhs)
        {
            return Ok(joined);
        }

        let (Some(a), Some(b)) = (Number::of(&lhs), Number::of(&rhs)) else {
            return Err(unsupported(&lhs, &rhs));
        };
        match (op, a, b) {
            (BinOp::Div, a, b) => {
                let divisor = b.to_f64();
                if divisor == 0.0 {
                    return Err(EvalError::ZeroDivision);
                }
                Ok(Value::Float(a.to_f64() / divisor))
            }
            (BinOp::Pow, Number::Int(base), Number::Int(exp)) => self.int_pow(base, exp),
            (BinOp::Pow, a, b) => float_pow(a.to_f64(), b.to_f64()),
            (op, Number::Int(a), Number::Int(b)) => match op {
                BinOp::Add => self.int_op("+", a, b, i64::checked_add, i64::wrapping_add),
                BinOp::Sub => self.int_op("-", a, b, i64::checked_sub, i64::wrapping_sub),
                _ => self.int_op("*", a, b, i64::checked_mul, i64::wrapping_mul),
            },
            (op, a, b) => {
                let (a, b) = (a.to_f64(), b.to_f64());
                Ok(Value::Float(match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    _ => a * b,
                }))
            }
        }
    }

    fn int_op(
        &self,
        op: &'static str,
        a: i64,
        b: i64,
        checked: impl FnOnce(i64, i64) -> Option<i64>,
        wrapping: impl FnOnce(i64, i64) -> i64,
    ) -> Result<Value, EvalError> {
        match self.parser.precision() {
            Precision::Checked => checked(a, b)
                .map(Value::Int)
                .ok_or(EvalError::Overflow { op }),
            Precision::Wrapping => Ok(Value::Int(wrapping(a, b))),
        }
    }

    fn int_pow(&self, base: i64, exp: i64) -> Result<Value, EvalError> {
        if exp < 0 {
            if base == 0 {
                return Err(EvalError::ZeroDivision);
            }
            return float_pow(base as f64, exp as f64);
        }
        let Ok(exp) = u32::try_from(exp) else {
            // Only these bases stay in range for huge exponents.
            return match base {
                0 | 1 => Ok(Value::Int(base)),
                -1 => Ok(Value::Int(if exp % 2 == 0 { 1 } else { -1 })),
                _ => match self.parser.precision() {
                    Precision::Checked => Err(EvalError::Overflow { op: "**" }),
                    Precision::Wrapping => Ok(Value::Int(wrapping_pow_u64(base, exp as u64))),
                },
            };
        };
        self.int_op(
            "**",
            base,
            i64::from(exp),
            |base, exp| base.checked_pow(exp as u32),
            |base, exp| base.wrapping_pow(exp as u32),
        )
    }
}

// -----------------------------------------------------------------------------
// Helpers

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn float_pow(base: f64, exp: f64) -> Result<Value, EvalError> {
    if base == 0.0 && exp < 0.0 {
        return Err(EvalError::ZeroDivision);
    }
    let result = base.powf(exp);
    if result.is_nan() && !base.is_nan() && !exp.is_nan() {
        return Err(EvalError::type_error(
            "negative number cannot be raised to a fractional power",
        ));
    }
    if result.is_infinite() && base.is_finite() && exp.is_finite() {
        return Err(EvalError::Overflow { op: "**" });
    }
    Ok(Value::Float(result))
}

fn wrapping_pow_u64(mut base: i64, mut exp: u64) -> i64 {
    let mut acc: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

/// `+` on sequences.
fn concat(lhs: &Value, rhs: &Value) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(Value::Str(alloc::format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => Some(Value::List(a.iter().chain(b).cloned().collect())),
        _ => {
            let a = lhs.downcast_ref::<Tuple>()?;
            let b = rhs.downcast_ref::<Tuple>()?;
            Some(Value::object(Tuple(a.0.iter().chain(&b.0).cloned().collect())))
        }
    }
}

fn out_of_range(kind: &str) -> EvalError {
    EvalError::Index {
        message: alloc::format!("{kind} index out of range"),
    }
}

fn index_error(err: ConfError) -> EvalError {
    match err {
        ConfError::MissingKey { .. }
        | ConfError::IndexOutOfRange { .. }
        | ConfError::NotAList { .. }
        | ConfError::NotADict { .. } => EvalError::Index {
            message: err.to_string(),
        },
        err => err.into(),
    }
}

/// Normalizes a possibly negative index into `0..len`.
fn sequence_index(index: &Value, len: usize) -> Result<usize, EvalError> {
    let Some(i) = as_int(index) else {
        return Err(EvalError::Index {
            message: alloc::format!("indices must be integers, not '{}'", kind_name(index)),
        });
    };
    let len = len as i64;
    let position = if i < 0 { i + len } else { i };
    if (0..len).contains(&position) {
        Ok(position as usize)
    } else {
        Err(out_of_range("sequence"))
    }
}

fn value_index(value: Value, index: &Value) -> Result<Value, EvalError> {
    match value {
        Value::List(items) => {
            let position = sequence_index(index, items.len())?;
            items.into_iter().nth(position).ok_or_else(|| out_of_range("list"))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let position = sequence_index(index, chars.len())?;
            Ok(Value::Str(chars[position].to_string()))
        }
        Value::Dict(mut dict) => {
            let Value::Str(key) = index else {
                return Err(EvalError::Index {
                    message: alloc::format!("dict keys are str, not '{}'", kind_name(index)),
                });
            };
            dict.swap_remove(key.as_str()).ok_or_else(|| EvalError::Index {
                message: alloc::format!("missing key '{key}'"),
            })
        }
        Value::Object(object) => match object.downcast::<Tuple>() {
            Ok(tuple) => {
                let position = sequence_index(index, tuple.0.len())?;
                tuple.0.into_iter().nth(position).ok_or_else(|| out_of_range("tuple"))
            }
            Err(object) => Err(EvalError::type_error(alloc::format!(
                "'{}' object is not subscriptable",
                object.type_path()
            ))),
        },
        other => Err(EvalError::type_error(alloc::format!(
            "'{}' object is not subscriptable",
            kind_name(&other)
        ))),
    }
}

/// The key name of a key node, or of the key holding a value node.
fn node_name(tree: &crate::NodeTree, id: NodeId) -> Option<&str> {
    tree.key_name(id)
        .or_else(|| tree.parent(id).and_then(|parent| tree.key_name(parent)))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::NodeTree;

    fn eval_in(tree: &NodeTree, current: Option<NodeId>, src: &str) -> Result<Value, EvalError> {
        let scope = Scope::new(tree, current, None);
        tree.parser().eval_value(src, &scope)
    }

    fn sample() -> NodeTree {
        NodeTree::new(Value::dict([
            ("xs", Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
            ("name", Value::from("box")),
            ("pair", Value::from("$(1, 'a')")),
        ]))
        .unwrap()
    }

    #[test]
    fn node_access() {
        let tree = sample();
        assert_eq!(eval_in(&tree, None, "r_['xs'][-1]").unwrap(), Value::Int(3));
        assert_eq!(eval_in(&tree, None, "r_('xs.1') * 10").unwrap(), Value::Int(20));
        assert_eq!(eval_in(&tree, None, "r_['xs'].qual_name").unwrap(), Value::from("xs"));
        assert_eq!(eval_in(&tree, None, "r_['*xs'].name").unwrap(), Value::from("xs"));
        assert_eq!(eval_in(&tree, None, "r_['xs'].name").unwrap(), Value::from("xs"));
        assert_eq!(eval_in(&tree, None, "r_['*name'].value + '!'").unwrap(), Value::from("box!"));
        assert_eq!(eval_in(&tree, None, "r_.parent").unwrap(), Value::Null);
        assert_eq!(eval_in(&tree, None, "r_['pair'][1]").unwrap(), Value::from("a"));
        assert_eq!(eval_in(&tree, None, "r_['name'][0]").unwrap(), Value::from("b"));

        let xs = tree.dict_child(tree.root(), "xs").unwrap();
        assert_eq!(eval_in(&tree, Some(xs), "n_[0] + parent(n_)['xs'][1]").unwrap(), Value::Int(3));
        assert_eq!(eval_in(&tree, Some(xs), "n_.hidden").unwrap(), Value::Bool(false));
    }

    #[test]
    fn node_access_errors() {
        let tree = sample();
        assert!(matches!(
            eval_in(&tree, None, "r_['missing']"),
            Err(EvalError::Index { .. })
        ));
        assert!(matches!(
            eval_in(&tree, None, "r_['xs'][3]"),
            Err(EvalError::Index { .. })
        ));
        assert!(matches!(
            eval_in(&tree, None, "r_.colour"),
            Err(EvalError::NoAttribute { .. })
        ));
        assert!(matches!(
            eval_in(&tree, None, "r_['xs'].value"),
            Err(EvalError::NoAttribute { found: "list", .. })
        ));
        assert!(matches!(
            eval_in(&tree, None, "r_('xs..nope')"),
            Err(EvalError::Node(err)) if matches!(*err, ConfError::InvalidRefStr { .. })
        ));
        assert!(matches!(
            eval_in(&tree, None, "1(2)"),
            Err(EvalError::NotCallable { found: "int" })
        ));
        // Nodes need a tree.
        assert!(matches!(
            Parser::new().eval_value("n_", &Scope::detached()),
            Err(EvalError::UndefinedFunction { .. })
        ));
    }

    #[test]
    fn sequences_and_numbers() {
        let tree = sample();
        assert_eq!(
            eval_in(&tree, None, "(1, 2) + (3,)").unwrap(),
            Value::object(Tuple(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(
            eval_in(&tree, None, "r_['xs'] + list('ab')").unwrap(),
            Value::List(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ])
        );
        assert_eq!(eval_in(&tree, None, "True ^ True").unwrap(), Value::Bool(false));
        assert_eq!(eval_in(&tree, None, "2.0 ** 3").unwrap(), Value::Float(8.0));
        assert_eq!(eval_in(&tree, None, "(-1) ** 5000000000").unwrap(), Value::Int(1));
        assert!(matches!(eval_in(&tree, None, "0 ** -1"), Err(EvalError::ZeroDivision)));
        assert!(matches!(eval_in(&tree, None, "(-8.0) ** 0.5"), Err(EvalError::Type { .. })));
        assert!(matches!(eval_in(&tree, None, "2 ** 5000000000"), Err(EvalError::Overflow { op: "**" })));
        assert!(matches!(eval_in(&tree, None, "-(-9223372036854775807 - 1)"), Err(EvalError::Overflow { op: "-" })));
    }
}
