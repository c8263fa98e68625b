//! String interpolation of `$name(arg, kw=val)` calls.
//!
//! This is a second, lighter front-end next to [`expr`](crate::expr): calls
//! take literal arguments only, and every literal (quoted or not) is cast
//! with YAML scalar rules, so `1` is an int, `true` a bool and `'1'` a
//! string. Calls nested in the arguments of another call run first.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use xr_serde::{BoxError, Dict, Value};
use xr_utils::hash::HashMap;

use crate::expr::{EvalError, to_text};
use crate::source::yaml_to_value;

static NS_VARNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*$")
        .unwrap_or_else(|err| unreachable!("invalid pattern: {err}"))
});

static CALL_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)\(")
        .unwrap_or_else(|err| unreachable!("invalid pattern: {err}"))
});

/// Characters an unquoted literal may only contain escaped.
const SPECIAL: &str = "$#='\",()\\";

type InterpFn = dyn Fn(Vec<Value>, Dict) -> Result<Value, BoxError> + Send + Sync;

// -----------------------------------------------------------------------------
// Interpolator

/// A registry of interpolation functions.
///
/// # Example
///
/// ```
/// use xr_conf::Value;
/// use xr_conf::interp::Interpolator;
///
/// let mut interp = Interpolator::new();
/// interp
///     .register("math.double", |args, _| Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2)), false)
///     .unwrap();
///
/// assert_eq!(interp.interpolate("$math.double(21)").unwrap(), Value::Int(42));
/// assert_eq!(interp.interpolate("n=$math.double($math.double(1))").unwrap(), Value::from("n=4"));
/// ```
#[derive(Clone, Default)]
pub struct Interpolator {
    functions: HashMap<String, Arc<InterpFn>>,
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

impl Interpolator {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function under a dotted name such as `env.home`.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F, overwrite: bool) -> Result<(), EvalError>
    where
        F: Fn(Vec<Value>, Dict) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        if !NS_VARNAME.is_match(&name) {
            return Err(EvalError::InvalidName { name });
        }
        if !overwrite && self.functions.contains_key(&name) {
            return Err(EvalError::AlreadyRegistered { name });
        }
        self.functions.insert(name, Arc::new(func));
        Ok(())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Whether `text` holds a call the interpolator would run.
    #[inline]
    pub fn has_call(text: &str) -> bool {
        find_call(text).is_some()
    }

    /// Runs every call in `text`, innermost first.
    ///
    /// A call spanning the whole string keeps the type of its result;
    /// otherwise the result is spliced in as text.
    pub fn interpolate(&self, text: &str) -> Result<Value, EvalError> {
        let mut current = Value::Str(String::from(text));
        while let Value::Str(text) = &current {
            let Some(call) = find_call(text) else {
                break;
            };
            let result = self.run(&call)?;
            current = if call.start == 0 && call.end == text.len() {
                result
            } else {
                let mut spliced = String::with_capacity(text.len());
                spliced.push_str(&text[..call.start]);
                spliced.push_str(&to_text(&result));
                spliced.push_str(&text[call.end..]);
                Value::Str(spliced)
            };
        }
        Ok(current)
    }

    fn run(&self, call: &Call<'_>) -> Result<Value, EvalError> {
        let func = self
            .functions
            .get(call.name)
            .ok_or_else(|| EvalError::UndefinedFunction {
                name: String::from(call.name),
            })?;
        let args = call
            .args
            .iter()
            .map(|arg| cast_literal(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let mut kwargs = Dict::with_capacity(call.kwargs.len());
        for (name, arg) in &call.kwargs {
            kwargs.insert(String::from(*name), cast_literal(arg)?);
        }
        func(args, kwargs).map_err(|source| EvalError::Call {
            name: String::from(call.name),
            source,
        })
    }
}

fn cast_literal(literal: &str) -> Result<Value, EvalError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(literal).map_err(|err| EvalError::Syntax {
        message: alloc::format!("invalid literal `{literal}`: {err}"),
        position: 0,
    })?;
    yaml_to_value(yaml).map_err(EvalError::from)
}

// -----------------------------------------------------------------------------
// Scanning

#[derive(Debug, PartialEq)]
struct Call<'a> {
    start: usize,
    end: usize,
    name: &'a str,
    args: Vec<String>,
    kwargs: Vec<(&'a str, String)>,
}

/// The first call whose arguments are all literals.
fn find_call(text: &str) -> Option<Call<'_>> {
    CALL_START.captures_iter(text).find_map(|captures| {
        let whole = captures.get(0)?;
        let name = captures.get(1)?.as_str();
        let slashes = text[..whole.start()]
            .bytes()
            .rev()
            .take_while(|b| *b == b'\\')
            .count();
        if slashes % 2 == 1 {
            return None;
        }
        let (args, kwargs, end) = ArgScanner::new(text, whole.end()).scan()?;
        Some(Call {
            start: whole.start(),
            end,
            name,
            args,
            kwargs,
        })
    })
}

struct ArgScanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> ArgScanner<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Scans `args) ` up to and including the closing parenthesis.
    fn scan(mut self) -> Option<(Vec<String>, Vec<(&'a str, String)>, usize)> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Some((args, kwargs, self.pos));
        }
        loop {
            self.skip_ws();
            if let Some(name) = self.keyword() {
                kwargs.push((name, self.literal()?));
            } else if kwargs.is_empty() {
                args.push(self.literal()?);
            } else {
                return None;
            }
            self.skip_ws();
            match self.bump()? {
                ',' => continue,
                ')' => return Some((args, kwargs, self.pos)),
                _ => return None,
            }
        }
    }

    /// Consumes `name =` if present.
    fn keyword(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let rest = &self.text[start..];
        let len = rest
            .char_indices()
            .find(|(i, c)| !(c.is_alphanumeric() || *c == '_') || (*i == 0 && c.is_ascii_digit()))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        self.pos += len;
        self.skip_ws();
        if self.peek() == Some('=') {
            self.bump();
            self.skip_ws();
            Some(&self.text[start..start + len])
        } else {
            self.pos = start;
            None
        }
    }

    fn literal(&mut self) -> Option<String> {
        match self.peek()? {
            quote @ ('\'' | '"') => {
                let start = self.pos;
                self.bump();
                loop {
                    match self.bump()? {
                        '\\' => {
                            self.bump()?;
                        }
                        c if c == quote => break,
                        _ => {}
                    }
                }
                Some(String::from(&self.text[start..self.pos]))
            }
            _ => {
                let mut out = String::new();
                while let Some(c) = self.peek() {
                    if c == '\\' {
                        let escaped = self.text[self.pos + 1..].chars().next()?;
                        if !(SPECIAL.contains(escaped) || escaped.is_whitespace()) {
                            return None;
                        }
                        self.bump();
                        self.bump();
                        out.push(escaped);
                    } else if c.is_whitespace() || SPECIAL.contains(c) {
                        break;
                    } else {
                        self.bump();
                        out.push(c);
                    }
                }
                (!out.is_empty()).then_some(out)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec;

    use super::*;

    fn sample() -> Interpolator {
        let mut interp = Interpolator::new();
        interp
            .register(
                "echo",
                |args, kwargs| {
                    Ok(match (args.len(), kwargs.is_empty()) {
                        (1, true) => args.into_iter().next().unwrap_or_default(),
                        _ => Value::List(vec![Value::List(args), Value::Dict(kwargs)]),
                    })
                },
                false,
            )
            .unwrap();
        interp
            .register("fail", |_, _| Err(Box::from("nope")), false)
            .unwrap();
        interp
    }

    #[test]
    fn scanning() {
        let call = find_call(r"x $f(1, 'a, b', c\,d) $g(k = v)").unwrap();
        assert_eq!(call.name, "f");
        assert_eq!(call.args, ["1", "'a, b'", "c,d"]);

        // Nested calls are skipped until their arguments are literals.
        let nested = find_call("$outer($inner(1), 2)").unwrap();
        assert_eq!(nested.name, "inner");

        assert!(find_call(r"\$f(1)").is_none());
        assert!(find_call(r"\\$f(1)").is_some());
        assert!(find_call("$f(k=1, 2)").is_none());
        assert!(find_call("$f(a b)").is_none());
        assert!(find_call("$1f(a)").is_none());
    }

    #[test]
    fn whole_string_calls_keep_their_type() {
        let interp = sample();
        assert_eq!(interp.interpolate("$echo(1)").unwrap(), Value::Int(1));
        assert_eq!(interp.interpolate("$echo(true)").unwrap(), Value::Bool(true));
        assert_eq!(interp.interpolate("$echo('1')").unwrap(), Value::from("1"));
        assert_eq!(interp.interpolate("$echo(null)").unwrap(), Value::Null);
        assert_eq!(
            interp.interpolate("$echo(1, k=2.5)").unwrap(),
            Value::List(vec![
                Value::List(vec![Value::Int(1)]),
                Value::dict([("k", Value::Float(2.5))]),
            ])
        );
    }

    #[test]
    fn embedded_calls_are_spliced_as_text() {
        let interp = sample();
        assert_eq!(
            interp.interpolate("a $echo(1.0) b $echo(x)").unwrap(),
            Value::from("a 1.0 b x")
        );
        assert_eq!(
            interp.interpolate("[$echo($echo(2))]").unwrap(),
            Value::from("[2]")
        );
        assert_eq!(interp.interpolate("no calls").unwrap(), Value::from("no calls"));
    }

    #[test]
    fn errors() {
        let mut interp = sample();
        assert!(matches!(
            interp.interpolate("$missing(1)"),
            Err(EvalError::UndefinedFunction { name }) if name == "missing"
        ));
        assert!(matches!(
            interp.interpolate("x $fail()"),
            Err(EvalError::Call { name, .. }) if name == "fail"
        ));
        assert!(matches!(
            interp.register("echo", |_, _| Ok(Value::Null), false),
            Err(EvalError::AlreadyRegistered { .. })
        ));
        assert!(matches!(
            interp.register("bad.", |_, _| Ok(Value::Null), false),
            Err(EvalError::InvalidName { .. })
        ));
        interp.register("echo", |_, _| Ok(Value::Null), true).unwrap();
        assert_eq!(interp.interpolate("$echo(1)").unwrap(), Value::Null);
    }
}
