use alloc::string::{String, ToString};

use xr_serde::Value;
use xr_utils::hash::HashMap;

use super::types::kind_name;
use super::{CallArgs, EvalError, Function, Scope, Term, TypeName};
use crate::{Environment, ProcessEnvironment, modifiers};

/// Fills a parser context with the default names.
pub(super) fn install(context: &mut HashMap<String, Term>) {
    for ty in TypeName::ALL {
        context.insert(String::from(ty.name()), Term::Type(ty));
    }
    let functions = [
        Function::new("parent", parent),
        Function::new("rename", rename),
        Function::new("cwd", cwd),
    ];
    for function in functions {
        context.insert(String::from(function.name()), Term::Function(function));
    }
    for modifier in [modifiers::hidden(), modifiers::load()] {
        context.insert(String::from(modifier.name()), Term::Modifier(modifier));
    }
}

fn int_arg(scope: &Scope<'_>, term: Term, name: &str) -> Result<i64, EvalError> {
    match term.into_value(scope)? {
        Value::Int(i) => Ok(i),
        Value::Bool(b) => Ok(i64::from(b)),
        other => Err(EvalError::type_error(alloc::format!(
            "argument `{name}` must be int, not '{}'",
            kind_name(&other)
        ))),
    }
}

/// `parent(node, levels=1)`: the container `levels` up, or `None` above the
/// root.
fn parent(scope: &Scope<'_>, mut args: CallArgs) -> Result<Term, EvalError> {
    let node = match args.required("node")? {
        Term::Node(id) => id,
        other => {
            return Err(EvalError::type_error(alloc::format!(
                "parent() expects a node, not '{}'",
                other.kind()
            )));
        }
    };
    let levels = match args.next("levels")? {
        Some(term) => int_arg(scope, term, "levels")?,
        None => 1,
    };
    args.finish("parent")?;

    let levels = usize::try_from(levels)
        .map_err(|_| EvalError::type_error("parent() levels must be non-negative"))?;
    let tree = scope.require_tree()?;
    Ok(tree
        .up(node, levels)
        .map_or(Term::Value(Value::Null), Term::Node))
}

/// `rename(name)`: a modifier renaming its key to `name`.
fn rename(scope: &Scope<'_>, mut args: CallArgs) -> Result<Term, EvalError> {
    let name = args.required("name")?.into_value(scope)?;
    args.finish("rename")?;
    match name {
        Value::Str(name) => Ok(Term::Modifier(modifiers::rename(name))),
        other => Err(EvalError::type_error(alloc::format!(
            "rename() expects a str, not '{}'",
            kind_name(&other)
        ))),
    }
}

/// `cwd()`: the working directory of the tree's environment.
fn cwd(scope: &Scope<'_>, args: CallArgs) -> Result<Term, EvalError> {
    args.finish("cwd")?;
    let dir = match scope.tree() {
        Some(tree) => tree.environment().cwd(),
        None => ProcessEnvironment.cwd(),
    };
    Ok(Term::Value(Value::Str(dir.display().to_string())))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Parser;

    #[test]
    fn default_context() {
        let parser = Parser::new();
        for name in ["float", "dict", "set", "parent", "rename", "cwd", "hidden", "load"] {
            assert!(parser.contains(name), "{name}");
        }
        assert!(matches!(parser.get("hidden"), Some(Term::Modifier(_))));
        assert!(matches!(parser.get("int"), Some(Term::Type(TypeName::Int))));
        assert!(Parser::bare().names().next().is_none());
    }

    #[test]
    fn builtin_functions() {
        let parser = Parser::new();
        let scope = Scope::detached();
        assert!(matches!(
            parser.eval("rename('b')", &scope).unwrap(),
            Term::Modifier(m) if m.name() == "rename"
        ));
        assert!(matches!(parser.eval("rename(1)", &scope), Err(EvalError::Type { .. })));
        assert!(matches!(parser.eval_value("cwd()", &scope).unwrap(), Value::Str(_)));
        assert!(matches!(parser.eval("cwd(1)", &scope), Err(EvalError::Type { .. })));
        assert!(matches!(parser.eval("parent(1)", &scope), Err(EvalError::Type { .. })));
    }
}
