use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use xr_serde::{Serializer, Value};

use crate::expr::{EvalError, Parser, Term};
use crate::interp::Interpolator;
use crate::node::{NodeId, NodeTree, TreeContext};
use crate::{ConfError, Environment, source};

// -----------------------------------------------------------------------------
// Config

/// A built node tree with its modifiers applied.
///
/// # Example
///
/// ```
/// use xr_conf::{Config, Value};
///
/// let config = Config::new(Value::dict([
///     ("debug::hidden", Value::Bool(true)),
///     ("level", Value::from("$int(r_['debug']) * 3")),
/// ]))
/// .unwrap();
/// assert_eq!(config.resolve().unwrap(), Value::dict([("level", Value::Int(3))]));
/// ```
#[derive(Debug)]
pub struct Config {
    tree: NodeTree,
}

impl Config {
    /// Builds `raw` with the default parser, serializer and environment.
    #[inline]
    pub fn new(raw: Value) -> Result<Self, ConfError> {
        Self::builder().build(raw)
    }

    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reads a YAML or JSON file with the default settings.
    #[inline]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        Self::builder().load(path)
    }

    /// Resolves the whole tree.
    #[inline]
    pub fn resolve(&self) -> Result<Value, ConfError> {
        self.tree.resolve(self.tree.root())
    }

    /// The node at `ref_str` from the root.
    #[inline]
    pub fn node(&self, ref_str: &str) -> Result<NodeId, ConfError> {
        self.tree.node_from_ref(self.tree.root(), ref_str)
    }

    /// Resolves the node at `ref_str` from the root.
    #[inline]
    pub fn get(&self, ref_str: &str) -> Result<Value, ConfError> {
        self.tree.call(self.tree.root(), ref_str)
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    #[inline]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    #[inline]
    pub fn into_tree(self) -> NodeTree {
        self.tree
    }

    /// Adds a name to the expression context of this tree.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        term: impl Into<Term>,
        overwrite: bool,
    ) -> Result<(), EvalError> {
        self.tree.parser_mut().register(name, term, overwrite)
    }
}

/// Builds a tree from raw data with the default settings.
#[inline]
pub fn build_node_tree(raw: Value) -> Result<Config, ConfError> {
    Config::new(raw)
}

// -----------------------------------------------------------------------------
// ConfigBuilder

/// Settings for building a [`Config`].
#[derive(Clone, Default)]
pub struct ConfigBuilder {
    context: TreeContext,
    source: Option<PathBuf>,
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("parser", &self.context.parser)
            .field("environment", &self.context.environment)
            .field("interpolator", &self.context.interpolator)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl ConfigBuilder {
    pub fn parser(mut self, parser: Parser) -> Self {
        self.context.parser = Arc::new(parser);
        self
    }

    /// The serializer whose signatures key types may name.
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.context.serializer = Arc::new(serializer);
        self
    }

    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.context.environment = Arc::new(environment);
        self
    }

    /// Enables interpolation of `$name(...)` calls in plain strings.
    pub fn interpolator(mut self, interpolator: Interpolator) -> Self {
        self.context.interpolator = Some(Arc::new(interpolator));
        self
    }

    /// The file the raw data came from. Relative `load` paths start from its
    /// directory.
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Builds the tree and applies its modifiers.
    pub fn build(self, raw: Value) -> Result<Config, ConfError> {
        let mut tree = NodeTree::with_context(raw, self.context, self.source)?;
        tree.modify(tree.root())?;
        Ok(Config { tree })
    }

    /// Reads a YAML or JSON file and builds it. Relative paths start from
    /// the environment's working directory.
    pub fn load(self, path: impl AsRef<Path>) -> Result<Config, ConfError> {
        let mut path = path.as_ref().to_path_buf();
        if path.is_relative() {
            path = self.context.environment.cwd().join(path);
        }
        let path = source::find_file(&path);
        let raw = source::read_raw(&path)?;
        self.source_file(path).build(raw)
    }
}

// -----------------------------------------------------------------------------
// SharedConfig

/// A [`Config`] behind a shared lock.
#[derive(Clone)]
pub struct SharedConfig {
    /// The wrapped [`Config`].
    pub internal: Arc<RwLock<Config>>,
}

impl SharedConfig {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self {
            internal: Arc::new(RwLock::new(config)),
        }
    }

    /// Takes a read lock on the underlying [`Config`].
    pub fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.internal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes a write lock on the underlying [`Config`].
    pub fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.internal
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Config> for SharedConfig {
    #[inline]
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

impl fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.read(), f)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::FixedEnvironment;
    use crate::expr::Precision;

    #[test]
    fn building_applies_modifiers() {
        let config = build_node_tree(Value::dict([
            ("a::hidden", Value::Int(1)),
            ("b", Value::from("$r_['a'] + 1")),
        ]))
        .unwrap();
        assert_eq!(config.resolve().unwrap(), Value::dict([("b", Value::Int(2))]));
        assert_eq!(config.get("a").unwrap(), Value::Int(1));
        assert_eq!(config.tree().qual_name(config.node("*a").unwrap()), "*a");
    }

    #[test]
    fn files_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("conf")).unwrap();
        std::fs::write(
            dir.path().join("conf/main.yaml"),
            "name: app\nserver::load: server\nhere: $cwd()\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("conf/server.yml"),
            "port:int: 8080\nhost: $f_.parent['name'] + '.local'\n",
        )
        .unwrap();

        let config = Config::builder()
            .environment(FixedEnvironment(dir.path().to_path_buf()))
            .load("conf/main")
            .unwrap();
        assert_eq!(
            config.resolve().unwrap(),
            Value::dict([
                ("name", Value::from("app")),
                (
                    "server",
                    Value::dict([
                        ("port", Value::Int(8080)),
                        ("host", Value::from("app.local")),
                    ])
                ),
                ("here", Value::Str(dir.path().display().to_string())),
            ])
        );

        let direct = Config::from_file(dir.path().join("conf/server.yml")).unwrap();
        assert_eq!(direct.get("port").unwrap(), Value::Int(8080));
        assert!(matches!(
            Config::from_file(dir.path().join("none.yaml")),
            Err(ConfError::Load { .. })
        ));
    }

    #[test]
    fn interpolation_is_opt_in() {
        let mut interpolator = Interpolator::new();
        interpolator
            .register("upper", |args, _| {
                Ok(Value::Str(
                    args.first().and_then(Value::as_str).unwrap_or_default().to_uppercase(),
                ))
            }, false)
            .unwrap();
        let raw = Value::dict([
            ("a", Value::from("x-$upper(abc)")),
            ("b", Value::from("\\x-$upper(abc)")),
        ]);

        let plain = Config::new(raw.clone()).unwrap();
        assert_eq!(plain.get("a").unwrap(), Value::from("x-$upper(abc)"));

        let config = Config::builder().interpolator(interpolator).build(raw).unwrap();
        assert_eq!(config.get("a").unwrap(), Value::from("x-ABC"));
        assert_eq!(config.get("b").unwrap(), Value::from("x-$upper(abc)"));
    }

    #[test]
    fn parser_settings_and_registration() {
        let raw = Value::dict([("a", Value::from("$9223372036854775807 + offset"))]);
        let mut config = Config::builder()
            .parser(Parser::new().with_precision(Precision::Wrapping))
            .build(raw)
            .unwrap();
        assert!(matches!(
            config.get("a"),
            Err(ConfError::Eval { source: EvalError::UndefinedFunction { .. }, .. })
        ));
        config.register("offset", Value::Int(1), false).unwrap();
        assert_eq!(config.get("a").unwrap(), Value::Int(i64::MIN));
    }

    #[test]
    fn shared_between_threads() {
        let shared = SharedConfig::from(
            Config::new(Value::dict([("n", Value::List(vec![Value::Int(1)]))])).unwrap(),
        );
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.read().get("n.0").unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Value::Int(1));
        }

        let mut config = shared.write();
        let root = config.root();
        let n = config.tree().node_from_ref(root, "n").unwrap();
        let extra = NodeTree::new(Value::Int(2)).unwrap();
        let copy = config.tree_mut().graft(&extra, extra.root()).unwrap();
        config.tree_mut().list_push(n, copy).unwrap();
        drop(config);
        assert_eq!(
            shared.read().get("n").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }
}
