use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// Locates the path under which generated code can reach one of the
/// `xr_*` crates, as seen from the caller's `Cargo.toml`.
///
/// # Example
///
/// ```rust
/// # use xr_macro_utils::Manifest;
/// let p: syn::Path = Manifest::shared(|m| m.get_crate_path("xr_serde"));
/// ```
///
/// # Resolution rules
///
/// 1. If the requested crate is listed in `dependencies`, return `::crate_name`.
/// 2. If the name begins with `xr_` and the caller depends on the facade
///    `xr_core`, return `::xr_core::short_name` (e.g. `xr_serde` -> `::xr_core::serde`).
/// 3. Repeat 1-2 with `dev-dependencies`.
/// 4. Otherwise fall back to `::crate_name`.
///
/// A crate that expands its own macros should declare
/// `extern crate self as crate_name;` so that rule 4 stays valid inside it.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Document<Box<str>>,
    pub modified_time: SystemTime,
}

const FACADE_NAME: &str = "xr_core";
const CRATE_PREFIX: &str = "xr_";

impl Manifest {
    fn get_manifest_path() -> Option<PathBuf> {
        let mut path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
        path.push("Cargo.toml");
        path.exists().then_some(path)
    }

    fn get_manifest_modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    fn read_manifest(path: &Path) -> Option<Document<Box<str>>> {
        let text = std::fs::read_to_string(path).ok()?.into_boxed_str();
        Document::parse(text).ok()
    }

    fn parse_path(path: &str) -> syn::Path {
        syn::parse_str(path).unwrap_or_else(|_| panic!("`{path}` is not a valid path"))
    }

    fn find_in_deps(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::parse_path(&format!("::{name}")));
        }
        let module = name.strip_prefix(CRATE_PREFIX)?;
        deps.contains_key(FACADE_NAME)
            .then(|| Self::parse_path(&format!("::{FACADE_NAME}::{module}")))
    }

    /// Returns the [`syn::Path`] for `name` resolved from this manifest.
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        for table in ["dependencies", "dev-dependencies"] {
            if let Some(Item::Table(deps)) = self.manifest.get(table)
                && let Some(path) = Self::find_in_deps(deps, name)
            {
                return path;
            }
        }
        Self::parse_path(&format!("::{name}"))
    }

    /// Runs `func` with the caller's manifest.
    ///
    /// Manifests are cached per path and re-read when the file changes.
    /// Without a readable manifest the fallback path `::name` is produced
    /// by [`Manifest::resolve`].
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let loaded = Self::get_manifest_path().and_then(|path| {
            let modified_time = Self::get_manifest_modified_time(&path)?;
            Some((path, modified_time))
        });

        let Some((path, modified_time)) = loaded else {
            return func(&Self::empty());
        };

        let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(manifest) = manifests.get(&path)
            && manifest.modified_time == modified_time
        {
            return func(manifest);
        }
        drop(manifests);

        let manifest = Manifest {
            manifest: Self::read_manifest(&path).unwrap_or_else(|| Self::empty().manifest),
            modified_time,
        };
        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);

        result
    }

    /// Shortcut for `Manifest::shared(|m| m.get_crate_path(name))`.
    pub fn resolve(name: &str) -> syn::Path {
        Self::shared(|m| m.get_crate_path(name))
    }

    fn empty() -> Self {
        Manifest {
            manifest: Document::parse(Box::<str>::from("")).unwrap_or_else(|_| unreachable!()),
            modified_time: SystemTime::UNIX_EPOCH,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            manifest: Document::parse(Box::<str>::from(text)).unwrap(),
            modified_time: SystemTime::UNIX_EPOCH,
        }
    }

    fn path_string(path: &syn::Path) -> String {
        path.segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect::<Vec<_>>()
            .join("::")
    }

    #[test]
    fn direct_dependency() {
        let m = manifest("[dependencies]\nxr_serde = \"0.0.1\"\n");
        assert_eq!(path_string(&m.get_crate_path("xr_serde")), "xr_serde");
    }

    #[test]
    fn through_facade() {
        let m = manifest("[dev-dependencies]\nxr_core = { path = \"..\" }\n");
        assert_eq!(path_string(&m.get_crate_path("xr_serde")), "xr_core::serde");
    }

    #[test]
    fn fallback() {
        let m = manifest("");
        assert_eq!(path_string(&m.get_crate_path("xr_conf")), "xr_conf");
    }
}
