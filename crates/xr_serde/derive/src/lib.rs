//! See following macros:
//!
//! - [`Serializable`]
//! - [`NamedEnum`]
//! - [`callable`]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

static XR_ATTRIBUTE_NAME: &str = "xr";

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod impls;
mod path;
mod utils;

// -----------------------------------------------------------------------------
// Macros

/// # Serializable Derivation
///
/// `#[derive(Serializable)]` implements `Serializable`, `IntoValue` and
/// `FromValue` for a struct with named fields (or a unit struct). Each field
/// becomes a constructor parameter; the plugin stores the fields by name.
///
/// The type must be `Clone + PartialEq + Debug + Send + Sync + 'static`, and
/// every field type must implement `IntoValue` and `FromValue`.
///
/// ## Container attributes
///
/// ```rust, ignore
/// #[derive(Serializable)]
/// #[xr(
///     signature = "geometry.Point", // default: the Rust type name
///     alias = "old.Point",           // repeatable, accepted when decoding
///     inheritable,                   // subtypes may reuse this plugin
///     explicit_defaults = false,     // skip fields equal to their default
///     kwargs_level = "safe",         // "root", "safe" or "auto"
///     auto_register,                 // submit the plugin to `Registry::auto_register`
/// )]
/// struct Point { x: i64, y: i64 }
/// ```
///
/// ## Field attributes
///
/// - `#[xr(default)]`: use `Default::default()` when the field is absent.
/// - `#[xr(default = expr)]`: use `expr` when the field is absent.
/// - `#[xr(keyword_only)]`: marks the parameter keyword-only.
/// - `#[xr(var_args)]`: the variadic positional parameter, a `Vec<T>`.
/// - `#[xr(var_kwargs)]`: the variadic keyword parameter, an `IndexMap<String, T>`.
/// - `#[xr(rename = "name")]`: the field name in the serialized form.
///
/// Generic types and tuple structs are not supported.
#[proc_macro_derive(Serializable, attributes(xr))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    impls::impl_serializable(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// # NamedEnum Derivation
///
/// `#[derive(NamedEnum)]` implements `NamedEnum`, `IntoValue` and
/// `FromValue` for an enum whose variants carry no data. A value is stored
/// as `{"name": "<Variant>"}`.
///
/// ```rust, ignore
/// #[derive(Clone, Copy, Debug, PartialEq, NamedEnum)]
/// #[xr(signature = "paint.Color", auto_register)]
/// enum Color {
///     Red,
///     #[xr(rename = "GREEN")]
///     Green,
/// }
/// ```
#[proc_macro_derive(NamedEnum, attributes(xr))]
pub fn derive_named_enum(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    impls::impl_named_enum(&ast)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// # Callable Plugins
///
/// Turns a function into a decode-only plugin. The function is kept as is;
/// a sibling `<name>_serializer()` returns the `TypeSerializer` that binds
/// the stored fields to the parameters and calls the function.
///
/// Parameters accept the same `#[xr(...)]` attributes as struct fields. The
/// macro arguments are `signature`, `explicit_defaults`, `kwargs_level` and
/// `auto_register`. The default signature is the function's module path
/// followed by its name.
///
/// ```rust, ignore
/// #[callable(signature = "math.add", auto_register)]
/// fn add(a: i64, #[xr(default = 1)] b: i64) -> i64 {
///     a + b
/// }
///
/// let plugin = add_serializer();
/// ```
#[proc_macro_attribute]
pub fn callable(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut attrs = attributes::TypeAttributes::default();
    let parser = syn::meta::parser(|meta| attrs.parse_meta(meta));
    parse_macro_input!(args with parser);
    let item = parse_macro_input!(input as ItemFn);

    impls::impl_callable(&attrs, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
