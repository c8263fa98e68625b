//! Paths into `xr_serde` used by generated code.

use proc_macro2::TokenStream;
use quote::quote;

/// Get the correct access path to the `xr_serde` crate.
///
/// 1. For crates that depend on `xr_serde`, `::xr_serde` is returned.
/// 2. For crates that depend on `xr_core`, `::xr_core::serde` is returned.
/// 3. For other situations, `::xr_serde` is returned, but this may be incorrect.
///
/// Reading the manifest is not free, so the path is obtained once per macro
/// call and passed around.
pub(crate) fn xr_serde() -> syn::Path {
    xr_macro_utils::Manifest::resolve("xr_serde")
}

#[inline(always)]
pub(crate) fn macro_exports_(xr_serde_path: &syn::Path) -> TokenStream {
    quote! {
        #xr_serde_path::__macro_exports
    }
}

#[cfg(feature = "auto_register")]
#[inline(always)]
pub(crate) fn auto_register_(xr_serde_path: &syn::Path) -> TokenStream {
    quote! {
        #xr_serde_path::__macro_exports::auto_register
    }
}

#[inline(always)]
pub(crate) fn impl_object_value_(xr_serde_path: &syn::Path) -> TokenStream {
    quote! {
        #xr_serde_path::impl_object_value
    }
}
