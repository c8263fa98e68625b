use proc_macro2::TokenStream;

#[inline(always)]
pub(crate) fn empty() -> TokenStream {
    TokenStream::new()
}

/// `Some("lit")` or `None`.
pub(crate) fn option_str(value: Option<&syn::LitStr>) -> TokenStream {
    match value {
        Some(lit) => quote::quote! { ::core::option::Option::Some(#lit) },
        None => quote::quote! { ::core::option::Option::None },
    }
}
