use proc_macro2::{Span, TokenStream};

/// Submits `constructor` (a `fn() -> TypeSerializer`) to the inventory.
#[cfg(feature = "auto_register")]
pub(crate) fn get_auto_register_impl(
    span: Option<Span>,
    xr_serde_path: &syn::Path,
    constructor: TokenStream,
) -> TokenStream {
    let Some(span) = span else {
        return crate::utils::empty();
    };
    let auto_register_ = crate::path::auto_register_(xr_serde_path);

    quote::quote_spanned! { span =>
        #auto_register_::inventory::submit!{
            #auto_register_::__AutoRegisterPlugin(#constructor)
        }
    }
}

#[cfg(not(feature = "auto_register"))]
pub(crate) fn get_auto_register_impl(
    _: Option<Span>,
    _: &syn::Path,
    _: TokenStream,
) -> TokenStream {
    crate::utils::empty()
}
