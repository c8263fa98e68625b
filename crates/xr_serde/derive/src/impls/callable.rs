use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemFn, Pat};

use super::auto_register::get_auto_register_impl;
use super::params::{self, ParamSpec};
use crate::attributes::{FieldAttributes, TypeAttributes, strip_xr_attrs};
use crate::path;

pub(crate) fn impl_callable(attrs: &TypeAttributes, mut item: ItemFn) -> syn::Result<TokenStream> {
    if !attrs.aliases.is_empty() || attrs.inheritable {
        return Err(syn::Error::new_spanned(
            &item.sig.ident,
            "`callable` does not accept `alias` or `inheritable`",
        ));
    }
    let sig = &item.sig;
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "`callable` functions cannot be generic",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "`callable` functions cannot be async"));
    }

    let mut specs = Vec::with_capacity(item.sig.inputs.len());
    for input in &mut item.sig.inputs {
        let FnArg::Typed(arg) = input else {
            return Err(syn::Error::new_spanned(input, "`callable` functions cannot take `self`"));
        };
        let Pat::Ident(pat) = &*arg.pat else {
            return Err(syn::Error::new_spanned(
                &arg.pat,
                "`callable` parameters must be plain identifiers",
            ));
        };
        specs.push(ParamSpec {
            ident: pat.ident.clone(),
            ty: (*arg.ty).clone(),
            attrs: FieldAttributes::parse_attrs(&arg.attrs)?,
        });
        strip_xr_attrs(&mut arg.attrs);
    }
    params::validate(&specs)?;

    let xr_serde_path = path::xr_serde();
    let exports = path::macro_exports_(&xr_serde_path);

    let vis = &item.vis;
    let fn_ident = &item.sig.ident;
    let serializer_ident = format_ident!("{}_serializer", fn_ident);
    let signature = match &attrs.signature {
        Some(lit) => quote! { #lit },
        None => {
            let name = fn_ident.to_string();
            quote! { ::core::concat!(::core::module_path!(), "::", #name) }
        }
    };

    let default_fns = params::default_fns(&specs, &exports);
    let param_list = params::param_list(&specs, &exports);
    let options = attrs.options_tokens(&exports);
    let bound = format_ident!("__xr_bound");
    let take_args = params::take_args(&specs, &exports, &bound);
    let args = specs.iter().map(|spec| &spec.ident);

    let auto_register = get_auto_register_impl(
        attrs.auto_register,
        &xr_serde_path,
        quote! { #serializer_ident },
    );
    let doc = format!("Decode-only plugin that calls [`{fn_ident}`].");

    Ok(quote! {
        #item

        #[doc = #doc]
        #vis fn #serializer_ident() -> #exports::TypeSerializer {
            #default_fns

            const PARAMS: &[#exports::Param] = #param_list;

            #exports::callable(
                #signature,
                PARAMS,
                #options,
                |#bound: #exports::BoundArgs|
                    -> ::core::result::Result<#exports::Value, #exports::BoxError>
                {
                    #[allow(unused_mut)]
                    let mut #bound = #bound;
                    #take_args
                    ::core::result::Result::Ok(#exports::IntoValue::into_value(#fn_ident(#(#args),*)))
                },
            )
        }

        const _: () = {
            #auto_register
        };
    })
}
