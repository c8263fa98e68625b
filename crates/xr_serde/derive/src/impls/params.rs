use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::Type;
use syn::ext::IdentExt;
use syn::spanned::Spanned;

use crate::attributes::{FieldAttributes, FieldKind};

/// One constructor parameter, from a struct field or a function argument.
pub(crate) struct ParamSpec {
    pub ident: Ident,
    pub ty: Type,
    pub attrs: FieldAttributes,
}

impl ParamSpec {
    /// The name in the serialized form.
    pub fn name(&self) -> String {
        match &self.attrs.rename {
            Some(lit) => lit.value(),
            None => self.ident.unraw().to_string(),
        }
    }

    fn default_fn_ident(&self) -> Ident {
        format_ident!("__xr_default_{}", self.ident.unraw())
    }
}

/// At most one variadic parameter of each kind, and unique names.
pub(crate) fn validate(params: &[ParamSpec]) -> syn::Result<()> {
    let mut names = Vec::with_capacity(params.len());
    let mut var_args = false;
    let mut var_kwargs = false;
    for param in params {
        let seen = match param.attrs.kind {
            FieldKind::VarArgs => Some(&mut var_args),
            FieldKind::VarKwargs => Some(&mut var_kwargs),
            _ => None,
        };
        if let Some(seen) = seen {
            if *seen {
                return Err(syn::Error::new(
                    param.ident.span(),
                    "only one `var_args` and one `var_kwargs` parameter are allowed",
                ));
            }
            *seen = true;
        }
        let name = param.name();
        if names.contains(&name) {
            return Err(syn::Error::new(
                param.ident.span(),
                format!("duplicate parameter name `{name}`"),
            ));
        }
        names.push(name);
    }
    Ok(())
}

/// Default value functions, one per defaulted parameter.
pub(crate) fn default_fns(params: &[ParamSpec], exports: &TokenStream) -> TokenStream {
    let fns = params.iter().filter_map(|param| {
        let default = param.attrs.default.as_ref()?;
        let fn_ident = param.default_fn_ident();
        let ty = &param.ty;
        let expr = match default {
            Some(expr) => quote! { #expr },
            None => quote! { <#ty as ::core::default::Default>::default() },
        };
        Some(quote! {
            #[allow(non_snake_case)]
            fn #fn_ident() -> #exports::Value {
                let value: #ty = #expr;
                #exports::IntoValue::into_value(value)
            }
        })
    });
    quote! { #(#fns)* }
}

/// `&[Param]` literal.
pub(crate) fn param_list(params: &[ParamSpec], exports: &TokenStream) -> TokenStream {
    let items = params.iter().map(|param| {
        let name = param.name();
        let ctor = match param.attrs.kind {
            FieldKind::Positional => quote! { positional },
            FieldKind::KeywordOnly => quote! { keyword_only },
            FieldKind::VarArgs => quote! { var_args },
            FieldKind::VarKwargs => quote! { var_kwargs },
        };
        let with_default = param.attrs.default.as_ref().map(|_| {
            let fn_ident = param.default_fn_ident();
            quote! { .with_default(#fn_ident) }
        });
        quote::quote_spanned! { param.ty.span() =>
            #exports::Param::#ctor(#name) #with_default
        }
    });
    quote! { &[#(#items),*] }
}

/// `let <ident>: <ty> = take_arg(&mut bound, "<name>")?;` for each parameter.
pub(crate) fn take_args(params: &[ParamSpec], exports: &TokenStream, bound: &Ident) -> TokenStream {
    let lets = params.iter().map(|param| {
        let ident = &param.ident;
        let ty = &param.ty;
        let name = param.name();
        quote! {
            let #ident: #ty = #exports::take_arg(&mut #bound, #name)?;
        }
    });
    quote! { #(#lets)* }
}
