use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use super::auto_register::get_auto_register_impl;
use crate::attributes::{FieldAttributes, TypeAttributes};
use crate::{path, utils};

pub(crate) fn impl_named_enum(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &ast.data else {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "`NamedEnum` can only be derived for enums",
        ));
    };
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "`NamedEnum` cannot be derived for generic types",
        ));
    }

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "`NamedEnum` requires at least one variant",
        ));
    }

    let type_attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    if !type_attrs.aliases.is_empty() || type_attrs.inheritable {
        return Err(syn::Error::new_spanned(
            &ast.ident,
            "`NamedEnum` only accepts `signature` and `auto_register`",
        ));
    }

    let mut variants = Vec::with_capacity(data.variants.len());
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "`NamedEnum` variants cannot carry data",
            ));
        }
        let attrs = FieldAttributes::parse_attrs(&variant.attrs)?;
        attrs.check_variant()?;
        let name = match attrs.rename {
            Some(lit) => lit.value(),
            None => variant.ident.to_string(),
        };
        if names.contains(&name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("duplicate variant name `{name}`"),
            ));
        }
        variants.push(&variant.ident);
        names.push(name);
    }

    let xr_serde_path = path::xr_serde();
    let exports = path::macro_exports_(&xr_serde_path);
    let impl_object_value = path::impl_object_value_(&xr_serde_path);
    let ident = &ast.ident;
    let signature = utils::option_str(type_attrs.signature.as_ref());

    let auto_register = get_auto_register_impl(
        type_attrs.auto_register,
        &xr_serde_path,
        quote! { #exports::TypeSerializer::named_enum::<#ident> },
    );

    Ok(quote! {
        const _: () = {
            impl #exports::NamedEnum for #ident {
                const SIGNATURE: ::core::option::Option<&'static str> = #signature;

                fn variant_name(&self) -> &'static str {
                    match self {
                        #(Self::#variants => #names,)*
                    }
                }

                fn from_variant_name(name: &str) -> ::core::option::Option<Self> {
                    match name {
                        #(#names => ::core::option::Option::Some(Self::#variants),)*
                        _ => ::core::option::Option::None,
                    }
                }
            }

            #impl_object_value!(#ident);

            #auto_register
        };
    })
}
