use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields};

use super::auto_register::get_auto_register_impl;
use super::params::{self, ParamSpec};
use crate::attributes::{FieldAttributes, TypeAttributes};
use crate::{path, utils};

pub(crate) fn impl_serializable(ast: &DeriveInput) -> syn::Result<TokenStream> {
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "`Serializable` cannot be derived for generic types",
        ));
    }

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &ast.ident,
                    "`Serializable` requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &ast.ident,
                "`Serializable` can only be derived for structs",
            ));
        }
    };

    let type_attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    let mut specs = Vec::with_capacity(fields.len());
    for field in fields {
        specs.push(ParamSpec {
            // Named fields always carry an ident.
            ident: field.ident.clone().ok_or_else(|| {
                syn::Error::new_spanned(field, "`Serializable` requires named fields")
            })?,
            ty: field.ty.clone(),
            attrs: FieldAttributes::parse_attrs(&field.attrs)?,
        });
    }
    params::validate(&specs)?;

    let xr_serde_path = path::xr_serde();
    let exports = path::macro_exports_(&xr_serde_path);
    let impl_object_value = path::impl_object_value_(&xr_serde_path);
    let ident = &ast.ident;

    let default_fns = params::default_fns(&specs, &exports);
    let param_list = params::param_list(&specs, &exports);
    let options = type_attrs.options_tokens(&exports);

    let signature = utils::option_str(type_attrs.signature.as_ref());
    let aliases = &type_attrs.aliases;
    let inheritable = type_attrs.inheritable;

    let bound = format_ident!("__xr_bound");
    let inserts = specs.iter().map(|spec| {
        let field = &spec.ident;
        let name = spec.name();
        quote! {
            #bound.insert(
                ::core::convert::Into::into(#name),
                #exports::IntoValue::into_value(::core::clone::Clone::clone(&self.#field)),
            );
        }
    });
    let take_args = params::take_args(&specs, &exports, &bound);
    let field_idents = specs.iter().map(|spec| &spec.ident);
    let capacity = specs.len();

    let auto_register = get_auto_register_impl(
        type_attrs.auto_register,
        &xr_serde_path,
        quote! { #exports::TypeSerializer::of::<#ident> },
    );

    Ok(quote! {
        const _: () = {
            #default_fns

            const __XR_PARAMS: &[#exports::Param] = #param_list;
            const __XR_OPTIONS: #exports::DecorateOptions = #options;

            impl #exports::Serializable for #ident {
                const SIGNATURE: ::core::option::Option<&'static str> = #signature;
                const ALIASES: &'static [&'static str] = &[#(#aliases),*];
                const INHERITABLE: bool = #inheritable;

                #[allow(unused_mut)]
                fn to_fields(&self) -> ::core::result::Result<#exports::Fields, #exports::BoxError> {
                    let mut #bound = #exports::BoundArgs::with_capacity(#capacity);
                    #(#inserts)*
                    ::core::result::Result::Ok(
                        #exports::encode_bound(__XR_PARAMS, &__XR_OPTIONS, #bound)?
                    )
                }

                #[allow(unused_mut)]
                fn from_fields(fields: #exports::Fields) -> ::core::result::Result<Self, #exports::BoxError> {
                    let mut #bound = #exports::bind_fields(__XR_PARAMS, &__XR_OPTIONS, fields)?;
                    #take_args
                    ::core::result::Result::Ok(Self { #(#field_idents),* })
                }
            }

            #impl_object_value!(#ident);

            #auto_register
        };
    })
}
