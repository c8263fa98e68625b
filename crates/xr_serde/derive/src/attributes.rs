//! Parsing of `#[xr(...)]` attributes.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, LitBool, LitStr, Token};

use crate::XR_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// KwargsLevel

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum KwargsLevel {
    Root,
    Safe,
    #[default]
    Auto,
}

impl KwargsLevel {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "root" => Ok(Self::Root),
            "safe" => Ok(Self::Safe),
            "auto" => Ok(Self::Auto),
            _ => Err(syn::Error::new(
                lit.span(),
                "expected `\"root\"`, `\"safe\"` or `\"auto\"`",
            )),
        }
    }

    pub fn to_tokens(self, exports: &TokenStream) -> TokenStream {
        match self {
            Self::Root => quote! { #exports::KwargsLevel::Root },
            Self::Safe => quote! { #exports::KwargsLevel::Safe },
            Self::Auto => quote! { #exports::KwargsLevel::Auto },
        }
    }
}

// -----------------------------------------------------------------------------
// Type attributes

/// Container attributes of `Serializable`, `NamedEnum` and `callable`.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub signature: Option<LitStr>,
    pub aliases: Vec<LitStr>,
    pub inheritable: bool,
    /// Default is `true`, use `#[xr(explicit_defaults = false)]` to skip
    /// arguments equal to their default.
    pub explicit_defaults: Option<bool>,
    pub kwargs_level: KwargsLevel,
    pub auto_register: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if attr.path().is_ident(XR_ATTRIBUTE_NAME) {
                attr.parse_nested_meta(|meta| this.parse_meta(meta))?;
            }
        }
        Ok(this)
    }

    /// Parses one item of the attribute list, shared with `#[callable(...)]`.
    pub fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("signature") {
            self.signature = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("alias") {
            self.aliases.push(meta.value()?.parse()?);
        } else if meta.path.is_ident("inheritable") {
            self.inheritable = true;
        } else if meta.path.is_ident("explicit_defaults") {
            let lit: LitBool = meta.value()?.parse()?;
            self.explicit_defaults = Some(lit.value);
        } else if meta.path.is_ident("kwargs_level") {
            let lit: LitStr = meta.value()?.parse()?;
            self.kwargs_level = KwargsLevel::parse(&lit)?;
        } else if meta.path.is_ident("auto_register") {
            self.auto_register = Some(meta.path.span());
        } else {
            return Err(meta.error("unknown `xr` attribute"));
        }
        Ok(())
    }

    pub fn options_tokens(&self, exports: &TokenStream) -> TokenStream {
        let explicit_defaults = self.explicit_defaults.unwrap_or(true);
        let kwargs_level = self.kwargs_level.to_tokens(exports);
        quote! {
            #exports::DecorateOptions {
                explicit_defaults: #explicit_defaults,
                kwargs_level: #kwargs_level,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Field attributes

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum FieldKind {
    #[default]
    Positional,
    KeywordOnly,
    VarArgs,
    VarKwargs,
}

/// Attributes of a struct field or function parameter.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub kind: FieldKind,
    /// `Some(None)` for a bare `default`, which uses `Default::default()`.
    pub default: Option<Option<Expr>>,
    pub rename: Option<LitStr>,
    /// Enum variants only accept `rename`.
    span: Option<Span>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if attr.path().is_ident(XR_ATTRIBUTE_NAME) {
                this.span = Some(attr.span());
                attr.parse_nested_meta(|meta| this.parse_meta(meta))?;
            }
        }
        this.validity()?;
        Ok(this)
    }

    fn set_kind(&mut self, kind: FieldKind, meta: &ParseNestedMeta) -> syn::Result<()> {
        if self.kind != FieldKind::Positional {
            return Err(meta.error("a parameter has at most one of `keyword_only`, `var_args`, `var_kwargs`"));
        }
        self.kind = kind;
        Ok(())
    }

    fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("default") {
            self.default = Some(if meta.input.peek(Token![=]) {
                Some(meta.value()?.parse()?)
            } else {
                None
            });
        } else if meta.path.is_ident("keyword_only") {
            self.set_kind(FieldKind::KeywordOnly, &meta)?;
        } else if meta.path.is_ident("var_args") {
            self.set_kind(FieldKind::VarArgs, &meta)?;
        } else if meta.path.is_ident("var_kwargs") {
            self.set_kind(FieldKind::VarKwargs, &meta)?;
        } else if meta.path.is_ident("rename") {
            self.rename = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("unknown `xr` attribute"));
        }
        Ok(())
    }

    fn validity(&self) -> syn::Result<()> {
        if self.default.is_some() && matches!(self.kind, FieldKind::VarArgs | FieldKind::VarKwargs) {
            let span = self.span.unwrap_or_else(Span::call_site);
            return Err(syn::Error::new(span, "variadic parameters cannot have a default"));
        }
        Ok(())
    }

    /// Only `rename` is meaningful here.
    pub fn check_variant(&self) -> syn::Result<()> {
        if self.default.is_some() || self.kind != FieldKind::Positional {
            let span = self.span.unwrap_or_else(Span::call_site);
            return Err(syn::Error::new(span, "enum variants only accept `rename`"));
        }
        Ok(())
    }
}

/// Removes `#[xr(...)]` attributes, which are not valid on function parameters.
pub(crate) fn strip_xr_attrs(attrs: &mut Vec<Attribute>) {
    attrs.retain(|attr| !attr.path().is_ident(XR_ATTRIBUTE_NAME));
}
