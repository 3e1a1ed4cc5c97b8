//! Procedural macros for autofactory.
//!
//! `#[typed_factory]` turns a factory trait into a trait plus an
//! implementation struct that forwards every call to an interceptor.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    FnArg, GenericArgument, Ident, ItemTrait, Pat, PatIdent, PathArguments, ReturnType, Signature,
    TraitItem, Type, parse_macro_input,
};

#[derive(Debug, Default, FromMeta)]
struct TypedFactoryArgs {
    /// Name of the generated implementation struct.
    #[darling(default)]
    name: Option<String>,
}

/// Generates the implementation of a typed factory trait.
///
/// For `trait WidgetFactory` this emits `WidgetFactoryImpl` (or the type
/// named by `#[typed_factory(name = "...")]`), which implements the trait,
/// `InterceptedFactory`, and `From<WidgetFactoryImpl> for Arc<dyn WidgetFactory>`.
///
/// Every required method must take `&self` and return `Result<R, E>` where
/// `E: From<AutoFactoryError>`. Methods returning `Arc<dyn _>` or
/// `Box<dyn _>` are dispatched as interface returns; everything else is
/// dispatched as a plain value and left to the rest of the pipeline.
/// Methods with a default body are not touched.
///
/// Arguments must be `Clone + Send + Sync + 'static`; they are matched to
/// constructor parameters by type.
#[proc_macro_attribute]
pub fn typed_factory(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(args) => args,
        Err(err) => return TokenStream::from(darling::Error::from(err).write_errors()),
    };
    let args = match TypedFactoryArgs::from_list(&attr_args) {
        Ok(args) => args,
        Err(err) => return TokenStream::from(err.write_errors()),
    };
    let item = parse_macro_input!(item as ItemTrait);

    match expand(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: TypedFactoryArgs, item: ItemTrait) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "typed factories cannot be generic",
        ));
    }

    let trait_ident = &item.ident;
    let vis = &item.vis;
    let impl_ident = match &args.name {
        Some(name) => syn::parse_str::<Ident>(name).map_err(|_| {
            syn::Error::new(Span::call_site(), format!("`{name}` is not a valid type name"))
        })?,
        None => format_ident!("{}Impl", trait_ident),
    };

    let methods = item
        .items
        .iter()
        .filter_map(|trait_item| match trait_item {
            TraitItem::Fn(method) if method.default.is_none() => Some(&method.sig),
            _ => None,
        })
        .map(expand_method)
        .collect::<syn::Result<Vec<_>>>()?;

    let doc = format!("Interception-backed implementation of [`{trait_ident}`].");

    Ok(quote! {
        #item

        #[doc = #doc]
        #vis struct #impl_ident {
            interceptor: ::autofactory::interception::Interceptor,
        }

        impl ::autofactory::interception::InterceptedFactory for #impl_ident {
            fn from_interceptor(interceptor: ::autofactory::interception::Interceptor) -> Self {
                Self { interceptor }
            }
        }

        impl #trait_ident for #impl_ident {
            #(#methods)*
        }

        impl ::core::convert::From<#impl_ident> for ::std::sync::Arc<dyn #trait_ident> {
            fn from(factory: #impl_ident) -> Self {
                ::std::sync::Arc::new(factory)
            }
        }
    })
}

fn expand_method(sig: &Signature) -> syn::Result<TokenStream2> {
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(sig.span(), "typed factory methods cannot be async"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "typed factory methods cannot be generic",
        ));
    }

    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "typed factory methods must take `&self`",
            ));
        }
    }

    let produced = produced_type(&sig.output)?;
    let return_type = if is_interface(produced) {
        quote!(::autofactory::interception::ReturnType::interface::<#produced>())
    } else {
        quote!(::autofactory::interception::ReturnType::value::<#produced>())
    };

    let mut sig = sig.clone();
    let mut arguments = Vec::new();
    for (index, input) in sig.inputs.iter_mut().skip(1).enumerate() {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let ident = match typed.pat.as_ref() {
            Pat::Ident(PatIdent { ident, subpat: None, .. }) => ident.clone(),
            _ => {
                let ident = format_ident!("__argument_{}", index);
                *typed.pat = Pat::Ident(PatIdent {
                    attrs: Vec::new(),
                    by_ref: None,
                    mutability: None,
                    ident: ident.clone(),
                    subpat: None,
                });
                ident
            }
        };
        let name = ident.to_string();
        let name = name.trim_start_matches("r#").to_owned();
        arguments.push(quote!(.with_argument(#name, #ident)));
    }

    let method_name = sig.ident.to_string();

    Ok(quote! {
        #sig {
            let invocation =
                ::autofactory::interception::MethodInvocation::new(#method_name, #return_type)
                    #(#arguments)*;
            self.interceptor
                .invoke(invocation)
                .and_then(|ret| ret.into_value::<#produced>())
                .map_err(::core::convert::Into::into)
        }
    })
}

/// The `R` of a `Result<R, ..>` return type.
fn produced_type(output: &ReturnType) -> syn::Result<&Type> {
    let ReturnType::Type(_, ty) = output else {
        return Err(syn::Error::new(
            output.span(),
            "typed factory methods must return `Result<_>`",
        ));
    };

    let produced = match ty.as_ref() {
        Type::Path(path) => path.path.segments.last().and_then(|segment| {
            if segment.ident != "Result" {
                return None;
            }
            match &segment.arguments {
                PathArguments::AngleBracketed(generics) => match generics.args.first() {
                    Some(GenericArgument::Type(produced)) => Some(produced),
                    _ => None,
                },
                _ => None,
            }
        }),
        _ => None,
    };

    produced.ok_or_else(|| {
        syn::Error::new(ty.span(), "typed factory methods must return `Result<_>`")
    })
}

/// `Arc<dyn _>` or `Box<dyn _>`. Produced values cross threads, so `Rc`
/// never qualifies.
fn is_interface(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    if !matches!(segment.ident.to_string().as_str(), "Arc" | "Box") {
        return false;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return false;
    };
    matches!(
        generics.args.first(),
        Some(GenericArgument::Type(Type::TraitObject(_)))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn interface_detection() {
        assert!(is_interface(&parse_quote!(Arc<dyn Widget>)));
        assert!(is_interface(&parse_quote!(std::boxed::Box<dyn Widget + Send>)));
        assert!(!is_interface(&parse_quote!(Arc<Widget>)));
        assert!(!is_interface(&parse_quote!(String)));
        assert!(!is_interface(&parse_quote!(Rc<dyn Widget>)));
    }

    #[test]
    fn produced_type_is_first_result_argument() {
        let output: ReturnType = parse_quote!(-> autofactory::Result<Arc<dyn Widget>>);
        let produced = produced_type(&output).unwrap();
        assert!(is_interface(produced));

        let output: ReturnType = parse_quote!(-> Option<u8>);
        assert!(produced_type(&output).is_err());
        assert!(produced_type(&ReturnType::Default).is_err());
    }

    #[test]
    fn expands_struct_and_impls() {
        let item: ItemTrait = parse_quote! {
            pub trait WidgetFactory: Send + Sync {
                fn create(&self, name: String, size: u32) -> Result<Arc<dyn Widget>>;
                fn describe(&self) -> String { String::new() }
            }
        };
        let tokens = expand(TypedFactoryArgs::default(), item).unwrap().to_string();

        assert!(tokens.contains("pub struct WidgetFactoryImpl"));
        assert!(tokens.contains("InterceptedFactory for WidgetFactoryImpl"));
        assert!(tokens.contains("with_argument"));
        assert!(tokens.contains("\"name\""));
        assert!(tokens.contains("ReturnType :: interface"));
        assert!(!tokens.contains("\"describe\""));
    }

    #[test]
    fn custom_name() {
        let item: ItemTrait = parse_quote! {
            trait WidgetFactory: Send + Sync {
                fn create(&self) -> Result<u8>;
            }
        };
        let args = TypedFactoryArgs {
            name: Some("Widgets".into()),
        };
        let tokens = expand(args, item).unwrap().to_string();
        assert!(tokens.contains("struct Widgets"));
        assert!(tokens.contains("ReturnType :: value"));
    }

    #[test]
    fn rejects_by_value_receiver() {
        let item: ItemTrait = parse_quote! {
            trait WidgetFactory {
                fn create(self) -> Result<u8>;
            }
        };
        assert!(expand(TypedFactoryArgs::default(), item).is_err());
    }
}
