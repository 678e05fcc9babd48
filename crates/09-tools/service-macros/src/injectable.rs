//! Injectable 派生宏实现

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Meta, Result, Type};

/// 上下文配置字段
struct ContextField {
    ident: Ident,
    ty: Type,
    key: LitStr,
}

/// 服务引用字段
struct ReferenceField {
    ident: Ident,
    ty: Type,
    qualifier: Option<LitStr>,
}

impl ReferenceField {
    fn description(&self) -> TokenStream {
        let ty = &self.ty;
        match &self.qualifier {
            Some(qualifier) => quote! { <#ty>::describe().qualified(#qualifier) },
            None => quote! { <#ty>::describe() },
        }
    }
}

/// 结构体级别参数
#[derive(Default)]
struct InjectableArgs {
    default_lifecycle: bool,
}

fn parse_struct_args(input: &DeriveInput) -> Result<InjectableArgs> {
    let mut args = InjectableArgs::default();
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default_lifecycle") {
                args.default_lifecycle = true;
                Ok(())
            } else {
                Err(meta.error("未知的 injectable 参数"))
            }
        })?;
    }
    Ok(args)
}

fn parse_reference_qualifier(attr: &syn::Attribute) -> Result<Option<LitStr>> {
    if let Meta::Path(_) = attr.meta {
        return Ok(None);
    }

    let mut qualifier = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("qualifier") {
            qualifier = Some(meta.value()?.parse::<LitStr>()?);
            Ok(())
        } else {
            Err(meta.error("未知的 reference 参数"))
        }
    })?;
    Ok(qualifier)
}

fn parse_context_key(attr: &syn::Attribute, ident: &Ident) -> Result<LitStr> {
    match &attr.meta {
        Meta::Path(_) => Ok(LitStr::new(&ident.to_string(), ident.span())),
        _ => attr.parse_args::<LitStr>(),
    }
}

/// 实现 #[derive(Injectable)]
pub fn derive_injectable_impl(input: DeriveInput) -> Result<TokenStream> {
    let args = parse_struct_args(&input)?;

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => Some(named),
            Fields::Unit => None,
            Fields::Unnamed(_) => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "Injectable 只支持具名字段结构体",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "Injectable 只能用于结构体",
            ))
        }
    };

    let mut contexts: Vec<ContextField> = Vec::new();
    let mut references: Vec<ReferenceField> = Vec::new();

    for field in named.iter().flat_map(|named| named.named.iter()) {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut injected = false;

        for attr in &field.attrs {
            if attr.path().is_ident("reference") || attr.path().is_ident("context") {
                if injected {
                    return Err(Error::new_spanned(attr, "一个字段只能声明一个注入属性"));
                }
                injected = true;
            }

            if attr.path().is_ident("reference") {
                references.push(ReferenceField {
                    ident: ident.clone(),
                    ty: field.ty.clone(),
                    qualifier: parse_reference_qualifier(attr)?,
                });
            } else if attr.path().is_ident("context") {
                let key = parse_context_key(attr, &ident)?;
                if contexts.iter().any(|c| c.key.value() == key.value()) {
                    return Err(Error::new_spanned(&key, "重复的上下文配置键"));
                }
                contexts.push(ContextField {
                    ident: ident.clone(),
                    ty: field.ty.clone(),
                    key,
                });
            }
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let context_keys = contexts.iter().map(|c| &c.key);
    let reference_descriptions: Vec<TokenStream> =
        references.iter().map(ReferenceField::description).collect();

    let inject_context = if contexts.is_empty() {
        quote! {}
    } else {
        let arms = contexts.iter().map(|c| {
            let ContextField { ident, ty, key } = c;
            quote! {
                #key => {
                    self.#ident = <#ty as ::core::str::FromStr>::from_str(&value).map_err(|e| {
                        ::di_abstractions::infrastructure_common::InjectionError::InvalidContextValue {
                            key: key.to_string(),
                            value: value.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    Ok(())
                }
            }
        });
        quote! {
            fn inject_context(
                &mut self,
                key: &str,
                value: ::std::string::String,
            ) -> ::di_abstractions::infrastructure_common::InjectionResult<()> {
                match key {
                    #(#arms)*
                    _ => Err(::di_abstractions::infrastructure_common::InjectionError::UnknownContextKey {
                        key: key.to_string(),
                    }),
                }
            }
        }
    };

    let inject_reference = if references.is_empty() {
        quote! {}
    } else {
        let checks = references
            .iter()
            .zip(reference_descriptions.iter())
            .map(|(r, description)| {
                let ident = &r.ident;
                quote! {
                    if *service == #description {
                        return self.#ident.inject(service, instance);
                    }
                }
            });
        quote! {
            fn inject_reference(
                &mut self,
                service: &::di_abstractions::infrastructure_common::ServiceDescription,
                instance: &::di_abstractions::ServiceInstance,
            ) -> ::di_abstractions::infrastructure_common::InjectionResult<()> {
                #(#checks)*
                Err(::di_abstractions::infrastructure_common::InjectionError::UnknownReference {
                    service: service.clone(),
                })
            }
        }
    };

    let lifecycle = if args.default_lifecycle {
        quote! {
            impl #impl_generics ::di_abstractions::infrastructure_common::ServiceLifecycle
                for #name #ty_generics #where_clause {}
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::di_abstractions::Injectable for #name #ty_generics #where_clause {
            fn dependencies() -> ::di_abstractions::ServiceDependencies {
                ::di_abstractions::ServiceDependencies::new()
                    #( .with_context(#context_keys) )*
                    #( .with_reference(#reference_descriptions) )*
            }

            #inject_context

            #inject_reference
        }

        #lifecycle
    })
}
