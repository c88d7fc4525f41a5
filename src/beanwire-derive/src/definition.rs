use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::visit_mut::VisitMut;
use syn::{Error as SynError, Ident, Item, Result as SynResult, Type};

use crate::attrs::AttributeRemovalVisitor;
use crate::diagnostics::{Diagnostics, ValidationError};
use crate::resolver::{self, Construction, Dependency, DependencyRef};

pub fn expand_component(item: Item, roles: Vec<Type>) -> SynResult<TokenStream2> {
    let mut item = match item {
        Item::Impl(item) => item,
        Item::Trait(item) => {
            return Err(ValidationError::InvalidShape {
                span: item.ident.span(),
                reason: "a trait cannot be a component, annotate the `impl` block of a concrete type instead".into(),
            }
            .into())
        }
        other => {
            return Err(ValidationError::InvalidShape {
                span: other.span(),
                reason: "`#[component]` should be annotated on the `impl` block".into(),
            }
            .into())
        }
    };

    let mut diagnostics = Diagnostics::new();
    let dependency = resolver::resolve(&item, &mut diagnostics);
    diagnostics.finish()?;
    let dependency = dependency
        .ok_or_else(|| SynError::new(item.self_ty.span(), "could not resolve the component"))?;

    let expanded = DefinitionWriter::new(&dependency).roles(&roles).write();

    AttributeRemovalVisitor::new(&["inject"]).visit_item_impl_mut(&mut item);

    Ok(quote! {
        #item
        #expanded
    })
}

/// Emits the `Component` implementation of a resolved type together with its
/// registration in the component slice.
pub struct DefinitionWriter<'a> {
    dependency: &'a Dependency,
    roles: &'a [Type],
    intercepted: Option<&'a Type>,
}

impl<'a> DefinitionWriter<'a> {
    pub fn new(dependency: &'a Dependency) -> Self {
        Self {
            dependency,
            roles: &[],
            intercepted: None,
        }
    }

    pub fn roles(mut self, roles: &'a [Type]) -> Self {
        self.roles = roles;
        self
    }

    /// Marks the component as a decorator of `base`. Its dependency on the
    /// base is then looked up exactly, bypassing the decorator itself.
    pub fn intercepting(mut self, base: &'a Type) -> Self {
        self.intercepted = Some(base);
        self
    }

    pub fn write(&self) -> TokenStream2 {
        let component = self.write_component();
        let registration = self.write_registration();
        quote! {
            #component
            #registration
        }
    }

    fn write_component(&self) -> TokenStream2 {
        let self_type = &self.dependency.self_type;
        let constructor = &self.dependency.constructor;

        let error_type = match &self.dependency.construction {
            Construction::Infallible => quote! { ::std::convert::Infallible },
            Construction::Fallible { error_type } => error_type.to_token_stream(),
        };

        let lookups = self
            .dependency
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| self.write_lookup(i, param))
            .collect::<TokenStream2>();
        let unused = self
            .dependency
            .params
            .is_empty()
            .then(|| quote! { let _ = provider; });

        let dep_args = self
            .dependency
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let dep = dependency_ident(i, param);
                quote! { #dep, }
            })
            .collect::<TokenStream2>();

        let wire_deps = match &self.dependency.construction {
            Construction::Infallible => quote! { Ok(Ok(<#self_type>::#constructor(#dep_args))) },
            Construction::Fallible { .. } => quote! { Ok(<#self_type>::#constructor(#dep_args)) },
        };

        let views = self
            .roles
            .iter()
            .map(|role| {
                quote! {
                    .provides::<#role>(
                        |bean: ::std::sync::Arc<Self>| -> ::std::sync::Arc<#role> { bean }
                    )
                }
            })
            .collect::<TokenStream2>();
        let intercepts = self
            .intercepted
            .map(|base| quote! { .intercepts::<#base>() });

        quote! {
            impl ::beanwire::component::Component for #self_type {
                type Error = #error_type;

                fn construct(
                    provider: &dyn ::beanwire::provider::BeanProvider,
                ) -> ::std::result::Result<
                    ::std::result::Result<Self, Self::Error>,
                    ::beanwire::provider::LookupError,
                > {
                    #unused
                    #lookups
                    #wire_deps
                }

                fn definition() -> ::beanwire::definition::BeanDefinition {
                    ::beanwire::definition::DefinitionBuilder::<Self>::new(::std::module_path!())
                        #views
                        #intercepts
                        .build()
                }
            }
        }
    }

    fn write_lookup(&self, index: usize, param: &DependencyRef) -> TokenStream2 {
        let dep = dependency_ident(index, param);
        match param {
            DependencyRef::Single { ty, .. } if self.is_intercepted(ty) => quote! {
                let #dep = ::beanwire::provider::TypedBeanProvider::provide_exact::<#ty>(provider)?;
            },
            DependencyRef::Single { ty, .. } => quote! {
                let #dep = ::beanwire::provider::TypedBeanProvider::provide::<#ty>(provider)?;
            },
            DependencyRef::Collection {
                container, element, ..
            } => quote! {
                let #dep = ::beanwire::provider::TypedBeanProvider::provide_all::<#element>(provider)?
                    .into_iter()
                    .collect::<#container<_>>();
            },
        }
    }

    fn is_intercepted(&self, ty: &Type) -> bool {
        self.intercepted.is_some_and(|base| {
            base.to_token_stream().to_string() == ty.to_token_stream().to_string()
        })
    }

    /// The entry is unnamed, so registrations of `Cache<User>` and
    /// `Cache<Order>` in one module never clash.
    fn write_registration(&self) -> TokenStream2 {
        let self_type = &self.dependency.self_type;

        quote! {
            const _: () = {
                #[::beanwire::__private::linkme::distributed_slice(::beanwire::registry::COMPONENTS)]
                #[linkme(crate = ::beanwire::__private::linkme)]
                static ENTRY: ::beanwire::registry::ComponentEntry =
                    ::beanwire::registry::ComponentEntry::new(
                        ::std::module_path!(),
                        <#self_type as ::beanwire::component::Component>::definition,
                    );
            };
        }
    }
}

fn dependency_ident(index: usize, param: &DependencyRef) -> Ident {
    Ident::new(&format!("dep{index}"), param.span())
}

/// Whether any segment of `ty` carries generic arguments, as in
/// `Cache<User>`.
pub fn has_generic_arguments(ty: &syn::TypePath) -> bool {
    ty.path
        .segments
        .iter()
        .any(|segment| !segment.arguments.is_none())
}

/// The unqualified, unraw name of the last segment of `ty`.
pub fn last_ident(ty: &syn::TypePath) -> Option<Ident> {
    ty.path
        .segments
        .last()
        .map(|segment| segment.ident.unraw())
}
