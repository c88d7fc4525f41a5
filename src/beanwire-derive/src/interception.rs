use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::visit_mut::VisitMut;
use syn::{
    Error as SynError, FnArg, GenericParam, Ident, ImplItem, ImplItemFn, ItemImpl, Pat, PatIdent,
    Path, Result as SynResult, ReturnType, Type, TypeImplTrait, TypePath,
};

use crate::attrs::{self, AttributeRemovalVisitor};
use crate::definition::{self, DefinitionWriter};
use crate::diagnostics::{Diagnostics, MethodDefect, ValidationError};
use crate::resolver;

const MARKER: &str = "transactional";

/// A trait implementation whose marked methods run inside transactions.
struct Interception {
    base: TypePath,
    base_name: Ident,
    trait_path: Path,
}

pub fn expand_transactional(attr: TokenStream2, item: TokenStream2) -> SynResult<TokenStream2> {
    attrs::ensure_no_arguments(attr, MARKER)?;
    let mut item = syn::parse2::<ItemImpl>(item).map_err(|err| {
        SynError::new(
            err.span(),
            "`#[transactional]` should be annotated on a trait implementation",
        )
    })?;

    let mut diagnostics = Diagnostics::new();
    let interception = inspect(&item, &mut diagnostics);
    diagnostics.finish()?;
    let interception = interception
        .ok_or_else(|| SynError::new(item.self_ty.span(), "could not intercept the type"))?;

    let expanded = interception.write(&item)?;

    AttributeRemovalVisitor::new(&[MARKER]).visit_item_impl_mut(&mut item);

    Ok(quote! {
        #item
        #expanded
    })
}

fn inspect(item: &ItemImpl, diagnostics: &mut Diagnostics) -> Option<Interception> {
    let component = item.self_ty.to_token_stream().to_string();
    let uninterceptable = |reason| ValidationError::UninterceptableType {
        span: item.self_ty.span(),
        component: component.clone(),
        reason,
    };

    let Some((None, trait_path, _)) = &item.trait_ else {
        diagnostics.report(uninterceptable(
            "only trait implementations can be intercepted, since the decorator implements the same trait",
        ));
        return None;
    };
    if !item.generics.params.is_empty() {
        diagnostics.report(uninterceptable(
            "generic implementations cannot be intercepted",
        ));
        return None;
    }
    let base = match item.self_ty.as_ref() {
        Type::Path(path) if path.qself.is_none() => path.clone(),
        _ => {
            diagnostics.report(uninterceptable(
                "the intercepted type should be a named struct or enum",
            ));
            return None;
        }
    };
    if definition::has_generic_arguments(&base) {
        diagnostics.report(uninterceptable(
            "the decorator is named after the intercepted type, which should not take generic arguments",
        ));
        return None;
    }

    let mut marked = 0;
    let mut valid = true;
    for method in methods(item) {
        let is_marked = attrs::has_attribute(&method.attrs, MARKER);
        for defect in defects(method, is_marked) {
            diagnostics.report(ValidationError::UninterceptableMethod {
                span: method.sig.ident.span(),
                method: method.sig.ident.to_string(),
                defect,
            });
            valid = false;
        }
        if is_marked {
            marked += 1;
        }
    }
    if marked == 0 {
        diagnostics.report(uninterceptable(
            "no method is marked with `#[transactional]`",
        ));
        return None;
    }

    let base_name = definition::last_ident(&base)?;
    valid.then(|| Interception {
        base,
        base_name,
        trait_path: trait_path.clone(),
    })
}

fn methods(item: &ItemImpl) -> impl Iterator<Item = &ImplItemFn> {
    item.items.iter().filter_map(|item| match item {
        ImplItem::Fn(item_fn) => Some(item_fn),
        _ => None,
    })
}

/// Why `method` cannot be forwarded by the decorator. Unmarked methods only
/// need a receiver the decorator can lend out of its shared delegate.
fn defects(method: &ImplItemFn, is_marked: bool) -> Vec<MethodDefect> {
    let mut defects = Vec::new();
    match method.sig.receiver() {
        None if is_marked => defects.push(MethodDefect::Static),
        None => {}
        Some(receiver) => match receiver.ty.as_ref() {
            Type::Reference(reference) if reference.mutability.is_none() => {}
            Type::Reference(_) => defects.push(MethodDefect::MutableReceiver),
            _ => defects.push(MethodDefect::ByValueReceiver),
        },
    }
    if is_marked && method.sig.asyncness.is_some() {
        defects.push(MethodDefect::Async);
    }
    defects
}

impl Interception {
    fn decorator(&self) -> Ident {
        format_ident!("{}Intercepted", self.base_name)
    }

    fn write(&self, item: &ItemImpl) -> SynResult<TokenStream2> {
        let base = &self.base;
        let decorator = self.decorator();
        let trait_path = &self.trait_path;
        let unsafety = &item.unsafety;

        let mut ctor: ItemImpl = syn::parse_quote! {
            impl #decorator {
                #[inject]
                fn new(
                    transaction_manager: ::std::sync::Arc<dyn ::beanwire::transaction::TransactionManager>,
                    delegate: ::std::sync::Arc<#base>,
                ) -> Self {
                    Self {
                        transaction_manager,
                        delegate,
                    }
                }
            }
        };
        let mut diagnostics = Diagnostics::new();
        let dependency = resolver::resolve(&ctor, &mut diagnostics);
        diagnostics.finish()?;
        let dependency = dependency
            .ok_or_else(|| SynError::new(item.self_ty.span(), "could not build the decorator"))?;

        let roles: [Type; 1] = [syn::parse_quote!(dyn #trait_path)];
        let base_type = Type::Path(base.clone());
        let component = DefinitionWriter::new(&dependency)
            .roles(&roles)
            .intercepting(&base_type)
            .write();
        AttributeRemovalVisitor::new(&["inject"]).visit_item_impl_mut(&mut ctor);

        let forwarded = item
            .items
            .iter()
            .map(|impl_item| match impl_item {
                ImplItem::Fn(method) => self.write_method(method),
                ImplItem::Type(ty) => {
                    let mut ty = ty.clone();
                    AttributeRemovalVisitor::new(&[MARKER]).visit_impl_item_type_mut(&mut ty);
                    ty.into_token_stream()
                }
                ImplItem::Const(constant) => {
                    let ident = &constant.ident;
                    let ty = &constant.ty;
                    quote! { const #ident: #ty = <#base as #trait_path>::#ident; }
                }
                other => other.to_token_stream(),
            })
            .collect::<TokenStream2>();

        Ok(quote! {
            /// Runs the transactional methods of the wrapped bean inside
            /// transactions and forwards every other call to it.
            pub struct #decorator {
                transaction_manager: ::std::sync::Arc<dyn ::beanwire::transaction::TransactionManager>,
                delegate: ::std::sync::Arc<#base>,
            }

            #ctor
            #component

            impl ::beanwire::component::Intercepted for #decorator {
                fn intercepted_type(&self) -> ::beanwire::key::TypeKey {
                    ::beanwire::key::TypeKey::of::<#base>()
                }
            }

            #unsafety impl #trait_path for #decorator {
                #forwarded
            }
        })
    }

    fn write_method(&self, method: &ImplItemFn) -> TokenStream2 {
        let base = &self.base;
        let trait_path = &self.trait_path;
        let is_marked = attrs::has_attribute(&method.attrs, MARKER);

        let mut sig = method.sig.clone();
        let mut args = Vec::new();
        let mut finder = ImplTraitFinder::default();
        for (i, input) in sig.inputs.iter_mut().enumerate() {
            match input {
                FnArg::Receiver(receiver) => receiver.attrs.clear(),
                FnArg::Typed(arg) => {
                    let ident = format_ident!("__arg{}", i);
                    arg.attrs.clear();
                    *arg.pat = Pat::Ident(PatIdent {
                        attrs: Vec::new(),
                        by_ref: None,
                        mutability: None,
                        ident: ident.clone(),
                        subpat: None,
                    });
                    finder.visit_type(&arg.ty);
                    args.push(ident);
                }
            }
        }

        let name = &sig.ident;
        let generic_args: Vec<&Ident> = sig
            .generics
            .params
            .iter()
            .filter_map(|param| match param {
                GenericParam::Type(ty) => Some(&ty.ident),
                GenericParam::Const(constant) => Some(&constant.ident),
                GenericParam::Lifetime(_) => None,
            })
            .collect();
        let turbofish = (!generic_args.is_empty() && !finder.found)
            .then(|| quote! { ::<#(#generic_args),*> });

        let call = if sig.receiver().is_some() {
            quote! { <#base as #trait_path>::#name #turbofish(&*self.delegate, #(#args),*) }
        } else {
            quote! { <#base as #trait_path>::#name #turbofish(#(#args),*) }
        };

        let body = if is_marked {
            let label = format!("{}::{}", self.base_name, name);
            if returns_result(&sig.output) {
                quote! {
                    ::beanwire::transaction::intercept_fallible(
                        &*self.transaction_manager,
                        #label,
                        move || #call,
                    )
                }
            } else {
                quote! {
                    ::beanwire::transaction::intercept(
                        &*self.transaction_manager,
                        #label,
                        move || #call,
                    )
                }
            }
        } else if sig.asyncness.is_some() {
            quote! { #call.await }
        } else {
            call
        };

        let attrs = method
            .attrs
            .iter()
            .filter(|attr| !attr.path().is_ident(MARKER));
        quote! {
            #(#attrs)*
            #sig {
                #body
            }
        }
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => match ty.as_ref() {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Result"),
            _ => false,
        },
        ReturnType::Default => false,
    }
}

/// Arguments of `impl Trait` type forbid explicit generic arguments.
#[derive(Default)]
struct ImplTraitFinder {
    found: bool,
}

impl<'ast> Visit<'ast> for ImplTraitFinder {
    fn visit_type_impl_trait(&mut self, node: &'ast TypeImplTrait) {
        self.found = true;
        visit::visit_type_impl_trait(self, node);
    }
}
