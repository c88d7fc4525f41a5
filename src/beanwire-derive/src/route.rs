use std::collections::HashMap;

use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit_mut::VisitMut;
use syn::{
    Attribute, Error as SynError, Expr, ExprLit, ExprPath, FnArg, Ident, ImplItem, ImplItemFn,
    ItemImpl, Lit, LitStr, MetaNameValue, Result as SynResult, ReturnType, Token, Type,
    TypePath,
};

use crate::attrs::{self, AttributeRemovalVisitor};
use crate::definition::{self, DefinitionWriter};
use crate::diagnostics::{Diagnostics, ValidationError};
use crate::resolver;

const MARKER: &str = "request_handle";

const METHODS: [(&str, &str); 8] = [
    ("GET", "Get"),
    ("POST", "Post"),
    ("PUT", "Put"),
    ("PATCH", "Patch"),
    ("DELETE", "Delete"),
    ("HEAD", "Head"),
    ("OPTIONS", "Options"),
    ("TRACE", "Trace"),
];

/// One `#[request_handle(...)]` marker.
#[derive(Debug)]
struct Route {
    method: Ident,
    path: LitStr,
    produces: TokenStream2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Unit,
    Value,
    Response,
    FallibleUnit,
    FallibleValue,
    FallibleResponse,
}

#[derive(Debug, Clone, Copy)]
struct HandlerShape {
    takes_request: bool,
    output: Output,
}

/// A generated handler binding one controller method to one route.
struct Binding {
    handler: Ident,
    target: Ident,
    route: Route,
    shape: HandlerShape,
}

pub fn expand_controller(attr: TokenStream2, item: TokenStream2) -> SynResult<TokenStream2> {
    attrs::ensure_no_arguments(attr, "controller")?;
    let mut item = syn::parse2::<ItemImpl>(item).map_err(|err| {
        SynError::new(
            err.span(),
            "`#[controller]` should be annotated on the `impl` block of a controller",
        )
    })?;

    let mut diagnostics = Diagnostics::new();
    let bindings = collect_bindings(&item, &mut diagnostics);
    diagnostics.finish()?;

    let controller = controller_type(&item)?;
    let expanded = bindings
        .iter()
        .map(|binding| write_binding(&controller, binding))
        .collect::<SynResult<TokenStream2>>()?;

    AttributeRemovalVisitor::new(&[MARKER]).visit_item_impl_mut(&mut item);

    Ok(quote! {
        #item
        #expanded
    })
}

fn controller_type(item: &ItemImpl) -> Result<TypePath, ValidationError> {
    match item.self_ty.as_ref() {
        Type::Path(path) if path.qself.is_none() => Ok(path.clone()),
        ty => Err(ValidationError::InvalidShape {
            span: ty.span(),
            reason: "a controller should be a named struct or enum".into(),
        }),
    }
}

fn collect_bindings(item: &ItemImpl, diagnostics: &mut Diagnostics) -> Vec<Binding> {
    if let Some((_, path, _)) = &item.trait_ {
        diagnostics.report(ValidationError::InvalidShape {
            span: path.span(),
            reason: "`#[controller]` should be annotated on the inherent `impl` block of a controller".into(),
        });
        return Vec::new();
    }
    if !item.generics.params.is_empty() {
        diagnostics.report(ValidationError::InvalidShape {
            span: item.generics.span(),
            reason: "a controller should be a concrete type without generic parameters".into(),
        });
        return Vec::new();
    }
    let controller = match controller_type(item) {
        Ok(controller) => controller,
        Err(err) => {
            diagnostics.report(err);
            return Vec::new();
        }
    };
    if definition::has_generic_arguments(&controller) {
        diagnostics.report(ValidationError::InvalidShape {
            span: controller.span(),
            reason: "handlers are named after the controller, which should not take generic arguments".into(),
        });
        return Vec::new();
    }
    let Some(controller_name) = definition::last_ident(&controller) else {
        return Vec::new();
    };

    let mut bindings = Vec::new();
    let mut claimed: HashMap<String, Ident> = HashMap::new();
    for method in item.items.iter().filter_map(|item| match item {
        ImplItem::Fn(item_fn) => Some(item_fn),
        _ => None,
    }) {
        let markers: Vec<&Attribute> = method
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident(MARKER))
            .collect();
        if markers.is_empty() {
            continue;
        }

        let shape = match check_signature(method) {
            Ok(shape) => shape,
            Err(err) => {
                diagnostics.report(err);
                continue;
            }
        };

        for (index, marker) in markers.iter().enumerate() {
            let handler = format_ident!(
                "{}{}{}Handler",
                controller_name,
                camel_case(&method.sig.ident),
                index + 1
            );
            let target = &method.sig.ident;
            match claimed.get(&handler.to_string()) {
                Some(owner) if owner != target => {
                    diagnostics.report(ValidationError::InvalidHandler {
                        span: target.span(),
                        method: target.to_string(),
                        reason: format!(
                            "its handler `{handler}` clashes with the one generated for `{owner}`, rename one of them"
                        ),
                    });
                    continue;
                }
                _ => {
                    claimed.insert(handler.to_string(), target.clone());
                }
            }

            match parse_route(marker, target) {
                Ok(route) => bindings.push(Binding {
                    handler,
                    target: target.clone(),
                    route,
                    shape,
                }),
                Err(err) => diagnostics.report(err),
            }
        }
    }
    bindings
}

fn check_signature(method: &ImplItemFn) -> Result<HandlerShape, ValidationError> {
    let sig = &method.sig;
    let invalid = |span, reason: &str| ValidationError::InvalidHandler {
        span,
        method: sig.ident.to_string(),
        reason: reason.to_owned(),
    };

    if sig.asyncness.is_some() {
        return Err(invalid(sig.span(), "request handlers cannot be `async`"));
    }
    if !sig.generics.params.is_empty() {
        return Err(invalid(
            sig.generics.span(),
            "request handlers cannot be generic",
        ));
    }
    match sig.receiver() {
        Some(receiver) if is_shared_reference(&receiver.ty) => {}
        _ => {
            return Err(invalid(
                sig.span(),
                "a request handler should take `&self`",
            ))
        }
    }

    let params: Vec<&Type> = sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(arg) => Some(arg.ty.as_ref()),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let takes_request = match params.as_slice() {
        [] => false,
        [ty] if is_request(ty) => true,
        [ty] => {
            return Err(invalid(
                ty.span(),
                "the only parameter of a request handler should be `&Request`",
            ))
        }
        [_, extra, ..] => {
            return Err(invalid(
                extra.span(),
                "a request handler takes at most one parameter, `&Request`",
            ))
        }
    };

    Ok(HandlerShape {
        takes_request,
        output: classify_output(&sig.output),
    })
}

fn is_shared_reference(ty: &Type) -> bool {
    matches!(ty, Type::Reference(reference) if reference.mutability.is_none())
}

fn is_request(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    reference.mutability.is_none() && last_segment_is(&reference.elem, "Request")
}

fn last_segment_is(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == name),
        _ => false,
    }
}

fn classify_output(output: &ReturnType) -> Output {
    let ReturnType::Type(_, ty) = output else {
        return Output::Unit;
    };
    match ty.as_ref() {
        Type::Tuple(tuple) if tuple.elems.is_empty() => Output::Unit,
        Type::Path(path) => {
            let Some(last) = path.path.segments.last() else {
                return Output::Value;
            };
            if last.ident == "Response" {
                return Output::Response;
            }
            if last.ident != "Result" {
                return Output::Value;
            }
            let syn::PathArguments::AngleBracketed(args) = &last.arguments else {
                return Output::FallibleValue;
            };
            match args.args.first() {
                Some(syn::GenericArgument::Type(Type::Tuple(tuple))) if tuple.elems.is_empty() => {
                    Output::FallibleUnit
                }
                Some(syn::GenericArgument::Type(ok)) if last_segment_is(ok, "Response") => {
                    Output::FallibleResponse
                }
                _ => Output::FallibleValue,
            }
        }
        _ => Output::Value,
    }
}

fn parse_route(marker: &Attribute, target: &Ident) -> Result<Route, ValidationError> {
    let invalid = |span, reason: String| ValidationError::InvalidHandler {
        span,
        method: target.to_string(),
        reason,
    };

    let args = marker
        .parse_args_with(Punctuated::<MetaNameValue, Token![,]>::parse_terminated)
        .map_err(|err| {
            invalid(
                err.span(),
                format!("expects `#[request_handle(method = GET, path = \"/...\")]`, {err}"),
            )
        })?;

    let mut method = None;
    let mut path = None;
    let mut produces = None;
    for arg in args {
        let Some(key) = arg.path.get_ident().map(ToString::to_string) else {
            return Err(invalid(arg.path.span(), "expects a plain argument name".into()));
        };
        let duplicated = match key.as_str() {
            "method" => {
                let value = parse_method(&arg.value).ok_or_else(|| {
                    invalid(
                        arg.value.span(),
                        "expects one of GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS or TRACE"
                            .into(),
                    )
                })?;
                method.replace(value).is_some()
            }
            "path" => {
                let Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) = &arg.value
                else {
                    return Err(invalid(
                        arg.value.span(),
                        "expects the path as a string literal".into(),
                    ));
                };
                path.replace(lit.clone()).is_some()
            }
            "produces" => produces.replace(arg.value.to_token_stream()).is_some(),
            _ => {
                return Err(invalid(
                    arg.path.span(),
                    format!("unknown argument `{key}`, expects `method`, `path` or `produces`"),
                ))
            }
        };
        if duplicated {
            return Err(invalid(
                arg.path.span(),
                format!("`{key}` is given more than once"),
            ));
        }
    }

    let method = method.ok_or_else(|| {
        invalid(
            marker.span(),
            "expects `method = GET` or another HTTP method".into(),
        )
    })?;
    Ok(Route {
        method,
        path: path.unwrap_or_else(|| LitStr::new("/", marker.span())),
        produces: produces
            .unwrap_or_else(|| quote! { ::beanwire::web::MediaType::APPLICATION_JSON }),
    })
}

fn parse_method(value: &Expr) -> Option<Ident> {
    let Expr::Path(ExprPath { path, .. }) = value else {
        return None;
    };
    let ident = path.get_ident()?;
    let name = ident.to_string().to_ascii_uppercase();
    METHODS
        .iter()
        .find(|(method, _)| *method == name)
        .map(|(_, variant)| Ident::new(variant, ident.span()))
}

fn camel_case(ident: &Ident) -> String {
    ident
        .to_string()
        .trim_start_matches("r#")
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect()
}

fn write_binding(controller: &TypePath, binding: &Binding) -> SynResult<TokenStream2> {
    let Binding {
        handler,
        target,
        route,
        shape,
    } = binding;

    let mut ctor: ItemImpl = syn::parse_quote! {
        impl #handler {
            #[inject]
            fn new(controller: ::std::sync::Arc<#controller>) -> Self {
                Self { controller }
            }
        }
    };
    let mut diagnostics = Diagnostics::new();
    let dependency = resolver::resolve(&ctor, &mut diagnostics);
    diagnostics.finish()?;
    let dependency = dependency
        .ok_or_else(|| SynError::new(handler.span(), "could not build the request handler"))?;

    let roles: [Type; 1] = [syn::parse_quote!(dyn ::beanwire::web::RequestHandler)];
    let component = DefinitionWriter::new(&dependency).roles(&roles).write();
    AttributeRemovalVisitor::new(&["inject"]).visit_item_impl_mut(&mut ctor);

    let Route {
        method,
        path,
        produces,
    } = route;
    let process = write_process(target, *shape);

    Ok(quote! {
        #[doc(hidden)]
        pub struct #handler {
            controller: ::std::sync::Arc<#controller>,
        }

        #ctor
        #component

        impl ::beanwire::web::RequestHandler for #handler {
            fn method(&self) -> ::beanwire::web::HttpMethod {
                ::beanwire::web::HttpMethod::#method
            }

            fn path(&self) -> &str {
                #path
            }

            fn produces(&self) -> &str {
                #produces
            }

            fn process(
                &self,
                request: &::beanwire::web::Request,
            ) -> ::std::result::Result<::beanwire::web::Reply, ::beanwire::web::HandlerError> {
                #process
            }
        }
    })
}

fn write_process(target: &Ident, shape: HandlerShape) -> TokenStream2 {
    let (call, unused) = if shape.takes_request {
        (quote! { self.controller.#target(request) }, None)
    } else {
        (
            quote! { self.controller.#target() },
            Some(quote! { let _ = request; }),
        )
    };

    let reply = match shape.output {
        Output::Unit => quote! {
            #call;
            Ok(::beanwire::web::Reply::Response(::beanwire::web::Response::no_content()))
        },
        Output::Value => quote! {
            let value = #call;
            ::beanwire::web::Reply::value(&value)
        },
        Output::Response => quote! {
            Ok(::beanwire::web::Reply::Response(#call))
        },
        Output::FallibleUnit => quote! {
            #call.map_err(::beanwire::web::HandlerError::failed)?;
            Ok(::beanwire::web::Reply::Response(::beanwire::web::Response::no_content()))
        },
        Output::FallibleValue => quote! {
            let value = #call.map_err(::beanwire::web::HandlerError::failed)?;
            ::beanwire::web::Reply::value(&value)
        },
        Output::FallibleResponse => quote! {
            #call
                .map(::beanwire::web::Reply::Response)
                .map_err(::beanwire::web::HandlerError::failed)
        },
    };

    quote! {
        #unused
        #reply
    }
}
