use proc_macro2::Span;
use quote::ToTokens;
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{
    FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl, Path, PathArguments,
    ReturnType, Signature, Type, TypePath,
};

use crate::attrs;
use crate::diagnostics::{Diagnostics, ValidationError};

const COLLECTIONS: [&str; 3] = ["Vec", "VecDeque", "LinkedList"];

const RETURN_TYPE_REASON: &str =
    "a constructor's return type should be `Self` or `Result<Self, E>`";

const DEPENDENCY_REASON: &str =
    "expects `Arc<T>` or a `Vec`, `VecDeque` or `LinkedList` of `Arc<T>`";

/// The constructor of a component and what it needs from the container.
#[derive(Debug)]
pub struct Dependency {
    pub self_type: TypePath,
    pub constructor: Ident,
    pub params: Vec<DependencyRef>,
    pub construction: Construction,
}

#[derive(Debug)]
pub enum DependencyRef {
    /// Exactly one bean of `ty`.
    Single { span: Span, ty: Type },
    /// Every bean of `element`, gathered into `container`.
    Collection {
        span: Span,
        container: Path,
        element: Type,
    },
}

impl DependencyRef {
    pub fn span(&self) -> Span {
        match self {
            Self::Single { span, .. } | Self::Collection { span, .. } => *span,
        }
    }
}

#[derive(Debug)]
pub enum Construction {
    Infallible,
    Fallible { error_type: Type },
}

/// Inspects the `#[inject]` constructor of an inherent `impl` block.
///
/// Every problem found is reported to `diagnostics`; `None` is returned if
/// there was any.
pub fn resolve(item: &ItemImpl, diagnostics: &mut Diagnostics) -> Option<Dependency> {
    let self_type = match check_shape(item) {
        Ok(self_type) => self_type,
        Err(err) => {
            diagnostics.report(err);
            return None;
        }
    };
    let component = type_name(&self_type);

    let signature = match find_constructor(item, &component) {
        Ok(signature) => signature,
        Err(err) => {
            diagnostics.report(err);
            return None;
        }
    };

    let mut resolved = true;
    let construction = match classify_return(&signature.output, &self_type) {
        Ok(construction) => Some(construction),
        Err(err) => {
            diagnostics.report(err);
            None
        }
    };

    let mut params = Vec::with_capacity(signature.inputs.len());
    for input in &signature.inputs {
        let classified = match input {
            FnArg::Receiver(receiver) => Err(ValidationError::InvalidShape {
                span: receiver.span(),
                reason: "method is not allowed to be annotated with `#[inject]`".into(),
            }),
            FnArg::Typed(arg) => classify(&arg.ty),
        };
        match classified {
            Ok(param) => params.push(param),
            Err(err) => {
                diagnostics.report(err);
                resolved = false;
            }
        }
    }

    let construction = construction?;
    resolved.then(|| Dependency {
        self_type,
        constructor: signature.ident.clone(),
        params,
        construction,
    })
}

fn check_shape(item: &ItemImpl) -> Result<TypePath, ValidationError> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(ValidationError::InvalidShape {
            span: path.span(),
            reason: "`#[component]` should be annotated on the inherent `impl` block of a concrete type, not on a trait implementation".into(),
        });
    }
    if !item.generics.params.is_empty() {
        return Err(ValidationError::InvalidShape {
            span: item.generics.span(),
            reason: "a component should be a concrete type without generic parameters".into(),
        });
    }
    match item.self_ty.as_ref() {
        Type::Path(path) if path.qself.is_none() => Ok(path.clone()),
        ty => Err(ValidationError::InvalidShape {
            span: ty.span(),
            reason: "a component should be a named struct or enum".into(),
        }),
    }
}

fn find_constructor<'a>(
    item: &'a ItemImpl,
    component: &str,
) -> Result<&'a Signature, ValidationError> {
    let ctors: Vec<&'a ImplItemFn> = item
        .items
        .iter()
        .filter_map(|item| match item {
            ImplItem::Fn(item_fn) => Some(item_fn),
            _ => None,
        })
        .filter(|item_fn| attrs::has_attribute(&item_fn.attrs, "inject"))
        .collect();

    match ctors.as_slice() {
        [] => Err(ValidationError::MissingConstructor {
            span: item.self_ty.span(),
            component: component.to_owned(),
        }),
        [ctor] => {
            let ctor: &'a ImplItemFn = ctor;
            Ok(&ctor.sig)
        }
        [_, second, ..] => Err(ValidationError::TooManyConstructors {
            span: second.sig.ident.span(),
            component: component.to_owned(),
            constructors: ctors
                .iter()
                .map(|ctor| ctor.sig.to_token_stream().to_string())
                .collect(),
        }),
    }
}

fn classify_return(
    output: &ReturnType,
    self_type: &TypePath,
) -> Result<Construction, ValidationError> {
    let invalid = |span| ValidationError::InvalidShape {
        span,
        reason: RETURN_TYPE_REASON.into(),
    };

    let ReturnType::Type(_, ty) = output else {
        return Err(invalid(output.span()));
    };
    if is_self(ty, self_type) {
        return Ok(Construction::Infallible);
    }

    let Type::Path(path) = ty.as_ref() else {
        return Err(invalid(ty.span()));
    };
    let Some(last) = path.path.segments.last().filter(|s| s.ident == "Result") else {
        return Err(invalid(ty.span()));
    };
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return Err(invalid(ty.span()));
    };

    match (args.args.len(), args.args.first(), args.args.last()) {
        (2, Some(GenericArgument::Type(ok)), Some(GenericArgument::Type(err)))
            if is_self(ok, self_type) =>
        {
            Ok(Construction::Fallible {
                error_type: err.clone(),
            })
        }
        _ => Err(invalid(args.span())),
    }
}

fn is_self(ty: &Type, self_type: &TypePath) -> bool {
    match ty {
        Type::Path(path) => path == self_type || path.path.is_ident("Self"),
        _ => false,
    }
}

fn classify(ty: &Type) -> Result<DependencyRef, ValidationError> {
    let span = ty.span();
    let unresolvable = |reason| ValidationError::UnresolvableDependency {
        span,
        dependency: ty.to_token_stream().to_string(),
        reason,
    };

    let Type::Path(path) = ty else {
        return Err(unresolvable(DEPENDENCY_REASON));
    };
    let Some(last) = path.path.segments.last().filter(|_| path.qself.is_none()) else {
        return Err(unresolvable(DEPENDENCY_REASON));
    };
    let args = type_arguments(&last.arguments);

    if last.ident == "Arc" {
        match args.as_slice() {
            [inner] => Ok(DependencyRef::Single {
                span,
                ty: (*inner).clone(),
            }),
            _ => Err(unresolvable("`Arc` takes exactly one type argument")),
        }
    } else if COLLECTIONS.iter().any(|collection| last.ident == *collection) {
        match args.as_slice() {
            [element] => match arc_inner(element) {
                Some(inner) => Ok(DependencyRef::Collection {
                    span,
                    container: strip_arguments(&path.path),
                    element: inner.clone(),
                }),
                None => Err(unresolvable(
                    "the elements of a collection dependency should be `Arc<T>`",
                )),
            },
            _ => Err(unresolvable(
                "a collection dependency takes exactly one type argument",
            )),
        }
    } else if args.len() > 1 {
        Err(unresolvable(
            "a container with more than one type argument cannot be filled with beans",
        ))
    } else {
        Err(unresolvable(DEPENDENCY_REASON))
    }
}

fn type_arguments(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != "Arc" {
        return None;
    }
    match type_arguments(&last.arguments).as_slice() {
        [inner] => Some(*inner),
        _ => None,
    }
}

fn strip_arguments(path: &Path) -> Path {
    let mut path = path.clone();
    if let Some(last) = path.segments.last_mut() {
        last.arguments = PathArguments::None;
    }
    path
}

fn type_name(ty: &TypePath) -> String {
    ty.path
        .segments
        .last()
        .map(|segment| segment.ident.unraw().to_string())
        .unwrap_or_default()
}
