mod attrs;
mod definition;
mod diagnostics;
mod interception;
mod resolver;
mod route;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::{Item, Result as SynResult};

/// Declares the annotated inherent `impl` block's type as a component.
///
/// The one associated function marked `#[inject]` constructs the bean. Its
/// parameters are `Arc<T>` for a single dependency or a `Vec`, `VecDeque` or
/// `LinkedList` of `Arc<T>` for every bean of a role. The attribute's
/// arguments list the roles the bean is visible as, e.g.
/// `#[component(dyn Service)]`.
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    match component_impl(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn component_impl(attr: TokenStream2, item: TokenStream2) -> SynResult<TokenStream2> {
    let roles = attrs::parse_roles(attr)?;
    let item = syn::parse2::<Item>(item)?;
    definition::expand_component(item, roles)
}

/// Wraps the methods marked `#[transactional]` of the annotated trait
/// implementation in transactions.
///
/// A decorator named `{Type}Intercepted` is generated and registered as the
/// trait's implementation, shadowing the annotated type in broad lookups.
#[proc_macro_attribute]
pub fn transactional(attr: TokenStream, item: TokenStream) -> TokenStream {
    match interception::expand_transactional(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Generates a registered request handler for each
/// `#[request_handle(method = ..., path = "...", produces = ...)]` marker in
/// the annotated `impl` block.
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    match route::expand_controller(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
