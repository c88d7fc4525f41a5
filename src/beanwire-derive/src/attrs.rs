use proc_macro2::TokenStream as TokenStream2;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{Attribute, Error as SynError, Result as SynResult, Token, Type};

/// Parses the roles of `#[component(dyn A, dyn B)]`.
pub fn parse_roles(attr: TokenStream2) -> SynResult<Vec<Type>> {
    let roles = Punctuated::<Type, Token![,]>::parse_terminated.parse2(attr)?;
    roles
        .into_iter()
        .map(|role| match role {
            Type::TraitObject(_) => Ok(role),
            other => Err(SynError::new(
                other.span(),
                "expects trait object types such as `dyn Service`",
            )),
        })
        .collect()
}

pub fn ensure_no_arguments(attr: TokenStream2, name: &str) -> SynResult<()> {
    if attr.is_empty() {
        Ok(())
    } else {
        Err(SynError::new(
            attr.span(),
            format!("`#[{name}]` does not take arguments"),
        ))
    }
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

/// Strips the marker attributes a macro consumes from the item it emits.
pub struct AttributeRemovalVisitor {
    names: &'static [&'static str],
}

impl AttributeRemovalVisitor {
    pub fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    fn is_custom_attribute(&self, attr: &Attribute) -> bool {
        self.names.iter().any(|name| attr.path().is_ident(name))
    }
}

impl VisitMut for AttributeRemovalVisitor {
    fn visit_attributes_mut(&mut self, attrs: &mut Vec<Attribute>) {
        attrs.retain(|attr| !self.is_custom_attribute(attr));
        attrs
            .iter_mut()
            .for_each(|attr| visit_mut::visit_attribute_mut(self, attr));
    }
}
