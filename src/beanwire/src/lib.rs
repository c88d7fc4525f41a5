#![allow(clippy::new_without_default)]

extern crate self as beanwire;

pub mod component;
pub mod definition;
pub mod key;
pub mod module;
pub mod provider;
pub mod registry;
pub mod transaction;
pub mod web;

pub use beanwire_derive::{component, controller, transactional};

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}

/// Assembles a [`Registry`](crate::registry::Registry) from every component
/// declared in the calling module (and its submodules), plus the components
/// of any extra module paths given as string literals.
///
/// ```ignore
/// let registry = beanwire::get_instance!()?;
/// let registry = beanwire::get_instance!("my_app::plugins")?;
/// ```
#[macro_export]
macro_rules! get_instance {
    ($($scope:expr),* $(,)?) => {{
        let scopes: &[&str] = &[$($scope),*];
        $crate::registry::get_instance(::std::module_path!(), scopes)
    }};
}

pub mod prelude {
    pub use crate::component::{Component, Intercepted};
    pub use crate::definition::{BeanDefinition, DefinitionBuilder};
    pub use crate::get_instance;
    pub use crate::key::TypeKey;
    pub use crate::module::{Configuration, Module};
    pub use crate::provider::{BeanProvider, LookupError, TypedBeanProvider};
    pub use crate::registry::{Configurer, Registry, RegistryBuilder, RegistryError};
    pub use crate::transaction::{TransactionFailure, TransactionManager};
    pub use crate::web::{HttpMethod, MediaType, Reply, Request, RequestHandler, Response};
    pub use crate::{component, controller, transactional};
}
