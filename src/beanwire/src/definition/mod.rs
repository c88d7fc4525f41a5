mod builder;
mod factory;
mod singleton;
mod view;

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::key::TypeKey;
use crate::provider::{BeanProvider, ErasedBean, Instance, LookupError};

pub use builder::DefinitionBuilder;
pub use factory::{ClosureFactory, ComponentFactory, Factory, InstanceFactory};
pub use singleton::SingletonCell;
pub use view::View;

/// The static description of one bean: its concrete type, the roles it is
/// visible as, and a memoized factory.
///
/// Every definition is a singleton: its factory runs at most once per
/// successful construction, and the instance is shared afterwards.
pub struct BeanDefinition {
    key: TypeKey,
    scope: &'static str,
    views: Vec<View>,
    intercepts: Option<TypeKey>,
    factory: Box<dyn Factory>,
    cell: SingletonCell,
}

impl BeanDefinition {
    pub fn new(
        key: TypeKey,
        scope: &'static str,
        views: Vec<View>,
        intercepts: Option<TypeKey>,
        factory: Box<dyn Factory>,
    ) -> Self {
        Self {
            key,
            scope,
            views,
            intercepts,
            factory,
            cell: SingletonCell::new(),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The module path the bean was declared in.
    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn intercepts(&self) -> Option<TypeKey> {
        self.intercepts
    }

    pub fn roles(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.views.iter().map(View::key)
    }

    pub fn is_visible_as(&self, key: TypeKey) -> bool {
        self.views.iter().any(|view| view.key() == key)
    }

    pub fn is_instantiated(&self) -> bool {
        self.cell.is_initialized()
    }

    /// Returns the singleton instance, constructing it on first use.
    pub fn instance(&self, provider: &dyn BeanProvider) -> Result<Instance, LookupError> {
        self.cell.get_or_try_init(self.key, || {
            tracing::debug!(bean = %self.key, scope = self.scope, "constructing singleton bean");
            self.factory.create(provider)
        })
    }

    /// Returns the singleton instance cast to the role `key`.
    pub fn resolve(
        &self,
        key: TypeKey,
        provider: &dyn BeanProvider,
    ) -> Result<ErasedBean, LookupError> {
        let Some(view) = self.views.iter().find(|view| view.key() == key) else {
            return Err(LookupError::not_found(key));
        };
        self.instance(provider).map(|instance| view.apply(instance))
    }
}

impl Debug for BeanDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("BeanDefinition")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("views", &self.views)
            .field("intercepts", &self.intercepts)
            .field("cell", &self.cell)
            .finish_non_exhaustive()
    }
}
