use std::marker::PhantomData;
use std::sync::Arc;

use crate::component::{Component, Intercepted};
use crate::definition::factory::{ClosureFactory, ComponentFactory, Factory, InstanceFactory};
use crate::definition::view::View;
use crate::definition::BeanDefinition;
use crate::key::TypeKey;
use crate::provider::{BeanProvider, LookupError};

/// Assembles a [`BeanDefinition`] for beans of type `T`.
///
/// A definition is always visible as `T` itself; [`provides`] adds more
/// roles. The builder is finished by choosing how the bean is created:
/// [`build`] for a [`Component`], [`to_instance`] for a pre-built value or
/// [`to_closure`] for a custom factory.
///
/// [`provides`]: DefinitionBuilder::provides
/// [`build`]: DefinitionBuilder::build
/// [`to_instance`]: DefinitionBuilder::to_instance
/// [`to_closure`]: DefinitionBuilder::to_closure
pub struct DefinitionBuilder<T> {
    scope: &'static str,
    views: Vec<View>,
    intercepts: Option<TypeKey>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefinitionBuilder<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            views: vec![View::identity::<T>()],
            intercepts: None,
            _marker: PhantomData,
        }
    }

    /// Makes the bean visible as `R` as well. Declaring the same role twice
    /// has no further effect.
    pub fn provides<R>(mut self, cast: fn(Arc<T>) -> Arc<R>) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
    {
        let key = TypeKey::of::<R>();
        if self.views.iter().all(|view| view.key() != key) {
            self.views.push(View::of(cast));
        }
        self
    }

    /// Marks the bean as the decorator of `B`, hiding `B` from broad lookups
    /// while the decorator is registered.
    pub fn intercepts<B>(mut self) -> Self
    where
        T: Intercepted,
        B: 'static,
    {
        self.intercepts = Some(TypeKey::of::<B>());
        self
    }

    pub fn to_instance(self, instance: Arc<T>) -> BeanDefinition {
        self.finish(Box::new(InstanceFactory::new(instance)))
    }

    pub fn to_closure<F>(self, closure: F) -> BeanDefinition
    where
        F: Fn(&dyn BeanProvider) -> Result<T, LookupError> + Send + Sync + 'static,
    {
        self.finish(Box::new(ClosureFactory::new(closure)))
    }

    fn finish(self, factory: Box<dyn Factory>) -> BeanDefinition {
        BeanDefinition::new(
            TypeKey::of::<T>(),
            self.scope,
            self.views,
            self.intercepts,
            factory,
        )
    }
}

impl<T: Component> DefinitionBuilder<T> {
    pub fn build(self) -> BeanDefinition {
        self.finish(Box::new(ComponentFactory::<T>::new()))
    }
}
