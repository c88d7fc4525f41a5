use std::marker::PhantomData;
use std::sync::Arc;

use crate::component::Component;
use crate::key::TypeKey;
use crate::provider::{BeanProvider, Instance, LookupError};

/// Creates the instance of a bean, resolving its dependencies from the
/// given provider.
pub trait Factory: Send + Sync {
    fn create(&self, provider: &dyn BeanProvider) -> Result<Instance, LookupError>;
}

pub struct ComponentFactory<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C: Component> ComponentFactory<C> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C: Component> Factory for ComponentFactory<C> {
    fn create(&self, provider: &dyn BeanProvider) -> Result<Instance, LookupError> {
        match C::construct(provider) {
            Ok(Ok(component)) => Ok(Arc::new(component)),
            Ok(Err(err)) => Err(LookupError::Instantiation {
                key: TypeKey::of::<C>(),
                source: Arc::from(err.into()),
            }),
            Err(err) => Err(err),
        }
    }
}

pub struct InstanceFactory<T> {
    instance: Arc<T>,
}

impl<T> InstanceFactory<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(instance: Arc<T>) -> Self {
        Self { instance }
    }
}

impl<T> Factory for InstanceFactory<T>
where
    T: Send + Sync + 'static,
{
    fn create(&self, _provider: &dyn BeanProvider) -> Result<Instance, LookupError> {
        Ok(Arc::clone(&self.instance) as Instance)
    }
}

pub struct ClosureFactory<T, F> {
    closure: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ClosureFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&dyn BeanProvider) -> Result<T, LookupError> + Send + Sync + 'static,
{
    pub fn new(closure: F) -> Self {
        Self {
            closure,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Factory for ClosureFactory<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&dyn BeanProvider) -> Result<T, LookupError> + Send + Sync + 'static,
{
    fn create(&self, provider: &dyn BeanProvider) -> Result<Instance, LookupError> {
        (self.closure)(provider).map(|bean| Arc::new(bean) as Instance)
    }
}
