mod builder;
mod scan;

use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use snafu::prelude::*;

use crate::definition::BeanDefinition;
use crate::key::TypeKey;
use crate::provider::{BeanProvider, ErasedBean, LookupError};

pub use builder::RegistryBuilder;
pub use scan::{get_instance, ComponentEntry, COMPONENTS};

/// The assembled, immutable set of bean definitions.
///
/// A `Registry` is a cheap handle: clones share the same definitions and
/// the same singleton instances. Lookups go through [`BeanProvider`] and
/// [`TypedBeanProvider`](crate::provider::TypedBeanProvider).
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    definitions: Vec<BeanDefinition>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn new(definitions: Vec<BeanDefinition>) -> Self {
        Self {
            inner: Arc::new(RegistryInner { definitions }),
        }
    }

    pub fn definitions(&self) -> &[BeanDefinition] {
        &self.inner.definitions
    }

    pub fn len(&self) -> usize {
        self.inner.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.definitions.is_empty()
    }

    /// Definitions visible as `key` which no participating decorator
    /// intercepts.
    ///
    /// A decorator participates if it is visible as `key` itself or if it
    /// intercepts `key`, so a decorated type is hidden both behind its
    /// shared roles and under its own concrete type.
    fn visible(&self, key: TypeKey) -> Vec<&BeanDefinition> {
        let definitions = &self.inner.definitions;
        let shadowed: HashSet<TypeKey> = definitions
            .iter()
            .filter(|def| def.is_visible_as(key) || def.intercepts() == Some(key))
            .filter_map(BeanDefinition::intercepts)
            .collect();

        definitions
            .iter()
            .filter(|def| def.is_visible_as(key))
            .filter(|def| !shadowed.contains(&def.key()))
            .collect()
    }

    fn interceptor_of(&self, key: TypeKey) -> Option<TypeKey> {
        self.inner
            .definitions
            .iter()
            .find(|def| def.intercepts() == Some(key))
            .map(BeanDefinition::key)
    }

    fn exact(&self, key: TypeKey) -> Vec<&BeanDefinition> {
        self.inner
            .definitions
            .iter()
            .filter(|def| def.key() == key)
            .collect()
    }

    fn single(key: TypeKey, candidates: Vec<&BeanDefinition>) -> Result<&BeanDefinition, LookupError> {
        match candidates.as_slice() {
            [] => Err(LookupError::not_found(key)),
            [definition] => Ok(*definition),
            _ => Err(LookupError::Ambiguous {
                key,
                count: candidates.len(),
            }),
        }
    }
}

impl BeanProvider for Registry {
    fn dyn_provide(&self, key: TypeKey) -> Result<ErasedBean, LookupError> {
        tracing::trace!(%key, "looking up a single bean");
        let candidates = self.visible(key);
        if candidates.is_empty() {
            if let Some(decorator) = self.interceptor_of(key) {
                return Err(LookupError::NotFound {
                    key,
                    intercepted_by: Some(decorator),
                });
            }
        }
        Self::single(key, candidates)?.resolve(key, self)
    }

    fn dyn_provide_all(&self, key: TypeKey) -> Result<Vec<ErasedBean>, LookupError> {
        tracing::trace!(%key, "looking up all beans");
        self.visible(key)
            .into_iter()
            .map(|def| def.resolve(key, self))
            .collect()
    }

    fn dyn_provide_exact(&self, key: TypeKey) -> Result<ErasedBean, LookupError> {
        tracing::trace!(%key, "looking up a single bean by its exact type");
        Self::single(key, self.exact(key))?.resolve(key, self)
    }

    fn dyn_provide_exact_all(&self, key: TypeKey) -> Result<Vec<ErasedBean>, LookupError> {
        tracing::trace!(%key, "looking up all beans by their exact type");
        self.exact(key)
            .into_iter()
            .map(|def| def.resolve(key, self))
            .collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Registry")
            .field("definitions", &self.inner.definitions)
            .finish()
    }
}

/// The sink a [`Module`](crate::module::Module) configures a registry
/// through.
pub trait Configurer {
    fn register(&mut self, definition: BeanDefinition);

    /// Registers every component declared in the module path `scope` or
    /// below it.
    fn scan(&mut self, scope: &str);

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>);
}

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum RegistryError {
    #[snafu(display("the bean {key} is registered more than once"))]
    #[non_exhaustive]
    KeyDuplicated { key: TypeKey },
    #[snafu(display("module {module} fails to setup the configuration"))]
    #[non_exhaustive]
    ModuleInner {
        module: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    #[snafu(display("aggregated registry errors:\n{}", AggregatedDisplayer::new(errors)))]
    Aggregated { errors: Vec<RegistryError> },
}

struct AggregatedDisplayer<'a> {
    errors: &'a [RegistryError],
}

impl<'a> AggregatedDisplayer<'a> {
    fn new(errors: &'a [RegistryError]) -> Self {
        Self { errors }
    }
}

impl Display for AggregatedDisplayer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "{:4}: {}", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::component::Intercepted;
    use crate::definition::DefinitionBuilder;
    use crate::provider::TypedBeanProvider;

    use super::*;

    trait Repository: Send + Sync {
        fn describe(&self) -> String;
    }

    struct SqlRepository;

    impl Repository for SqlRepository {
        fn describe(&self) -> String {
            "sql".into()
        }
    }

    struct AuditedRepository {
        delegate: Arc<SqlRepository>,
    }

    impl Repository for AuditedRepository {
        fn describe(&self) -> String {
            format!("audited {}", self.delegate.describe())
        }
    }

    impl Intercepted for AuditedRepository {
        fn intercepted_type(&self) -> TypeKey {
            TypeKey::of::<SqlRepository>()
        }
    }

    struct CacheRepository;

    impl Repository for CacheRepository {
        fn describe(&self) -> String {
            "cache".into()
        }
    }

    fn sql() -> BeanDefinition {
        DefinitionBuilder::<SqlRepository>::new("app")
            .provides::<dyn Repository>(|bean| -> Arc<dyn Repository> { bean })
            .to_instance(Arc::new(SqlRepository))
    }

    fn audited() -> BeanDefinition {
        DefinitionBuilder::<AuditedRepository>::new("app")
            .provides::<dyn Repository>(|bean| -> Arc<dyn Repository> { bean })
            .intercepts::<SqlRepository>()
            .to_closure(|provider| {
                Ok(AuditedRepository {
                    delegate: provider.provide_exact::<SqlRepository>()?,
                })
            })
    }

    fn cache() -> BeanDefinition {
        DefinitionBuilder::<CacheRepository>::new("app")
            .provides::<dyn Repository>(|bean| -> Arc<dyn Repository> { bean })
            .to_instance(Arc::new(CacheRepository))
    }

    #[test]
    fn registry_provide_succeeds() {
        let registry = Registry::new(vec![sql()]);
        let repository = registry.provide::<dyn Repository>().unwrap();
        assert_eq!(repository.describe(), "sql");
        assert!(registry.provide::<SqlRepository>().is_ok());
    }

    #[test]
    fn registry_provide_returns_the_same_instance() {
        let registry = Registry::new(vec![sql()]);
        let first = registry.provide::<SqlRepository>().unwrap();
        let second = registry.provide::<SqlRepository>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn registry_provide_fails_when_not_found() {
        let registry = Registry::new(vec![sql()]);
        let err = registry.provide::<CacheRepository>().err().unwrap();
        assert!(matches!(err, LookupError::NotFound { intercepted_by: None, .. }));
        assert!(registry.provide_all::<CacheRepository>().unwrap().is_empty());
    }

    #[test]
    fn registry_provide_fails_when_ambiguous() {
        let registry = Registry::new(vec![sql(), cache()]);
        let err = registry.provide::<dyn Repository>().err().unwrap();
        assert!(matches!(err, LookupError::Ambiguous { count: 2, .. }));
        assert_eq!(registry.provide_all::<dyn Repository>().unwrap().len(), 2);
    }

    #[test]
    fn registry_provide_prefers_decorator_over_intercepted_bean() {
        let registry = Registry::new(vec![sql(), audited()]);

        let repository = registry.provide::<dyn Repository>().unwrap();
        assert_eq!(repository.describe(), "audited sql");

        let all = registry.provide_all::<dyn Repository>().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].describe(), "audited sql");
    }

    #[test]
    fn registry_provide_hides_intercepted_concrete_type() {
        let registry = Registry::new(vec![sql(), audited()]);
        let err = registry.provide::<SqlRepository>().err().unwrap();
        assert!(matches!(
            err,
            LookupError::NotFound { intercepted_by: Some(decorator), .. }
                if decorator == TypeKey::of::<AuditedRepository>()
        ));
        assert!(err.to_string().contains("intercepted by"));
        assert!(registry.provide_all::<SqlRepository>().unwrap().is_empty());
    }

    #[test]
    fn registry_provide_exact_ignores_shadowing() {
        let registry = Registry::new(vec![sql(), audited()]);
        let base = registry.provide_exact::<SqlRepository>().unwrap();
        let decorator = registry.provide_exact::<AuditedRepository>().unwrap();

        assert!(Arc::ptr_eq(&base, &decorator.delegate));
        assert_eq!(registry.provide_exact_all::<SqlRepository>().unwrap().len(), 1);
    }

    #[test]
    fn registry_provide_exact_does_not_match_roles() {
        let registry = Registry::new(vec![sql()]);
        assert!(registry.provide_exact_all::<AuditedRepository>().unwrap().is_empty());
        assert!(matches!(
            registry.provide_exact::<AuditedRepository>().err().unwrap(),
            LookupError::NotFound { .. }
        ));
    }

    #[test]
    fn registry_shadowing_keeps_unrelated_beans() {
        let registry = Registry::new(vec![sql(), audited(), cache()]);
        let mut all: Vec<_> = registry
            .provide_all::<dyn Repository>()
            .unwrap()
            .iter()
            .map(|repository| repository.describe())
            .collect();
        all.sort();
        assert_eq!(all, ["audited sql", "cache"]);
    }

    #[test]
    fn registry_clone_shares_singletons() {
        let registry = Registry::new(vec![sql()]);
        let cloned = registry.clone();
        let first = registry.provide::<SqlRepository>().unwrap();
        let second = cloned.provide::<SqlRepository>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cloned.len(), 1);
    }
}
