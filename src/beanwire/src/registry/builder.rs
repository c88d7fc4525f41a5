use std::error::Error;

use crate::definition::BeanDefinition;
use crate::module::Module;
use crate::registry::scan::{ComponentEntry, COMPONENTS};
use crate::registry::{Configurer, Registry, RegistryError};

/// Collects bean definitions and assembles them into a [`Registry`].
///
/// Definitions come from three sources: explicit registration, modules and
/// scanning the registered components of some module paths. Scanned
/// components are added after everything else when the registry is built.
pub struct RegistryBuilder {
    definitions: Vec<BeanDefinition>,
    scopes: Vec<String>,
    errors: Vec<RegistryError>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            scopes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: BeanDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scan(scope);
        self
    }

    pub fn install<M: Module>(mut self, module: M) -> Self {
        module.setup(&mut self);
        self
    }

    pub fn build(mut self) -> Result<Registry, RegistryError> {
        self.register_scanned();

        let mut errors = self.errors;
        match errors.len() {
            0 => {
                tracing::debug!(
                    definitions = self.definitions.len(),
                    scopes = ?self.scopes,
                    "assembled bean registry"
                );
                Ok(Registry::new(self.definitions))
            }
            1 => Err(errors.remove(0)),
            _ => Err(RegistryError::Aggregated { errors }),
        }
    }

    fn register_scanned(&mut self) {
        if self.scopes.is_empty() {
            return;
        }
        let scanned: Vec<_> = COMPONENTS
            .iter()
            .filter(|entry| self.scopes.iter().any(|scope| entry.is_within(scope)))
            .map(ComponentEntry::definition)
            .collect();
        scanned
            .into_iter()
            .for_each(|definition| self.register(definition));
    }
}

impl Configurer for RegistryBuilder {
    fn register(&mut self, definition: BeanDefinition) {
        let key = definition.key();
        if self.definitions.iter().any(|existing| existing.key() == key) {
            self.errors.push(RegistryError::KeyDuplicated { key });
        } else {
            tracing::trace!(bean = %key, scope = definition.scope(), "registered bean definition");
            self.definitions.push(definition);
        }
    }

    fn scan(&mut self, scope: &str) {
        if !self.scopes.iter().any(|existing| existing == scope) {
            self.scopes.push(scope.to_owned());
        }
    }

    fn report_module_error(&mut self, module: &'static str, err: Box<dyn Error + Send + Sync>) {
        self.errors.push(RegistryError::ModuleInner {
            module,
            source: err,
        });
    }
}
