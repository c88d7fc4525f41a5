use std::any;
use std::error::Error;

use crate::registry::Configurer;

/// A reusable unit of registry configuration.
///
/// Modules register hand-written definitions (pre-built instances,
/// closures, or components outside the scanned module paths) and may
/// request scans of further module paths.
pub trait Module: 'static {
    fn name(&self) -> &'static str {
        any::type_name::<Self>()
    }

    fn setup(&self, configurer: &mut dyn Configurer) {
        if let Err(err) = self.configure(configurer) {
            configurer.report_module_error(self.name(), err);
        }
    }

    fn configure(
        &self,
        configurer: &mut dyn Configurer,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// An ordered collection of modules which is itself a module.
#[derive(Default)]
pub struct Configuration {
    modules: Vec<Box<dyn Module>>,
}

impl Configuration {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with<M: Module>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    pub fn compose(mut self, mut other: Configuration) -> Self {
        self.modules.append(&mut other.modules);
        self
    }
}

impl Module for Configuration {
    fn configure(
        &self,
        configurer: &mut dyn Configurer,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.modules
            .iter()
            .for_each(|module| module.setup(configurer));
        Ok(())
    }
}
