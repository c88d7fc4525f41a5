use linkme::distributed_slice;

use crate::definition::BeanDefinition;
use crate::registry::{Registry, RegistryBuilder, RegistryError};

/// Every component declared with `#[component]`, `#[transactional]` or
/// `#[controller]` anywhere in the final binary.
#[distributed_slice]
pub static COMPONENTS: [ComponentEntry];

/// A link-time registration of a component.
pub struct ComponentEntry {
    scope: &'static str,
    definition: fn() -> BeanDefinition,
}

impl ComponentEntry {
    pub const fn new(scope: &'static str, definition: fn() -> BeanDefinition) -> Self {
        Self { scope, definition }
    }

    /// The module path the component was declared in.
    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn definition(&self) -> BeanDefinition {
        (self.definition)()
    }

    pub fn is_within(&self, scope: &str) -> bool {
        is_within(self.scope, scope)
    }
}

fn is_within(path: &str, scope: &str) -> bool {
    path.strip_prefix(scope)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Builds a registry from every registered component declared in
/// `default_scope` or in one of `extra_scopes`, or in a module nested below
/// one of them.
///
/// This is what [`get_instance!`](crate::get_instance) expands to, with the
/// caller's module path as the default scope.
///
/// # Errors
///
/// Returns an error if a component is registered more than once.
pub fn get_instance<S: AsRef<str>>(
    default_scope: &str,
    extra_scopes: &[S],
) -> Result<Registry, RegistryError> {
    extra_scopes
        .iter()
        .fold(
            RegistryBuilder::new().with_scope(default_scope),
            |builder, scope| builder.with_scope(scope.as_ref()),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_within_matches_module_and_submodules() {
        assert!(is_within("app", "app"));
        assert!(is_within("app::web::handlers", "app"));
        assert!(is_within("app::web", "app::web"));
    }

    #[test]
    fn is_within_rejects_siblings_with_common_prefix() {
        assert!(!is_within("application", "app"));
        assert!(!is_within("app", "app::web"));
        assert!(!is_within("other::app", "app"));
    }

    #[test]
    fn component_entry_exposes_scope() {
        fn definition() -> BeanDefinition {
            crate::definition::DefinitionBuilder::<u8>::new("app::store")
                .to_instance(std::sync::Arc::new(0))
        }

        let entry = ComponentEntry::new("app::store", definition);
        assert_eq!(entry.scope(), "app::store");
        assert!(entry.is_within("app"));
        assert!(!entry.is_within("app::web"));
        assert_eq!(entry.definition().scope(), "app::store");
    }
}
