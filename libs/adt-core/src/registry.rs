//! Module discovery: a static, link-time registration table.
//!
//! Module crates submit a constructor via `inventory::submit!` instead of
//! relying on a runtime entry-point scan. `ModuleRegistry::discover` walks the
//! resulting table, instantiates each provider, and rejects duplicate names.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::contract::Module;
use crate::error::{CoreError, CoreResult};

/// One module provider registered at link time.
///
/// `inventory::submit! { Registrator(|| Arc::new(MyModule::default())) }`
pub struct Registrator(pub fn() -> Arc<dyn Module>);

inventory::collect!(Registrator);

/// A discovered, instantiated set of modules keyed by their self-declared name.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: Arc<RwLock<BTreeMap<String, Arc<dyn Module>>>>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the statically registered providers.
    ///
    /// Failures instantiating any individual provider are non-fatal: a
    /// provider whose constructor panics is skipped (caught via
    /// `catch_unwind`) and logged; a duplicate name is a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateModule`] if two providers declare the same name.
    pub fn discover() -> CoreResult<Self> {
        let registry = Self::new();
        for registrator in inventory::iter::<Registrator> {
            let ctor = registrator.0;
            let module = match std::panic::catch_unwind(ctor) {
                Ok(module) => module,
                Err(_) => {
                    tracing::warn!("a module provider panicked during construction; skipping");
                    continue;
                }
            };
            registry.register(module)?;
        }
        Ok(registry)
    }

    /// Register a single module instance directly (used by tests and by
    /// hosts that want to bypass static discovery).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateModule`] if a module with the same name
    /// is already registered; the earlier registration is kept.
    pub fn register(&self, module: Arc<dyn Module>) -> CoreResult<()> {
        let name = module.name().to_string();
        let mut modules = self.modules.write();
        if modules.contains_key(&name) {
            return Err(CoreError::DuplicateModule { name });
        }
        modules.insert(name, module);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.modules.read().contains_key(name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}
