//! Explicit registry of rebuild helpers and default values.
//!
//! Producers register their capabilities once at startup through a
//! [`RegistryBuilder`]; the finished [`Registry`] is handed to the store by
//! reference and is read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use assetgraph_core::{AssetError, Context, DefaultProvider, DefaultValue, Rebuild};

/// Name-keyed rebuild helpers and defaults.
#[derive(Clone, Default)]
pub struct Registry {
    rebuilders: HashMap<String, Arc<dyn Rebuild>>,
    defaults: HashMap<String, Arc<dyn DefaultValue>>,
}

impl Registry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Registry::default()
    }

    /// The rebuild helper registered for `name`.
    pub fn rebuilder(&self, name: &str) -> Option<Arc<dyn Rebuild>> {
        self.rebuilders.get(name).cloned()
    }

    /// True if a default value is registered for `name`.
    pub fn has_default(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Names with a registered rebuild helper, sorted.
    pub fn rebuilder_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rebuilders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names with a registered default, sorted.
    pub fn default_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defaults.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl DefaultProvider for Registry {
    fn default_for(&self, ctx: &Context, name: &str) -> Result<Vec<u8>, AssetError> {
        match self.defaults.get(name) {
            Some(default) => default.value(ctx),
            None => Err(AssetError::not_found(format!("default for {name:?}"))),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("rebuilders", &self.rebuilder_names())
            .field("defaults", &self.default_names())
            .finish()
    }
}

/// Collects registrations and reports duplicates on [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    registry: Registry,
    duplicates: Vec<AssetError>,
}

impl RegistryBuilder {
    /// Registers the rebuild helper for `name`.
    pub fn rebuilder(mut self, name: impl Into<String>, rebuild: impl Rebuild + 'static) -> Self {
        let name = name.into();
        if self.registry.rebuilders.contains_key(&name) {
            self.duplicates.push(AssetError::DuplicateRegistration {
                kind: "rebuilder",
                name,
            });
        } else {
            self.registry.rebuilders.insert(name, Arc::new(rebuild));
        }
        self
    }

    /// Registers the default value for `name`.
    pub fn default_value(
        mut self,
        name: impl Into<String>,
        value: impl DefaultValue + 'static,
    ) -> Self {
        let name = name.into();
        if self.registry.defaults.contains_key(&name) {
            self.duplicates.push(AssetError::DuplicateRegistration {
                kind: "default",
                name,
            });
        } else {
            self.registry.defaults.insert(name, Arc::new(value));
        }
        self
    }

    /// Finishes the registry, failing on the first duplicate registration.
    pub fn build(self) -> Result<Registry, AssetError> {
        match self.duplicates.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.registry),
        }
    }
}
