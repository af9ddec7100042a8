use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::dependency::{Dependency, DependencyOptions};
use crate::proxy::DependenciesProxy;
use crate::registry::ClassRegistry;
use crate::InjectError;

/// Holds the dependency signatures of a service
#[derive(Clone, Debug)]
pub struct DependenciesGraph {
    graph: IndexMap<String, Rc<Dependency>>,
    namespaces: Vec<String>,
    registry: ClassRegistry,
}

impl DependenciesGraph {
    /// Empty graph resolving classes in the given namespace chain
    pub fn new(namespaces: Vec<String>, registry: ClassRegistry) -> Self {
        Self {
            graph: IndexMap::new(),
            namespaces,
            registry,
        }
    }

    /// Declared names, in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Dependency>> {
        self.graph.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Add the signature of a dependency.
    ///
    /// All the dependencies it depends on must already be declared.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        options: DependencyOptions,
    ) -> Result<(), InjectError> {
        let name = name.into();
        let missing: Vec<String> = options
            .depends_on
            .iter()
            .filter(|dep| !self.graph.contains_key(dep.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(InjectError::MissingDependencies { missing });
        }

        debug!(dependency = %name, depends_on = ?options.depends_on, "Declared dependency");
        let dependency = Dependency::new(
            name.clone(),
            options,
            self.namespaces.clone(),
            self.registry.clone(),
        );
        self.graph.insert(name, Rc::new(dependency));
        Ok(())
    }

    /// Fresh resolver over the current signatures
    pub fn proxy(&self) -> DependenciesProxy {
        DependenciesProxy::new(self.graph.clone())
    }

    /// Copy of the graph resolving classes in another namespace chain
    pub fn with_namespace(&self, namespaces: Vec<String>) -> Self {
        let graph = self
            .graph
            .iter()
            .map(|(name, dep)| {
                let dep = dep.with_namespaces(namespaces.clone());
                (name.clone(), Rc::new(dep))
            })
            .collect();
        Self {
            graph,
            namespaces,
            registry: self.registry.clone(),
        }
    }
}
