use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use tracing::trace;

use crate::args::{downcast, Args, Instance};
use crate::dependency::Dependency;
use crate::InjectError;

struct Slot {
    dependency: Rc<Dependency>,
    instance: OnceCell<Instance>,
}

/// Lazy resolver for the dependencies of one service instance.
///
/// Each dependency is built on first access and kept for the lifetime of the proxy, so that
/// siblings depending on the same dependency share its instance.
pub struct DependenciesProxy {
    slots: IndexMap<String, Slot>,
    resolving: RefCell<HashSet<String>>,
}

impl DependenciesProxy {
    pub fn new(graph: IndexMap<String, Rc<Dependency>>) -> Self {
        let slots = graph
            .into_iter()
            .map(|(name, dependency)| {
                let slot = Slot {
                    dependency,
                    instance: OnceCell::new(),
                };
                (name, slot)
            })
            .collect();
        Self {
            slots,
            resolving: RefCell::default(),
        }
    }

    /// Obtain the instance of a dependency, building it if needed
    pub fn get(&self, name: &str) -> Result<Instance, InjectError> {
        let slot = self
            .slots
            .get(name)
            .ok_or_else(|| InjectError::UnknownDependency {
                name: name.to_string(),
            })?;
        if let Some(instance) = slot.instance.get() {
            trace!(dependency = name, "Reusing resolved dependency");
            return Ok(instance.clone());
        }

        if !self.resolving.borrow_mut().insert(name.to_string()) {
            return Err(InjectError::CyclicResolution {
                name: name.to_string(),
            });
        }
        let built = slot
            .instance
            .get_or_try_init(|| self.build(&slot.dependency))
            .cloned();
        self.resolving.borrow_mut().remove(name);
        built
    }

    pub fn get_as<T: Any>(&self, name: &str) -> Result<Rc<T>, InjectError> {
        downcast(name, self.get(name)?)
    }

    /// Use an existing instance for a dependency.
    ///
    /// Returns `false`, leaving the proxy unchanged, if the dependency was already resolved or is
    /// not declared.
    pub fn seed(&self, name: &str, instance: Instance) -> bool {
        let Some(slot) = self.slots.get(name) else {
            trace!(dependency = name, "Ignoring seed of an undeclared dependency");
            return false;
        };
        let seeded = slot.instance.set(instance).is_ok();
        if !seeded {
            trace!(dependency = name, "Dependency already resolved, seed ignored");
        }
        seeded
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .is_some_and(|slot| slot.instance.get().is_some())
    }

    fn build(&self, dependency: &Dependency) -> Result<Instance, InjectError> {
        let mut args = Args::new();
        for sub in dependency.depends_on() {
            args.insert(sub.clone(), self.get(sub)?);
        }
        trace!(dependency = dependency.name(), "Resolving dependency");
        dependency.instance(args)
    }
}
