//! Declarative dependency injection for service objects.
//!
//! # Simple use case
//!
//! ```
//! # use injectable::*;
//! // A collaborator, registered as a named class
//! #[derive(Default)]
//! struct TeamQuery;
//!
//! impl TeamQuery {
//!     fn find(&self, id: u32) -> String {
//!         format!("team #{id}")
//!     }
//! }
//!
//! # fn main() -> Result<(), InjectError> {
//! let registry = ClassRegistry::new();
//! registry.register(ClassDef::default_of::<TeamQuery>("TeamQuery"));
//!
//! // Declare a service: `team_query` is resolved to the `TeamQuery` class by convention
//! let service = ServiceDefinition::builder("ShowTeam", &registry)
//!     .dependency("team_query", DependencyOptions::new())?
//!     .argument("team_id", ArgumentOptions::required())
//!     .call(|s| {
//!         let query = s.dependency_as::<TeamQuery>("team_query")?;
//!         Ok(query.find(*s.argument_as::<u32>("team_id")?))
//!     })
//!     .build();
//!
//! let team = ServiceDefinition::call_as::<String>(&service, Args::new().kwarg("team_id", 7u32))?;
//! assert_eq!(team.as_str(), "team #7");
//! # Ok(())
//! # }
//! ```
//!
//! # Mechanism
//!
//! Dependencies are declared by name on a [ServiceDefinition], and built in one of three ways:
//!
//! * by convention: the dependency name is camelized (`team_query` gives `TeamQuery`) and the class
//!   is looked up in the [ClassRegistry], first inside the namespace of the service and its parents,
//!   then at the top level;
//! * from an explicit class name ([DependencyOptions::class]);
//! * by a factory function ([DependencyOptions::factory]).
//!
//! The declarations form a [DependenciesGraph]. A dependency may depend on previously declared
//! dependencies, which it receives as keyword arguments. Each [ServiceInstance] owns a
//! [DependenciesProxy] built from the graph: dependencies are built on first access and shared with
//! every other dependency of the same instance that depends on them.
//!
//! Values cross the declaration API as type-erased [Instance]s, with typed accessors
//! (`*_as::<T>()`) to get them back.

mod args;
mod dependency;
mod error;
mod graph;
pub mod naming;
mod proxy;
mod registry;
mod service;

pub use args::{downcast, instance, Args, Instance};
pub use dependency::{Dependency, DependencyOptions, Factory};
pub use error::InjectError;
pub use graph::DependenciesGraph;
pub use proxy::DependenciesProxy;
pub use registry::{Callable, ClassDef, ClassRegistry, Method};
pub use service::{ArgumentOptions, Arguments, ServiceBuilder, ServiceDefinition, ServiceInstance};
