//! Services: named dependencies and arguments around a `call` entry point.
//!
//! A [ServiceDefinition] is declared once with a [ServiceBuilder]. Every [ServiceInstance] built
//! from it owns its argument values and a lazily created [DependenciesProxy], so dependencies are
//! built at most once per instance.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::args::{downcast, instance, Args, Instance};
use crate::dependency::DependencyOptions;
use crate::graph::DependenciesGraph;
use crate::proxy::DependenciesProxy;
use crate::registry::ClassRegistry;
use crate::InjectError;

type Body = Rc<dyn Fn(&ServiceInstance) -> Result<Instance, InjectError>>;

/// Declaration of a `call` or constructor argument
#[derive(Clone, Default)]
pub struct ArgumentOptions {
    default: Option<Instance>,
}

impl ArgumentOptions {
    pub fn required() -> Self {
        Self::default()
    }

    pub fn with_default<T: Any>(value: T) -> Self {
        Self {
            default: Some(instance(value)),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Declared arguments, in declaration order
#[derive(Clone, Default)]
pub struct Arguments(IndexMap<String, ArgumentOptions>);

impl Arguments {
    fn declare(&mut self, name: String, options: ArgumentOptions) {
        self.0.insert(name, options);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Names declared without a default
    pub fn required(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(_, options)| options.is_required())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn check_missing(&self, args: &Args) -> Result<(), InjectError> {
        let missing: Vec<String> = self
            .required()
            .into_iter()
            .filter(|name| !args.contains(name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InjectError::MissingArguments { missing })
        }
    }

    fn assign(&self, variables: &mut HashMap<String, Instance>, args: &Args) {
        for (name, options) in &self.0 {
            if let Some(value) = args.get(name).or_else(|| options.default.clone()) {
                variables.insert(name.clone(), value);
            }
        }
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.0
                    .iter()
                    .map(|(name, options)| (name, options.is_required())),
            )
            .finish()
    }
}

/// A service: its dependencies, its arguments and its body
pub struct ServiceDefinition {
    name: String,
    namespaces: Vec<String>,
    dependencies: DependenciesGraph,
    call_arguments: Arguments,
    initialize_arguments: Arguments,
    body: Option<Body>,
    registry: ClassRegistry,
}

impl ServiceDefinition {
    /// Start declaring a service.
    ///
    /// Classes of its dependencies are first looked up inside the service name, then outwards.
    pub fn builder(name: impl Into<String>, registry: &ClassRegistry) -> ServiceBuilder {
        let name = name.into();
        let namespaces = vec![name.clone()];
        ServiceBuilder {
            definition: ServiceDefinition {
                dependencies: DependenciesGraph::new(namespaces.clone(), registry.clone()),
                name,
                namespaces,
                call_arguments: Arguments::default(),
                initialize_arguments: Arguments::default(),
                body: None,
                registry: registry.clone(),
            },
        }
    }

    /// Start declaring a service that inherits everything declared by `parent`.
    ///
    /// Inherited dependencies resolve their classes in the new service first, then in its parents.
    pub fn inherit(parent: &ServiceDefinition, name: impl Into<String>) -> ServiceBuilder {
        let name = name.into();
        let namespaces: Vec<String> = std::iter::once(name.clone())
            .chain(parent.namespaces.iter().cloned())
            .collect();
        ServiceBuilder {
            definition: ServiceDefinition {
                dependencies: parent.dependencies.with_namespace(namespaces.clone()),
                name,
                namespaces,
                call_arguments: parent.call_arguments.clone(),
                initialize_arguments: parent.initialize_arguments.clone(),
                body: parent.body.clone(),
                registry: parent.registry.clone(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn dependencies(&self) -> &DependenciesGraph {
        &self.dependencies
    }

    pub fn call_arguments(&self) -> &Arguments {
        &self.call_arguments
    }

    pub fn initialize_arguments(&self) -> &Arguments {
        &self.initialize_arguments
    }

    pub fn required_call_arguments(&self) -> Vec<String> {
        self.call_arguments.required()
    }

    pub fn required_initialize_arguments(&self) -> Vec<String> {
        self.initialize_arguments.required()
    }

    /// Build an instance.
    ///
    /// `args` holds the constructor arguments and, under their names, instances replacing declared
    /// dependencies. A constructor argument that is also a dependency replaces it with its value,
    /// passed or default.
    pub fn new(definition: &Rc<Self>, args: Args) -> Result<ServiceInstance, InjectError> {
        definition.initialize_arguments.check_missing(&args)?;

        let mut variables = HashMap::new();
        definition.initialize_arguments.assign(&mut variables, &args);

        // a constructor argument named like a dependency stands for it
        let overrides = definition
            .dependencies
            .names()
            .filter_map(|name| {
                let value = if definition.initialize_arguments.contains(name) {
                    variables.get(name).cloned()
                } else {
                    args.get(name)
                };
                value.map(|value| (name.to_string(), value))
            })
            .collect();

        Ok(ServiceInstance {
            definition: definition.clone(),
            variables: RefCell::new(variables),
            overrides,
            proxy: OnceCell::new(),
        })
    }

    /// Build an instance with default dependencies and call it
    pub fn call(definition: &Rc<Self>, args: Args) -> Result<Instance, InjectError> {
        Self::new(definition, Args::new())?.call(args)
    }

    pub fn call_as<T: Any>(definition: &Rc<Self>, args: Args) -> Result<Rc<T>, InjectError> {
        downcast(&definition.name, Self::call(definition, args)?)
    }
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies.names().collect::<Vec<_>>())
            .field("call_arguments", &self.call_arguments)
            .field("initialize_arguments", &self.initialize_arguments)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Declares the dependencies, arguments and body of a [ServiceDefinition]
pub struct ServiceBuilder {
    definition: ServiceDefinition,
}

impl ServiceBuilder {
    /// Declare a dependency, available through [ServiceInstance::dependency]
    pub fn dependency(
        mut self,
        name: impl Into<String>,
        options: DependencyOptions,
    ) -> Result<Self, InjectError> {
        self.definition.dependencies.add(name, options)?;
        Ok(self)
    }

    /// Declare an argument of `call`
    pub fn argument(mut self, name: impl Into<String>, options: ArgumentOptions) -> Self {
        self.definition.call_arguments.declare(name.into(), options);
        self
    }

    /// Declare an argument of the constructor
    pub fn initialize_with(mut self, name: impl Into<String>, options: ArgumentOptions) -> Self {
        self.definition
            .initialize_arguments
            .declare(name.into(), options);
        self
    }

    /// Set the body run by `call`
    pub fn call<T, F>(mut self, body: F) -> Self
    where
        T: Any,
        F: Fn(&ServiceInstance) -> Result<T, InjectError> + 'static,
    {
        self.definition.body = Some(Rc::new(move |service| body(service).map(instance)));
        self
    }

    /// Use the `call` method of a dependency as body
    pub fn delegate_call(self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        self.call(move |service: &ServiceInstance| {
            let target = service.dependency(&dependency)?;
            service
                .definition
                .registry
                .call_method(&target, "call", &Args::new())
        })
    }

    pub fn build(self) -> Rc<ServiceDefinition> {
        Rc::new(self.definition)
    }
}

impl fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBuilder")
            .field("definition", &self.definition)
            .finish()
    }
}

/// An instance of a service
pub struct ServiceInstance {
    definition: Rc<ServiceDefinition>,
    variables: RefCell<HashMap<String, Instance>>,
    overrides: HashMap<String, Instance>,
    proxy: OnceCell<DependenciesProxy>,
}

impl ServiceInstance {
    pub fn definition(&self) -> &Rc<ServiceDefinition> {
        &self.definition
    }

    /// Entry point of the service.
    ///
    /// `args` must hold every argument declared without default.
    pub fn call(&self, args: Args) -> Result<Instance, InjectError> {
        let definition = &self.definition;
        let body = definition
            .body
            .clone()
            .ok_or_else(|| InjectError::CallNotDefined {
                service: definition.name.clone(),
            })?;
        definition.call_arguments.check_missing(&args)?;
        definition
            .call_arguments
            .assign(&mut self.variables.borrow_mut(), &args);

        debug!(service = %definition.name, "Calling service");
        body(self)
    }

    pub fn call_as<T: Any>(&self, args: Args) -> Result<Rc<T>, InjectError> {
        downcast(&self.definition.name, self.call(args)?)
    }

    /// Instance of a declared dependency
    pub fn dependency(&self, name: &str) -> Result<Instance, InjectError> {
        match self.overrides.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.proxy().get(name),
        }
    }

    pub fn dependency_as<T: Any>(&self, name: &str) -> Result<Rc<T>, InjectError> {
        downcast(name, self.dependency(name)?)
    }

    /// Current value of a `call` or constructor argument
    pub fn argument(&self, name: &str) -> Result<Instance, InjectError> {
        self.variables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| InjectError::UnknownArgument {
                name: name.to_string(),
            })
    }

    pub fn argument_as<T: Any>(&self, name: &str) -> Result<Rc<T>, InjectError> {
        downcast(name, self.argument(name)?)
    }

    /// Turn the instance into a function, e.g. for `Iterator::map`
    pub fn into_callable(self) -> impl Fn(Args) -> Result<Instance, InjectError> {
        move |args| self.call(args)
    }

    fn proxy(&self) -> &DependenciesProxy {
        self.proxy.get_or_init(|| {
            let proxy = self.definition.dependencies.proxy();
            for (name, value) in &self.overrides {
                proxy.seed(name, value.clone());
            }
            proxy
        })
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("service", &self.definition.name)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}
