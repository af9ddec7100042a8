//! Named classes: constructors and method tables looked up by name.
//!
//! The registry plays the part of constant lookup: dependencies find the class to instantiate by
//! name (see [crate::naming]), and the `call` option of a dependency finds the method to wrap in the
//! method table of that class.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::args::{instance, Args, Instance};
use crate::service::{ServiceDefinition, ServiceInstance};
use crate::InjectError;

type Constructor = Rc<dyn Fn(&Args) -> Result<Instance, InjectError>>;

/// A method of a registered class, called on a type-erased receiver
pub type Method = Rc<dyn Fn(&Instance, &Args) -> Result<Instance, InjectError>>;

/// A named class: how to build it and which methods can be called by name
pub struct ClassDef {
    name: String,
    type_id: Option<TypeId>,
    constructor: Constructor,
    methods: HashMap<String, Method>,
}

impl ClassDef {
    pub fn new<T, F>(name: impl Into<String>, constructor: F) -> Self
    where
        T: Any,
        F: Fn(&Args) -> Result<T, InjectError> + 'static,
    {
        Self {
            name: name.into(),
            type_id: Some(TypeId::of::<T>()),
            constructor: Rc::new(move |args| constructor(args).map(instance)),
            methods: HashMap::new(),
        }
    }

    /// Class built with [Default], ignoring any argument
    pub fn default_of<T: Any + Default>(name: impl Into<String>) -> Self {
        Self::new(name, |_| Ok(T::default()))
    }

    /// Add a method that can be called by name on instances of the class
    pub fn method<T, R, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        T: Any,
        R: Any,
        F: Fn(&T, &Args) -> Result<R, InjectError> + 'static,
    {
        let class = self.name.clone();
        let method: Method = Rc::new(move |receiver: &Instance, args: &Args| {
            let receiver = receiver
                .downcast_ref::<T>()
                .ok_or_else(|| InjectError::TypeMismatch {
                    name: class.clone(),
                    expected: type_name::<T>(),
                })?;
            f(receiver, args).map(instance)
        });
        self.methods.insert(name.into(), method);
        self
    }

    /// A service definition used as a class.
    ///
    /// Instances are built with [ServiceDefinition::new] and answer to `call`.
    fn service(definition: &Rc<ServiceDefinition>) -> Self {
        let name = definition.name().to_string();
        let weak: Weak<ServiceDefinition> = Rc::downgrade(definition);
        let class = name.clone();
        let constructor: Constructor = Rc::new(move |args: &Args| {
            let definition = weak.upgrade().ok_or_else(|| InjectError::UndefinedClass {
                class: class.clone(),
            })?;
            let service = ServiceDefinition::new(&definition, args.clone())?;
            Ok(instance(service))
        });
        let call: Method = Rc::new(move |receiver: &Instance, args: &Args| {
            let service = receiver
                .downcast_ref::<ServiceInstance>()
                .ok_or_else(|| InjectError::TypeMismatch {
                    name: name.clone(),
                    expected: type_name::<ServiceInstance>(),
                })?;
            service.call(args.clone())
        });
        Self {
            name: definition.name().to_string(),
            type_id: None,
            constructor,
            methods: HashMap::from([("call".to_string(), call)]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self, args: &Args) -> Result<Instance, InjectError> {
        (self.constructor)(args)
    }

    pub fn method_named(&self, name: &str) -> Option<Method> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
struct Classes {
    by_name: HashMap<String, Rc<ClassDef>>,
    by_type: HashMap<TypeId, Rc<ClassDef>>,
}

/// Shared table of named classes.
///
/// Cloning the registry gives another handle on the same table, so classes registered after a
/// service was declared are still visible when its dependencies are first resolved.
#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: Rc<RefCell<Classes>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, replacing any class with the same name.
    ///
    /// A Rust type stays indexed under the first class registered for it, so that aliases do not
    /// change the method table used by [ClassRegistry::class_of].
    pub fn register(&self, class: ClassDef) -> &Self {
        let class = Rc::new(class);
        let mut guard = self.classes.borrow_mut();
        let classes = &mut *guard;

        match classes.by_name.insert(class.name.clone(), class.clone()) {
            Some(replaced) => {
                warn!(class = %class.name, "Replacing a registered class");
                classes.by_type.retain(|_, indexed| !Rc::ptr_eq(indexed, &replaced));
            }
            None => debug!(class = %class.name, "Registered class"),
        }

        if let Some(type_id) = class.type_id {
            match classes.by_type.entry(type_id) {
                Entry::Vacant(entry) => {
                    entry.insert(class);
                }
                Entry::Occupied(entry) => debug!(
                    class = %class.name,
                    indexed = %entry.get().name,
                    "Type already indexed under another class"
                ),
            }
        }
        self
    }

    /// Make a service usable as the class of other dependencies.
    ///
    /// Only a weak handle on the definition is kept: once it is dropped, building the class fails
    /// with [InjectError::UndefinedClass].
    pub fn register_service(&self, definition: &Rc<ServiceDefinition>) -> &Self {
        self.register(ClassDef::service(definition))
    }

    pub fn get(&self, name: &str) -> Option<Rc<ClassDef>> {
        self.classes.borrow().by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.borrow().by_name.contains_key(name)
    }

    /// First registered class among the candidates
    pub fn resolve(&self, candidates: &[String]) -> Option<Rc<ClassDef>> {
        let classes = self.classes.borrow();
        candidates
            .iter()
            .find_map(|name| classes.by_name.get(name).cloned())
    }

    /// Class registered for the concrete type of an instance
    pub fn class_of(&self, instance: &Instance) -> Option<Rc<ClassDef>> {
        let type_id = Any::type_id(&**instance);
        self.classes.borrow().by_type.get(&type_id).cloned()
    }

    /// Call a method by name on any instance.
    ///
    /// [Callable] and [ServiceInstance] answer to `call` directly; other receivers use the method
    /// table of the class registered for their type.
    pub fn call_method(
        &self,
        receiver: &Instance,
        method: &str,
        args: &Args,
    ) -> Result<Instance, InjectError> {
        if method == "call" {
            if let Some(callable) = receiver.downcast_ref::<Callable>() {
                return callable.call(args);
            }
            if let Some(service) = receiver.downcast_ref::<ServiceInstance>() {
                return service.call(args.clone());
            }
        }
        let class = self.class_of(receiver);
        match class.as_ref().and_then(|c| c.method_named(method)) {
            Some(m) => m(receiver, args),
            None => Err(InjectError::UnknownMethod {
                class: class.map_or_else(|| "instance".to_string(), |c| c.name().to_string()),
                method: method.to_string(),
            }),
        }
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes = self.classes.borrow();
        let mut names: Vec<_> = classes.by_name.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}

/// A method bound to its receiver
pub struct Callable {
    receiver: Instance,
    method: Method,
}

impl Callable {
    pub fn new(receiver: Instance, method: Method) -> Self {
        Self { receiver, method }
    }

    pub fn call(&self, args: &Args) -> Result<Instance, InjectError> {
        (self.method)(&self.receiver, args)
    }

    pub fn receiver(&self) -> &Instance {
        &self.receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::downcast;

    #[derive(Default)]
    struct Greeter;

    struct Prefixed(String);

    #[test]
    fn instantiate_and_call_methods() -> Result<(), InjectError> {
        let registry = ClassRegistry::new();
        registry
            .register(ClassDef::default_of::<Greeter>("Greeter").method(
                "greet",
                |_: &Greeter, args: &Args| Ok(format!("hello {}", args.positional::<&str>(0)?)),
            ))
            .register(ClassDef::new("Prefixed", |args: &Args| {
                Ok(Prefixed(args.keyword::<String>("prefix")?.to_string()))
            }));

        let greeter = registry.get("Greeter").expect("registered");
        let instance = greeter.instantiate(&Args::new())?;
        let greet = greeter.method_named("greet").expect("declared");
        let out = Callable::new(instance, greet).call(&Args::new().arg("bob"))?;
        assert_eq!(downcast::<String>("out", out)?.as_str(), "hello bob");

        let prefixed = registry
            .get("Prefixed")
            .expect("registered")
            .instantiate(&Args::new().kwarg("prefix", ">".to_string()))?;
        assert_eq!(downcast::<Prefixed>("prefixed", prefixed)?.0, ">");
        Ok(())
    }

    #[test]
    fn resolve_first_candidate_and_type() -> Result<(), InjectError> {
        let registry = ClassRegistry::new();
        registry.register(ClassDef::default_of::<Greeter>("Outer::Greeter"));

        let candidates = vec!["Inner::Greeter".to_string(), "Outer::Greeter".to_string()];
        let found = registry.resolve(&candidates).expect("found");
        assert_eq!(found.name(), "Outer::Greeter");
        assert!(registry.resolve(&["Greeter".to_string()]).is_none());

        let greeter = found.instantiate(&Args::new())?;
        let class = registry.class_of(&greeter).expect("indexed by type");
        assert_eq!(class.name(), "Outer::Greeter");
        Ok(())
    }

    #[test]
    fn last_registration_wins() -> Result<(), InjectError> {
        let registry = ClassRegistry::new();
        registry
            .register(ClassDef::new("Prefixed", |_: &Args| Ok(Prefixed("first".into()))))
            .register(ClassDef::new("Prefixed", |_: &Args| Ok(Prefixed("second".into()))));

        let prefixed = registry
            .get("Prefixed")
            .expect("registered")
            .instantiate(&Args::new())?;
        assert_eq!(downcast::<Prefixed>("prefixed", prefixed)?.0, "second");
        Ok(())
    }

    #[test]
    fn type_index_keeps_first_class() -> Result<(), InjectError> {
        let registry = ClassRegistry::new();
        registry
            .register(
                ClassDef::default_of::<Greeter>("Greeter")
                    .method("greet", |_: &Greeter, _: &Args| Ok("hello")),
            )
            .register(ClassDef::default_of::<Greeter>("Alias::Greeter"));

        let greeter: Instance = Rc::new(Greeter);
        let class = registry.class_of(&greeter).expect("indexed by type");
        assert_eq!(class.name(), "Greeter");
        let out = registry.call_method(&greeter, "greet", &Args::new())?;
        assert_eq!(*downcast::<&str>("out", out)?, "hello");
        Ok(())
    }

    #[test]
    fn replaced_class_leaves_type_index() {
        let registry = ClassRegistry::new();
        registry
            .register(ClassDef::default_of::<Greeter>("Greeter"))
            .register(ClassDef::new("Greeter", |_: &Args| Ok(Prefixed("".into()))));

        let greeter: Instance = Rc::new(Greeter);
        assert!(registry.class_of(&greeter).is_none());

        let prefixed: Instance = Rc::new(Prefixed("".into()));
        let class = registry.class_of(&prefixed).expect("indexed by type");
        assert_eq!(class.name(), "Greeter");
    }
}
