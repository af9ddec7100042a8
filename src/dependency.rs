use std::any::Any;
use std::fmt;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::args::{instance, Args, Instance};
use crate::naming::{camelize, lookup_candidates};
use crate::registry::{Callable, ClassDef, ClassRegistry, Method};
use crate::InjectError;

/// Explicit construction of a dependency
pub type Factory = Rc<dyn Fn(&Args) -> Result<Instance, InjectError>>;

/// How a dependency should be built
#[derive(Clone, Default)]
pub struct DependencyOptions {
    pub(crate) factory: Option<Factory>,
    pub(crate) class: Option<String>,
    pub(crate) call: Option<String>,
    pub(crate) with: Option<Args>,
    pub(crate) depends_on: Vec<String>,
}

impl DependencyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the dependency with this function instead of a class.
    ///
    /// The function receives the sibling dependencies listed in
    /// [depends_on](Self::depends_on) as keyword arguments.
    pub fn factory<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&Args) -> Result<T, InjectError> + 'static,
    {
        self.factory = Some(Rc::new(move |args| f(args).map(instance)));
        self
    }

    /// Use this class instead of the one derived from the dependency name
    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    /// Expose a single method of the instance as a [Callable]
    pub fn call(mut self, method: impl Into<String>) -> Self {
        self.call = Some(method.into());
        self
    }

    /// Build the instance with these arguments, ignoring sibling dependencies
    pub fn with(mut self, args: Args) -> Self {
        self.with = Some(args);
        self
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Signature of a named dependency.
///
/// A dependency does not retain the instances it builds: memoization belongs to
/// [DependenciesProxy](crate::DependenciesProxy).
pub struct Dependency {
    name: String,
    options: DependencyOptions,
    namespaces: Vec<String>,
    registry: ClassRegistry,
    class: OnceCell<Rc<ClassDef>>,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        options: DependencyOptions,
        namespaces: Vec<String>,
        registry: ClassRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            options,
            namespaces,
            registry,
            class: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depends_on(&self) -> &[String] {
        &self.options.depends_on
    }

    /// Same signature, resolving classes from other namespaces
    pub(crate) fn with_namespaces(&self, namespaces: Vec<String>) -> Self {
        Self::new(
            self.name.clone(),
            self.options.clone(),
            namespaces,
            self.registry.clone(),
        )
    }

    /// Build a new instance
    pub fn instance(&self, args: Args) -> Result<Instance, InjectError> {
        let args = match &self.options.with {
            Some(with) => with.clone(),
            None => args,
        };
        let built = match &self.options.factory {
            Some(factory) => factory(&args)?,
            None => self.class()?.instantiate(&args)?,
        };
        self.wrap_call(built)
    }

    fn wrap_call(&self, built: Instance) -> Result<Instance, InjectError> {
        let Some(method) = &self.options.call else {
            return Ok(built);
        };
        if self.options.factory.is_some() {
            // any receiver: dispatched by name when called
            let registry = self.registry.clone();
            let name = method.clone();
            let forward: Method = Rc::new(move |receiver: &Instance, args: &Args| {
                registry.call_method(receiver, &name, args)
            });
            return Ok(instance(Callable::new(built, forward)));
        }
        let class = self.class()?;
        match class.method_named(method) {
            Some(m) => Ok(instance(Callable::new(built, m))),
            None => Err(InjectError::UnknownMethod {
                class: class.name().to_string(),
                method: method.clone(),
            }),
        }
    }

    /// Class to instantiate, looked up once
    fn class(&self) -> Result<Rc<ClassDef>, InjectError> {
        self.class
            .get_or_try_init(|| match &self.options.class {
                Some(explicit) => self
                    .registry
                    .get(explicit)
                    .ok_or_else(|| InjectError::UndefinedClass {
                        class: explicit.clone(),
                    }),
                None => {
                    let candidates = lookup_candidates(&self.namespaces, &camelize(&self.name));
                    self.registry.resolve(&candidates).ok_or_else(|| {
                        InjectError::UnresolvedClass {
                            dependency: self.name.clone(),
                            candidates,
                        }
                    })
                }
            })
            .cloned()
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("class", &self.options.class)
            .field("call", &self.options.call)
            .field("factory", &self.options.factory.is_some())
            .field("depends_on", &self.options.depends_on)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::downcast;
    use crate::service::{ArgumentOptions, ServiceDefinition, ServiceInstance};

    #[derive(Default)]
    struct MyDependency;

    struct WithArg(String);

    struct WithKwarg(String);

    #[derive(Default)]
    struct Renderer;

    fn registry() -> ClassRegistry {
        let registry = ClassRegistry::new();
        registry
            .register(ClassDef::default_of::<MyDependency>("MyDependency"))
            .register(ClassDef::default_of::<MyDependency>("Namespaced::Dep"))
            .register(ClassDef::new("WithArg", |args: &Args| {
                Ok(WithArg(args.positional::<String>(0)?.to_string()))
            }))
            .register(ClassDef::new("WithKwarg", |args: &Args| {
                Ok(WithKwarg(args.keyword::<String>("kwarg")?.to_string()))
            }))
            .register(
                ClassDef::default_of::<Renderer>("Renderer")
                    .method("render", |_: &Renderer, _: &Args| Ok("rendered")),
            );
        registry
    }

    fn dependency(name: &str, options: DependencyOptions) -> Dependency {
        Dependency::new(name, options, vec![], registry())
    }

    #[test]
    fn instance_from_name() -> Result<(), InjectError> {
        let dep = dependency("my_dependency", DependencyOptions::new());
        let built = dep.instance(Args::new())?;
        assert!(built.is::<MyDependency>());
        Ok(())
    }

    #[test]
    fn does_not_retain_instances() -> Result<(), InjectError> {
        let dep = dependency("my_dependency", DependencyOptions::new());
        assert!(!Rc::ptr_eq(
            &dep.instance(Args::new())?,
            &dep.instance(Args::new())?
        ));
        Ok(())
    }

    #[test]
    fn passes_arguments() -> Result<(), InjectError> {
        let dep = dependency("positional", DependencyOptions::new().class("WithArg"));
        let built = dep.instance(Args::new().arg("some arg".to_string()))?;
        assert_eq!(downcast::<WithArg>("positional", built)?.0, "some arg");

        let dep = dependency("keyword", DependencyOptions::new().class("WithKwarg"));
        let built = dep.instance(Args::new().kwarg("kwarg", "some arg".to_string()))?;
        assert_eq!(downcast::<WithKwarg>("keyword", built)?.0, "some arg");
        Ok(())
    }

    #[test]
    fn explicit_namespaced_class() -> Result<(), InjectError> {
        let dep = dependency("whatever", DependencyOptions::new().class("Namespaced::Dep"));
        assert!(dep.instance(Args::new())?.is::<MyDependency>());

        let dep = dependency("whatever", DependencyOptions::new().class("Missing"));
        assert_eq!(
            dep.instance(Args::new()).unwrap_err(),
            InjectError::UndefinedClass {
                class: "Missing".into()
            }
        );
        Ok(())
    }

    #[test]
    fn factory_result() -> Result<(), InjectError> {
        let dep = dependency(
            "some_dep",
            DependencyOptions::new().factory(|_| Ok("from factory")),
        );
        let built = dep.instance(Args::new())?;
        assert_eq!(*downcast::<&str>("some_dep", built)?, "from factory");
        Ok(())
    }

    #[test]
    fn call_wraps_method() -> Result<(), InjectError> {
        let dep = dependency(
            "renderer",
            DependencyOptions::new()
                .call("render")
                .factory(|_| Ok(Renderer)),
        );
        let callable = downcast::<Callable>("renderer", dep.instance(Args::new())?)?;
        let out = callable.call(&Args::new())?;
        assert_eq!(*downcast::<&str>("out", out)?, "rendered");

        let dep = dependency("renderer", DependencyOptions::new().call("paint"));
        assert_eq!(
            dep.instance(Args::new()).unwrap_err(),
            InjectError::UnknownMethod {
                class: "Renderer".into(),
                method: "paint".into()
            }
        );

        // built instances only fail once called
        let dep = dependency(
            "renderer",
            DependencyOptions::new()
                .call("paint")
                .factory(|_| Ok(Renderer)),
        );
        let callable = downcast::<Callable>("renderer", dep.instance(Args::new())?)?;
        assert_eq!(
            callable.call(&Args::new()).unwrap_err(),
            InjectError::UnknownMethod {
                class: "Renderer".into(),
                method: "paint".into()
            }
        );
        Ok(())
    }

    #[test]
    fn call_on_built_services_and_callables() -> Result<(), InjectError> {
        let inner = ServiceDefinition::builder("Inner", &registry())
            .argument("suffix", ArgumentOptions::with_default("!"))
            .call(|s: &ServiceInstance| Ok(format!("inner{}", s.argument_as::<&str>("suffix")?)))
            .build();

        let service = dependency(
            "inner",
            DependencyOptions::new()
                .call("call")
                .factory(move |_| ServiceDefinition::new(&inner, Args::new())),
        );
        let callable = downcast::<Callable>("inner", service.instance(Args::new())?)?;
        let out = callable.call(&Args::new().kwarg("suffix", "?"))?;
        assert_eq!(downcast::<String>("out", out)?.as_str(), "inner?");

        let wrapped = dependency(
            "wrapped",
            DependencyOptions::new().call("call").factory(|_| {
                let render: Method =
                    Rc::new(|_: &Instance, _: &Args| Ok::<_, InjectError>(instance("rendered")));
                Ok(Callable::new(instance(Renderer), render))
            }),
        );
        let callable = downcast::<Callable>("wrapped", wrapped.instance(Args::new())?)?;
        let out = callable.call(&Args::new())?;
        assert_eq!(*downcast::<&str>("out", out)?, "rendered");
        Ok(())
    }

    #[test]
    fn with_replaces_arguments() -> Result<(), InjectError> {
        let dep = dependency(
            "with_arg",
            DependencyOptions::new().with(Args::new().arg("fixed".to_string())),
        );
        let built = dep.instance(Args::new().arg("ignored".to_string()))?;
        assert_eq!(downcast::<WithArg>("with_arg", built)?.0, "fixed");
        Ok(())
    }

    #[test]
    fn unresolved_class_lists_candidates() {
        let dep = Dependency::new(
            "team_query",
            DependencyOptions::new(),
            vec!["Roster".into()],
            registry(),
        );
        assert_eq!(
            dep.instance(Args::new()).unwrap_err(),
            InjectError::UnresolvedClass {
                dependency: "team_query".into(),
                candidates: vec!["Roster::TeamQuery".into(), "TeamQuery".into()],
            }
        );
    }
}
