use thiserror::Error;

/// Errors triggered while declaring, wiring or calling a service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("missing dependencies: {}", .missing.join(", "))]
    MissingDependencies { missing: Vec<String> },
    #[error("missing keywords: {}", .missing.join(","))]
    MissingArguments { missing: Vec<String> },
    #[error("A #call method with zero arity must be defined in {service}")]
    CallNotDefined { service: String },
    #[error("unknown dependency: {name}")]
    UnknownDependency { name: String },
    #[error("unknown argument: {name}")]
    UnknownArgument { name: String },
    #[error("uninitialized constant {class}")]
    UndefinedClass { class: String },
    #[error("cannot resolve a class for dependency {dependency} (tried {})", .candidates.join(", "))]
    UnresolvedClass {
        dependency: String,
        candidates: Vec<String>,
    },
    #[error("undefined method `{method}' for {class}")]
    UnknownMethod { class: String, method: String },
    #[error("cyclic dependencies: {name} is already being resolved")]
    CyclicResolution { name: String },
    #[error("{name} is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("missing positional argument #{index}")]
    MissingPositional { index: usize },
    #[error("missing keyword argument: {name}")]
    MissingKeyword { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = InjectError::MissingDependencies {
            missing: vec!["missing".into(), "none".into()],
        };
        assert_eq!(e.to_string(), "missing dependencies: missing, none");

        let e = InjectError::MissingArguments {
            missing: vec!["a".into(), "b".into()],
        };
        assert_eq!(e.to_string(), "missing keywords: a,b");

        let e = InjectError::CallNotDefined {
            service: "MyFancyClass".into(),
        };
        assert_eq!(
            e.to_string(),
            "A #call method with zero arity must be defined in MyFancyClass"
        );
    }
}
