//! Type-erased values and the argument lists passed to constructors, factories and services.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::InjectError;

/// Shared, type-erased value: a dependency, an argument or the result of a call
pub type Instance = Rc<dyn Any>;

/// Wrap a value into an [Instance].
///
/// A value that already is an [Instance] is returned as is.
pub fn instance<T: Any>(value: T) -> Instance {
    let boxed: Box<dyn Any> = Box::new(value);
    match boxed.downcast::<Instance>() {
        Ok(instance) => *instance,
        Err(boxed) => Rc::from(boxed),
    }
}

/// Obtain a typed view of an instance.
///
/// `name` is only used to report a mismatch.
pub fn downcast<T: Any>(name: &str, instance: Instance) -> Result<Rc<T>, InjectError> {
    instance
        .downcast::<T>()
        .map_err(|_| InjectError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
        })
}

/// Positional and keyword arguments.
///
/// Keywords keep their insertion order.
#[derive(Clone, Default)]
pub struct Args {
    positional: Vec<Instance>,
    keywords: IndexMap<String, Instance>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value
    pub fn arg<T: Any>(mut self, value: T) -> Self {
        self.push(instance(value));
        self
    }

    /// Set a keyword value
    pub fn kwarg<T: Any>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, instance(value));
        self
    }

    pub fn push(&mut self, value: Instance) {
        self.positional.push(value);
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Instance) {
        self.keywords.insert(name.into(), value);
    }

    pub fn positional<T: Any>(&self, index: usize) -> Result<Rc<T>, InjectError> {
        let value = self
            .positional
            .get(index)
            .cloned()
            .ok_or(InjectError::MissingPositional { index })?;
        downcast(&format!("positional argument #{index}"), value)
    }

    pub fn keyword<T: Any>(&self, name: &str) -> Result<Rc<T>, InjectError> {
        let value = self.get(name).ok_or_else(|| InjectError::MissingKeyword {
            name: name.to_string(),
        })?;
        downcast(name, value)
    }

    /// Raw keyword value
    pub fn get(&self, name: &str) -> Option<Instance> {
        self.keywords.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keywords.keys().map(String::as_str)
    }

    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("positional", &self.positional.len())
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .finish()
    }
}
