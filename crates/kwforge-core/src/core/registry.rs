use super::kwargs::Kwargs;
use super::signature::{Signature, SignatureError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error type factories report; it is collapsed into a single message by the resolver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Factory<B> = Arc<dyn Fn(&Kwargs) -> Result<Box<B>, BoxError> + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Type names registered under '{base}' cannot be empty")]
    EmptyName { base: &'static str },

    #[error("'{name}' is already registered under '{base}'")]
    Duplicate { base: &'static str, name: String },

    #[error("Invalid signature for '{name}': {source}")]
    Signature {
        name: String,
        #[source]
        source: SignatureError,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Could not find any {base} named '{name}'. Available types: {}", .known.join(", "))]
pub struct LookupError {
    pub base: &'static str,
    pub name: String,
    pub known: Vec<String>,
}

/// A concrete type that can be built from validated keyword arguments.
pub trait Constructible: Sized {
    /// The name descriptions use in their `type` key.
    const TYPE_NAME: &'static str;

    fn signature() -> Result<Signature, SignatureError>;

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError>;
}

/// A named factory together with the signature its descriptions are validated against.
pub struct Entry<B: ?Sized> {
    name: String,
    signature: Arc<Signature>,
    factory: Factory<B>,
}

impl<B: ?Sized> Clone for Entry<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            signature: Arc::clone(&self.signature),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<B: ?Sized> fmt::Debug for Entry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl<B: ?Sized> Entry<B> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    pub fn instantiate(&self, kwargs: Kwargs) -> Result<Box<B>, BoxError> {
        (self.factory)(&kwargs)
    }
}

/// The set of concrete types that can be built for one base type.
///
/// Registries are filled once at start-up and only read afterwards, so they
/// can be shared freely between threads.
pub struct Registry<B: ?Sized> {
    base: &'static str,
    entries: BTreeMap<String, Entry<B>>,
}

impl<B: ?Sized> fmt::Debug for Registry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("base", &self.base)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<B: ?Sized + 'static> Registry<B> {
    pub fn new(base: &'static str) -> Self {
        Self {
            base,
            entries: BTreeMap::new(),
        }
    }

    /// The human readable name of the base type, used in error messages.
    pub fn base(&self) -> &'static str {
        self.base
    }

    /// Registers a factory under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if `name` is taken and
    /// [`RegistryError::EmptyName`] for an empty name.
    pub fn register<F>(
        &mut self,
        name: &str,
        signature: Signature,
        factory: F,
    ) -> Result<&mut Self, RegistryError>
    where
        F: Fn(&Kwargs) -> Result<Box<B>, BoxError> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName { base: self.base });
        }
        if self.entries.contains_key(name) {
            return Err(RegistryError::Duplicate {
                base: self.base,
                name: name.to_string(),
            });
        }
        self.entries.insert(
            name.to_string(),
            Entry {
                name: name.to_string(),
                signature: Arc::new(signature),
                factory: Arc::new(factory),
            },
        );
        Ok(self)
    }

    /// Registers a [`Constructible`] type, boxing instances with `wrap`.
    pub fn register_type<T>(&mut self, wrap: fn(T) -> Box<B>) -> Result<&mut Self, RegistryError>
    where
        T: Constructible + 'static,
    {
        let signature = T::signature().map_err(|source| RegistryError::Signature {
            name: T::TYPE_NAME.to_string(),
            source,
        })?;
        self.register(T::TYPE_NAME, signature, move |kwargs| {
            T::construct(kwargs).map(wrap)
        })
    }

    pub fn resolve(&self, name: &str) -> Result<&Entry<B>, LookupError> {
        self.entries.get(name).ok_or_else(|| LookupError {
            base: self.base,
            name: name.to_string(),
            known: self.names().map(str::to_string).collect(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered type names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::{Mapping, Value};

    trait Shape: fmt::Debug + Send + Sync {
        fn area(&self) -> f64;
    }

    #[derive(Debug)]
    struct Square {
        side: f64,
    }

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.side * self.side
        }
    }

    impl Constructible for Square {
        const TYPE_NAME: &'static str = "Square";

        fn signature() -> Result<Signature, SignatureError> {
            Signature::builder().keyword("side", 1.0).build()
        }

        fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
            let side = kwargs.float("side")?;
            if side <= 0.0 {
                return Err("side must be positive".into());
            }
            Ok(Self { side })
        }
    }

    fn boxed(square: Square) -> Box<dyn Shape> {
        Box::new(square)
    }

    fn registry() -> Registry<dyn Shape> {
        let mut registry = Registry::new("Shape");
        registry.register_type::<Square>(boxed).unwrap();
        registry
    }

    #[test]
    fn registered_types_instantiate_from_kwargs() {
        let registry = registry();
        let entry = registry.resolve("Square").unwrap();
        let mut values = Mapping::new();
        values.insert("side".into(), Value::Float(3.0));

        let shape = entry
            .instantiate(Kwargs::new(values, Arc::clone(entry.signature())))
            .unwrap();
        assert_eq!(shape.area(), 9.0);

        let default = entry
            .instantiate(Kwargs::new(Mapping::new(), Arc::clone(entry.signature())))
            .unwrap();
        assert_eq!(default.area(), 1.0);
    }

    #[test]
    fn factory_errors_are_reported() {
        let registry = registry();
        let entry = registry.resolve("Square").unwrap();
        let mut values = Mapping::new();
        values.insert("side".into(), Value::Float(-1.0));
        let error = entry
            .instantiate(Kwargs::new(values, Arc::clone(entry.signature())))
            .unwrap_err();
        assert_eq!(error.to_string(), "side must be positive");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let result = registry.register_type::<Square>(boxed);
        assert!(matches!(result, Err(RegistryError::Duplicate { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_names_list_available_types() {
        let registry = registry();
        let error = registry.resolve("Circle").unwrap_err();
        assert_eq!(error.name, "Circle");
        assert_eq!(error.known, vec!["Square".to_string()]);
        assert_eq!(
            error.to_string(),
            "Could not find any Shape named 'Circle'. Available types: Square"
        );
    }

    #[test]
    fn closures_register_and_empty_names_are_rejected() {
        let mut registry: Registry<dyn Shape> = Registry::new("Shape");
        let signature = Signature::builder().keyword("a", 1_i64).build().unwrap();
        registry
            .register("Blob", signature, |_| Ok(boxed(Square { side: 2.0 })))
            .unwrap();
        assert!(registry.contains("Blob"));
        assert!(matches!(
            registry.register("", Signature::default(), |_| Ok(boxed(Square { side: 1.0 }))),
            Err(RegistryError::EmptyName { .. })
        ));
    }
}
