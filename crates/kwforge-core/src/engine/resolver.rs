use super::error::ConstructionError;
use crate::core::kwargs::Kwargs;
use crate::core::registry::{Entry, Registry};
use crate::core::signature::{DISCRIMINATOR, Signature};
use crate::core::units::try_parse_quantity;
use crate::core::value::{Mapping, Value};
use crate::schema::coercion::Coercer;
use crate::schema::generator::generate_schema;
use crate::schema::rule::{Rule, Schema};
use crate::schema::validator::{UnknownKeys, Validator};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-call knobs of the constructor resolver.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    special_coercions: Vec<(String, Coercer)>,
    convert_quantity_strings: bool,
    defaults: Mapping,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the derived rule of `key` with a nullable rule applying `coercer`.
    pub fn special_coercion(mut self, key: &str, coercer: Coercer) -> Self {
        self.special_coercions.push((key.to_string(), coercer));
        self
    }

    /// Upgrades every validated string that parses as a quantity.
    pub fn convert_quantity_strings(mut self, enabled: bool) -> Self {
        self.convert_quantity_strings = enabled;
        self
    }

    /// A value used for `key` when the description leaves it out.
    pub fn with_default(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.to_string(), value.into());
        self
    }

    pub fn with_defaults(mut self, defaults: &Mapping) -> Self {
        self.defaults
            .extend(defaults.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn caller_defaults(&self) -> &Mapping {
        &self.defaults
    }

    /// The schema descriptions of a type with `signature` are validated against.
    pub fn schema_for(&self, signature: &Signature) -> Schema {
        let overrides = self
            .special_coercions
            .iter()
            .filter(|(key, _)| signature.accepts_keyword(key))
            .map(|(key, coercer)| (key.clone(), Rule::optional().nullable().coerce(coercer.clone())))
            .collect();
        generate_schema(signature, overrides, &[])
    }
}

/// A description that passed validation, ready to be instantiated.
#[derive(Debug)]
pub struct Resolved<'r, B: ?Sized> {
    pub type_name: String,
    pub kwargs: Mapping,
    pub entry: &'r Entry<B>,
}

impl<B: ?Sized> Resolved<'_, B> {
    /// Calls the factory with the validated kwargs.
    ///
    /// # Errors
    ///
    /// Any factory failure is reported as [`ConstructionError::Instantiation`].
    pub fn instantiate(self) -> Result<Box<B>, ConstructionError> {
        let kwargs = Kwargs::new(self.kwargs, Arc::clone(self.entry.signature()));
        self.entry
            .instantiate(kwargs)
            .map_err(|e| ConstructionError::Instantiation {
                type_name: self.type_name,
                message: e.to_string(),
            })
    }
}

/// Checks that `description` names the type to build with a string.
pub fn check_type_keyword(description: &Mapping) -> Result<&str, ConstructionError> {
    match description.get(DISCRIMINATOR) {
        None | Some(Value::Null) => Err(ConstructionError::MissingType),
        Some(Value::String(name)) => Ok(name),
        Some(other) => Err(ConstructionError::InvalidType {
            found: other.type_name(),
        }),
    }
}

/// Validates a constructor description against the registered type it names.
///
/// The description is copied, never modified. Caller defaults only fill
/// parameters the schema knows and the description leaves out.
///
/// # Errors
///
/// Fails on a missing or non-string `type`, an unknown type name, or any
/// field failure, which are all reported together.
pub fn resolve<'r, B: ?Sized + 'static>(
    registry: &'r Registry<B>,
    description: &Mapping,
    options: &BuildOptions,
) -> Result<Resolved<'r, B>, ConstructionError> {
    let type_name = check_type_keyword(description)?.to_string();
    let mut description = description.clone();
    description.remove(DISCRIMINATOR);

    let entry = registry.resolve(&type_name)?;
    let schema = options.schema_for(entry.signature());

    for (key, value) in &options.defaults {
        if schema.contains_key(key) && !description.contains_key(key) {
            description.insert(key.clone(), value.clone());
        }
    }

    let mut kwargs = Validator::new()
        .unknown_keys(UnknownKeys::Reject)
        .validate(&description, &schema)
        .map_err(|errors| ConstructionError::Validation {
            type_name: type_name.clone(),
            errors,
        })?;

    if options.convert_quantity_strings {
        for (key, value) in kwargs.iter_mut() {
            if let Value::String(text) = value {
                if let Some(quantity) = try_parse_quantity(text) {
                    debug!(key = %key, quantity = %quantity, "Converted quantity string.");
                    *value = Value::Quantity(quantity);
                }
            }
        }
    }

    Ok(Resolved {
        type_name,
        kwargs,
        entry,
    })
}

/// Builds an instance of the registered type named by `description`.
///
/// Equivalent to [`resolve`] followed by [`Resolved::instantiate`].
#[instrument(skip_all, name = "build_constructor", fields(base = registry.base()))]
pub fn build<B: ?Sized + 'static>(
    registry: &Registry<B>,
    description: &Mapping,
    options: &BuildOptions,
) -> Result<Box<B>, ConstructionError> {
    let resolved = resolve(registry, description, options)?;
    let type_name = resolved.type_name.clone();
    let instance = resolved.instantiate()?;
    info!(type_name = %type_name, "Constructed instance.");
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{BoxError, Constructible};
    use crate::core::signature::SignatureError;
    use crate::core::units::{FEMTOSECOND, Quantity};
    use std::fmt;

    trait Integrator: fmt::Debug + Send + Sync {
        fn steps(&self) -> i64;
        fn timestep_fs(&self) -> f64;
        fn label(&self) -> Option<&str>;
    }

    #[derive(Debug)]
    struct Verlet {
        n_steps: i64,
        timestep_fs: f64,
        label: Option<String>,
    }

    impl Integrator for Verlet {
        fn steps(&self) -> i64 {
            self.n_steps
        }

        fn timestep_fs(&self) -> f64 {
            self.timestep_fs
        }

        fn label(&self) -> Option<&str> {
            self.label.as_deref()
        }
    }

    impl Constructible for Verlet {
        const TYPE_NAME: &'static str = "Verlet";

        fn signature() -> Result<Signature, SignatureError> {
            Signature::builder()
                .required("system")
                .keyword("nSteps", 10_i64)
                .keyword("timestep", Quantity::new(1.0, FEMTOSECOND))
                .keyword("label", Value::Null)
                .keyword("iterations", 1_i64)
                .build()
        }

        fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
            let n_steps = kwargs.integer("n_steps")?;
            if n_steps <= 0 {
                return Err(format!("n_steps must be positive, got {}", n_steps).into());
            }
            Ok(Self {
                n_steps,
                timestep_fs: kwargs
                    .quantity("timestep", &FEMTOSECOND.into())?
                    .value_in(&FEMTOSECOND.into())?,
                label: kwargs.optional_string("label")?.map(str::to_string),
            })
        }
    }

    fn boxed(v: Verlet) -> Box<dyn Integrator> {
        Box::new(v)
    }

    fn registry() -> Registry<dyn Integrator> {
        let mut registry = Registry::new("Integrator");
        registry.register_type::<Verlet>(boxed).unwrap();
        registry
    }

    fn description(pairs: &[(&str, Value)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn builds_from_a_valid_description() {
        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("n_steps", Value::Integer(50)),
            ("timestep", Value::from("2.0*femtoseconds")),
        ]);
        let instance = build(&registry(), &desc, &BuildOptions::new()).unwrap();
        assert_eq!(instance.steps(), 50);
        assert!((instance.timestep_fs() - 2.0).abs() < 1e-12);
        assert_eq!(instance.label(), None);
        assert!(desc.contains_key("type"));
    }

    #[test]
    fn type_keyword_is_checked_first() {
        let desc = description(&[("n_steps", Value::from("ten"))]);
        let error = build(&registry(), &desc, &BuildOptions::new()).unwrap_err();
        assert!(matches!(error, ConstructionError::MissingType));
        assert_eq!(error.to_string(), "'type' must be specified");

        let desc = description(&[("type", Value::Integer(3))]);
        let error = build(&registry(), &desc, &BuildOptions::new()).unwrap_err();
        assert!(matches!(error, ConstructionError::InvalidType { found: "int" }));
    }

    #[test]
    fn unknown_types_name_the_offending_value() {
        let desc = description(&[("type", Value::from("Leapfrog"))]);
        let error = build(&registry(), &desc, &BuildOptions::new()).unwrap_err();
        match error {
            ConstructionError::Lookup(lookup) => assert_eq!(lookup.name, "Leapfrog"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn field_failures_abort_the_build() {
        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("n_steps", Value::Float(1.5)),
            ("system", Value::from("complex")),
        ]);
        let error = build(&registry(), &desc, &BuildOptions::new()).unwrap_err();
        let errors = error.validation_errors().unwrap();
        assert_eq!(errors.field("n_steps"), ["must be of integer type"]);
        assert_eq!(errors.field("system"), ["unknown field"]);
        assert!(error.to_string().starts_with("Validation of Verlet constructor failed with:"));
    }

    #[test]
    fn factory_failures_become_instantiation_errors() {
        let desc = description(&[("type", Value::from("Verlet")), ("n_steps", Value::Integer(0))]);
        let error = build(&registry(), &desc, &BuildOptions::new()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Attempt to initialize Verlet failed with: n_steps must be positive, got 0"
        );
    }

    #[test]
    fn caller_defaults_never_override_the_description() {
        let registry = registry();
        let options = BuildOptions::new()
            .with_default("n_steps", 99_i64)
            .with_default("label", "from-defaults")
            .with_default("not_a_parameter", true);

        let desc = description(&[("type", Value::from("Verlet")), ("n_steps", Value::Integer(5))]);
        let resolved = resolve(&registry, &desc, &options).unwrap();
        assert_eq!(resolved.kwargs["n_steps"], Value::Integer(5));
        assert_eq!(resolved.kwargs["label"], Value::from("from-defaults"));
        assert!(!resolved.kwargs.contains_key("not_a_parameter"));
    }

    #[test]
    fn special_coercions_replace_derived_rules() {
        let registry = registry();
        let options = BuildOptions::new()
            .special_coercion("iterations", Coercer::to_integer_or_infinity())
            .special_coercion("system", Coercer::to_integer_or_infinity());
        let schema = options.schema_for(&Verlet::signature().unwrap());
        assert!(!schema.contains_key("system"));

        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("iterations", Value::Float(f64::INFINITY)),
        ]);
        let resolved = resolve(&registry, &desc, &options).unwrap();
        assert_eq!(resolved.kwargs["iterations"], Value::Float(f64::INFINITY));
    }

    #[test]
    fn quantity_strings_are_converted_on_request() {
        let registry = registry();
        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("label", Value::from("3.0*femtoseconds")),
        ]);
        let plain = resolve(&registry, &desc, &BuildOptions::new()).unwrap();
        assert_eq!(plain.kwargs["label"], Value::from("3.0*femtoseconds"));

        let options = BuildOptions::new().convert_quantity_strings(true);
        let converted = resolve(&registry, &desc, &options).unwrap();
        assert_eq!(
            converted.kwargs["label"],
            Value::Quantity(Quantity::new(3.0, FEMTOSECOND))
        );

        let desc = description(&[("type", Value::from("Verlet")), ("label", Value::from("fast"))]);
        let kept = resolve(&registry, &desc, &options).unwrap();
        assert_eq!(kept.kwargs["label"], Value::from("fast"));

        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("label", Value::from("nanometer**100*nanometer**100")),
        ]);
        let kept = resolve(&registry, &desc, &options).unwrap();
        assert_eq!(kept.kwargs["label"], Value::from("nanometer**100*nanometer**100"));
    }

    #[test]
    fn validated_kwargs_revalidate_unchanged() {
        let registry = registry();
        let desc = description(&[
            ("type", Value::from("Verlet")),
            ("n_steps", Value::Integer(5)),
            ("timestep", Value::from("0.5*femtoseconds")),
        ]);
        let options = BuildOptions::new();
        let resolved = resolve(&registry, &desc, &options).unwrap();
        let schema = options.schema_for(resolved.entry.signature());
        let again = Validator::new().validate(&resolved.kwargs, &schema).unwrap();
        assert_eq!(again, resolved.kwargs);
    }
}
