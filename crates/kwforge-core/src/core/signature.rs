use super::units::UnitError;
use super::value::{Mapping, Value};
use thiserror::Error;

/// The reserved description key naming the concrete type to build.
pub const DISCRIMINATOR: &str = "type";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Parameter name cannot be empty")]
    EmptyName,

    #[error("Parameter name '{0}' is reserved for the type discriminator")]
    ReservedName(String),

    #[error("Non-default parameter '{0}' follows a parameter with a default value")]
    RequiredAfterDefault(String),

    #[error("{defaults} default values were given for only {parameters} parameters")]
    TooManyDefaults { defaults: usize, parameters: usize },

    #[error("Parameters '{first}' and '{second}' both normalize to '{key}'")]
    DuplicateParameter {
        first: String,
        second: String,
        key: String,
    },

    #[error("Invalid unit in a default value: {0}")]
    DefaultUnit(#[from] UnitError),
}

/// One declared constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    key: String,
    default: Option<Value>,
}

impl Parameter {
    /// The name as declared by the constructible type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The snake_case name configuration files use.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// The declared parameter list of a constructible type.
///
/// Mirrors a constructor signature: parameter names in declaration order and
/// default values aligned to the trailing parameters. Only parameters with a
/// default can be set from configuration; the others must be provided by the
/// code that assembles the object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    /// Builds a signature from ordered names and defaults for the trailing names.
    pub fn new(names: &[&str], defaults: Vec<Value>) -> Result<Self, SignatureError> {
        if defaults.len() > names.len() {
            return Err(SignatureError::TooManyDefaults {
                defaults: defaults.len(),
                parameters: names.len(),
            });
        }
        let first_default = names.len() - defaults.len();
        let mut defaults = defaults.into_iter();
        let declared = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let default = if i >= first_default {
                    defaults.next()
                } else {
                    None
                };
                (name.to_string(), default)
            })
            .collect();
        Self::from_declared(declared)
    }

    pub fn builder() -> SignatureBuilder {
        SignatureBuilder::default()
    }

    fn from_declared(declared: Vec<(String, Option<Value>)>) -> Result<Self, SignatureError> {
        let mut parameters: Vec<Parameter> = Vec::with_capacity(declared.len());
        for (name, default) in declared {
            if name.is_empty() {
                return Err(SignatureError::EmptyName);
            }
            let key = camelcase_to_underscore(&name);
            if key == DISCRIMINATOR {
                return Err(SignatureError::ReservedName(name));
            }
            if let Some(previous) = parameters.iter().find(|p| p.key == key) {
                return Err(SignatureError::DuplicateParameter {
                    first: previous.name.clone(),
                    second: name,
                    key,
                });
            }
            if default.is_none() && parameters.iter().any(Parameter::has_default) {
                return Err(SignatureError::RequiredAfterDefault(name));
            }
            parameters.push(Parameter { name, key, default });
        }
        Ok(Self { parameters })
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameters that carry a default and may therefore be configured.
    pub fn keyword_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.has_default())
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.key == key)
    }

    pub fn default_for(&self, key: &str) -> Option<&Value> {
        self.parameter(key).and_then(Parameter::default)
    }

    pub fn accepts_keyword(&self, key: &str) -> bool {
        self.default_for(key).is_some()
    }

    pub fn defaults(&self) -> Mapping {
        self.keyword_parameters()
            .filter_map(|p| p.default.clone().map(|d| (p.key.clone(), d)))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SignatureBuilder {
    declared: Vec<(String, Option<Value>)>,
}

impl SignatureBuilder {
    pub fn required(mut self, name: &str) -> Self {
        self.declared.push((name.to_string(), None));
        self
    }

    pub fn keyword(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.declared.push((name.to_string(), Some(default.into())));
        self
    }

    pub fn build(self) -> Result<Signature, SignatureError> {
        Signature::from_declared(self.declared)
    }
}

/// Converts `camelCase` / `PascalCase` names to `snake_case`.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, and before the last capital of an acronym that
/// starts a new word (`HTTPResponse` becomes `http_response`).
pub fn camelcase_to_underscore(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camelcase_names_are_normalized() {
        assert_eq!(camelcase_to_underscore("collisionRate"), "collision_rate");
        assert_eq!(camelcase_to_underscore("nSteps"), "n_steps");
        assert_eq!(camelcase_to_underscore("logZ_guess"), "log_z_guess");
        assert_eq!(camelcase_to_underscore("getHTTPResponse"), "get_http_response");
        assert_eq!(camelcase_to_underscore("already_snake"), "already_snake");
        assert_eq!(camelcase_to_underscore("K_r"), "k_r");
    }

    #[test]
    fn defaults_align_to_trailing_parameters() {
        let signature = Signature::new(
            &["thermodynamic_state", "nSteps", "timestep"],
            vec![Value::Integer(1000), Value::Null],
        )
        .unwrap();

        let keys: Vec<_> = signature.keyword_parameters().map(Parameter::key).collect();
        assert_eq!(keys, vec!["n_steps", "timestep"]);
        assert!(!signature.parameters()[0].has_default());
        assert_eq!(signature.default_for("n_steps"), Some(&Value::Integer(1000)));
        assert!(!signature.accepts_keyword("thermodynamic_state"));
    }

    #[test]
    fn too_many_defaults_is_rejected() {
        let result = Signature::new(&["a"], vec![Value::Null, Value::Null]);
        assert_eq!(
            result,
            Err(SignatureError::TooManyDefaults {
                defaults: 2,
                parameters: 1
            })
        );
    }

    #[test]
    fn builder_rejects_required_after_keyword() {
        let result = Signature::builder()
            .keyword("a", 1_i64)
            .required("b")
            .build();
        assert_eq!(
            result,
            Err(SignatureError::RequiredAfterDefault("b".to_string()))
        );
    }

    #[test]
    fn builder_rejects_colliding_and_reserved_names() {
        let collision = Signature::builder()
            .keyword("nSteps", 1_i64)
            .keyword("n_steps", 2_i64)
            .build();
        assert!(matches!(
            collision,
            Err(SignatureError::DuplicateParameter { .. })
        ));

        let reserved = Signature::builder().keyword("type", "x").build();
        assert_eq!(
            reserved,
            Err(SignatureError::ReservedName("type".to_string()))
        );
    }

    #[test]
    fn defaults_are_keyed_by_normalized_name() {
        let signature = Signature::builder()
            .keyword("collisionRate", 1.0)
            .keyword("reassign_velocities", false)
            .build()
            .unwrap();
        let defaults = signature.defaults();
        assert_eq!(defaults.get("collision_rate"), Some(&Value::Float(1.0)));
        assert_eq!(
            defaults.get("reassign_velocities"),
            Some(&Value::Boolean(false))
        );
    }
}
