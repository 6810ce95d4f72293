use super::signature::Signature;
use super::units::{Quantity, Unit, UnitError, parse_quantity};
use super::value::{Mapping, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("Missing required argument '{0}'")]
    Missing(String),

    #[error("Argument '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Argument '{name}' has invalid units: {source}")]
    Units { name: String, source: UnitError },

    #[error("Argument '{name}' is invalid: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Validated keyword arguments handed to a factory.
///
/// Lookups fall back to the signature defaults, so a factory reads every
/// parameter the same way whether or not the description set it.
#[derive(Debug, Clone)]
pub struct Kwargs {
    values: Mapping,
    signature: Arc<Signature>,
}

impl Kwargs {
    pub fn new(values: Mapping, signature: Arc<Signature>) -> Self {
        Self { values, signature }
    }

    pub fn values(&self) -> &Mapping {
        &self.values
    }

    pub fn into_values(self) -> Mapping {
        self.values
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether the caller provided `key` rather than relying on its default.
    pub fn is_explicit(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values
            .get(key)
            .or_else(|| self.signature.default_for(key))
    }

    fn require(&self, key: &str) -> Result<&Value, ArgumentError> {
        self.get(key)
            .ok_or_else(|| ArgumentError::Missing(key.to_string()))
    }

    fn wrong_type(key: &str, expected: &'static str, found: &Value) -> ArgumentError {
        ArgumentError::WrongType {
            name: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn float(&self, key: &str) -> Result<f64, ArgumentError> {
        let value = self.require(key)?;
        value
            .as_float()
            .ok_or_else(|| Self::wrong_type(key, "a number", value))
    }

    pub fn integer(&self, key: &str) -> Result<i64, ArgumentError> {
        let value = self.require(key)?;
        value
            .as_integer()
            .ok_or_else(|| Self::wrong_type(key, "an integer", value))
    }

    pub fn boolean(&self, key: &str) -> Result<bool, ArgumentError> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| Self::wrong_type(key, "a boolean", value))
    }

    pub fn string(&self, key: &str) -> Result<&str, ArgumentError> {
        let value = self.require(key)?;
        value
            .as_str()
            .ok_or_else(|| Self::wrong_type(key, "a string", value))
    }

    /// Reads a quantity and checks it can be expressed in `unit`.
    ///
    /// Quantity strings that survived validation untouched are parsed here.
    pub fn quantity(&self, key: &str, unit: &Unit) -> Result<Quantity, ArgumentError> {
        let value = self.require(key)?;
        let quantity = match value {
            Value::Quantity(q) => q.clone(),
            Value::String(text) => {
                parse_quantity(text, Some(unit)).map_err(|source| ArgumentError::Units {
                    name: key.to_string(),
                    source,
                })?
            }
            other => return Err(Self::wrong_type(key, "a quantity", other)),
        };
        if !quantity.is_compatible(unit) {
            return Err(ArgumentError::Units {
                name: key.to_string(),
                source: UnitError::Incompatible {
                    found: quantity.unit().to_string(),
                    expected: unit.to_string(),
                },
            });
        }
        Ok(quantity)
    }

    pub fn optional_integer(&self, key: &str) -> Result<Option<i64>, ArgumentError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.integer(key).map(Some),
        }
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<&str>, ArgumentError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(key).map(Some),
        }
    }

    pub fn optional_quantity(&self, key: &str, unit: &Unit) -> Result<Option<Quantity>, ArgumentError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.quantity(key, unit).map(Some),
        }
    }

    /// Reads an optional atom selection: null, or a list of atom indices.
    pub fn atoms(&self, key: &str) -> Result<Option<Vec<usize>>, ArgumentError> {
        let items = match self.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::List(items)) => items,
            Some(other) => return Err(Self::wrong_type(key, "a list of atom indices", other)),
        };
        items
            .iter()
            .map(|item| match item {
                Value::Integer(i) if *i >= 0 => Ok(*i as usize),
                other => Err(ArgumentError::InvalidValue {
                    name: key.to_string(),
                    reason: format!("{} is not a valid atom index", other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::{FEMTOSECOND, KELVIN, NANOMETER, PICOSECOND};

    fn kwargs(values: Mapping) -> Kwargs {
        let signature = Signature::builder()
            .required("thermodynamic_state")
            .keyword("timestep", Quantity::new(1.0, FEMTOSECOND))
            .keyword("n_steps", 1000_i64)
            .keyword("atom_subset", Value::Null)
            .keyword("collision_rate", 10.0)
            .build()
            .unwrap();
        Kwargs::new(values, Arc::new(signature))
    }

    #[test]
    fn missing_values_fall_back_to_signature_defaults() {
        let mut values = Mapping::new();
        values.insert("n_steps".into(), Value::Integer(50));
        let kwargs = kwargs(values);

        assert_eq!(kwargs.integer("n_steps").unwrap(), 50);
        assert!(kwargs.is_explicit("n_steps"));
        assert!(!kwargs.is_explicit("collision_rate"));
        assert_eq!(kwargs.float("collision_rate").unwrap(), 10.0);
        let timestep = kwargs.quantity("timestep", &PICOSECOND.into()).unwrap();
        assert!((timestep.value_in(&FEMTOSECOND.into()).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(kwargs.atoms("atom_subset").unwrap(), None);
    }

    #[test]
    fn required_parameters_without_values_are_missing() {
        let kwargs = kwargs(Mapping::new());
        assert_eq!(
            kwargs.string("thermodynamic_state"),
            Err(ArgumentError::Missing("thermodynamic_state".into()))
        );
    }

    #[test]
    fn quantity_rejects_incompatible_units_and_wrong_types() {
        let mut values = Mapping::new();
        values.insert("timestep".into(), Value::from("2.0*nanometer"));
        values.insert("collision_rate".into(), Value::from("fast"));
        let kwargs = kwargs(values);

        assert!(matches!(
            kwargs.quantity("timestep", &FEMTOSECOND.into()),
            Err(ArgumentError::Units { .. })
        ));
        assert!(matches!(
            kwargs.quantity("n_steps", &KELVIN.into()),
            Err(ArgumentError::WrongType { .. })
        ));
        assert!(matches!(
            kwargs.float("collision_rate"),
            Err(ArgumentError::WrongType { found: "str", .. })
        ));
        let parsed = kwargs.optional_quantity("atom_subset", &NANOMETER.into()).unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    fn atom_selections_require_non_negative_indices() {
        let mut values = Mapping::new();
        values.insert(
            "atom_subset".into(),
            Value::List(vec![Value::Integer(0), Value::Integer(4)]),
        );
        assert_eq!(kwargs(values).atoms("atom_subset").unwrap(), Some(vec![0, 4]));

        let mut values = Mapping::new();
        values.insert("atom_subset".into(), Value::List(vec![Value::Integer(-1)]));
        assert!(matches!(
            kwargs(values).atoms("atom_subset"),
            Err(ArgumentError::InvalidValue { .. })
        ));
    }
}
