use crate::core::units::{Unit, UnitError, parse_quantity};
use crate::core::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The sentinel accepted by [`Coercer::to_none_int_or_checkpoint`].
pub const CHECKPOINT: &str = "checkpoint";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoercionError {
    #[error(transparent)]
    Units(#[from] UnitError),

    #[error("expected a quantity string, got {0}")]
    NotAQuantity(String),

    #[error("{0} cannot be converted to an integer")]
    NotAnInteger(String),
}

type CoerceFn = dyn Fn(&Value) -> Result<Value, CoercionError> + Send + Sync;

/// A named value transformation applied before type checking.
#[derive(Clone)]
pub struct Coercer {
    name: String,
    func: Arc<CoerceFn>,
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coercer({})", self.name)
    }
}

impl Coercer {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: &Value) -> Result<Value, CoercionError> {
        (self.func)(value)
    }

    /// Parses quantity strings whose units are compatible with `compatible_units`.
    ///
    /// Quantities that are already compatible pass through, so validated
    /// output can be validated again without change.
    pub fn to_unit(compatible_units: Unit) -> Self {
        let name = format!("to_unit({})", compatible_units);
        Self::new(name, move |value| match value {
            Value::String(text) => Ok(Value::Quantity(parse_quantity(text, Some(&compatible_units))?)),
            Value::Quantity(q) if q.is_compatible(&compatible_units) => Ok(value.clone()),
            Value::Quantity(q) => Err(UnitError::Incompatible {
                found: q.unit().to_string(),
                expected: compatible_units.to_string(),
            }
            .into()),
            other => Err(CoercionError::NotAQuantity(other.to_string())),
        })
    }

    /// Keeps positive infinity, truncates everything else to an integer.
    pub fn to_integer_or_infinity() -> Self {
        Self::new("to_integer_or_infinity", |value| match value {
            Value::Float(x) if *x == f64::INFINITY => Ok(value.clone()),
            other => truncate(other).map(Value::Integer),
        })
    }

    /// Keeps null and the `"checkpoint"` sentinel, truncates everything else to an integer.
    pub fn to_none_int_or_checkpoint() -> Self {
        Self::new("to_none_int_or_checkpoint", |value| match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) if s == CHECKPOINT => Ok(value.clone()),
            other => truncate(other).map(Value::Integer),
        })
    }

    /// Wraps a bare string into a one-element list.
    pub fn single_to_list() -> Self {
        Self::new("single_to_list", |value| match value {
            Value::String(_) => Ok(Value::List(vec![value.clone()])),
            other => Ok(other.clone()),
        })
    }
}

fn truncate(value: &Value) -> Result<i64, CoercionError> {
    let not_an_integer = || CoercionError::NotAnInteger(value.to_string());
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Float(x) if x.is_finite() && x.abs() < i64::MAX as f64 => Ok(x.trunc() as i64),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_an_integer()),
        _ => Err(not_an_integer()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::{FEMTOSECOND, KELVIN, PICOSECOND, Quantity};

    #[test]
    fn to_unit_parses_compatible_strings() {
        let coercer = Coercer::to_unit(FEMTOSECOND.into());
        let value = coercer.apply(&Value::from("2.0*picoseconds")).unwrap();
        let quantity = value.as_quantity().unwrap();
        assert!((quantity.value_in(&FEMTOSECOND.into()).unwrap() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn to_unit_rejects_incompatible_and_non_strings() {
        let coercer = Coercer::to_unit(FEMTOSECOND.into());
        assert!(matches!(
            coercer.apply(&Value::from("300*kelvin")),
            Err(CoercionError::Units(UnitError::Incompatible { .. }))
        ));
        assert!(matches!(
            coercer.apply(&Value::Quantity(Quantity::new(300.0, KELVIN))),
            Err(CoercionError::Units(UnitError::Incompatible { .. }))
        ));
        assert_eq!(
            coercer.apply(&Value::Integer(2)),
            Err(CoercionError::NotAQuantity("2".into()))
        );
    }

    #[test]
    fn to_unit_is_idempotent_on_quantities() {
        let coercer = Coercer::to_unit(FEMTOSECOND.into());
        let quantity = Value::Quantity(Quantity::new(1.0, PICOSECOND));
        assert_eq!(coercer.apply(&quantity).unwrap(), quantity);
    }

    #[test]
    fn integer_or_infinity_keeps_infinity_and_truncates() {
        let coercer = Coercer::to_integer_or_infinity();
        assert_eq!(
            coercer.apply(&Value::Float(f64::INFINITY)).unwrap(),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(coercer.apply(&Value::Float(3.9)).unwrap(), Value::Integer(3));
        assert_eq!(coercer.apply(&Value::from("12")).unwrap(), Value::Integer(12));
        assert_eq!(coercer.apply(&Value::Integer(5)).unwrap(), Value::Integer(5));
        assert!(coercer.apply(&Value::from("many")).is_err());
        assert!(coercer.apply(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn none_int_or_checkpoint_keeps_sentinels() {
        let coercer = Coercer::to_none_int_or_checkpoint();
        assert_eq!(coercer.apply(&Value::Null).unwrap(), Value::Null);
        assert_eq!(
            coercer.apply(&Value::from("checkpoint")).unwrap(),
            Value::from("checkpoint")
        );
        assert_eq!(coercer.apply(&Value::Float(10.0)).unwrap(), Value::Integer(10));
        assert!(coercer.apply(&Value::from("never")).is_err());
    }

    #[test]
    fn single_to_list_only_wraps_strings() {
        let coercer = Coercer::single_to_list();
        assert_eq!(
            coercer.apply(&Value::from("a.mol2")).unwrap(),
            Value::List(vec![Value::from("a.mol2")])
        );
        let list = Value::List(vec![Value::Integer(1)]);
        assert_eq!(coercer.apply(&list).unwrap(), list);
    }
}
