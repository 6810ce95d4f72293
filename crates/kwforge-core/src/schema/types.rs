use crate::core::value::{NativeType, Value};
use std::fmt;
use std::sync::Arc;

/// Structural type tokens understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Boolean,
    Binary,
    Date,
    Dict,
    Float,
    Integer,
    List,
    String,
    Quantity,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Binary => "binary",
            ValueType::Date => "date",
            ValueType::Dict => "dict",
            ValueType::Float => "float",
            ValueType::Integer => "integer",
            ValueType::List => "list",
            ValueType::String => "string",
            ValueType::Quantity => "quantity",
        }
    }

    /// Integers are accepted where floats are expected; booleans never count as numbers.
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::Boolean, Value::Boolean(_))
                | (ValueType::Binary, Value::Binary(_))
                | (ValueType::Date, Value::Date(_))
                | (ValueType::Dict, Value::Mapping(_))
                | (ValueType::Float, Value::Float(_) | Value::Integer(_))
                | (ValueType::Integer, Value::Integer(_))
                | (ValueType::List, Value::List(_))
                | (ValueType::String, Value::String(_))
                | (ValueType::Quantity, Value::Quantity(_))
        )
    }

    /// Brings an accepted value into canonical form.
    pub(crate) fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (ValueType::Float, Value::Integer(i)) => Value::Float(i as f64),
            (_, value) => value,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named validation function returning an error message on rejection.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self.func)(value) {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({})", self.name)
    }
}

/// The structural part of a rule: a type token or a custom predicate.
#[derive(Debug, Clone)]
pub enum TypeCheck {
    Type(ValueType),
    Predicate(Predicate),
}

impl TypeCheck {
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            TypeCheck::Type(ty) if ty.matches(value) => Ok(()),
            TypeCheck::Type(ty) => Err(format!("must be of {} type", ty)),
            TypeCheck::Predicate(predicate) => predicate.check(value),
        }
    }
}

impl fmt::Display for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeCheck::Type(ty) => write!(f, "type={}", ty),
            TypeCheck::Predicate(predicate) => write!(f, "validator={}", predicate.name()),
        }
    }
}

/// Maps the native type of a default value to the check its parameter gets.
///
/// Types without a structural token are checked for an exact type match.
pub fn type_to_check(native: &NativeType) -> TypeCheck {
    let token = match native {
        NativeType::Boolean => ValueType::Boolean,
        NativeType::Binary => ValueType::Binary,
        NativeType::Date => ValueType::Date,
        NativeType::Mapping => ValueType::Dict,
        NativeType::Float => ValueType::Float,
        NativeType::Integer => ValueType::Integer,
        NativeType::Sequence => ValueType::List,
        NativeType::String => ValueType::String,
        other => return TypeCheck::Predicate(exact_type_predicate(*other)),
    };
    TypeCheck::Type(token)
}

/// Accepts a value only when its runtime type is exactly `expected`.
pub fn exact_type_predicate(expected: NativeType) -> Predicate {
    Predicate::new(format!("is_{}", expected.name()), move |value| {
        if value.native_type() == expected {
            None
        } else {
            Some(format!("must be of type {}", expected.name()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::{NANOMETER, Quantity};
    use crate::core::value::Opaque;

    #[test]
    fn known_native_types_map_to_tokens() {
        let cases = [
            (NativeType::Boolean, ValueType::Boolean),
            (NativeType::Integer, ValueType::Integer),
            (NativeType::Float, ValueType::Float),
            (NativeType::String, ValueType::String),
            (NativeType::Sequence, ValueType::List),
            (NativeType::Mapping, ValueType::Dict),
        ];
        for (native, token) in cases {
            assert!(matches!(type_to_check(&native), TypeCheck::Type(t) if t == token));
        }
    }

    #[test]
    fn float_accepts_integers_but_integer_rejects_floats_and_bools() {
        assert!(ValueType::Float.matches(&Value::Integer(2)));
        assert!(!ValueType::Integer.matches(&Value::Float(2.0)));
        assert!(!ValueType::Integer.matches(&Value::Boolean(true)));
        assert_eq!(ValueType::Float.normalize(Value::Integer(2)), Value::Float(2.0));
        assert_eq!(
            TypeCheck::Type(ValueType::Integer).check(&Value::from("3")),
            Err("must be of integer type".to_string())
        );
    }

    #[test]
    fn unknown_types_get_an_exact_type_predicate() {
        struct Topology;
        let sample = Value::Opaque(Opaque::new(Topology));
        let check = type_to_check(&sample.native_type());
        assert!(matches!(check, TypeCheck::Predicate(_)));
        assert!(check.check(&Value::Opaque(Opaque::new(Topology))).is_ok());

        let message = check.check(&Value::Integer(1)).unwrap_err();
        assert!(message.starts_with("must be of type "));
        assert!(message.contains("Topology"));
    }

    #[test]
    fn quantity_native_type_requires_a_quantity() {
        let check = type_to_check(&NativeType::Quantity);
        assert!(check.check(&Value::Quantity(Quantity::new(1.0, NANOMETER))).is_ok());
        assert_eq!(
            check.check(&Value::from("1.0*nanometer")),
            Err("must be of type Quantity".to_string())
        );
    }
}
