use super::units::Quantity;
use serde::{Deserialize, Deserializer};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use toml::value::Datetime;

/// A keyed collection of configuration values, e.g. a constructor description.
pub type Mapping = BTreeMap<String, Value>;

/// A dynamically typed configuration value.
///
/// Configuration documents arrive as loosely typed trees; validation turns the
/// relevant leaves into their canonical form (for instance a quantity string
/// into [`Value::Quantity`]). Host objects that never appear in configuration
/// files, but may be injected as caller defaults, travel as [`Value::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Binary(Vec<u8>),
    Date(Datetime),
    List(Vec<Value>),
    Mapping(Mapping),
    Quantity(Quantity),
    Opaque(Opaque),
}

/// The runtime type of a [`Value`], used when deriving validation rules from defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeType {
    Null,
    Boolean,
    Binary,
    Date,
    Mapping,
    Float,
    Integer,
    Sequence,
    String,
    Quantity,
    Opaque(OpaqueType),
}

impl NativeType {
    pub fn name(&self) -> &'static str {
        match self {
            NativeType::Null => "null",
            NativeType::Boolean => "bool",
            NativeType::Binary => "bytes",
            NativeType::Date => "date",
            NativeType::Mapping => "mapping",
            NativeType::Float => "float",
            NativeType::Integer => "int",
            NativeType::Sequence => "list",
            NativeType::String => "str",
            NativeType::Quantity => "Quantity",
            NativeType::Opaque(opaque) => opaque.name,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a host type carried inside [`Value::Opaque`].
#[derive(Debug, Clone, Copy)]
pub struct OpaqueType {
    pub name: &'static str,
    id: TypeId,
}

impl PartialEq for OpaqueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueType {}

/// A shared host object with no configuration representation.
#[derive(Clone)]
pub struct Opaque {
    ty: OpaqueType,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            ty: OpaqueType {
                name: std::any::type_name::<T>(),
                id: TypeId::of::<T>(),
            },
            inner: Arc::new(value),
        }
    }

    pub fn native_type(&self) -> OpaqueType {
        self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.ty.name)
    }
}

impl Value {
    pub fn native_type(&self) -> NativeType {
        match self {
            Value::Null => NativeType::Null,
            Value::Boolean(_) => NativeType::Boolean,
            Value::Integer(_) => NativeType::Integer,
            Value::Float(_) => NativeType::Float,
            Value::String(_) => NativeType::String,
            Value::Binary(_) => NativeType::Binary,
            Value::Date(_) => NativeType::Date,
            Value::List(_) => NativeType::Sequence,
            Value::Mapping(_) => NativeType::Mapping,
            Value::Quantity(_) => NativeType::Quantity,
            Value::Opaque(opaque) => NativeType::Opaque(opaque.native_type()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.native_type().name()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            Value::Quantity(q) => Some(q),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Date(date) => write!(f, "{}", date),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Mapping(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Quantity(q) => write!(f, "{}", q),
            Value::Opaque(opaque) => write!(f, "<{}>", opaque.ty.name),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(x) => Value::Float(x),
            toml::Value::Boolean(b) => Value::Boolean(b),
            toml::Value::Datetime(d) => Value::Date(d),
            toml::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Mapping(mapping_from_table(table)),
        }
    }
}

pub fn mapping_from_table(table: toml::Table) -> Mapping {
    table.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        toml::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Self {
        Value::Quantity(q)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}
