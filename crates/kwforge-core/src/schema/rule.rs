use super::checks::Check;
use super::coercion::Coercer;
use super::types::{TypeCheck, ValueType};
use crate::core::value::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Fills in a value for a field the document leaves out.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultSetter {
    /// An empty parameter list, `{ parameters = [] }`.
    NoParameters,
    Value(Value),
}

impl DefaultSetter {
    pub fn apply(&self) -> Value {
        match self {
            DefaultSetter::NoParameters => {
                let mut map = Mapping::new();
                map.insert("parameters".to_string(), Value::List(Vec::new()));
                Value::Mapping(map)
            }
            DefaultSetter::Value(value) => value.clone(),
        }
    }
}

/// Validation rule for a single field.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub required: bool,
    pub nullable: bool,
    pub check: Option<TypeCheck>,
    pub coerce: Option<Coercer>,
    pub checks: Vec<Check>,
    pub default: Option<DefaultSetter>,
    pub schema: Option<Schema>,
    pub values: Option<Box<Rule>>,
    pub items: Option<Box<Rule>>,
    pub any_of: Vec<Rule>,
    pub allowed: Option<Vec<Value>>,
}

impl Rule {
    /// An optional field with no constraints.
    pub fn optional() -> Self {
        Self::default()
    }

    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn typed(self, ty: ValueType) -> Self {
        self.check(TypeCheck::Type(ty))
    }

    pub fn check(mut self, check: TypeCheck) -> Self {
        self.check = Some(check);
        self
    }

    pub fn coerce(mut self, coercer: Coercer) -> Self {
        self.coerce = Some(coercer);
        self
    }

    pub fn with(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn default_to(mut self, setter: DefaultSetter) -> Self {
        self.default = Some(setter);
        self
    }

    /// Validates a mapping value against a nested schema.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Validates every value of a mapping with `rule`.
    pub fn values(mut self, rule: Rule) -> Self {
        self.values = Some(Box::new(rule));
        self
    }

    /// Validates every item of a list with `rule`.
    pub fn items(mut self, rule: Rule) -> Self {
        self.items = Some(Box::new(rule));
        self
    }

    pub fn any_of(mut self, alternatives: Vec<Rule>) -> Self {
        self.any_of = alternatives;
        self
    }

    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![if self.required { "required" } else { "optional" }.to_string()];
        if self.nullable {
            parts.push("nullable".to_string());
        }
        if let Some(check) = &self.check {
            parts.push(check.to_string());
        }
        if let Some(coercer) = &self.coerce {
            parts.push(format!("coerce={}", coercer.name()));
        }
        for check in &self.checks {
            parts.push(check.name().to_string());
        }
        if let Some(default) = &self.default {
            parts.push(format!("default={}", default.apply()));
        }
        if let Some(allowed) = &self.allowed {
            parts.push(format!("allowed={}", Value::List(allowed.clone())));
        }
        if let Some(schema) = &self.schema {
            parts.push(format!("schema=[{}]", schema.keys().collect::<Vec<_>>().join(", ")));
        }
        if !self.any_of.is_empty() {
            parts.push(format!("any_of={} alternatives", self.any_of.len()));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Field name to rule.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: BTreeMap<String, Rule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, builder style.
    pub fn field(mut self, name: &str, rule: Rule) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn insert(&mut self, name: &str, rule: Rule) -> Option<Rule> {
        self.rules.insert(name.to_string(), rule)
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl IntoIterator for Schema {
    type Item = (String, Rule);
    type IntoIter = std::collections::btree_map::IntoIter<String, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl Extend<(String, Rule)> for Schema {
    fn extend<T: IntoIterator<Item = (String, Rule)>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

impl FromIterator<(String, Rule)> for Schema {
    fn from_iter<T: IntoIterator<Item = (String, Rule)>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}
