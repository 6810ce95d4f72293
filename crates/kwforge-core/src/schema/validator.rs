use super::checks::ComponentBuilder;
use super::error::ValidationErrors;
use super::rule::{Rule, Schema};
use super::types::TypeCheck;
use crate::core::value::{Mapping, Value};

/// What to do with document keys the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    #[default]
    Reject,
    Allow,
}

/// Applies a [`Schema`] to a mapping, normalizing values and collecting every failure.
///
/// For each field the validator applies, in order: the default setter for
/// absent fields, the null check, the coercion, the alternatives, the type
/// check, the allowed values, nested rules and finally the domain checks. A
/// field that fails before its domain checks is not checked further.
#[derive(Clone, Copy, Default)]
pub struct Validator<'a> {
    builder: Option<&'a dyn ComponentBuilder>,
    unknown: UnknownKeys,
}

impl<'a> Validator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the constructor checks, which dry-run builds through `builder`.
    pub fn with_builder(mut self, builder: &'a dyn ComponentBuilder) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn unknown_keys(mut self, unknown: UnknownKeys) -> Self {
        self.unknown = unknown;
        self
    }

    /// Validates `document`, returning the normalized copy.
    ///
    /// # Errors
    ///
    /// Returns every field failure found, keyed by field path.
    pub fn validate(&self, document: &Mapping, schema: &Schema) -> Result<Mapping, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let normalized = self.validate_mapping("", document, schema, &mut errors);
        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(errors)
        }
    }

    fn validate_mapping(
        &self,
        prefix: &str,
        document: &Mapping,
        schema: &Schema,
        errors: &mut ValidationErrors,
    ) -> Mapping {
        let mut normalized = Mapping::new();

        for (key, value) in document {
            if !schema.contains_key(key) {
                match self.unknown {
                    UnknownKeys::Reject => errors.add(&join(prefix, key), "unknown field"),
                    UnknownKeys::Allow => {
                        normalized.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        for (key, rule) in schema.iter() {
            let path = join(prefix, key);
            let value = match (document.get(key), &rule.default) {
                (Some(value), _) => value.clone(),
                (None, Some(setter)) => setter.apply(),
                (None, None) => {
                    if rule.required {
                        errors.add(&path, "required field");
                    }
                    continue;
                }
            };
            if let Some(value) = self.validate_value(&path, value, rule, errors) {
                normalized.insert(key.to_string(), value);
            }
        }
        normalized
    }

    fn validate_value(
        &self,
        path: &str,
        mut value: Value,
        rule: &Rule,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        if value.is_null() {
            if rule.nullable {
                return Some(value);
            }
            errors.add(path, "null value not allowed");
            return None;
        }

        if let Some(coercer) = &rule.coerce {
            match coercer.apply(&value) {
                Ok(coerced) => value = coerced,
                Err(e) => {
                    errors.add(path, format!("field '{}' cannot be coerced: {}", leaf(path), e));
                    return None;
                }
            }
        }

        if !rule.any_of.is_empty() {
            value = self.validate_alternatives(path, value, &rule.any_of, errors)?;
        }

        if let Some(check) = &rule.check {
            if let Err(message) = check.check(&value) {
                errors.add(path, message);
                return None;
            }
            if let TypeCheck::Type(ty) = check {
                value = ty.normalize(value);
            }
        }

        if let Some(allowed) = &rule.allowed {
            if !allowed.contains(&value) {
                errors.add(path, format!("unallowed value {}", value));
                return None;
            }
        }

        value = self.validate_nested(path, value, rule, errors)?;

        for check in &rule.checks {
            for message in check.run(leaf(path), &value, self.builder) {
                errors.add(path, message);
            }
        }
        Some(value)
    }

    fn validate_alternatives(
        &self,
        path: &str,
        value: Value,
        alternatives: &[Rule],
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        let mut failures = Vec::with_capacity(alternatives.len());
        for (i, alternative) in alternatives.iter().enumerate() {
            let mut scratch = ValidationErrors::new();
            let candidate = self.validate_value(path, value.clone(), alternative, &mut scratch);
            match candidate {
                Some(normalized) if scratch.is_empty() => return Some(normalized),
                _ => failures.push(format!("definition {}: {}", i, scratch)),
            }
        }
        errors.add(path, "no definitions validate");
        for failure in failures {
            errors.add(path, failure);
        }
        None
    }

    fn validate_nested(
        &self,
        path: &str,
        value: Value,
        rule: &Rule,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        match value {
            Value::Mapping(map) if rule.schema.is_some() || rule.values.is_some() => {
                let mut map = match &rule.schema {
                    Some(schema) => self.validate_mapping(path, &map, schema, errors),
                    None => map,
                };
                if let Some(values_rule) = &rule.values {
                    map = map
                        .into_iter()
                        .filter_map(|(key, item)| {
                            let item_path = join(path, &key);
                            self.validate_value(&item_path, item, values_rule, errors)
                                .map(|v| (key, v))
                        })
                        .collect();
                }
                Some(Value::Mapping(map))
            }
            Value::List(items) if rule.items.is_some() => {
                let items_rule = rule.items.as_deref()?;
                let items = items
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        self.validate_value(&join(path, &i.to_string()), item, items_rule, errors)
                    })
                    .collect();
                Some(Value::List(items))
            }
            other if rule.schema.is_some() => {
                errors.add(path, format!("{} must be of dict type", other));
                None
            }
            other => Some(other),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// The last component of a field path.
fn leaf(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::{FEMTOSECOND, Quantity};
    use crate::schema::checks::{Check, Component};
    use crate::schema::coercion::Coercer;
    use crate::schema::rule::DefaultSetter;
    use crate::schema::types::ValueType;

    fn doc(pairs: &[(&str, Value)]) -> Mapping {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn move_schema() -> Schema {
        Schema::new()
            .field("n_steps", Rule::optional().typed(ValueType::Integer))
            .field("collision_rate", Rule::optional().typed(ValueType::Float))
            .field(
                "timestep",
                Rule::optional().coerce(Coercer::to_unit(FEMTOSECOND.into())),
            )
            .field("atom_subset", Rule::optional().nullable())
    }

    #[test]
    fn valid_documents_are_normalized() {
        let document = doc(&[
            ("n_steps", Value::Integer(500)),
            ("collision_rate", Value::Integer(5)),
            ("timestep", Value::from("2.0*femtoseconds")),
            ("atom_subset", Value::Null),
        ]);
        let validated = Validator::new().validate(&document, &move_schema()).unwrap();

        assert_eq!(validated["collision_rate"], Value::Float(5.0));
        assert_eq!(
            validated["timestep"],
            Value::Quantity(Quantity::new(2.0, FEMTOSECOND))
        );
        assert_eq!(validated["atom_subset"], Value::Null);
        assert!(!validated.contains_key("missing"));
    }

    #[test]
    fn revalidating_normalized_output_is_a_no_op() {
        let document = doc(&[
            ("collision_rate", Value::Integer(5)),
            ("timestep", Value::from("2.0*femtoseconds")),
        ]);
        let validator = Validator::new();
        let first = validator.validate(&document, &move_schema()).unwrap();
        let second = validator.validate(&first, &move_schema()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn all_field_failures_are_reported_together() {
        let document = doc(&[
            ("n_steps", Value::Float(1.5)),
            ("timestep", Value::from("2.0*kelvin")),
            ("typo", Value::Integer(1)),
        ]);
        let errors = Validator::new()
            .validate(&document, &move_schema())
            .unwrap_err();

        assert_eq!(errors.field("n_steps"), ["must be of integer type"]);
        assert!(errors.field("timestep")[0].starts_with("field 'timestep' cannot be coerced"));
        assert_eq!(errors.field("typo"), ["unknown field"]);
    }

    #[test]
    fn unknown_keys_can_be_allowed() {
        let document = doc(&[("typo", Value::Integer(1))]);
        let validated = Validator::new()
            .unknown_keys(UnknownKeys::Allow)
            .validate(&document, &move_schema())
            .unwrap();
        assert_eq!(validated["typo"], Value::Integer(1));
    }

    #[test]
    fn null_requires_nullable() {
        let document = doc(&[("n_steps", Value::Null)]);
        let errors = Validator::new()
            .validate(&document, &move_schema())
            .unwrap_err();
        assert_eq!(errors.field("n_steps"), ["null value not allowed"]);
    }

    #[test]
    fn nested_schemas_items_and_defaults() {
        let schema = Schema::new()
            .field("required", Rule::required().typed(ValueType::String))
            .field(
                "leap",
                Rule::optional()
                    .typed(ValueType::Dict)
                    .default_to(DefaultSetter::NoParameters)
                    .schema(Schema::new().field(
                        "parameters",
                        Rule::optional()
                            .coerce(Coercer::single_to_list())
                            .items(Rule::optional().typed(ValueType::String)),
                    )),
            )
            .field(
                "select",
                Rule::optional().items(Rule::optional().typed(ValueType::Integer)),
            );

        let document = doc(&[
            ("required", Value::from("x")),
            (
                "select",
                Value::List(vec![Value::Integer(1), Value::from("two")]),
            ),
        ]);
        let errors = Validator::new().validate(&document, &schema).unwrap_err();
        assert_eq!(errors.field("select.1"), ["must be of integer type"]);
        assert_eq!(errors.len(), 1);

        let document = doc(&[("required", Value::from("x"))]);
        let validated = Validator::new().validate(&document, &schema).unwrap();
        let leap = validated["leap"].as_mapping().unwrap();
        assert_eq!(leap["parameters"], Value::List(vec![]));

        let errors = Validator::new().validate(&Mapping::new(), &schema).unwrap_err();
        assert_eq!(errors.field("required"), ["required field"]);
    }

    #[test]
    fn any_of_picks_the_first_matching_alternative() {
        let schema = Schema::new().field(
            "filepath",
            Rule::required().any_of(vec![
                Rule::optional().with(Check::IsPeptide),
                Rule::optional().with(Check::IsSmallMolecule),
            ]),
        );
        let document = doc(&[("filepath", Value::from("ligand.sdf"))]);
        assert!(Validator::new().validate(&document, &schema).is_ok());

        let document = doc(&[("filepath", Value::from("ligand.txt"))]);
        let errors = Validator::new().validate(&document, &schema).unwrap_err();
        let messages = errors.field("filepath");
        assert_eq!(messages[0], "no definitions validate");
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn allowed_values_and_per_value_rules() {
        let schema = Schema::new()
            .field("mode", Rule::optional().allowed(["fast", "slow"]))
            .field(
                "weights",
                Rule::optional().values(Rule::optional().typed(ValueType::Float)),
            );
        let mut weights = Mapping::new();
        weights.insert("a".into(), Value::Integer(1));
        weights.insert("b".into(), Value::from("heavy"));
        let document = doc(&[
            ("mode", Value::from("medium")),
            ("weights", Value::Mapping(weights)),
        ]);
        let errors = Validator::new().validate(&document, &schema).unwrap_err();
        assert_eq!(errors.field("mode"), ["unallowed value 'medium'"]);
        assert_eq!(errors.field("weights.b"), ["must be of float type"]);
        assert!(errors.field("weights.a").is_empty());
    }

    #[test]
    fn constructor_checks_without_builder_are_errors() {
        let schema = Schema::new().field(
            "restraint",
            Rule::optional().with(Check::Constructor(Component::Restraint)),
        );
        let document = doc(&[("restraint", Value::Mapping(Mapping::new()))]);
        let errors = Validator::new().validate(&document, &schema).unwrap_err();
        assert_eq!(errors.field("restraint").len(), 1);
    }
}
