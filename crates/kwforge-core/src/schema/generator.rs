use super::coercion::Coercer;
use super::rule::{Rule, Schema};
use super::types::type_to_check;
use crate::core::signature::Signature;
use crate::core::value::Value;
use tracing::debug;

/// Derives the schema of the keyword parameters declared by `signature`.
///
/// Every parameter with a default becomes an optional field whose rule
/// follows from the default:
///
/// - a null default accepts anything, including null;
/// - a quantity default accepts quantity strings in compatible units;
/// - any other default must match its type.
///
/// # Arguments
///
/// * `signature` - The parameter declaration of the constructible type.
/// * `overrides` - Rules that replace the derived ones; they are merged last, verbatim.
/// * `excluded` - Parameter keys left out of the schema.
///
/// # Return
///
/// The schema keyed by normalized parameter name.
pub fn generate_schema(signature: &Signature, overrides: Schema, excluded: &[&str]) -> Schema {
    let mut schema = Schema::new();
    for parameter in signature.keyword_parameters() {
        let key = parameter.key();
        if excluded.contains(&key) || overrides.contains_key(key) {
            continue;
        }
        let rule = match parameter.default() {
            Some(Value::Null) => Rule::optional().nullable(),
            Some(Value::Quantity(default)) => {
                Rule::optional().coerce(Coercer::to_unit(default.unit().clone()))
            }
            Some(default) => Rule::optional().check(type_to_check(&default.native_type())),
            None => continue,
        };
        schema.insert(key, rule);
    }
    debug!(
        derived = schema.len(),
        overrides = overrides.len(),
        "Generated signature schema."
    );
    schema.extend(overrides);
    schema
}
