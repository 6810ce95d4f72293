use crate::error::{CliError, Result};
use kwforge::core::value::{Mapping, Value};
use kwforge::workflows::document::load_document;
use std::path::Path;
use tracing::debug;

/// Loads a constructor description and applies the `-S` overrides to it.
pub fn load_description(path: &Path, set_values: &[String]) -> Result<Mapping> {
    debug!("Loading description from file: {:?}", path);
    let mut description = load_document(path)?;
    apply_set_values(&mut description, set_values)?;
    Ok(description)
}

/// Parses `-D` arguments into caller defaults.
pub fn parse_defaults(defaults: &[String]) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    apply_set_values(&mut mapping, defaults)?;
    Ok(mapping)
}

/// Sets each `KEY=VALUE` pair, creating intermediate tables for dotted keys.
pub fn apply_set_values(target: &mut Mapping, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let path: Vec<&str> = key.split('.').map(str::trim).collect();
        if path.iter().any(|segment| segment.is_empty()) {
            return Err(CliError::Config(format!("Invalid key in '{}'", kv_pair)));
        }
        let value = parse_literal(value_str);
        debug!(key, value = %value, "Applying override.");
        insert_path(target, &path, value)?;
    }
    Ok(())
}

/// Parses `text` as a TOML value, keeping it as a plain string when it is not one.
pub fn parse_literal(text: &str) -> Value {
    let text = text.trim();
    toml::from_str::<toml::Table>(&format!("value = {}", text))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .map(Value::from)
        .unwrap_or_else(|| Value::from(text))
}

fn insert_path(target: &mut Mapping, path: &[&str], value: Value) -> Result<()> {
    let (last, parents) = match path.split_last() {
        Some(split) => split,
        None => return Err(CliError::Config("Empty key".to_string())),
    };
    let mut current = target;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = match entry {
            Value::Mapping(map) => map,
            other => {
                return Err(CliError::Config(format!(
                    "Cannot set '{}': '{}' is {}, not a table",
                    path.join("."),
                    parents[..=depth].join("."),
                    other.type_name()
                )));
            }
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}
