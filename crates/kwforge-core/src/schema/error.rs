use std::collections::BTreeMap;
use std::fmt;

/// Field failures collected during one validation pass.
///
/// Paths join nested keys with `.` and list positions by index, e.g.
/// `experiments.restraint` or `molecules.ligand.select.1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, message: impl Into<String>) {
        self.fields
            .entry(path.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn field(&self, path: &str) -> &[String] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, messages)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", path, messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_group_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("n_steps", "must be of integer type");
        errors.add("atoms", "-2 must be a positive integer");
        errors.add("atoms", "3.5 must be a positive integer");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.field("atoms").len(), 2);
        assert!(errors.field("timestep").is_empty());
        assert_eq!(
            errors.to_string(),
            "atoms: -2 must be a positive integer, 3.5 must be a positive integer; \
             n_steps: must be of integer type"
        );
    }
}
