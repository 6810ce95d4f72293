use thiserror::Error;

use crate::core::registry::LookupError;
use crate::schema::error::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("'type' must be specified")]
    MissingType,

    #[error("'type' must be a string, got {found}")]
    InvalidType { found: &'static str },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Validation of {type_name} constructor failed with: {errors}")]
    Validation {
        type_name: String,
        errors: ValidationErrors,
    },

    #[error("Attempt to initialize {type_name} failed with: {message}")]
    Instantiation { type_name: String, message: String },

    #[error("A {composite} must specify a \"{field}\" keyword containing a list of MCMCMoves")]
    MissingField {
        composite: &'static str,
        field: &'static str,
    },

    #[error("\"{field}\" of a {composite} must be a list of constructor descriptions, got {found}")]
    InvalidNested {
        composite: &'static str,
        field: &'static str,
        found: String,
    },

    #[error("Move {index} of the sequence is invalid: {source}")]
    Nested {
        index: usize,
        #[source]
        source: Box<ConstructionError>,
    },
}

impl ConstructionError {
    /// The field failures behind a validation error, if that is what this is.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ConstructionError::Validation { errors, .. } => Some(errors),
            ConstructionError::Nested { source, .. } => source.validation_errors(),
            _ => None,
        }
    }
}
