use crate::core::units::{ATMOSPHERE, FEMTOSECOND, KELVIN, NANOMETER};
use crate::core::value::{Mapping, Value, mapping_from_table};
use crate::engine::catalog::{Catalog, MCMC_MOVES};
use crate::schema::checks::{Check, Component};
use crate::schema::coercion::Coercer;
use crate::schema::error::ValidationErrors;
use crate::schema::rule::{DefaultSetter, Rule, Schema};
use crate::schema::types::{Predicate, TypeCheck, ValueType};
use crate::schema::validator::{UnknownKeys, Validator};
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid experiment document: {0}")]
    Invalid(ValidationErrors),
}

impl DocumentError {
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DocumentError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Reads a TOML file into a [`Mapping`].
pub fn load_document(path: &Path) -> Result<Mapping, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| DocumentError::Toml {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    Ok(mapping_from_table(table))
}

fn positive_integer() -> Rule {
    Rule::optional().check(TypeCheck::Predicate(Predicate::new(
        "positive_integer",
        |value| match value {
            Value::Integer(i) if *i > 0 => None,
            other => Some(format!("{} must be a positive integer", other)),
        },
    )))
}

fn string() -> Rule {
    Rule::optional().typed(ValueType::String)
}

fn required_string() -> Rule {
    Rule::required().typed(ValueType::String)
}

fn boolean() -> Rule {
    Rule::optional().typed(ValueType::Boolean)
}

fn quantity(coercer: Coercer) -> Rule {
    Rule::optional().coerce(coercer).typed(ValueType::Quantity)
}

/// `leap.parameters`: a file name or list of file names, empty when left out.
fn leap() -> Rule {
    Rule::optional()
        .typed(ValueType::Dict)
        .default_to(DefaultSetter::NoParameters)
        .schema(Schema::new().field(
            "parameters",
            Rule::optional()
                .coerce(Coercer::single_to_list())
                .typed(ValueType::List)
                .items(required_string()),
        ))
}

fn options_schema() -> Schema {
    Schema::new()
        .field("verbose", boolean())
        .field("resume_setup", boolean())
        .field("resume_simulation", boolean())
        .field("minimize", boolean())
        .field("output_dir", string())
        .field("setup_dir", string())
        .field("experiments_dir", string())
        .field(
            "platform",
            string().allowed(["fastest", "CUDA", "OpenCL", "CPU", "Reference"]),
        )
        .field(
            "precision",
            string().allowed(["auto", "double", "mixed", "single"]),
        )
        .field("temperature", quantity(Coercer::to_unit(KELVIN.into())))
        .field(
            "pressure",
            quantity(Coercer::to_unit(ATMOSPHERE.into())).nullable(),
        )
        .field("default_timestep", quantity(Coercer::to_unit(FEMTOSECOND.into())))
        .field("default_nsteps_per_iteration", positive_integer())
        .field(
            "default_number_of_iterations",
            Rule::optional().coerce(Coercer::to_integer_or_infinity()),
        )
        .field(
            "switch_experiment_interval",
            Rule::optional().coerce(Coercer::to_integer_or_infinity()),
        )
        .field("checkpoint_interval", positive_integer())
        .field("processes_per_experiment", positive_integer().nullable())
}

fn peptide_schema() -> Schema {
    Schema::new()
        .field(
            "filepath",
            required_string().with(Check::IsPeptide).with(Check::FileExists),
        )
        .field("select", Rule::optional().with(Check::IntOrAllString))
        .field("strip_protons", boolean())
        .field("leap", leap())
}

fn small_molecule_schema() -> Schema {
    Schema::new()
        .field(
            "filepath",
            required_string()
                .with(Check::IsSmallMolecule)
                .with(Check::FileExists),
        )
        .field("select", Rule::optional().with(Check::IntOrAllString))
        .field("net_charge", Rule::optional().nullable().typed(ValueType::Integer))
        .field(
            "antechamber",
            Rule::optional().typed(ValueType::Dict).schema(
                Schema::new().field("charge_method", string().nullable()),
            ),
        )
        .field(
            "openeye",
            Rule::optional()
                .typed(ValueType::Dict)
                .schema(Schema::new().field("quacpac", required_string().allowed(["am1-bcc"]))),
        )
        .field("leap", leap())
}

fn solvent_schema() -> Schema {
    Schema::new()
        .field(
            "nonbonded_method",
            required_string().allowed(["NoCutoff", "CutoffPeriodic", "CutoffNonPeriodic", "PME", "Ewald"]),
        )
        .field("nonbonded_cutoff", quantity(Coercer::to_unit(NANOMETER.into())))
        .field("clearance", quantity(Coercer::to_unit(NANOMETER.into())))
        .field(
            "implicit_solvent",
            string()
                .nullable()
                .allowed(["OBC1", "OBC2", "GBn", "GBn2", "HCT"]),
        )
        .field(
            "solvent_model",
            string().allowed(["tip3p", "tip4pew", "tip5p", "spce"]),
        )
        .field("positive_ion", string())
        .field("negative_ion", string())
        .field("leap", leap())
}

fn system_file_list() -> Rule {
    Rule::required()
        .typed(ValueType::List)
        .items(required_string())
        .with(Check::SupportedSystemFiles)
}

fn binding_system_schema() -> Schema {
    Schema::new()
        .field("receptor", required_string())
        .field("ligand", required_string())
        .field("solvent", required_string())
        .field("pack", boolean())
        .field("leap", leap())
}

fn hydration_system_schema() -> Schema {
    Schema::new()
        .field("solute", required_string())
        .field("solvent1", required_string())
        .field("solvent2", required_string())
        .field("leap", leap())
}

fn prebuilt_system_schema() -> Schema {
    Schema::new()
        .field("phase1_path", system_file_list())
        .field("phase2_path", system_file_list())
        .field("ligand_dsl", required_string())
        .field("solvent", string())
        .field("gromacs_include_dir", string().with(Check::DirectoryExists))
}

fn experiment_entry_schema() -> Schema {
    Schema::new()
        .field("system", required_string())
        .field("protocol", required_string())
        .field("sampler", string())
        .field("options", Rule::optional().typed(ValueType::Dict))
        .field(
            "restraint",
            Rule::optional()
                .typed(ValueType::Dict)
                .with(Check::Constructor(Component::Restraint)),
        )
}

fn named(rule: Rule) -> Rule {
    Rule::optional().typed(ValueType::Dict).values(rule)
}

fn section(schema: Schema) -> Rule {
    named(Rule::required().typed(ValueType::Dict).schema(schema))
}

fn constructors(component: Component) -> Rule {
    named(
        Rule::required()
            .typed(ValueType::Dict)
            .with(Check::Constructor(component)),
    )
}

/// The schema every experiment document is validated against.
pub fn experiment_schema() -> Schema {
    Schema::new()
        .field(
            "options",
            Rule::optional().typed(ValueType::Dict).schema(options_schema()),
        )
        .field(
            "molecules",
            named(Rule::required().any_of(vec![
                Rule::required().typed(ValueType::Dict).schema(peptide_schema()),
                Rule::required()
                    .typed(ValueType::Dict)
                    .schema(small_molecule_schema()),
            ])),
        )
        .field("solvents", section(solvent_schema()))
        .field(
            "systems",
            named(Rule::required().any_of(vec![
                Rule::required()
                    .typed(ValueType::Dict)
                    .schema(binding_system_schema()),
                Rule::required()
                    .typed(ValueType::Dict)
                    .schema(hydration_system_schema()),
                Rule::required()
                    .typed(ValueType::Dict)
                    .schema(prebuilt_system_schema()),
            ])),
        )
        .field("mcmc_moves", constructors(Component::McmcMove))
        .field("samplers", constructors(Component::Sampler))
        .field("protocols", named(Rule::required().typed(ValueType::Dict)))
        .field("experiments", section(experiment_entry_schema()))
}

/// Names defined in a top-level section of the normalized document.
fn defined<'d>(document: &'d Mapping, section: &str) -> Vec<&'d str> {
    document
        .get(section)
        .and_then(Value::as_mapping)
        .map(|entries| entries.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Reports `section.entry.field` values that do not name an entry of `target`.
fn check_references(
    document: &Mapping,
    section: &str,
    fields: &[&str],
    target: &str,
    errors: &mut ValidationErrors,
) {
    let known = defined(document, target);
    let Some(entries) = document.get(section).and_then(Value::as_mapping) else {
        return;
    };
    for (name, entry) in entries {
        let Some(entry) = entry.as_mapping() else {
            continue;
        };
        for field in fields {
            if let Some(reference) = entry.get(*field).and_then(Value::as_str) {
                if !known.contains(&reference) {
                    errors.add(
                        &format!("{}.{}.{}", section, name, field),
                        format!("'{}' is not defined in {}", reference, target),
                    );
                }
            }
        }
    }
}

fn check_cross_references(document: &Mapping) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    check_references(document, "systems", &["receptor", "ligand", "solute"], "molecules", &mut errors);
    check_references(document, "systems", &["solvent", "solvent1", "solvent2"], "solvents", &mut errors);
    check_references(document, "experiments", &["system"], "systems", &mut errors);
    check_references(document, "experiments", &["protocol"], "protocols", &mut errors);
    check_references(document, "experiments", &["sampler"], "samplers", &mut errors);
    check_references(document, "samplers", &[MCMC_MOVES], "mcmc_moves", &mut errors);
    errors
}

/// Validates an experiment document, returning its normalized copy.
///
/// Component descriptions are dry-run built through `catalog`. Cross
/// references between sections are only checked once the schema passes.
///
/// # Errors
///
/// Returns every schema or cross-reference failure found.
pub fn validate_document(document: &Mapping, catalog: &Catalog) -> Result<Mapping, ValidationErrors> {
    let normalized = Validator::new()
        .with_builder(catalog)
        .unknown_keys(UnknownKeys::Reject)
        .validate(document, &experiment_schema())
        .inspect_err(|errors| {
            warn!(
                errors = errors.len(),
                "Schema validation failed, skipping cross-reference checks."
            )
        })?;

    let errors = check_cross_references(&normalized);
    if errors.is_empty() {
        Ok(normalized)
    } else {
        Err(errors)
    }
}

/// Loads the document at `path` and validates it.
#[instrument(skip_all, name = "validate_document", fields(path = %path.display()))]
pub fn load_and_validate(path: &Path, catalog: &Catalog) -> Result<Mapping, DocumentError> {
    let document = load_document(path)?;
    let normalized = validate_document(&document, catalog).map_err(DocumentError::Invalid)?;
    info!(sections = normalized.len(), "Experiment document is valid.");
    Ok(normalized)
}
