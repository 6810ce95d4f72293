use super::types::Predicate;
use crate::core::value::{Mapping, Value};
use phf::{Set, phf_set};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

static SMALL_MOLECULE_EXTENSIONS: Set<&'static str> = phf_set! {
    "mol2", "sdf", "smiles", "csv",
};

/// Pre-built system file bundles, in the order they are matched.
const SYSTEM_FILE_BUNDLES: [(SystemFileFormat, [&str; 2]); 4] = [
    (SystemFileFormat::Amber, ["inpcrd", "prmtop"]),
    (SystemFileFormat::Amber, ["rst7", "prmtop"]),
    (SystemFileFormat::Gromacs, ["gro", "top"]),
    (SystemFileFormat::OpenMM, ["pdb", "xml"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemFileFormat {
    Amber,
    Gromacs,
    OpenMM,
}

impl SystemFileFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SystemFileFormat::Amber => "amber",
            SystemFileFormat::Gromacs => "gromacs",
            SystemFileFormat::OpenMM => "openmm",
        }
    }
}

impl fmt::Display for SystemFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The pluggable component families a description can construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Restraint,
    McmcMove,
    Sampler,
}

impl Component {
    pub fn name(&self) -> &'static str {
        match self {
            Component::Restraint => "restraint",
            Component::McmcMove => "MCMC move",
            Component::Sampler => "sampler",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds a component from its description without keeping the result.
///
/// Lets the validator check that a nested description would construct
/// successfully. Failures are returned as their rendered message.
pub trait ComponentBuilder {
    fn try_build(&self, component: Component, description: &Mapping) -> Result<(), String>;
}

/// Domain checks that can be attached to a rule.
#[derive(Debug, Clone)]
pub enum Check {
    FileExists,
    DirectoryExists,
    IsPeptide,
    IsSmallMolecule,
    PositiveIntList,
    IntOrAllString,
    SupportedSystemFiles,
    Constructor(Component),
    Custom(Predicate),
}

impl Check {
    pub fn name(&self) -> &str {
        match self {
            Check::FileExists => "file_exists",
            Check::DirectoryExists => "directory_exists",
            Check::IsPeptide => "is_peptide",
            Check::IsSmallMolecule => "is_small_molecule",
            Check::PositiveIntList => "positive_int_list",
            Check::IntOrAllString => "int_or_all_string",
            Check::SupportedSystemFiles => "supported_system_files",
            Check::Constructor(Component::Restraint) => "is_restraint_constructor",
            Check::Constructor(Component::McmcMove) => "is_mcmc_move_constructor",
            Check::Constructor(Component::Sampler) => "is_sampler_constructor",
            Check::Custom(predicate) => predicate.name(),
        }
    }

    /// Runs the check, returning one message per problem found.
    pub fn run(&self, field: &str, value: &Value, builder: Option<&dyn ComponentBuilder>) -> Vec<String> {
        let mut errors = Vec::new();
        match self {
            Check::FileExists => {
                if let Some(path) = expect_path(value, &mut errors) {
                    if !Path::new(path).is_file() {
                        errors.push(format!("File path {} does not exist.", path));
                    }
                }
            }
            Check::DirectoryExists => {
                if let Some(path) = expect_path(value, &mut errors) {
                    if !Path::new(path).is_dir() {
                        errors.push(format!("Directory {} does not exist.", path));
                    }
                }
            }
            Check::IsPeptide => {
                if let Some(path) = expect_path(value, &mut errors) {
                    if extension(path) != "pdb" {
                        errors.push("Not a .pdb file".to_string());
                    }
                }
            }
            Check::IsSmallMolecule => {
                if let Some(path) = expect_path(value, &mut errors) {
                    if !SMALL_MOLECULE_EXTENSIONS.contains(extension(path)) {
                        errors.push("File is not one of mol2, sdf, smiles, csv".to_string());
                    }
                }
            }
            Check::PositiveIntList => match value {
                Value::List(items) => {
                    for item in items {
                        if !matches!(item, Value::Integer(i) if *i >= 0) {
                            errors.push(format!("{} must be a positive integer", item));
                        }
                    }
                }
                other => errors.push(format!("{} is not a list", other)),
            },
            Check::IntOrAllString => {
                let accepted = matches!(value, Value::Integer(_))
                    || value.as_str() == Some("all");
                if !accepted {
                    errors.push(format!("{} must be an int or the string 'all'", value));
                }
            }
            Check::SupportedSystemFiles => check_system_files(field, value, &mut errors),
            Check::Constructor(component) => match (value, builder) {
                (Value::Mapping(description), Some(builder)) => {
                    if let Err(message) = builder.try_build(*component, description) {
                        errors.push(message);
                    }
                }
                (Value::Mapping(_), None) => errors.push(format!(
                    "no {} catalog is available to check this description",
                    component
                )),
                (other, _) => errors.push(format!(
                    "{} is not a {} description",
                    other, component
                )),
            },
            Check::Custom(predicate) => {
                if let Err(message) = predicate.check(value) {
                    errors.push(message);
                }
            }
        }
        errors
    }
}

fn expect_path<'v>(value: &'v Value, errors: &mut Vec<String>) -> Option<&'v str> {
    let path = value.as_str();
    if path.is_none() {
        errors.push(format!("{} is not a path", value));
    }
    path
}

/// The extension of `path` without the dot, or an empty string.
fn extension(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
}

/// Finds the system format whose extension set equals that of `paths`.
///
/// Matching is case-sensitive and ignores the order of the paths.
pub fn detect_system_file_format<S: AsRef<str>>(paths: &[S]) -> Option<SystemFileFormat> {
    let extensions: BTreeSet<&str> = paths.iter().map(|p| extension(p.as_ref())).collect();
    SYSTEM_FILE_BUNDLES
        .iter()
        .find(|(_, bundle)| {
            let expected: BTreeSet<&str> = bundle.iter().copied().collect();
            expected == extensions
        })
        .map(|(format, _)| *format)
}

fn check_system_files(field: &str, value: &Value, errors: &mut Vec<String>) {
    let Some(items) = value.as_list() else {
        errors.push(format!("{} is not a list of file paths", value));
        return;
    };
    let Some(paths) = items.iter().map(Value::as_str).collect::<Option<Vec<_>>>() else {
        errors.push(format!("{} is not a list of file paths", value));
        return;
    };
    match detect_system_file_format(paths.as_slice()) {
        Some(format) => {
            debug!(field, ?paths, %format, "Recognized system files.");
        }
        None => {
            let accepted = SYSTEM_FILE_BUNDLES
                .iter()
                .map(|(format, bundle)| format!("{} ({})", format, bundle.join(", ")))
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(format!(
                "{} must have file extensions matching one of the following types: {}",
                field, accepted
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn list(paths: &[&str]) -> Value {
        Value::List(paths.iter().map(|p| Value::from(*p)).collect())
    }

    #[test]
    fn file_and_directory_checks_hit_the_filesystem() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("ligand.mol2");
        File::create(&file).unwrap();
        let file = Value::from(file.to_str().unwrap());
        let dir_value = Value::from(dir.path().to_str().unwrap());

        assert!(Check::FileExists.run("f", &file, None).is_empty());
        assert!(Check::DirectoryExists.run("f", &dir_value, None).is_empty());
        assert_eq!(Check::FileExists.run("f", &dir_value, None).len(), 1);

        let missing = Value::from("/definitely/not/here.pdb");
        assert_eq!(
            Check::FileExists.run("f", &missing, None),
            vec!["File path /definitely/not/here.pdb does not exist.".to_string()]
        );
    }

    #[test]
    fn molecule_extension_checks() {
        assert!(Check::IsPeptide.run("f", &Value::from("abl.pdb"), None).is_empty());
        assert_eq!(
            Check::IsPeptide.run("f", &Value::from("abl.PDB"), None),
            vec!["Not a .pdb file".to_string()]
        );
        assert!(Check::IsSmallMolecule.run("f", &Value::from("imatinib.sdf"), None).is_empty());
        assert_eq!(
            Check::IsSmallMolecule.run("f", &Value::from("imatinib.pdb"), None).len(),
            1
        );
    }

    #[test]
    fn positive_int_list_reports_every_offender() {
        let value = Value::List(vec![Value::Integer(1), Value::Integer(-2), Value::Float(3.5)]);
        let errors = Check::PositiveIntList.run("f", &value, None);
        assert_eq!(
            errors,
            vec![
                "-2 must be a positive integer".to_string(),
                "3.5 must be a positive integer".to_string()
            ]
        );
    }

    #[test]
    fn int_or_all_string() {
        assert!(Check::IntOrAllString.run("f", &Value::Integer(4), None).is_empty());
        assert!(Check::IntOrAllString.run("f", &Value::from("all"), None).is_empty());
        assert_eq!(Check::IntOrAllString.run("f", &Value::from("some"), None).len(), 1);
    }

    #[test]
    fn supported_system_files_match_exact_extension_sets() {
        let accepted = [
            (["complex.prmtop", "complex.inpcrd"], SystemFileFormat::Amber),
            (["complex.rst7", "complex.prmtop"], SystemFileFormat::Amber),
            (["complex.top", "complex.gro"], SystemFileFormat::Gromacs),
            (["complex.xml", "complex.pdb"], SystemFileFormat::OpenMM),
        ];
        for (paths, format) in accepted {
            assert_eq!(detect_system_file_format(&paths[..]), Some(format));
            assert!(Check::SupportedSystemFiles.run("phase1_path", &list(&paths), None).is_empty());
        }

        for paths in [
            &["complex.prmtop"][..],
            &["complex.PRMTOP", "complex.inpcrd"][..],
            &["complex.prmtop", "complex.inpcrd", "complex.pdb"][..],
            &["complex.gro", "complex.xml"][..],
        ] {
            assert_eq!(detect_system_file_format(paths), None);
            let errors = Check::SupportedSystemFiles.run("phase1_path", &list(paths), None);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("phase1_path must have file extensions"));
            assert!(errors[0].contains("gromacs (gro, top)"));
        }
    }

    struct Fails;

    impl ComponentBuilder for Fails {
        fn try_build(&self, component: Component, _: &Mapping) -> Result<(), String> {
            Err(format!("cannot build {}", component))
        }
    }

    #[test]
    fn constructor_checks_delegate_to_the_builder() {
        let description = Value::Mapping(Mapping::new());
        let check = Check::Constructor(Component::Restraint);
        assert_eq!(check.name(), "is_restraint_constructor");
        assert_eq!(
            check.run("restraint", &description, Some(&Fails)),
            vec!["cannot build restraint".to_string()]
        );
        assert_eq!(check.run("restraint", &Value::Integer(1), Some(&Fails)).len(), 1);
    }
}
