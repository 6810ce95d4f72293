use crate::cli::ValidateArgs;
use crate::error::Result;
use kwforge::engine::catalog::Catalog;
use kwforge::workflows::document::{DocumentError, load_and_validate};
use tracing::info;

/// One line per failing field, in path order.
pub fn render_errors(error: &DocumentError) -> Vec<String> {
    match error.validation_errors() {
        Some(errors) => errors
            .iter()
            .flat_map(|(path, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("  ✗ {}: {}", path, message))
            })
            .collect(),
        None => Vec::new(),
    }
}

pub fn run(args: ValidateArgs, catalog: &Catalog) -> Result<()> {
    info!("Validating experiment document {:?}", &args.document);
    match load_and_validate(&args.document, catalog) {
        Ok(document) => {
            println!(
                "✓ {} is valid ({} section(s)).",
                args.document.display(),
                document.len()
            );
            Ok(())
        }
        Err(error) => {
            let lines = render_errors(&error);
            if !lines.is_empty() {
                println!("{} has {} problem(s):", args.document.display(), lines.len());
                for line in &lines {
                    println!("{}", line);
                }
            }
            Err(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reports_each_field_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        fs::write(
            &path,
            "[solvents.vacuum]\nnonbonded_method = \"Reaction\"\n\n[typo]\nkey = 1\n",
        )
        .unwrap();
        let catalog = Catalog::standard().unwrap();

        let error = load_and_validate(&path, &catalog).unwrap_err();
        assert_eq!(
            render_errors(&error),
            [
                "  ✗ solvents.vacuum.nonbonded_method: unallowed value 'Reaction'",
                "  ✗ typo: unknown field",
            ]
        );

        let result = run(ValidateArgs { document: path }, &catalog);
        assert!(matches!(result, Err(CliError::Document(DocumentError::Invalid(_)))));
    }

    #[test]
    fn accepts_an_empty_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();
        let catalog = Catalog::standard().unwrap();
        assert!(run(ValidateArgs { document: path }, &catalog).is_ok());
    }
}
