use crate::cli::{BuildArgs, ComponentKind};
use crate::config::{load_description, parse_defaults};
use crate::error::{CliError, Result};
use kwforge::core::value::Mapping;
use kwforge::engine::catalog::Catalog;
use tracing::info;

/// Builds the described component and returns its debug rendering.
pub fn build_component(
    catalog: &Catalog,
    kind: ComponentKind,
    description: &Mapping,
    defaults: &Mapping,
) -> Result<String> {
    if !defaults.is_empty() && kind != ComponentKind::McmcMove {
        return Err(CliError::Argument(
            "-D/--default only applies to mcmc-move builds".to_string(),
        ));
    }
    let rendered = match kind {
        ComponentKind::Restraint => format!("{:#?}", catalog.build_restraint(description)?),
        ComponentKind::McmcMove => format!("{:#?}", catalog.build_mcmc_move(description, defaults)?),
        ComponentKind::Sampler => format!("{:#?}", catalog.build_sampler(description)?),
    };
    Ok(rendered)
}

pub fn run(args: BuildArgs, catalog: &Catalog) -> Result<()> {
    let description = load_description(&args.description, &args.set_values)?;
    let defaults = parse_defaults(&args.defaults)?;
    info!(
        "Building {} from {:?}",
        kwforge::schema::checks::Component::from(args.kind),
        &args.description
    );
    let rendered = build_component(catalog, args.kind, &description, &defaults)?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::apply_set_values;
    use kwforge::engine::error::ConstructionError;

    fn description(pairs: &[&str]) -> Mapping {
        let mut mapping = Mapping::new();
        let pairs: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
        apply_set_values(&mut mapping, &pairs).unwrap();
        mapping
    }

    #[test]
    fn builds_each_kind() {
        let catalog = Catalog::standard().unwrap();

        let rendered = build_component(
            &catalog,
            ComponentKind::McmcMove,
            &description(&["type=GHMCMove"]),
            &description(&["n_steps=25"]),
        )
        .unwrap();
        assert!(rendered.contains("GHMCMove"));
        assert!(rendered.contains("n_steps: 25"));

        let rendered = build_component(
            &catalog,
            ComponentKind::Sampler,
            &description(&["type=SAMSSampler", "gamma0=2.0"]),
            &Mapping::new(),
        )
        .unwrap();
        assert!(rendered.contains("gamma0: 2.0"));

        assert!(build_component(
            &catalog,
            ComponentKind::Restraint,
            &description(&["type=Harmonic"]),
            &Mapping::new(),
        )
        .is_ok());
    }

    #[test]
    fn defaults_are_only_accepted_for_moves() {
        let catalog = Catalog::standard().unwrap();
        let result = build_component(
            &catalog,
            ComponentKind::Sampler,
            &description(&["type=MultiStateSampler"]),
            &description(&["number_of_iterations=5"]),
        );
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn construction_errors_pass_through() {
        let catalog = Catalog::standard().unwrap();
        let result = build_component(
            &catalog,
            ComponentKind::Restraint,
            &description(&["spring_constant=1.0"]),
            &Mapping::new(),
        );
        assert!(matches!(
            result,
            Err(CliError::Construction(ConstructionError::MissingType))
        ));
    }
}
