use clap::{Args, Parser, Subcommand, ValueEnum};
use kwforge::schema::checks::Component;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The kwforge developers",
    version,
    about = "kwforge CLI - Validate experiment documents and build simulation components from type-tagged TOML descriptions.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate an experiment document and report every field error.
    Validate(ValidateArgs),
    /// Build a single component from a TOML constructor description.
    Build(BuildArgs),
    /// Print the schema derived for a registered type.
    Schema(SchemaArgs),
    /// List the registered type names.
    List(ListArgs),
}

/// The component families the CLI can build.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Restraint,
    McmcMove,
    Sampler,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::Restraint,
        ComponentKind::McmcMove,
        ComponentKind::Sampler,
    ];
}

impl From<ComponentKind> for Component {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Restraint => Component::Restraint,
            ComponentKind::McmcMove => Component::McmcMove,
            ComponentKind::Sampler => Component::Sampler,
        }
    }
}

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the experiment document in TOML format.
    #[arg(required = true, value_name = "PATH")]
    pub document: PathBuf,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// The component family the description belongs to.
    #[arg(value_enum)]
    pub kind: ComponentKind,

    /// Path to the constructor description in TOML format.
    #[arg(required = true, value_name = "PATH")]
    pub description: PathBuf,

    /// Set a description value, overriding the file.
    /// Can be used multiple times. Example: -S n_steps=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Provide a default for parameters the description leaves out (MCMC moves only).
    /// Can be used multiple times. Example: -D timestep=2.0*femtoseconds
    #[arg(short = 'D', long = "default", value_name = "KEY=VALUE", num_args(0..))]
    pub defaults: Vec<String>,
}

/// Arguments for the `schema` subcommand.
#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// The component family of the type.
    #[arg(value_enum)]
    pub kind: ComponentKind,

    /// The registered type name, e.g. `LangevinDynamicsMove`.
    #[arg(required = true, value_name = "TYPE")]
    pub type_name: String,
}

/// Arguments for the `list` subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list this component family.
    #[arg(value_enum)]
    pub kind: Option<ComponentKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_with_overrides_and_defaults() {
        let cli = Cli::parse_from([
            "kwforge",
            "-vv",
            "build",
            "mcmc-move",
            "move.toml",
            "-S",
            "n_steps=10",
            "-D",
            "timestep=2.0*femtoseconds",
            "-D",
            "collision_rate=5.0/picoseconds",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.kind, ComponentKind::McmcMove);
                assert_eq!(args.description, PathBuf::from("move.toml"));
                assert_eq!(args.set_values, ["n_steps=10"]);
                assert_eq!(args.defaults.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn list_kind_is_optional() {
        let cli = Cli::parse_from(["kwforge", "list"]);
        assert!(matches!(cli.command, Commands::List(ListArgs { kind: None })));

        let cli = Cli::parse_from(["kwforge", "--quiet", "list", "sampler"]);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::List(ListArgs {
                kind: Some(ComponentKind::Sampler)
            })
        ));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["kwforge", "-q", "-v", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn schema_requires_a_type_name() {
        assert!(Cli::try_parse_from(["kwforge", "schema", "restraint"]).is_err());
        let cli = Cli::parse_from(["kwforge", "schema", "restraint", "Harmonic"]);
        match cli.command {
            Commands::Schema(args) => assert_eq!(args.type_name, "Harmonic"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
