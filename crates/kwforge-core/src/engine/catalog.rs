use super::error::ConstructionError;
use super::resolver::{BuildOptions, build, check_type_keyword};
use crate::core::registry::{LookupError, Registry, RegistryError};
use crate::core::signature::DISCRIMINATOR;
use crate::core::value::{Mapping, Value};
use crate::plugins::moves::standard_moves;
use crate::plugins::restraints::standard_restraints;
use crate::plugins::samplers::standard_samplers;
use crate::plugins::{McmcMove, Restraint, Sampler, SequenceMove};
use crate::schema::checks::{Component, ComponentBuilder};
use crate::schema::coercion::Coercer;
use crate::schema::error::ValidationErrors;
use crate::schema::rule::{Rule, Schema};
use crate::schema::types::ValueType;
use tracing::{debug, instrument};

/// The key holding the moves of a [`SequenceMove`] description.
pub const MOVE_LIST: &str = "move_list";

/// The key a sampler description may use to reference its moves.
pub const MCMC_MOVES: &str = "mcmc_moves";

/// The registries of every component family.
#[derive(Debug)]
pub struct Catalog {
    restraints: Registry<dyn Restraint>,
    moves: Registry<dyn McmcMove>,
    samplers: Registry<dyn Sampler>,
}

impl Catalog {
    pub fn new(
        restraints: Registry<dyn Restraint>,
        moves: Registry<dyn McmcMove>,
        samplers: Registry<dyn Sampler>,
    ) -> Self {
        Self {
            restraints,
            moves,
            samplers,
        }
    }

    /// A catalog of the built-in restraints, moves and samplers.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::new(
            standard_restraints()?,
            standard_moves()?,
            standard_samplers()?,
        ))
    }

    pub fn restraints(&self) -> &Registry<dyn Restraint> {
        &self.restraints
    }

    pub fn moves(&self) -> &Registry<dyn McmcMove> {
        &self.moves
    }

    pub fn samplers(&self) -> &Registry<dyn Sampler> {
        &self.samplers
    }

    pub fn restraint_options() -> BuildOptions {
        BuildOptions::new().convert_quantity_strings(true)
    }

    pub fn move_options(defaults: &Mapping) -> BuildOptions {
        BuildOptions::new()
            .convert_quantity_strings(true)
            .with_defaults(defaults)
    }

    pub fn sampler_options() -> BuildOptions {
        BuildOptions::new()
            .special_coercion("number_of_iterations", Coercer::to_integer_or_infinity())
            .special_coercion("online_analysis_interval", Coercer::to_none_int_or_checkpoint())
    }

    pub fn build_restraint(&self, description: &Mapping) -> Result<Box<dyn Restraint>, ConstructionError> {
        build(&self.restraints, description, &Self::restraint_options())
    }

    /// Builds a move, or a [`SequenceMove`] from the descriptions in its `move_list`.
    ///
    /// `defaults` fill parameters the descriptions leave out, in every nested
    /// move as well. Nested moves come from the plain move registry, so a
    /// sequence cannot contain another sequence.
    #[instrument(skip_all, name = "build_mcmc_move")]
    pub fn build_mcmc_move(
        &self,
        description: &Mapping,
        defaults: &Mapping,
    ) -> Result<Box<dyn McmcMove>, ConstructionError> {
        let type_name = check_type_keyword(description)?;
        if type_name != SequenceMove::TYPE_NAME {
            return build(&self.moves, description, &Self::move_options(defaults));
        }

        let items = match description.get(MOVE_LIST) {
            None => {
                return Err(ConstructionError::MissingField {
                    composite: SequenceMove::TYPE_NAME,
                    field: MOVE_LIST,
                });
            }
            Some(Value::List(items)) => items,
            Some(other) => return Err(invalid_move_list(other)),
        };

        let mut errors = ValidationErrors::new();
        for key in description.keys() {
            if key != DISCRIMINATOR && key != MOVE_LIST {
                errors.add(key, "unknown field");
            }
        }
        if !errors.is_empty() {
            return Err(ConstructionError::Validation {
                type_name: SequenceMove::TYPE_NAME.to_string(),
                errors,
            });
        }

        let options = Self::move_options(defaults);
        let mut moves = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let nested = item.as_mapping().ok_or_else(|| invalid_move_list(item))?;
            let mcmc_move = build(&self.moves, nested, &options)
                .map_err(|source| ConstructionError::Nested {
                    index,
                    source: Box::new(source),
                })?;
            moves.push(mcmc_move);
        }
        debug!(moves = moves.len(), "Assembled move sequence.");
        Ok(Box::new(SequenceMove::new(moves)))
    }

    /// Builds a sampler, ignoring any `mcmc_moves` reference in the description.
    pub fn build_sampler(&self, description: &Mapping) -> Result<Box<dyn Sampler>, ConstructionError> {
        let mut description = description.clone();
        description.remove(MCMC_MOVES);
        build(&self.samplers, &description, &Self::sampler_options())
    }

    /// Type names descriptions of `component` may use, sorted.
    pub fn type_names(&self, component: Component) -> Vec<String> {
        let mut names: Vec<String> = match component {
            Component::Restraint => self.restraints.names().map(str::to_string).collect(),
            Component::McmcMove => self.moves.names().map(str::to_string).collect(),
            Component::Sampler => self.samplers.names().map(str::to_string).collect(),
        };
        if component == Component::McmcMove {
            names.push(SequenceMove::TYPE_NAME.to_string());
            names.sort();
        }
        names
    }

    /// The schema descriptions of `type_name` are validated against, without the `type` key.
    pub fn schema_for(&self, component: Component, type_name: &str) -> Result<Schema, LookupError> {
        match component {
            Component::Restraint => {
                let entry = self.restraints.resolve(type_name)?;
                Ok(Self::restraint_options().schema_for(entry.signature()))
            }
            Component::McmcMove if type_name == SequenceMove::TYPE_NAME => Ok(Schema::new().field(
                MOVE_LIST,
                Rule::required()
                    .typed(ValueType::List)
                    .items(Rule::required().typed(ValueType::Dict)),
            )),
            Component::McmcMove => {
                let entry = self.moves.resolve(type_name)?;
                Ok(Self::move_options(&Mapping::new()).schema_for(entry.signature()))
            }
            Component::Sampler => {
                let entry = self.samplers.resolve(type_name)?;
                Ok(Self::sampler_options().schema_for(entry.signature()))
            }
        }
    }
}

fn invalid_move_list(found: &Value) -> ConstructionError {
    ConstructionError::InvalidNested {
        composite: SequenceMove::TYPE_NAME,
        field: MOVE_LIST,
        found: found.to_string(),
    }
}

impl ComponentBuilder for Catalog {
    fn try_build(&self, component: Component, description: &Mapping) -> Result<(), String> {
        let built = match component {
            Component::Restraint => self.build_restraint(description).map(drop),
            Component::McmcMove => self.build_mcmc_move(description, &Mapping::new()).map(drop),
            Component::Sampler => self.build_sampler(description).map(drop),
        };
        built.map_err(|e| e.to_string())
    }
}
