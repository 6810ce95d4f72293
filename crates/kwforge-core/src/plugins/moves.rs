use super::McmcMove;
use crate::core::kwargs::Kwargs;
use crate::core::registry::{BoxError, Constructible, Registry, RegistryError};
use crate::core::signature::{Signature, SignatureError};
use crate::core::units::{ANGSTROM, FEMTOSECOND, PICOSECOND, Quantity, Unit, UnitError};
use crate::core::value::Value;
use std::any::Any;

/// The move family name used in error messages.
pub const BASE_NAME: &str = "MCMCMove";

fn inverse_picosecond() -> Result<Unit, UnitError> {
    Unit::from(PICOSECOND).powi(-1)
}

/// Integration parameters shared by the dynamics moves.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsParameters {
    pub timestep: Quantity,
    pub collision_rate: Quantity,
    pub n_steps: u64,
}

impl DynamicsParameters {
    fn read(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let timestep = kwargs.quantity("timestep", &FEMTOSECOND.into())?;
        if timestep.value() <= 0.0 {
            return Err(format!("timestep must be positive, got {}", timestep).into());
        }
        let collision_rate = kwargs.quantity("collision_rate", &inverse_picosecond()?)?;
        if collision_rate.value() < 0.0 {
            return Err(format!("collision_rate cannot be negative, got {}", collision_rate).into());
        }
        let n_steps = kwargs.integer("n_steps")?;
        if n_steps <= 0 {
            return Err(format!("n_steps must be a positive integer, got {}", n_steps).into());
        }
        Ok(Self {
            timestep,
            collision_rate,
            n_steps: n_steps as u64,
        })
    }
}

/// Langevin dynamics with the BAOAB integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct LangevinDynamicsMove {
    pub dynamics: DynamicsParameters,
    pub reassign_velocities: bool,
    pub n_restart_attempts: u32,
    pub constraint_tolerance: f64,
}

impl Constructible for LangevinDynamicsMove {
    const TYPE_NAME: &'static str = "LangevinDynamicsMove";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("timestep", Quantity::new(1.0, FEMTOSECOND))
            .keyword("collision_rate", Quantity::new(10.0, inverse_picosecond()?))
            .keyword("n_steps", 1000_i64)
            .keyword("reassign_velocities", false)
            .keyword("n_restart_attempts", 4_i64)
            .keyword("constraint_tolerance", 1e-8)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let n_restart_attempts = kwargs.integer("n_restart_attempts")?;
        let n_restart_attempts = u32::try_from(n_restart_attempts)
            .map_err(|_| format!("n_restart_attempts cannot be negative, got {}", n_restart_attempts))?;
        let constraint_tolerance = kwargs.float("constraint_tolerance")?;
        if constraint_tolerance <= 0.0 {
            return Err(format!(
                "constraint_tolerance must be positive, got {}",
                constraint_tolerance
            )
            .into());
        }
        Ok(Self {
            dynamics: DynamicsParameters::read(kwargs)?,
            reassign_velocities: kwargs.boolean("reassign_velocities")?,
            n_restart_attempts,
            constraint_tolerance,
        })
    }
}

/// Langevin dynamics with a configurable operator splitting, e.g. `V R O R V`.
#[derive(Debug, Clone, PartialEq)]
pub struct LangevinSplittingDynamicsMove {
    pub dynamics: DynamicsParameters,
    pub splitting: String,
    pub reassign_velocities: bool,
}

impl Constructible for LangevinSplittingDynamicsMove {
    const TYPE_NAME: &'static str = "LangevinSplittingDynamicsMove";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("timestep", Quantity::new(1.0, FEMTOSECOND))
            .keyword("collision_rate", Quantity::new(1.0, inverse_picosecond()?))
            .keyword("n_steps", 1000_i64)
            .keyword("splitting", "V R O R V")
            .keyword("reassign_velocities", false)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let splitting = kwargs.string("splitting")?;
        validate_splitting(splitting)?;
        Ok(Self {
            dynamics: DynamicsParameters::read(kwargs)?,
            splitting: splitting.to_string(),
            reassign_velocities: kwargs.boolean("reassign_velocities")?,
        })
    }
}

/// Each step is an operator letter, optionally followed by a substep count (`R2`).
fn validate_splitting(splitting: &str) -> Result<(), String> {
    let steps: Vec<&str> = splitting.split_whitespace().collect();
    if steps.is_empty() {
        return Err("splitting cannot be empty".to_string());
    }
    for step in &steps {
        let mut chars = step.chars();
        let Some(operator) = chars.next() else {
            return Err(format!("empty step in splitting '{}'", splitting));
        };
        let substeps = chars.as_str();
        if !matches!(operator, 'V' | 'R' | 'O')
            || !substeps.chars().all(|c| c.is_ascii_digit())
        {
            return Err(format!("invalid step '{}' in splitting '{}'", step, splitting));
        }
    }
    if !steps.iter().any(|s| s.starts_with('O')) {
        return Err(format!("splitting '{}' has no thermostat step 'O'", splitting));
    }
    Ok(())
}

/// Generalized hybrid Monte Carlo.
#[derive(Debug, Clone, PartialEq)]
pub struct GHMCMove {
    pub dynamics: DynamicsParameters,
}

impl Constructible for GHMCMove {
    const TYPE_NAME: &'static str = "GHMCMove";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("timestep", Quantity::new(1.0, FEMTOSECOND))
            .keyword("collision_rate", Quantity::new(20.0, inverse_picosecond()?))
            .keyword("n_steps", 1000_i64)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        Ok(Self {
            dynamics: DynamicsParameters::read(kwargs)?,
        })
    }
}

/// Random rigid displacement of a group of atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct MCDisplacementMove {
    pub displacement_sd: Quantity,
    pub atom_subset: Option<Vec<usize>>,
}

impl Constructible for MCDisplacementMove {
    const TYPE_NAME: &'static str = "MCDisplacementMove";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("displacement_sd", Quantity::new(1.0, ANGSTROM))
            .keyword("atom_subset", Value::Null)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let displacement_sd = kwargs.quantity("displacement_sd", &ANGSTROM.into())?;
        if displacement_sd.value() <= 0.0 {
            return Err(format!("displacement_sd must be positive, got {}", displacement_sd).into());
        }
        Ok(Self {
            displacement_sd,
            atom_subset: kwargs.atoms("atom_subset")?,
        })
    }
}

/// Random rigid rotation of a group of atoms about their centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct MCRotationMove {
    pub atom_subset: Option<Vec<usize>>,
}

impl Constructible for MCRotationMove {
    const TYPE_NAME: &'static str = "MCRotationMove";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder().keyword("atom_subset", Value::Null).build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        Ok(Self {
            atom_subset: kwargs.atoms("atom_subset")?,
        })
    }
}

macro_rules! impl_mcmc_move {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl McmcMove for $ty {
                fn type_name(&self) -> &'static str {
                    <$ty as Constructible>::TYPE_NAME
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )+
    };
}

impl_mcmc_move!(
    LangevinDynamicsMove,
    LangevinSplittingDynamicsMove,
    GHMCMove,
    MCDisplacementMove,
    MCRotationMove,
);

fn boxed<T: McmcMove + 'static>(mcmc_move: T) -> Box<dyn McmcMove> {
    Box::new(mcmc_move)
}

/// A registry holding the built-in single moves.
///
/// [`SequenceMove`](super::SequenceMove) is not registered: it is assembled
/// from already built moves.
pub fn standard_moves() -> Result<Registry<dyn McmcMove>, RegistryError> {
    let mut registry: Registry<dyn McmcMove> = Registry::new(BASE_NAME);
    registry
        .register_type::<LangevinDynamicsMove>(boxed)?
        .register_type::<LangevinSplittingDynamicsMove>(boxed)?
        .register_type::<GHMCMove>(boxed)?
        .register_type::<MCDisplacementMove>(boxed)?
        .register_type::<MCRotationMove>(boxed)?;
    Ok(registry)
}
