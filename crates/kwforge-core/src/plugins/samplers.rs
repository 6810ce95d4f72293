use super::Sampler;
use crate::core::kwargs::Kwargs;
use crate::core::registry::{BoxError, Constructible, Registry, RegistryError};
use crate::core::signature::{Signature, SignatureBuilder, SignatureError};
use crate::core::value::Value;
use crate::schema::coercion::CHECKPOINT;
use std::any::Any;

/// The sampler family name used in error messages.
pub const BASE_NAME: &str = "MultiStateSampler";

/// How many iterations a sampler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationLimit {
    Finite(u64),
    Unbounded,
}

/// How often the free energy estimate is updated while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisInterval {
    Disabled,
    AtCheckpoints,
    Every(u64),
}

/// Options shared by every multi-state sampler.
///
/// The moves a sampler propagates replicas with are a required parameter
/// assembled separately, so they never appear among the configurable keywords.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStateOptions {
    pub number_of_iterations: IterationLimit,
    pub online_analysis_interval: AnalysisInterval,
    pub online_analysis_target_error: f64,
    pub online_analysis_minimum_iterations: u64,
    pub locality: Option<u64>,
}

impl MultiStateOptions {
    fn signature() -> SignatureBuilder {
        Signature::builder()
            .required("mcmc_moves")
            .keyword("number_of_iterations", 1_i64)
            .keyword("online_analysis_interval", 200_i64)
            .keyword("online_analysis_target_error", 0.0)
            .keyword("online_analysis_minimum_iterations", 200_i64)
            .keyword("locality", Value::Null)
    }

    fn read(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let number_of_iterations = match kwargs.get("number_of_iterations") {
            Some(Value::Float(x)) if *x == f64::INFINITY => IterationLimit::Unbounded,
            Some(Value::Integer(n)) if *n >= 0 => IterationLimit::Finite(*n as u64),
            other => {
                return Err(format!(
                    "number_of_iterations must be a non-negative integer or infinity, got {}",
                    other.unwrap_or(&Value::Null)
                )
                .into());
            }
        };
        let online_analysis_interval = match kwargs.get("online_analysis_interval") {
            None | Some(Value::Null) => AnalysisInterval::Disabled,
            Some(Value::String(s)) if s == CHECKPOINT => AnalysisInterval::AtCheckpoints,
            Some(Value::Integer(n)) if *n > 0 => AnalysisInterval::Every(*n as u64),
            Some(other) => {
                return Err(format!(
                    "online_analysis_interval must be null, '{}' or a positive integer, got {}",
                    CHECKPOINT, other
                )
                .into());
            }
        };
        let online_analysis_target_error = kwargs.float("online_analysis_target_error")?;
        if online_analysis_target_error < 0.0 {
            return Err("online_analysis_target_error cannot be negative".into());
        }
        let online_analysis_minimum_iterations = non_negative(kwargs, "online_analysis_minimum_iterations")?;
        let locality = match kwargs.optional_integer("locality")? {
            Some(n) if n <= 0 => return Err(format!("locality must be positive, got {}", n).into()),
            other => other.map(|n| n as u64),
        };
        Ok(Self {
            number_of_iterations,
            online_analysis_interval,
            online_analysis_target_error,
            online_analysis_minimum_iterations,
            locality,
        })
    }
}

fn non_negative(kwargs: &Kwargs, key: &str) -> Result<u64, BoxError> {
    let n = kwargs.integer(key)?;
    u64::try_from(n).map_err(|_| format!("{} cannot be negative, got {}", key, n).into())
}

fn one_of<'k>(kwargs: &'k Kwargs, key: &str, allowed: &[&str]) -> Result<&'k str, BoxError> {
    let value = kwargs.string(key)?;
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} must be one of {}, got '{}'", key, allowed.join(", "), value).into())
    }
}

/// Independent simulations of every thermodynamic state.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStateSampler {
    pub options: MultiStateOptions,
}

impl Constructible for MultiStateSampler {
    const TYPE_NAME: &'static str = "MultiStateSampler";

    fn signature() -> Result<Signature, SignatureError> {
        MultiStateOptions::signature().build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        Ok(Self {
            options: MultiStateOptions::read(kwargs)?,
        })
    }
}

/// Hamiltonian replica exchange between neighboring or all states.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaExchangeSampler {
    pub options: MultiStateOptions,
    pub replica_mixing_scheme: Option<String>,
}

impl ReplicaExchangeSampler {
    pub const MIXING_SCHEMES: [&'static str; 2] = ["swap-all", "swap-neighbors"];
}

impl Constructible for ReplicaExchangeSampler {
    const TYPE_NAME: &'static str = "ReplicaExchangeSampler";

    fn signature() -> Result<Signature, SignatureError> {
        MultiStateOptions::signature()
            .keyword("replica_mixing_scheme", "swap-all")
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let replica_mixing_scheme = match kwargs.get("replica_mixing_scheme") {
            Some(Value::Null) => None,
            _ => Some(one_of(kwargs, "replica_mixing_scheme", &Self::MIXING_SCHEMES)?.to_string()),
        };
        Ok(Self {
            options: MultiStateOptions::read(kwargs)?,
            replica_mixing_scheme,
        })
    }
}

/// Self-adjusted mixture sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct SAMSSampler {
    pub options: MultiStateOptions,
    pub state_update_scheme: String,
    pub update_stages: String,
    pub flatness_criteria: String,
    pub flatness_threshold: f64,
    pub weight_update_method: String,
    pub adapt_target_probabilities: bool,
    pub gamma0: f64,
    pub log_z_guess: Option<Vec<f64>>,
}

impl Constructible for SAMSSampler {
    const TYPE_NAME: &'static str = "SAMSSampler";

    fn signature() -> Result<Signature, SignatureError> {
        MultiStateOptions::signature()
            .keyword("state_update_scheme", "global-jump")
            .keyword("update_stages", "two-stage")
            .keyword("flatness_criteria", "logZ-flatness")
            .keyword("flatness_threshold", 0.2)
            .keyword("weight_update_method", "rao-blackwellized")
            .keyword("adapt_target_probabilities", false)
            .keyword("gamma0", 1.0)
            .keyword("logZ_guess", Value::Null)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        let state_update_scheme = one_of(
            kwargs,
            "state_update_scheme",
            &["global-jump", "local-jump", "restricted-range-jump"],
        )?;
        let update_stages = one_of(kwargs, "update_stages", &["one-stage", "two-stage"])?;
        let flatness_criteria = one_of(
            kwargs,
            "flatness_criteria",
            &["logZ-flatness", "minimum-visits", "histogram-flatness"],
        )?;
        let weight_update_method = one_of(
            kwargs,
            "weight_update_method",
            &["optimal", "rao-blackwellized"],
        )?;
        let flatness_threshold = kwargs.float("flatness_threshold")?;
        if flatness_threshold <= 0.0 {
            return Err(format!("flatness_threshold must be positive, got {}", flatness_threshold).into());
        }
        let gamma0 = kwargs.float("gamma0")?;
        let log_z_guess = match kwargs.get("log_z_guess") {
            None | Some(Value::Null) => None,
            Some(Value::List(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_float()
                            .ok_or_else(|| format!("logZ_guess entries must be numbers, got {}", item))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => return Err(format!("logZ_guess must be a list of numbers, got {}", other).into()),
        };
        Ok(Self {
            options: MultiStateOptions::read(kwargs)?,
            state_update_scheme: state_update_scheme.to_string(),
            update_stages: update_stages.to_string(),
            flatness_criteria: flatness_criteria.to_string(),
            flatness_threshold,
            weight_update_method: weight_update_method.to_string(),
            adapt_target_probabilities: kwargs.boolean("adapt_target_probabilities")?,
            gamma0,
            log_z_guess,
        })
    }
}

macro_rules! impl_sampler {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Sampler for $ty {
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

impl_sampler!(MultiStateSampler, ReplicaExchangeSampler, SAMSSampler);

fn boxed<T: Sampler + 'static>(sampler: T) -> Box<dyn Sampler> {
    Box::new(sampler)
}

/// A registry holding the built-in samplers.
pub fn standard_samplers() -> Result<Registry<dyn Sampler>, RegistryError> {
    let mut registry: Registry<dyn Sampler> = Registry::new(BASE_NAME);
    registry
        .register_type::<MultiStateSampler>(boxed)?
        .register_type::<ReplicaExchangeSampler>(boxed)?
        .register_type::<SAMSSampler>(boxed)?;
    Ok(registry)
}
