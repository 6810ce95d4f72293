use super::Restraint;
use crate::core::kwargs::{ArgumentError, Kwargs};
use crate::core::registry::{BoxError, Constructible, Registry, RegistryError};
use crate::core::signature::{Signature, SignatureError};
use crate::core::units::{KILOJOULE_PER_MOLE, NANOMETER, Quantity, Unit, UnitError};
use crate::core::value::Value;
use std::any::Any;

/// The restraint family name used in error messages.
pub const BASE_NAME: &str = "ReceptorLigandRestraint";

/// Atoms a restraint acts on: explicit indices or a selection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomSelection {
    Indices(Vec<usize>),
    Expression(String),
}

fn atom_selection(kwargs: &Kwargs, key: &str) -> Result<Option<AtomSelection>, ArgumentError> {
    let selection = match kwargs.get(key) {
        Some(Value::String(expression)) => Some(AtomSelection::Expression(expression.clone())),
        _ => kwargs.atoms(key)?.map(AtomSelection::Indices),
    };
    if let Some(AtomSelection::Indices(indices)) = &selection {
        if indices.is_empty() {
            return Err(ArgumentError::InvalidValue {
                name: key.to_string(),
                reason: "the atom selection is empty".to_string(),
            });
        }
    }
    Ok(selection)
}

fn spring_constant_unit() -> Result<Unit, UnitError> {
    Unit::from(KILOJOULE_PER_MOLE).divide(&Unit::from(NANOMETER).powi(2)?)
}

fn positive_quantity(
    kwargs: &Kwargs,
    key: &str,
    unit: &Unit,
) -> Result<Option<Quantity>, BoxError> {
    let quantity = kwargs.optional_quantity(key, unit)?;
    if let Some(q) = &quantity {
        if q.value() <= 0.0 {
            return Err(format!("{} must be positive, got {}", key, q).into());
        }
    }
    Ok(quantity)
}

/// A harmonic restraint between the centroids of receptor and ligand atoms.
///
/// Unset parameters are determined later from the thermodynamic state, so
/// every parameter is optional here.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmonic {
    pub spring_constant: Option<Quantity>,
    pub restrained_receptor_atoms: Option<AtomSelection>,
    pub restrained_ligand_atoms: Option<AtomSelection>,
}

impl Constructible for Harmonic {
    const TYPE_NAME: &'static str = "Harmonic";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("spring_constant", Value::Null)
            .keyword("restrained_receptor_atoms", Value::Null)
            .keyword("restrained_ligand_atoms", Value::Null)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        Ok(Self {
            spring_constant: positive_quantity(kwargs, "spring_constant", &spring_constant_unit()?)?,
            restrained_receptor_atoms: atom_selection(kwargs, "restrained_receptor_atoms")?,
            restrained_ligand_atoms: atom_selection(kwargs, "restrained_ligand_atoms")?,
        })
    }
}

impl Restraint for Harmonic {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A restraint that is flat up to `well_radius` and harmonic beyond it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBottom {
    pub spring_constant: Option<Quantity>,
    pub well_radius: Option<Quantity>,
    pub restrained_receptor_atoms: Option<AtomSelection>,
    pub restrained_ligand_atoms: Option<AtomSelection>,
}

impl Constructible for FlatBottom {
    const TYPE_NAME: &'static str = "FlatBottom";

    fn signature() -> Result<Signature, SignatureError> {
        Signature::builder()
            .keyword("spring_constant", Value::Null)
            .keyword("well_radius", Value::Null)
            .keyword("restrained_receptor_atoms", Value::Null)
            .keyword("restrained_ligand_atoms", Value::Null)
            .build()
    }

    fn construct(kwargs: &Kwargs) -> Result<Self, BoxError> {
        Ok(Self {
            spring_constant: positive_quantity(kwargs, "spring_constant", &spring_constant_unit()?)?,
            well_radius: positive_quantity(kwargs, "well_radius", &NANOMETER.into())?,
            restrained_receptor_atoms: atom_selection(kwargs, "restrained_receptor_atoms")?,
            restrained_ligand_atoms: atom_selection(kwargs, "restrained_ligand_atoms")?,
        })
    }
}

impl Restraint for FlatBottom {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn boxed<T: Restraint + 'static>(restraint: T) -> Box<dyn Restraint> {
    Box::new(restraint)
}

/// A registry holding the built-in restraints.
pub fn standard_restraints() -> Result<Registry<dyn Restraint>, RegistryError> {
    let mut registry: Registry<dyn Restraint> = Registry::new(BASE_NAME);
    registry
        .register_type::<Harmonic>(boxed)?
        .register_type::<FlatBottom>(boxed)?;
    Ok(registry)
}
