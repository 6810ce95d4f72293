//! # Plugins Module
//!
//! The pluggable component families and a standard set of implementations.
//!
//! ## Overview
//!
//! Each family is a trait object built by name from a configuration
//! description: [`Restraint`], [`McmcMove`] and [`Sampler`]. The concrete
//! types in this module only hold their validated parameters; they carry no
//! simulation logic.
//!
//! ## Architecture
//!
//! - **Restraints** ([`restraints`]) - Receptor-ligand restraints
//! - **Moves** ([`moves`]) - Markov chain Monte Carlo moves and the composite [`SequenceMove`]
//! - **Samplers** ([`samplers`]) - Multi-state samplers
//!
//! Every family exposes a `standard_*` function that fills a
//! [`Registry`](crate::core::registry::Registry) with the built-in types.

use std::any::Any;
use std::fmt;

pub mod moves;
pub mod restraints;
pub mod samplers;

/// A restraint between a receptor and a ligand.
pub trait Restraint: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A Markov chain Monte Carlo move.
pub trait McmcMove: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A multi-state sampler.
pub trait Sampler: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// Moves applied one after another, in order.
#[derive(Debug)]
pub struct SequenceMove {
    moves: Vec<Box<dyn McmcMove>>,
}

impl SequenceMove {
    pub const TYPE_NAME: &'static str = "SequenceMove";

    pub fn new(moves: Vec<Box<dyn McmcMove>>) -> Self {
        Self { moves }
    }

    pub fn moves(&self) -> &[Box<dyn McmcMove>] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl McmcMove for SequenceMove {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
