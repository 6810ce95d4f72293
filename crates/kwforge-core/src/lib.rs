//! # kwforge Core Library
//!
//! Schema-driven validation of configuration documents and construction of
//! pluggable components from type-tagged descriptions.
//!
//! ## Architectural Philosophy
//!
//! The library is layered so that each level only depends on the ones below it.
//!
//! - **[`core`]: The Foundation.** Dynamic values, physical units, constructor
//!   signatures, typed keyword access and the name-to-factory [`Registry`](core::registry::Registry).
//!
//! - **[`schema`]: The Rules.** Declarative field rules, coercions, domain
//!   checks, schema derivation from signatures and the validator applying them.
//!
//! - **[`engine`]: The Builder.** Resolves a description to a registered type,
//!   validates its arguments against the derived schema and instantiates it.
//!
//! - **[`plugins`]: The Components.** The restraint, MCMC move and sampler
//!   families with a standard set of implementations.
//!
//! - **[`workflows`]: The Public API.** Loading and validating complete
//!   experiment documents.

pub mod core;
pub mod engine;
pub mod plugins;
pub mod schema;
pub mod workflows;
