//! # Workflows Module
//!
//! High-level entry points that tie the schema engine and the component
//! catalog together.
//!
//! ## Overview
//!
//! An experiment document is a TOML file describing molecules, solvents,
//! systems, MCMC moves, samplers, protocols and the experiments combining
//! them. Loading one validates every section, dry-runs the construction of
//! every embedded component description and checks that sections reference
//! each other by names that exist.
//!
//! ## Architecture
//!
//! - **Experiment Documents** ([`document`]) - Loading, the document schema and cross-reference checks

pub mod document;
