//! # Schema Module
//!
//! Declarative validation rules and the engine that applies them.
//!
//! ## Overview
//!
//! A [`Schema`](rule::Schema) maps field names to [`Rule`](rule::Rule)s. Rules
//! are either written by hand, as for experiment documents, or derived from a
//! constructible type's [`Signature`](crate::core::signature::Signature) by
//! [`generate_schema`](generator::generate_schema).
//!
//! ## Architecture
//!
//! - **Type Mapping** ([`types`]) - Structural type tokens and exact-type predicates
//! - **Coercions** ([`coercion`]) - Value transformations applied before type checks
//! - **Rules** ([`rule`]) - Field rules, schemas and default setters
//! - **Schema Generation** ([`generator`]) - Rules derived from parameter defaults
//! - **Domain Checks** ([`checks`]) - File, extension, list and constructor checks
//! - **Validation** ([`validator`], [`error`]) - Rule application and aggregated field errors

pub mod checks;
pub mod coercion;
pub mod error;
pub mod generator;
pub mod rule;
pub mod types;
pub mod validator;
