//! # Engine Module
//!
//! Turns type-tagged configuration descriptions into constructed components.
//!
//! ## Overview
//!
//! A description is a mapping whose `type` key names a registered type and
//! whose remaining keys are that type's keyword arguments. The engine looks the
//! type up, derives a schema from its signature, validates and normalizes the
//! arguments and finally calls the registered factory.
//!
//! ## Architecture
//!
//! - **Resolution** ([`resolver`]) - Type lookup, schema derivation, caller defaults and construction
//! - **Catalog** ([`catalog`]) - The registries of every component family and their build options
//! - **Error Handling** ([`error`]) - Failures of each construction stage

pub mod catalog;
pub mod error;
pub mod resolver;
