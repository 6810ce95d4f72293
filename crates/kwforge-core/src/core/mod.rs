//! # Core Module
//!
//! The foundation the validation and construction layers are built on.
//!
//! ## Overview
//!
//! Configuration arrives as loosely typed trees of values. The core module
//! defines that value model, the physical units many parameters carry, and
//! the declarative description of what a constructible type accepts.
//!
//! ## Architecture
//!
//! - **Value Model** ([`value`]) - Dynamic configuration values and their native types
//! - **Units** ([`units`]) - Dimensions, units, quantities and the quantity-string parser
//! - **Signatures** ([`signature`]) - Ordered parameter names with trailing defaults
//! - **Keyword Access** ([`kwargs`]) - Typed reads of validated arguments with default fallback
//! - **Registries** ([`registry`]) - Named factories per base type
//!
//! Nothing in this module performs validation on its own; the [`crate::schema`]
//! layer derives rules from signatures and applies them to values.

pub mod kwargs;
pub mod registry;
pub mod signature;
pub mod units;
pub mod value;
