//! # rulehub-domain
//!
//! Pure domain model for the rulehub effect-execution core.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error taxonomy, timestamps
//! - Define **property values** and the **declared property types** that accept them
//! - Define **thing references** (a property or an action on a thing)
//! - Define **effect descriptions** (the serialized, storable form of an effect)
//! - Define **effect events** (what happened when an effect ran)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod effect;
pub mod thing;
pub mod value;
