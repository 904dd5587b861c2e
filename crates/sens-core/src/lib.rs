//! # sens-core — Foundational Types for Sensitivity Tracking
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on:
//!
//! - **Errors** (`error.rs`): the `SensitivityError` taxonomy. Shape
//!   incompatibilities, unsupported algebra rules, and deliberately
//!   unimplemented extension points are distinct variants.
//!
//! - **Entities** (`entity.rs`): `EntityId` and `EntityCount` newtypes. The
//!   entity count `E` is fixed for a computation; an `EntityId` is an index
//!   into the trailing entity axis.
//!
//! - **Precision** (`precision.rs`): the `ContributionScalar` element trait
//!   and the `Sentinel` extreme used to fence out inactive entities. The
//!   sentinel is configuration, not a hard-coded literal, so `f32` and `f64`
//!   computations each get a representable value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sens-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod entity;
pub mod error;
pub mod precision;

pub use entity::{EntityCount, EntityId};
pub use error::{Result, SensitivityError, ShapeError};
pub use precision::{ContributionScalar, Sentinel, DEFAULT_HARD_SIGMOID_LEAK};
