//! # sens-tensor — Bounded-Contribution Tensor
//!
//! Tracks, alongside ordinary tensor values, how much each contributing
//! entity (data owner) could have influenced every output element, through
//! a chain of arithmetic. The per-element *sensitivity* (how far an output
//! can move if one entity is removed) falls out of the tracked bounds and
//! feeds differential-privacy mechanisms downstream.
//!
//! - **Tensor** (`bounded.rs`): [`BoundedContributionTensor`], its
//!   validated construction, and the derived bounds (`max_vals`,
//!   `min_vals`, `sensitivity`, per-entity queries).
//!
//! - **Operands** (`operand.rs`): [`Operand`] classifies the right-hand
//!   side of every binary rule as a [`PublicConstant`] or a bounded tensor.
//!
//! - **Arithmetic** (`arithmetic.rs`): add, subtract, negate, multiply,
//!   divide.
//!
//! - **Comparison** (`compare.rs`): `gt` / `lt` with influence bounds.
//!
//! - **Clamping** (`clamp.rs`): `clamp_min` / `clamp_max` and the hard
//!   sigmoid built on them.
//!
//! ## Example
//!
//! ```
//! use ndarray::arr1;
//! use sens_core::{EntityCount, EntityId};
//! use sens_tensor::BoundedContributionTensor;
//!
//! let count = EntityCount::new(2)?;
//! let bob = BoundedContributionTensor::from_entity_bounds(
//!     arr1(&[5.0]).into_dyn(), 0.0, 10.0, EntityId::new(0), count,
//! )?;
//! let alice = BoundedContributionTensor::from_entity_bounds(
//!     arr1(&[6.0]).into_dyn(), 0.0, 10.0, EntityId::new(1), count,
//! )?;
//!
//! let total = bob.try_add(&alice)?;
//! assert_eq!(total.max_vals()[[0]], 20.0);
//! assert_eq!(total.max_entity_sensitivity()[[0]], 10.0);
//! # Ok::<(), sens_core::SensitivityError>(())
//! ```
//!
//! ## Crate Policy
//!
//! - No operation mutates an operand; every rule returns a new tensor.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod arithmetic;
pub mod bounded;
pub mod clamp;
pub mod compare;
mod kernels;
pub mod operand;

pub use bounded::BoundedContributionTensor;
pub use operand::{Operand, PublicConstant};
