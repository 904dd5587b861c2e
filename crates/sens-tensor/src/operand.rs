//! # Operand Classification
//!
//! Every binary rule first classifies its right-hand side as either a
//! public constant (exactly known, zero sensitivity) or a bounded tensor
//! carrying its own per-entity contributions, then runs the code path for
//! that class. `From` conversions make call sites read naturally:
//!
//! ```
//! # use sens_tensor::{BoundedContributionTensor, Operand};
//! # use sens_core::{EntityCount, EntityId};
//! # use ndarray::arr1;
//! let count = EntityCount::new(2)?;
//! let x = BoundedContributionTensor::from_entity_bounds(
//!     arr1(&[3.0]).into_dyn(), 0.0, 10.0, EntityId::new(0), count,
//! )?;
//! let shifted = x.try_add(2.0)?;          // public scalar
//! let doubled = x.try_add(&x)?;           // bounded operand
//! assert!(matches!(Operand::from(&x), Operand::Bounded(_)));
//! # Ok::<(), sens_core::SensitivityError>(())
//! ```

use ndarray::{ArrayD, Axis};

use sens_core::{ContributionScalar, Result, ShapeError};

use crate::bounded::BoundedContributionTensor;

/// A value treated as exactly known.
#[derive(Debug, Clone, PartialEq)]
pub enum PublicConstant<A> {
    /// Applies to every element.
    Scalar(A),
    /// Same shape as the bounded operand's values; applies per element and
    /// is shared by every entity of that element.
    Tensor(ArrayD<A>),
}

impl<A: ContributionScalar> PublicConstant<A> {
    /// Materialize this constant in the shape of `target`.
    ///
    /// `target` is either a values tensor of shape `S` or a contribution
    /// tensor of shape `S + (E,)`; a tensor constant of shape `S` is
    /// repeated along the entity axis in the latter case.
    pub fn broadcast_like(&self, target: &ArrayD<A>) -> Result<ArrayD<A>> {
        match self {
            Self::Scalar(k) => Ok(ArrayD::from_elem(target.raw_dim(), *k)),
            Self::Tensor(t) => {
                if t.shape() == target.shape() {
                    return Ok(t.clone());
                }
                let lead = t.ndim();
                if target.ndim() == lead + 1 && &target.shape()[..lead] == t.shape() {
                    let expanded = t.view().insert_axis(Axis(lead));
                    if let Some(view) = expanded.broadcast(target.raw_dim()) {
                        return Ok(view.to_owned());
                    }
                }
                Err(ShapeError::PublicBroadcast {
                    public: t.shape().to_vec(),
                    target: target.shape().to_vec(),
                }
                .into())
            }
        }
    }

    /// Whether any element equals zero.
    pub fn contains_zero(&self) -> bool {
        match self {
            Self::Scalar(k) => k.is_zero(),
            Self::Tensor(t) => t.iter().any(|k| k.is_zero()),
        }
    }
}

impl<A> From<ArrayD<A>> for PublicConstant<A> {
    fn from(tensor: ArrayD<A>) -> Self {
        Self::Tensor(tensor)
    }
}

/// Right-hand side of a binary rule.
#[derive(Debug, Clone)]
pub enum Operand<'a, A> {
    /// Exactly known value; contributes no sensitivity.
    Public(PublicConstant<A>),
    /// Value with per-entity contribution bounds.
    Bounded(&'a BoundedContributionTensor<A>),
}

impl<A> Operand<'_, A> {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Public(PublicConstant::Scalar(_)) => "public_scalar",
            Self::Public(PublicConstant::Tensor(_)) => "public_tensor",
            Self::Bounded(_) => "bounded",
        }
    }
}

impl<'a, A> From<&'a BoundedContributionTensor<A>> for Operand<'a, A> {
    fn from(tensor: &'a BoundedContributionTensor<A>) -> Self {
        Self::Bounded(tensor)
    }
}

impl<A> From<PublicConstant<A>> for Operand<'_, A> {
    fn from(constant: PublicConstant<A>) -> Self {
        Self::Public(constant)
    }
}

impl<A> From<ArrayD<A>> for Operand<'_, A> {
    fn from(tensor: ArrayD<A>) -> Self {
        Self::Public(PublicConstant::Tensor(tensor))
    }
}

macro_rules! impl_public_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PublicConstant<$ty> {
                fn from(k: $ty) -> Self {
                    Self::Scalar(k)
                }
            }

            impl From<$ty> for Operand<'_, $ty> {
                fn from(k: $ty) -> Self {
                    Self::Public(PublicConstant::Scalar(k))
                }
            }
        )*
    };
}

impl_public_scalar!(f32, f64);
