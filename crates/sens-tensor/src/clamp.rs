//! # Clamping and Hard Sigmoid
//!
//! Clamping against a public bound tightens only the side being clamped:
//! `clamp_min` raises values and min contributions, `clamp_max` lowers
//! values and max contributions. The opposite bound is left as is.
//!
//! Only active entity slots are clamped. Inactive slots pass through
//! unchanged so they keep contributing zero sensitivity.

use ndarray::Zip;

use sens_core::{ContributionScalar, Result, SensitivityError, DEFAULT_HARD_SIGMOID_LEAK};

use crate::bounded::BoundedContributionTensor;
use crate::operand::{Operand, PublicConstant};

impl<A: ContributionScalar> BoundedContributionTensor<A> {
    /// Elementwise `max(self, floor)` for a public `floor`.
    pub fn clamp_min<'a>(&self, floor: impl Into<Operand<'a, A>>) -> Result<Self> {
        let floor = match floor.into() {
            Operand::Public(k) => k,
            Operand::Bounded(_) => return Err(bounded_clamp("clamp_min")),
        };
        let values = Zip::from(self.values())
            .and(&floor.broadcast_like(self.values())?)
            .map_collect(|&v, &k| v.max(k));
        let min_contrib = Zip::from(self.min_contrib())
            .and(self.entity_mask())
            .and(&floor.broadcast_like(self.min_contrib())?)
            .map_collect(|&v, &m, &k| if m.is_zero() { v } else { v.max(k) });
        Ok(Self::from_parts(
            values,
            self.max_contrib().clone(),
            min_contrib,
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    /// Elementwise `min(self, ceiling)` for a public `ceiling`.
    pub fn clamp_max<'a>(&self, ceiling: impl Into<Operand<'a, A>>) -> Result<Self> {
        let ceiling = match ceiling.into() {
            Operand::Public(k) => k,
            Operand::Bounded(_) => return Err(bounded_clamp("clamp_max")),
        };
        let values = Zip::from(self.values())
            .and(&ceiling.broadcast_like(self.values())?)
            .map_collect(|&v, &k| v.min(k));
        let max_contrib = Zip::from(self.max_contrib())
            .and(self.entity_mask())
            .and(&ceiling.broadcast_like(self.max_contrib())?)
            .map_collect(|&v, &m, &k| if m.is_zero() { v } else { v.min(k) });
        Ok(Self::from_parts(
            values,
            max_contrib,
            self.min_contrib().clone(),
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    /// Clamp to `[0, 1]`.
    pub fn hard_sigmoid(&self) -> Result<Self> {
        self.clamp_max(PublicConstant::Scalar(A::one()))?
            .clamp_min(PublicConstant::Scalar(A::zero()))
    }

    /// Derivative of [`hard_sigmoid`](Self::hard_sigmoid): 1 inside `(0, 1)`,
    /// `leak` below 0 and `-leak` above 1.
    ///
    /// Built from the comparison and arithmetic rules, so the result carries
    /// the influence bounds of those rules.
    pub fn hard_sigmoid_deriv(&self, leak: A) -> Result<Self> {
        let zero = || PublicConstant::Scalar(A::zero());
        let one = || PublicConstant::Scalar(A::one());
        let leak = PublicConstant::Scalar(leak);

        let inside = self.lt(one())?.try_mul(&self.gt(zero())?)?;
        let below = self.lt(zero())?.try_mul(leak.clone())?;
        let above = self.gt(one())?.try_mul(leak)?;
        inside.try_add(&below)?.try_sub(&above)
    }

    /// [`hard_sigmoid_deriv`](Self::hard_sigmoid_deriv) with the default leak of 0.01.
    pub fn hard_sigmoid_deriv_default(&self) -> Result<Self> {
        self.hard_sigmoid_deriv(A::from_f64_lossy(DEFAULT_HARD_SIGMOID_LEAK))
    }
}

fn bounded_clamp(operation: &str) -> SensitivityError {
    tracing::debug!(operation, "rejecting clamp against a bounded operand");
    SensitivityError::NotImplemented(format!("{operation} with a bounded clamp argument"))
}
