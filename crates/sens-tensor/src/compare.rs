//! # Comparison Rules
//!
//! Thresholding produces a {0,1} tensor. Its per-entity bounds describe
//! *influence*, not magnitude: `max_contrib = 1` when the entity's range
//! overlaps the threshold (so the entity can flip the outcome) and `0` when
//! the ranges provably do not overlap. `min_contrib` is always 0.

use std::cmp::Ordering;

use ndarray::{ArrayD, Zip};

use sens_core::{ContributionScalar, Result};

use crate::bounded::BoundedContributionTensor;
use crate::kernels::{fence, indicator, maximum, minimum, union_mask};
use crate::operand::{Operand, PublicConstant};

impl<A: ContributionScalar> BoundedContributionTensor<A> {
    /// `self > rhs`, elementwise.
    pub fn gt<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "gt", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.threshold_public(&k, Ordering::Greater),
            Operand::Bounded(other) => self.gt_bounded(other),
        }
    }

    /// `self < rhs`, elementwise.
    ///
    /// Against a bounded operand this is `rhs > self`, evaluated with the
    /// operands' roles exchanged rather than by inverting `self > rhs`.
    pub fn lt<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "lt", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.threshold_public(&k, Ordering::Less),
            Operand::Bounded(other) => other.gt_bounded(self),
        }
    }

    fn threshold_public(&self, k: &PublicConstant<A>, direction: Ordering) -> Result<Self> {
        let k_values = k.broadcast_like(self.values())?;
        let k_contrib = k.broadcast_like(self.max_contrib())?;

        let values = Zip::from(self.values())
            .and(&k_values)
            .map_collect(|v, k| indicator(v.partial_cmp(k) == Some(direction)));

        let max_contrib = Zip::from(self.min_contrib())
            .and(self.max_contrib())
            .and(self.entity_mask())
            .and(&k_contrib)
            .map_collect(|&lo, &hi, &m, &k| indicator::<A>(lo <= k && k <= hi) * m);

        Ok(Self::from_parts(
            values,
            max_contrib,
            ArrayD::zeros(self.max_contrib().raw_dim()),
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    fn gt_bounded(&self, other: &Self) -> Result<Self> {
        self.ensure_compatible(other)?;

        let values = Zip::from(self.values())
            .and(other.values())
            .map_collect(|&a, &b| indicator(a > b));

        let self_side = self.overlap_with(other);
        let other_side = other.overlap_with(self);
        let zeros = ArrayD::zeros(self.max_contrib().raw_dim());

        let union = union_mask(self.entity_mask(), other.entity_mask());
        let sentinel = self.sentinel();

        let max_contrib = maximum(
            &fence(&self_side, self.entity_mask(), self.entity_mask(), sentinel.lower()),
            &fence(&other_side, other.entity_mask(), other.entity_mask(), sentinel.lower()),
        ) * &union;
        let min_contrib = minimum(
            &fence(&zeros, self.entity_mask(), self.entity_mask(), sentinel.upper()),
            &fence(&zeros, other.entity_mask(), other.entity_mask(), sentinel.upper()),
        ) * &union;

        Ok(Self::from_parts(
            values,
            max_contrib,
            min_contrib,
            union,
            sentinel,
        ))
    }

    /// 1 where an active entity's range overlaps the aggregate range of
    /// `other`, 0 where it lies entirely above or below it.
    fn overlap_with(&self, other: &Self) -> ArrayD<A> {
        let other_hi = other.expanded_max_vals();
        let other_lo = other.expanded_min_vals();
        Zip::from(self.min_contrib())
            .and(self.max_contrib())
            .and(self.entity_mask())
            .and(&other_hi)
            .and(&other_lo)
            .map_collect(|&lo, &hi, &m, &o_hi, &o_lo| {
                let above = indicator::<A>(lo > o_hi);
                let below = indicator::<A>(hi < o_lo);
                A::one() - (above + below) * m
            })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2};
    use sens_core::{EntityCount, EntityId};

    use super::*;

    fn leaf(values: &[f64], lo: f64, hi: f64, entity: usize, count: usize) -> BoundedContributionTensor<f64> {
        BoundedContributionTensor::from_entity_bounds(
            arr1(values).into_dyn(),
            lo,
            hi,
            EntityId::new(entity),
            EntityCount::new(count).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn gt_public_marks_overlapping_entities() {
        let x = leaf(&[3.0, 8.0], 2.0, 10.0, 0, 2);
        let above = x.gt(5.0).unwrap();
        assert_eq!(above.values(), &arr1(&[0.0, 1.0]).into_dyn());
        assert_eq!(
            above.max_contrib(),
            &arr2(&[[1.0, 0.0], [1.0, 0.0]]).into_dyn()
        );
        assert!(above.min_contrib().iter().all(|&v| v == 0.0));
        assert_eq!(above.sensitivity(), arr1(&[1.0, 1.0]).into_dyn());
    }

    #[test]
    fn gt_public_outside_range_has_no_influence() {
        let x = leaf(&[3.0], 2.0, 10.0, 0, 1);
        let never = x.gt(20.0).unwrap();
        assert_eq!(never.values(), &arr1(&[0.0]).into_dyn());
        assert_eq!(never.sensitivity(), arr1(&[0.0]).into_dyn());
    }

    #[test]
    fn gt_public_ignores_inactive_entities_at_zero() {
        // The inactive slot holds [0, 0], which a threshold of 0 would overlap.
        let x = leaf(&[3.0], 2.0, 10.0, 0, 2);
        let out = x.gt(0.0).unwrap();
        assert_eq!(out.max_contrib(), &arr2(&[[0.0, 0.0]]).into_dyn());
    }

    #[test]
    fn lt_public_mirrors_gt() {
        let x = leaf(&[3.0, 8.0], 2.0, 10.0, 0, 1);
        let below = x.lt(5.0).unwrap();
        assert_eq!(below.values(), &arr1(&[1.0, 0.0]).into_dyn());
        assert_eq!(below.max_contrib(), &arr2(&[[1.0], [1.0]]).into_dyn());
    }

    #[test]
    fn gt_bounded_overlapping_ranges() {
        let x = leaf(&[3.0], 0.0, 10.0, 0, 2);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        let out = x.gt(&y).unwrap();
        assert_eq!(out.values(), &arr1(&[1.0]).into_dyn());
        assert_eq!(out.max_contrib(), &arr2(&[[1.0, 1.0]]).into_dyn());
        assert_eq!(out.min_contrib(), &arr2(&[[0.0, 0.0]]).into_dyn());
        assert_eq!(out.entity_mask(), &arr2(&[[1.0, 1.0]]).into_dyn());
    }

    #[test]
    fn gt_bounded_separated_ranges() {
        let x = leaf(&[30.0], 20.0, 40.0, 0, 2);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        let out = x.gt(&y).unwrap();
        assert_eq!(out.values(), &arr1(&[1.0]).into_dyn());
        // x sits entirely above y. y still reports influence because x's
        // aggregate lower bound is pulled to 0 by x's inactive slot.
        assert_eq!(out.max_contrib(), &arr2(&[[0.0, 1.0]]).into_dyn());
        assert_eq!(out.sensitivity(), arr1(&[1.0]).into_dyn());
    }

    #[test]
    fn lt_bounded_exchanges_roles() {
        let x = leaf(&[30.0], 20.0, 40.0, 0, 2);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        let out = y.lt(&x).unwrap();
        assert_eq!(out, x.gt(&y).unwrap());
    }
}
