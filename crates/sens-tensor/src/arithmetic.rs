//! # Arithmetic Rules
//!
//! Addition, subtraction, negation, multiplication and division. Each
//! binary rule classifies its right-hand side into an [`Operand`] and runs
//! the public or bounded path for it.
//!
//! Public constants shift or scale every entity's bounds. Bounded operands
//! combine bounds entity by entity after masking each side with its own
//! ancestry, so an entity inactive in one operand never contributes a stray
//! unmasked bound.

use std::ops::Neg;

use ndarray::Zip;

use sens_core::{ContributionScalar, Result, SensitivityError};

use crate::bounded::BoundedContributionTensor;
use crate::kernels::{fence, maximum, minimum, union_mask};
use crate::operand::{Operand, PublicConstant};

impl<A: ContributionScalar> BoundedContributionTensor<A> {
    /// `self + rhs`.
    ///
    /// Bounded: contributions add entity-wise; the ancestry is the union.
    /// Public: every entity's bounds shift by the constant.
    pub fn try_add<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "add", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.add_public(&k),
            Operand::Bounded(other) => self.add_bounded(other),
        }
    }

    fn add_public(&self, k: &PublicConstant<A>) -> Result<Self> {
        Ok(Self::from_parts(
            self.values() + &k.broadcast_like(self.values())?,
            self.max_contrib() + &k.broadcast_like(self.max_contrib())?,
            self.min_contrib() + &k.broadcast_like(self.min_contrib())?,
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    fn add_bounded(&self, other: &Self) -> Result<Self> {
        self.ensure_compatible(other)?;
        let max_contrib = self.max_contrib() * self.entity_mask()
            + other.max_contrib() * other.entity_mask();
        let min_contrib = self.min_contrib() * self.entity_mask()
            + other.min_contrib() * other.entity_mask();
        Ok(Self::from_parts(
            self.values() + other.values(),
            max_contrib,
            min_contrib,
            union_mask(self.entity_mask(), other.entity_mask()),
            self.sentinel(),
        ))
    }

    /// `self - rhs`.
    ///
    /// Bounded: the upper bound subtracts the other side's *lower* bound and
    /// vice versa, as `self + (-rhs)` would.
    pub fn try_sub<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "sub", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.sub_public(&k),
            Operand::Bounded(other) => self.sub_bounded(other),
        }
    }

    fn sub_public(&self, k: &PublicConstant<A>) -> Result<Self> {
        Ok(Self::from_parts(
            self.values() - &k.broadcast_like(self.values())?,
            self.max_contrib() - &k.broadcast_like(self.max_contrib())?,
            self.min_contrib() - &k.broadcast_like(self.min_contrib())?,
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    fn sub_bounded(&self, other: &Self) -> Result<Self> {
        self.ensure_compatible(other)?;
        let max_contrib = self.entity_mask() * self.max_contrib()
            - other.entity_mask() * other.min_contrib();
        let min_contrib = self.entity_mask() * self.min_contrib()
            - other.entity_mask() * other.max_contrib();
        Ok(Self::from_parts(
            self.values() - other.values(),
            max_contrib,
            min_contrib,
            union_mask(self.entity_mask(), other.entity_mask()),
            self.sentinel(),
        ))
    }

    /// `self * rhs`.
    ///
    /// Public: bounds scale by the constant, swapping wherever it is not
    /// positive. Bounded: see [`mul_bounded`](Self::mul_bounded).
    pub fn try_mul<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "mul", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.mul_public(&k),
            Operand::Bounded(other) => self.mul_bounded(other),
        }
    }

    fn mul_public(&self, k: &PublicConstant<A>) -> Result<Self> {
        let k_contrib = k.broadcast_like(self.max_contrib())?;
        let zero = A::zero();
        let max_contrib = Zip::from(self.max_contrib())
            .and(self.min_contrib())
            .and(&k_contrib)
            .map_collect(|&hi, &lo, &k| if k > zero { hi * k } else { lo * k });
        let min_contrib = Zip::from(self.max_contrib())
            .and(self.min_contrib())
            .and(&k_contrib)
            .map_collect(|&hi, &lo, &k| if k > zero { lo * k } else { hi * k });
        Ok(Self::from_parts(
            self.values() * &k.broadcast_like(self.values())?,
            max_contrib,
            min_contrib,
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }

    /// Product of two bounded tensors.
    ///
    /// Each entity's contribution to one factor is scaled by the *aggregate*
    /// range of the other factor, since removing the entity changes the
    /// product by up to its own range times everything the other factor can
    /// be. Corner products are compared because either sign may produce the
    /// extreme.
    ///
    /// Per-side results are fenced with the sentinel before the cross-operand
    /// max/min. Both sides are gated by the left operand's ancestry: an
    /// entity that appears only in `other` ends with zero contribution.
    fn mul_bounded(&self, other: &Self) -> Result<Self> {
        self.ensure_compatible(other)?;

        let self_hi = self.expanded_max_vals();
        let self_lo = self.expanded_min_vals();
        let other_hi = other.expanded_max_vals();
        let other_lo = other.expanded_min_vals();

        // Entities of `self`, scaled by the range of `other`.
        let self_max_other_max = self.max_contrib() * &other_hi;
        let self_min_other_min = self.min_contrib() * &other_lo;
        let self_max_other_min = self.max_contrib() * &other_lo;
        let self_min_other_max = self.min_contrib() * &other_hi;
        let self_side_max = maximum(&self_min_other_min, &self_max_other_max);
        let self_side_min = minimum(&self_min_other_max, &self_max_other_min);

        // Entities of `other`, scaled by the range of `self`. The lower bound
        // also admits the min-by-min corner, unlike the `self` side.
        let other_min_self_min = other.min_contrib() * &self_lo;
        let other_max_self_max = other.max_contrib() * &self_hi;
        let other_min_self_max = other.min_contrib() * &self_hi;
        let other_max_self_min = other.max_contrib() * &self_lo;
        let other_side_max = maximum(&other_min_self_min, &other_max_self_max);
        let other_side_min = minimum(
            &minimum(&other_min_self_max, &other_max_self_min),
            &other_min_self_min,
        );

        if Zip::from(self.entity_mask())
            .and(other.entity_mask())
            .any(|&s, &o| s.is_zero() && !o.is_zero())
        {
            tracing::debug!(
                "product has entities present only in the right operand; their contribution is zeroed"
            );
        }

        let union = union_mask(self.entity_mask(), other.entity_mask());
        let sentinel = self.sentinel();
        let gate = self.entity_mask();

        let max_contrib = maximum(
            &fence(&self_side_max, gate, self.entity_mask(), sentinel.lower()),
            &fence(&other_side_max, gate, other.entity_mask(), sentinel.lower()),
        ) * &union;
        let min_contrib = minimum(
            &fence(&self_side_min, gate, self.entity_mask(), sentinel.upper()),
            &fence(&other_side_min, gate, other.entity_mask(), sentinel.upper()),
        ) * &union;

        Ok(Self::from_parts(
            self.values() * other.values(),
            max_contrib,
            min_contrib,
            union,
            sentinel,
        ))
    }

    /// `self / rhs` for a public, nonzero divisor.
    ///
    /// Bounds divide directly with no sign swap, so a negative divisor
    /// leaves `max_contrib < min_contrib`. Bounded divisors are rejected:
    /// a range that can cross zero has no finite sensitivity.
    pub fn try_div<'a>(&self, rhs: impl Into<Operand<'a, A>>) -> Result<Self> {
        let rhs = rhs.into();
        tracing::trace!(op = "div", operand = rhs.kind(), entities = self.entity_count());
        match rhs {
            Operand::Public(k) => self.div_public(&k),
            Operand::Bounded(_) => {
                tracing::debug!("rejecting division by a bounded operand");
                Err(SensitivityError::unsupported(
                    "div",
                    "divisor carries contribution bounds; the quotient's sensitivity is unbounded",
                ))
            }
        }
    }

    fn div_public(&self, k: &PublicConstant<A>) -> Result<Self> {
        if k.contains_zero() {
            tracing::debug!("rejecting division by a zero public constant");
            return Err(SensitivityError::unsupported(
                "div",
                "public divisor contains zero",
            ));
        }
        Ok(Self::from_parts(
            self.values() / &k.broadcast_like(self.values())?,
            self.max_contrib() / &k.broadcast_like(self.max_contrib())?,
            self.min_contrib() / &k.broadcast_like(self.min_contrib())?,
            self.entity_mask().clone(),
            self.sentinel(),
        ))
    }
}

impl<A: ContributionScalar> Neg for &BoundedContributionTensor<A> {
    type Output = BoundedContributionTensor<A>;

    /// Flip signs; the old lower bound becomes the new upper bound.
    fn neg(self) -> Self::Output {
        BoundedContributionTensor::from_parts(
            self.values().mapv(|v| -v),
            self.min_contrib().mapv(|v| -v),
            self.max_contrib().mapv(|v| -v),
            self.entity_mask().clone(),
            self.sentinel(),
        )
    }
}

impl<A: ContributionScalar> Neg for BoundedContributionTensor<A> {
    type Output = BoundedContributionTensor<A>;

    fn neg(self) -> Self::Output {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2, ArrayD};
    use sens_core::{EntityCount, EntityId, ShapeError};

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

    fn dyn1(v: &[f64]) -> ArrayD<f64> {
        arr1(v).into_dyn()
    }

    #[test]
    fn add_two_entities() {
        let x = leaf(&[3.0], 0.0, 10.0, 0, 2);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        let z = x.try_add(&y).unwrap();
        assert_eq!(z.values(), &dyn1(&[5.0]));
        assert_eq!(z.max_contrib(), &arr2(&[[10.0, 5.0]]).into_dyn());
        assert_eq!(z.entity_mask(), &arr2(&[[1.0, 1.0]]).into_dyn());
        assert_eq!(z.max_vals(), dyn1(&[15.0]));
        assert_eq!(z.min_vals(), dyn1(&[0.0]));
        assert_eq!(z.sensitivity(), dyn1(&[15.0]));
    }

    #[test]
    fn add_public_shifts_bounds() {
        let x = leaf(&[3.0, 4.0], 1.0, 6.0, 0, 1);
        let z = x.try_add(2.0).unwrap();
        assert_eq!(z.values(), &dyn1(&[5.0, 6.0]));
        assert_eq!(z.max_vals(), dyn1(&[8.0, 8.0]));
        assert_eq!(z.min_vals(), dyn1(&[3.0, 3.0]));
        assert_eq!(z.entity_mask(), x.entity_mask());
    }

    #[test]
    fn add_public_tensor_per_element() {
        let x = leaf(&[3.0, 4.0], 1.0, 6.0, 0, 1);
        let z = x.try_add(dyn1(&[1.0, -1.0])).unwrap();
        assert_eq!(z.values(), &dyn1(&[4.0, 3.0]));
        assert_eq!(z.max_vals(), dyn1(&[7.0, 5.0]));
    }

    #[test]
    fn add_rejects_mismatched_entity_count() {
        let x = leaf(&[1.0], 0.0, 1.0, 0, 2);
        let y = leaf(&[1.0], 0.0, 1.0, 0, 3);
        assert!(matches!(
            x.try_add(&y),
            Err(SensitivityError::Shape(ShapeError::EntityCount { left: 2, right: 3 }))
        ));
    }

    #[test]
    fn add_rejects_mismatched_values_shape() {
        let x = leaf(&[1.0], 0.0, 1.0, 0, 2);
        let y = leaf(&[1.0, 1.0], 0.0, 1.0, 1, 2);
        assert!(matches!(
            x.try_add(&y),
            Err(SensitivityError::Shape(ShapeError::Operand { .. }))
        ));
    }

    #[test]
    fn sub_crosses_bounds() {
        let x = leaf(&[3.0], 0.0, 10.0, 0, 2);
        let y = leaf(&[2.0], 1.0, 5.0, 1, 2);
        let z = x.try_sub(&y).unwrap();
        assert_eq!(z.values(), &dyn1(&[1.0]));
        assert_eq!(z.max_contrib(), &arr2(&[[10.0, -1.0]]).into_dyn());
        assert_eq!(z.min_contrib(), &arr2(&[[0.0, -5.0]]).into_dyn());
        assert_eq!(z.max_vals(), dyn1(&[9.0]));
    }

    #[test]
    fn sub_matches_add_of_negation() {
        let x = leaf(&[3.0], -2.0, 10.0, 0, 2);
        let y = leaf(&[2.0], 1.0, 5.0, 1, 2);
        let direct = x.try_sub(&y).unwrap();
        let via_neg = x.try_add(&-&y).unwrap();
        assert_eq!(direct, via_neg);
    }

    #[test]
    fn sub_public_shifts_down() {
        let x = leaf(&[3.0], 0.0, 10.0, 0, 1);
        let z = x.try_sub(4.0).unwrap();
        assert_eq!(z.values(), &dyn1(&[-1.0]));
        assert_eq!(z.max_vals(), dyn1(&[6.0]));
        assert_eq!(z.sensitivity(), x.sensitivity());
    }

    #[test]
    fn negation_swaps_bounds() {
        let x = leaf(&[3.0], -1.0, 4.0, 0, 1);
        let n = -&x;
        assert_eq!(n.values(), &dyn1(&[-3.0]));
        assert_eq!(n.max_vals(), dyn1(&[1.0]));
        assert_eq!(n.min_vals(), dyn1(&[-4.0]));
        assert_eq!(-n, x);
    }

    #[test]
    fn mul_positive_scalar_scales() {
        let x = leaf(&[3.0], -1.0, 4.0, 0, 1);
        let z = x.try_mul(2.0).unwrap();
        assert_eq!(z.max_vals(), dyn1(&[8.0]));
        assert_eq!(z.min_vals(), dyn1(&[-2.0]));
    }

    #[test]
    fn mul_non_positive_scalar_swaps() {
        let x = leaf(&[3.0], -1.0, 4.0, 0, 1);
        let z = x.try_mul(-2.0).unwrap();
        assert_eq!(z.values(), &dyn1(&[-6.0]));
        assert_eq!(z.max_vals(), dyn1(&[2.0]));
        assert_eq!(z.min_vals(), dyn1(&[-8.0]));

        let zeroed = x.try_mul(0.0).unwrap();
        assert_eq!(zeroed.sensitivity(), dyn1(&[0.0]));
    }

    #[test]
    fn mul_public_tensor_swaps_per_element() {
        let x = leaf(&[1.0, 1.0], 0.0, 2.0, 0, 1);
        let z = x.try_mul(dyn1(&[3.0, -3.0])).unwrap();
        assert_eq!(z.max_vals(), dyn1(&[6.0, 0.0]));
        assert_eq!(z.min_vals(), dyn1(&[0.0, -6.0]));
    }

    #[test]
    fn mul_two_entities_uses_aggregate_scaling() {
        let x = leaf(&[3.0], 0.0, 10.0, 0, 2);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        let z = x.try_mul(&y).unwrap();
        assert_eq!(z.values(), &dyn1(&[6.0]));
        assert_eq!(z.max_vals(), dyn1(&[50.0]));
        assert_eq!(z.min_vals(), dyn1(&[0.0]));
        assert_eq!(z.entity_mask(), &arr2(&[[1.0, 1.0]]).into_dyn());
    }

    #[test]
    fn mul_shared_entity_takes_corner_extremes() {
        let x = leaf(&[-1.0], -2.0, 3.0, 0, 1);
        let sq = x.try_mul(&x).unwrap();
        // max(3*3, -2*-2) and min(-2*3, 3*-2)
        assert_eq!(sq.max_vals(), dyn1(&[9.0]));
        assert_eq!(sq.min_vals(), dyn1(&[-6.0]));
    }

    #[test]
    fn mul_lower_bound_candidates_differ_by_side() {
        // Both factors strictly positive: the self side never considers
        // min*min, the other side does.
        let x = leaf(&[2.0], 1.0, 2.0, 0, 1);
        let y = BoundedContributionTensor::new(
            dyn1(&[3.0]),
            arr2(&[[4.0]]).into_dyn(),
            arr2(&[[3.0]]).into_dyn(),
            ndarray::arr2(&[[true]]).into_dyn(),
        )
        .unwrap();
        let z = x.try_mul(&y).unwrap();
        // self side: min(1*4, 2*3) = 4; other side: min(3*2, 4*1, 3*1) = 3
        assert_eq!(z.min_contrib(), &arr2(&[[3.0]]).into_dyn());
        assert_eq!(z.max_contrib(), &arr2(&[[8.0]]).into_dyn());
    }

    #[test]
    fn div_by_positive_scalar() {
        let x = leaf(&[3.0], 1.0, 4.0, 0, 1);
        let z = x.try_div(2.0).unwrap();
        assert_eq!(z.values(), &dyn1(&[1.5]));
        assert_eq!(z.max_vals(), dyn1(&[2.0]));
        assert_eq!(z.min_vals(), dyn1(&[0.5]));
    }

    #[test]
    fn div_by_bounded_rejected() {
        let x = leaf(&[3.0], 1.0, 4.0, 0, 2);
        let y = leaf(&[2.0], 1.0, 4.0, 1, 2);
        assert!(matches!(
            x.try_div(&y),
            Err(SensitivityError::UnsupportedOperation { operation: "div", .. })
        ));
    }

    #[test]
    fn div_by_zero_rejected() {
        let x = leaf(&[3.0], 1.0, 4.0, 0, 1);
        assert!(matches!(
            x.try_div(0.0),
            Err(SensitivityError::UnsupportedOperation { operation: "div", .. })
        ));
        assert!(x.try_div(dyn1(&[0.0])).is_err());
    }

    #[test]
    fn results_inherit_left_sentinel() {
        let sentinel = sens_core::Sentinel::new(1e6).unwrap();
        let x = leaf(&[3.0], 0.0, 10.0, 0, 2).with_sentinel(sentinel);
        let y = leaf(&[2.0], 0.0, 5.0, 1, 2);
        assert_eq!(x.try_mul(&y).unwrap().sentinel(), sentinel);
        assert_eq!(y.try_mul(&x).unwrap().sentinel(), sens_core::Sentinel::default());
    }
}
