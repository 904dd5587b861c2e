//! Elementwise kernels shared by the operator rules.
//!
//! Every kernel takes operands of identical shape; callers establish that
//! through construction invariants or `ensure_compatible`.

use ndarray::{ArrayD, Zip};

use sens_core::ContributionScalar;

/// `1` when `cond` holds, `0` otherwise.
pub(crate) fn indicator<A: ContributionScalar>(cond: bool) -> A {
    if cond {
        A::one()
    } else {
        A::zero()
    }
}

pub(crate) fn maximum<A: ContributionScalar>(a: &ArrayD<A>, b: &ArrayD<A>) -> ArrayD<A> {
    Zip::from(a).and(b).map_collect(|&x, &y| x.max(y))
}

pub(crate) fn minimum<A: ContributionScalar>(a: &ArrayD<A>, b: &ArrayD<A>) -> ArrayD<A> {
    Zip::from(a).and(b).map_collect(|&x, &y| x.min(y))
}

/// Logical OR of two {0,1} masks, kept as floating point.
pub(crate) fn union_mask<A: ContributionScalar>(a: &ArrayD<A>, b: &ArrayD<A>) -> ArrayD<A> {
    Zip::from(a)
        .and(b)
        .map_collect(|&x, &y| indicator(x + y > A::zero()))
}

/// `bound * gate + (1 - presence) * extreme`.
///
/// Entities absent from `presence` are pushed to `extreme` so a later
/// max/min across operands never picks them. `gate` zeroes the bound itself.
pub(crate) fn fence<A: ContributionScalar>(
    bound: &ArrayD<A>,
    gate: &ArrayD<A>,
    presence: &ArrayD<A>,
    extreme: A,
) -> ArrayD<A> {
    Zip::from(bound)
        .and(gate)
        .and(presence)
        .map_collect(|&v, &g, &p| v * g + (A::one() - p) * extreme)
}
