//! # Bounded-Contribution Tensor
//!
//! A data tensor of shape `S` plus, for every element and every entity `e`,
//! the greatest (`max_contrib[..., e]`) and least (`min_contrib[..., e]`)
//! amount `e` could have contributed to that element, and a {0,1} entity
//! mask recording which entities are in the element's ancestry. All three
//! per-entity tensors have shape `S + (E,)`.
//!
//! Instances are immutable. The operator rules (`arithmetic.rs`,
//! `compare.rs`, `clamp.rs`) consume one or two tensors and return a new one.
//!
//! ## Invariants
//!
//! - `min_contrib <= max_contrib` for every active entity of a leaf.
//! - `values` carries no bound guarantee; [`max_vals`] and [`min_vals`] are
//!   the authoritative bounds.
//! - The entity count is fixed per computation; binary rules reject
//!   operands built for a different count.
//!
//! [`max_vals`]: BoundedContributionTensor::max_vals
//! [`min_vals`]: BoundedContributionTensor::min_vals

use ndarray::{ArrayD, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

use sens_core::{
    ContributionScalar, EntityCount, EntityId, Result, Sentinel, SensitivityError, ShapeError,
};

use crate::operand::PublicConstant;

/// Values plus per-entity contribution bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    into = "BoundedRepr<A>",
    try_from = "BoundedRepr<A>",
    bound(
        serialize = "A: ContributionScalar + Serialize",
        deserialize = "A: ContributionScalar + Deserialize<'de>"
    )
)]
pub struct BoundedContributionTensor<A> {
    values: ArrayD<A>,
    max_contrib: ArrayD<A>,
    min_contrib: ArrayD<A>,
    entity_mask: ArrayD<A>,
    sentinel: Sentinel<A>,
}

impl<A: ContributionScalar> BoundedContributionTensor<A> {
    /// Build a tensor from raw per-entity bounds.
    ///
    /// `max_contrib`, `min_contrib` and `entity_mask` must share the shape
    /// `values.shape() + [E]` with `E >= 1`. The mask is converted to
    /// floating point here and never changes afterwards. Active entities
    /// must satisfy `min <= max` with finite bounds.
    pub fn new(
        values: ArrayD<A>,
        max_contrib: ArrayD<A>,
        min_contrib: ArrayD<A>,
        entity_mask: ArrayD<bool>,
    ) -> Result<Self> {
        if max_contrib.shape() != min_contrib.shape() || max_contrib.shape() != entity_mask.shape()
        {
            return Err(ShapeError::ContributionMismatch {
                max: max_contrib.shape().to_vec(),
                min: min_contrib.shape().to_vec(),
                mask: entity_mask.shape().to_vec(),
            }
            .into());
        }

        match max_contrib.shape().split_last() {
            Some((0, _)) => return Err(ShapeError::EmptyEntityAxis.into()),
            Some((_, leading)) if leading == values.shape() => {}
            _ => {
                return Err(ShapeError::ValuesPrefix {
                    values: values.shape().to_vec(),
                    contributions: max_contrib.shape().to_vec(),
                }
                .into())
            }
        }

        let entity_mask = entity_mask.mapv(|active| {
            if active {
                A::one()
            } else {
                A::zero()
            }
        });
        let tensor = Self::from_parts(
            values,
            max_contrib,
            min_contrib,
            entity_mask,
            Sentinel::for_precision(),
        );
        tensor.validate_bounds()?;
        Ok(tensor)
    }

    /// [`new`](Self::new) with the mask given as numeric indicators.
    ///
    /// Every mask entry must be exactly 0 or 1.
    pub fn from_indicator_mask(
        values: ArrayD<A>,
        max_contrib: ArrayD<A>,
        min_contrib: ArrayD<A>,
        entity_mask: ArrayD<A>,
    ) -> Result<Self> {
        if let Some((idx, m)) = entity_mask
            .indexed_iter()
            .find(|(_, m)| !m.is_zero() && !m.is_one())
        {
            return Err(SensitivityError::InvalidMask(format!(
                "entry {m} at {:?} is neither 0 nor 1",
                idx.slice()
            )));
        }
        let entity_mask = entity_mask.mapv(|m| m.is_one());
        Self::new(values, max_contrib, min_contrib, entity_mask)
    }

    /// Build a leaf owned by a single entity.
    ///
    /// `values` must lie within `[lower, upper]` elementwise. The entity's
    /// slot receives the bounds; every other slot is zero and inactive.
    pub fn from_entity_bounds(
        values: ArrayD<A>,
        lower: impl Into<PublicConstant<A>>,
        upper: impl Into<PublicConstant<A>>,
        entity: EntityId,
        entity_count: EntityCount,
    ) -> Result<Self> {
        let entity = entity.check(entity_count)?;
        let lower = lower.into().broadcast_like(&values)?;
        let upper = upper.into().broadcast_like(&values)?;

        for ((idx, &v), (&lo, &hi)) in values
            .indexed_iter()
            .zip(lower.iter().zip(upper.iter()))
        {
            if !(lo <= v && v <= hi) {
                return Err(SensitivityError::InvalidBounds(format!(
                    "value {v} at {:?} outside declared bounds [{lo}, {hi}]",
                    idx.slice()
                )));
            }
        }

        let lead = values.ndim();
        let slot = entity.index();
        let mut shape = values.shape().to_vec();
        shape.push(entity_count.get());
        let dim = IxDyn(&shape);

        let in_slot = |idx: &IxDyn, bound: &ArrayD<A>| {
            if idx[lead] == slot {
                bound[&idx.slice()[..lead]]
            } else {
                A::zero()
            }
        };
        let max_contrib = ArrayD::from_shape_fn(dim.clone(), |idx| in_slot(&idx, &upper));
        let min_contrib = ArrayD::from_shape_fn(dim.clone(), |idx| in_slot(&idx, &lower));
        let entity_mask = ArrayD::from_shape_fn(dim, |idx| idx[lead] == slot);

        Self::new(values, max_contrib, min_contrib, entity_mask)
    }

    /// Copy of this tensor using a different inactive-entity sentinel.
    ///
    /// Results of binary rules inherit the left operand's sentinel.
    pub fn with_sentinel(mut self, sentinel: Sentinel<A>) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Assemble a result without validation. Operator rules produce
    /// correctly shaped parts by construction.
    pub(crate) fn from_parts(
        values: ArrayD<A>,
        max_contrib: ArrayD<A>,
        min_contrib: ArrayD<A>,
        entity_mask: ArrayD<A>,
        sentinel: Sentinel<A>,
    ) -> Self {
        Self {
            values,
            max_contrib,
            min_contrib,
            entity_mask,
            sentinel,
        }
    }

    fn validate_bounds(&self) -> Result<()> {
        if let Some(v) = self.values.iter().find(|v| !v.is_finite()) {
            return Err(SensitivityError::InvalidBounds(format!(
                "non-finite value {v}"
            )));
        }
        for ((idx, &hi), (&lo, &active)) in self
            .max_contrib
            .indexed_iter()
            .zip(self.min_contrib.iter().zip(self.entity_mask.iter()))
        {
            if active.is_zero() {
                continue;
            }
            if !hi.is_finite() || !lo.is_finite() || lo > hi {
                return Err(SensitivityError::InvalidBounds(format!(
                    "active entity at {:?} has min {lo} > max {hi} or non-finite bounds",
                    idx.slice()
                )));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The computed data, shape `S`.
    pub fn values(&self) -> &ArrayD<A> {
        &self.values
    }

    /// Per-entity upper contribution bounds, shape `S + (E,)`.
    pub fn max_contrib(&self) -> &ArrayD<A> {
        &self.max_contrib
    }

    /// Per-entity lower contribution bounds, shape `S + (E,)`.
    pub fn min_contrib(&self) -> &ArrayD<A> {
        &self.min_contrib
    }

    /// {0,1} ancestry mask, shape `S + (E,)`.
    pub fn entity_mask(&self) -> &ArrayD<A> {
        &self.entity_mask
    }

    /// The inactive-entity sentinel carried by this tensor.
    pub fn sentinel(&self) -> Sentinel<A> {
        self.sentinel
    }

    /// Shape `S` of the values.
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of entities `E`.
    pub fn entity_count(&self) -> usize {
        self.max_contrib.len_of(self.entity_axis())
    }

    /// Whether entity `entity` is in the ancestry of any element.
    pub fn has_entity(&self, entity: EntityId) -> bool {
        entity.index() < self.entity_count()
            && self
                .entity_mask
                .index_axis(self.entity_axis(), entity.index())
                .iter()
                .any(|m| !m.is_zero())
    }

    pub(crate) fn entity_axis(&self) -> Axis {
        Axis(self.max_contrib.ndim() - 1)
    }

    // -----------------------------------------------------------------------
    // Derived bounds
    // -----------------------------------------------------------------------

    /// Greatest value each element can take: the masked sum of max
    /// contributions over the entity axis.
    pub fn max_vals(&self) -> ArrayD<A> {
        (&self.max_contrib * &self.entity_mask).sum_axis(self.entity_axis())
    }

    /// Least value each element can take, as the *minimum* over the entity
    /// axis of masked min contributions.
    ///
    /// Not a sum, unlike [`max_vals`](Self::max_vals): with several entities
    /// contributing negative amounts this is not a lower bound of the true
    /// value. Inactive entities take part as zeros.
    pub fn min_vals(&self) -> ArrayD<A> {
        (&self.min_contrib * &self.entity_mask).fold_axis(
            self.entity_axis(),
            A::infinity(),
            |&acc, &x| acc.min(x),
        )
    }

    /// [`max_vals`](Self::max_vals) repeated along the entity axis.
    pub fn expanded_max_vals(&self) -> ArrayD<A> {
        self.expand_over_entities(&self.max_vals())
    }

    /// [`min_vals`](Self::min_vals) repeated along the entity axis.
    pub fn expanded_min_vals(&self) -> ArrayD<A> {
        self.expand_over_entities(&self.min_vals())
    }

    fn expand_over_entities(&self, reduced: &ArrayD<A>) -> ArrayD<A> {
        let lead = reduced.ndim();
        ArrayD::from_shape_fn(self.max_contrib.raw_dim(), |idx| {
            reduced[&idx.slice()[..lead]]
        })
    }

    /// Total sensitivity of each element: `sum_e (max_contrib - min_contrib)`.
    pub fn sensitivity(&self) -> ArrayD<A> {
        self.entity_sensitivities().sum_axis(self.entity_axis())
    }

    /// `max_contrib - min_contrib` per element and entity.
    pub fn entity_sensitivities(&self) -> ArrayD<A> {
        &self.max_contrib - &self.min_contrib
    }

    /// Sensitivity attributable to one entity, shape `S`.
    pub fn sensitivity_of(&self, entity: EntityId) -> Result<ArrayD<A>> {
        let count = self.entity_count();
        if entity.index() >= count {
            return Err(ShapeError::EntityOutOfRange {
                entity: entity.index(),
                count,
            }
            .into());
        }
        Ok(self
            .entity_sensitivities()
            .index_axis_move(self.entity_axis(), entity.index()))
    }

    /// Largest single-entity sensitivity of each element: how far the
    /// element can move when any one entity is removed.
    pub fn max_entity_sensitivity(&self) -> ArrayD<A> {
        self.entity_sensitivities().fold_axis(
            self.entity_axis(),
            A::neg_infinity(),
            |&acc, &x| acc.max(x),
        )
    }

    // -----------------------------------------------------------------------
    // Binary-rule helpers
    // -----------------------------------------------------------------------

    pub(crate) fn ensure_compatible(&self, other: &Self) -> Result<()> {
        let (left, right) = (self.entity_count(), other.entity_count());
        if left != right {
            return Err(ShapeError::EntityCount { left, right }.into());
        }
        if self.shape() != other.shape() {
            return Err(ShapeError::Operand {
                left: self.shape().to_vec(),
                right: other.shape().to_vec(),
            }
            .into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Wire form: all four fields travel together, the mask as booleans.
#[derive(Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: ContributionScalar + Serialize",
    deserialize = "A: ContributionScalar + Deserialize<'de>"
))]
struct BoundedRepr<A> {
    values: ArrayD<A>,
    max_contrib: ArrayD<A>,
    min_contrib: ArrayD<A>,
    entity_mask: ArrayD<bool>,
    #[serde(default)]
    sentinel: Sentinel<A>,
}

impl<A: ContributionScalar> From<BoundedContributionTensor<A>> for BoundedRepr<A> {
    fn from(tensor: BoundedContributionTensor<A>) -> Self {
        Self {
            entity_mask: tensor.entity_mask.mapv(|m| !m.is_zero()),
            values: tensor.values,
            max_contrib: tensor.max_contrib,
            min_contrib: tensor.min_contrib,
            sentinel: tensor.sentinel,
        }
    }
}

impl<A: ContributionScalar> TryFrom<BoundedRepr<A>> for BoundedContributionTensor<A> {
    type Error = SensitivityError;

    fn try_from(repr: BoundedRepr<A>) -> Result<Self> {
        Ok(Self::new(
            repr.values,
            repr.max_contrib,
            repr.min_contrib,
            repr.entity_mask,
        )?
        .with_sentinel(repr.sentinel))
    }
}
