//! # Numeric Precision and the Inactive-Entity Sentinel
//!
//! When two operands with different ancestries are combined by a max/min
//! rule, entities absent from one side must not tighten the bound. They are
//! fenced out with an extreme value (`-MAXVAL` for max contributions,
//! `+MAXVAL` for min contributions) before the combination, then masked away.
//!
//! The extreme must be representable in the element type and must survive
//! multiplication by 0 and 1 exactly, so it is a finite power of two rather
//! than `A::max_value()` or infinity (`0 * inf` is NaN).

use ndarray::NdFloat;
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};

/// Default leak coefficient for `hard_sigmoid_deriv` outside `[0, 1]`.
pub const DEFAULT_HARD_SIGMOID_LEAK: f64 = 0.01;

/// Element types the contribution algebra can run over.
pub trait ContributionScalar: NdFloat + Float {
    /// Default magnitude of the inactive-entity sentinel for this precision.
    const DEFAULT_SENTINEL: Self;

    /// Convert an `f64` configuration constant into this precision.
    fn from_f64_lossy(value: f64) -> Self;
}

impl ContributionScalar for f64 {
    // 2^62
    const DEFAULT_SENTINEL: Self = 4_611_686_018_427_387_904.0;

    fn from_f64_lossy(value: f64) -> Self {
        value
    }
}

impl ContributionScalar for f32 {
    // 2^62, exact in f32.
    const DEFAULT_SENTINEL: Self = 4_611_686_018_427_387_904.0;

    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }
}

/// Magnitude of the extreme used to fence out inactive entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Sentinel<A>(A);

impl<A: ContributionScalar> Sentinel<A> {
    /// A custom sentinel. Must be finite and strictly positive.
    pub fn new(magnitude: A) -> Result<Self> {
        if !magnitude.is_finite() || magnitude <= A::zero() {
            return Err(SensitivityError::InvalidConfig(format!(
                "sentinel must be finite and positive, got {magnitude}"
            )));
        }
        if magnitude != A::DEFAULT_SENTINEL {
            tracing::debug!(sentinel = %magnitude, "using non-default inactive-entity sentinel");
        }
        Ok(Self(magnitude))
    }

    /// The default sentinel for this precision.
    pub fn for_precision() -> Self {
        Self(A::DEFAULT_SENTINEL)
    }

    /// `+MAXVAL`: fences min contributions.
    pub fn upper(self) -> A {
        self.0
    }

    /// `-MAXVAL`: fences max contributions.
    pub fn lower(self) -> A {
        -self.0
    }
}

impl<A: ContributionScalar> Default for Sentinel<A> {
    fn default() -> Self {
        Self::for_precision()
    }
}

impl<'de, A> Deserialize<'de> for Sentinel<A>
where
    A: ContributionScalar + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = A::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sentinel_is_two_to_the_62() {
        assert_eq!(Sentinel::<f64>::default().upper(), 2f64.powi(62));
        assert_eq!(Sentinel::<f32>::default().upper(), 2f32.powi(62));
        assert_eq!(Sentinel::<f64>::default().lower(), -(2f64.powi(62)));
    }

    #[test]
    fn sentinel_survives_mask_multiplication() {
        let s = Sentinel::<f32>::default().upper();
        assert_eq!(s * 0.0, 0.0);
        assert_eq!(s * 1.0, s);
        assert!((s * 0.0).is_finite());
    }

    #[test]
    fn invalid_sentinels_rejected() {
        assert!(Sentinel::new(0.0_f64).is_err());
        assert!(Sentinel::new(-1.0_f64).is_err());
        assert!(Sentinel::new(f64::INFINITY).is_err());
        assert!(Sentinel::new(f64::NAN).is_err());
        assert_eq!(Sentinel::new(1e9_f64).unwrap().upper(), 1e9);
    }

    #[test]
    fn sentinel_deserialize_validates() {
        let s: Sentinel<f64> = serde_json::from_str("1024.0").unwrap();
        assert_eq!(s.upper(), 1024.0);
        assert!(serde_json::from_str::<Sentinel<f64>>("-3.0").is_err());
    }

    #[test]
    fn leak_converts_to_both_precisions() {
        assert_eq!(f64::from_f64_lossy(DEFAULT_HARD_SIGMOID_LEAK), 0.01);
        assert_eq!(f32::from_f64_lossy(DEFAULT_HARD_SIGMOID_LEAK), 0.01_f32);
    }
}
