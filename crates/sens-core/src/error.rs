//! # Error Types
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations. Every error is a deterministic logic error: the
//! expression that produced it is aborted, no partial result is returned,
//! and retrying with the same operands fails the same way.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SensitivityError>;

/// Top-level error type for the contribution-bound algebra.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensitivityError {
    /// Operand shapes or entity counts are incompatible.
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    /// The algebra has no rule for this operand combination.
    #[error("unsupported operation `{operation}`: {reason}")]
    UnsupportedOperation {
        /// Operation name (e.g. `div`).
        operation: &'static str,
        /// Why the combination is rejected.
        reason: String,
    },

    /// A reserved extension point of the algebra.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Contribution bounds violate `min <= max` or are not finite.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// Entity mask entries must be exactly 0 or 1.
    #[error("invalid entity mask: {0}")]
    InvalidMask(String),

    /// Configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SensitivityError {
    /// Shorthand for [`SensitivityError::UnsupportedOperation`].
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation,
            reason: reason.into(),
        }
    }
}

/// Shape and entity-axis incompatibilities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// `max_contrib`, `min_contrib` and `entity_mask` must share one shape.
    #[error("contribution tensors disagree: max {max:?}, min {min:?}, mask {mask:?}")]
    ContributionMismatch {
        /// Shape of the max-contribution tensor.
        max: Vec<usize>,
        /// Shape of the min-contribution tensor.
        min: Vec<usize>,
        /// Shape of the entity mask.
        mask: Vec<usize>,
    },

    /// Contribution shape must be the values shape plus a trailing entity axis.
    #[error("values shape {values:?} is not the prefix of contribution shape {contributions:?}")]
    ValuesPrefix {
        /// Shape of the values tensor.
        values: Vec<usize>,
        /// Shape of the contribution tensors.
        contributions: Vec<usize>,
    },

    /// The trailing entity axis has length zero.
    #[error("entity axis is empty")]
    EmptyEntityAxis,

    /// Binary operands were built for different entity counts.
    #[error("entity count mismatch: left has {left}, right has {right}")]
    EntityCount {
        /// Entity count of the left operand.
        left: usize,
        /// Entity count of the right operand.
        right: usize,
    },

    /// Binary operands have different values shapes.
    #[error("operand shape mismatch: left {left:?}, right {right:?}")]
    Operand {
        /// Values shape of the left operand.
        left: Vec<usize>,
        /// Values shape of the right operand.
        right: Vec<usize>,
    },

    /// A public tensor cannot be broadcast onto the bounded operand.
    #[error("public constant of shape {public:?} cannot broadcast to {target:?}")]
    PublicBroadcast {
        /// Shape of the public constant.
        public: Vec<usize>,
        /// Shape it was applied to.
        target: Vec<usize>,
    },

    /// An entity index outside `0..count`.
    #[error("entity {entity} out of range for {count} entities")]
    EntityOutOfRange {
        /// Requested entity index.
        entity: usize,
        /// Number of entities in the computation.
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_converts_into_top_level() {
        let err: SensitivityError = ShapeError::EntityCount { left: 2, right: 3 }.into();
        assert!(matches!(err, SensitivityError::Shape(ShapeError::EntityCount { .. })));
        assert_eq!(
            err.to_string(),
            "shape error: entity count mismatch: left has 2, right has 3"
        );
    }

    #[test]
    fn unsupported_display_names_operation() {
        let err = SensitivityError::unsupported("div", "divisor carries contribution bounds");
        assert_eq!(
            err.to_string(),
            "unsupported operation `div`: divisor carries contribution bounds"
        );
    }

    #[test]
    fn entity_out_of_range_display() {
        let err = ShapeError::EntityOutOfRange { entity: 4, count: 2 };
        assert_eq!(err.to_string(), "entity 4 out of range for 2 entities");
    }
}
