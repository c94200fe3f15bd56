//! Error types for geometry operations.

use thiserror::Error;

/// Errors arising from point and rectangle operations.
///
/// All of these indicate a caller bug: the operation is rejected
/// immediately and nothing is coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Two operands have different dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension of the receiver.
        expected: usize,
        /// Dimension of the argument.
        found: usize,
    },
    /// An axis index is not below the value's dimension.
    #[error("axis {axis} out of range for {dim}-dimensional value")]
    AxisOutOfRange {
        /// The offending axis.
        axis: usize,
        /// Dimension of the value.
        dim: usize,
    },
    /// A rectangle would have `ul > br` on some axis.
    #[error("invalid region: {reason}")]
    InvalidRegion {
        /// What went wrong.
        reason: String,
    },
    /// A point or rectangle is not inside the region it must lie in.
    #[error("{what} is not contained in {region}")]
    NotContained {
        /// Description of the offending value.
        what: String,
        /// Description of the containing region.
        region: String,
    },
    /// Two rectangles that were required to overlap do not.
    #[error("rectangles {a} and {b} do not intersect")]
    NoIntersection {
        /// The receiver.
        a: String,
        /// The argument.
        b: String,
    },
}
