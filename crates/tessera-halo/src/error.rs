//! Error types for halo plan construction and execution.

use tessera_geom::GeometryError;
use thiserror::Error;

/// Errors arising from building or executing a [`HaloPlan`](crate::HaloPlan).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HaloError {
    /// A geometric precondition failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// A plan was requested with a zero element size.
    #[error("element size must be positive")]
    ZeroElementSize,
    /// A ghost width below zero was requested.
    #[error("ghost width {width} is negative")]
    NegativeGhostWidth {
        /// The rejected width.
        width: i64,
    },
    /// The ghost layer is at least as wide as the periodic world.
    #[error("ghost width {width} does not fit the world extent {extent} on axis {axis}")]
    GhostWidthTooLarge {
        /// The rejected width.
        width: i64,
        /// First axis that is too narrow.
        axis: usize,
        /// The world's extent on that axis.
        extent: i64,
    },
    /// The storage buffer is smaller than the plan's bounding region.
    #[error("storage holds {available} bytes, plan needs {needed}")]
    StorageTooSmall {
        /// Bytes required by the bounding region.
        needed: usize,
        /// Bytes the storage exposes.
        available: usize,
    },
    /// An unpack payload does not match the plan's byte count.
    #[error("payload has {actual} bytes, plan describes {expected}")]
    PayloadLength {
        /// Bytes described by the plan.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}
