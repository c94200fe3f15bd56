//! Error types for tree operations.

use tessera_geom::GeometryError;
use thiserror::Error;

use crate::quadtree::NodeId;

/// Errors arising from quadtree and interval-index operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A geometric precondition failed (dimension mismatch, point outside
    /// the node, ...).
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// The node id does not refer to a live node: it was merged away, or
    /// belongs to another tree.
    #[error("stale or unknown node {0}")]
    StaleNode(NodeId),
    /// A snap policy returned an origin outside the region it was asked to
    /// snap into.
    #[error("snap policy placed origin {origin} outside {region}")]
    SnapOutside {
        /// The snapped origin.
        origin: String,
        /// The region it had to lie in.
        region: String,
    },
    /// A segment has `start > end`.
    #[error("invalid segment [{start}, {end})")]
    InvalidSegment {
        /// Segment start.
        start: String,
        /// Segment end.
        end: String,
    },
    /// [`Quadtree::check_invariants`](crate::Quadtree::check_invariants)
    /// found a structural violation.
    #[error("tree invariant violated at node {node}: {reason}")]
    InvariantViolated {
        /// The offending node.
        node: NodeId,
        /// Description of the violation.
        reason: String,
    },
}
