//! Error types for transports and collectives.

use tessera_core::{ConfigError, Rank, WireError};
use tessera_tree::{NodeId, TreeError};
use thiserror::Error;

/// Errors raised by a [`Transport`](crate::Transport) or a
/// [`CollectiveTransport`](crate::CollectiveTransport) operation.
///
/// Under [`FailurePolicy::Abort`](crate::FailurePolicy::Abort) none of
/// these reach the caller of a collective: the process logs and aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A payload could not be decoded.
    #[error("payload decode failed: {0}")]
    Wire(#[from] WireError),
    /// A peer's endpoint is gone (its thread exited or the group was
    /// torn down).
    #[error("peer {peer} disconnected")]
    Disconnected {
        /// Group-local rank of the peer.
        peer: Rank,
    },
    /// A rank argument is outside the group.
    #[error("rank {rank} out of range for group of {size}")]
    RankOutOfRange {
        /// The offending rank.
        rank: Rank,
        /// Size of the group.
        size: usize,
    },
    /// A per-rank or per-neighbour list has the wrong length.
    #[error("expected {expected} entries, got {actual}")]
    CountMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// Participants disagreed about the shape of a collective.
    #[error("protocol violation: {reason}")]
    Protocol {
        /// Description of the disagreement.
        reason: String,
    },
    /// A decomposition node that must be owned has no owning rank.
    #[error("decomposition node {node} has no owner")]
    Unowned {
        /// The unassigned node.
        node: NodeId,
    },
    /// An aggregation group was asked to span a leaf.
    #[error("decomposition node {node} is a leaf, expected an internal node")]
    NotInternal {
        /// The leaf.
        node: NodeId,
    },
    /// Group membership could not be derived from the decomposition.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A configuration value was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
