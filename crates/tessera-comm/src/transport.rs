//! The raw group transport the collective layer drives.

use tessera_core::Rank;

use crate::error::TransportError;

/// A byte-oriented group communication layer.
///
/// Ranks are group-local and dense (`0..size()`). Every operation except
/// the local accessors and [`set_neighbors`](Self::set_neighbors) is
/// collective: every member must call it in the same order with matching
/// arguments, or the call blocks indefinitely.
///
/// The variable-length byte operations take per-rank `counts` and
/// `displs` (byte displacement of each rank's slice), in the style of an
/// MPI `*v` collective. Callers learn the counts through the fixed-size
/// count collectives first.
pub trait Transport: Send {
    /// This process's rank within the group.
    fn rank(&self) -> Rank;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// World rank of this process, stable across sub-groups.
    fn world_rank(&self) -> Rank;

    /// World ranks of the group members, indexed by group rank.
    fn members(&self) -> &[Rank];

    /// Topology neighbours, in topology order.
    fn neighbors(&self) -> &[Rank];

    /// Define the neighbour topology used by the neighbour collectives.
    ///
    /// Local operation. Neighbour relations must be symmetric across the
    /// group for the neighbour collectives to match up.
    fn set_neighbors(&mut self, neighbors: Vec<Rank>) -> Result<(), TransportError>;

    /// Create a sub-group over `members` (world ranks).
    ///
    /// Collective over the members only. Members are numbered in
    /// ascending world-rank order. Returns `Ok(None)` without
    /// communicating when the caller is not a member.
    fn create_group(&mut self, members: &[Rank]) -> Result<Option<Self>, TransportError>
    where
        Self: Sized;

    /// Block until every member has entered the barrier.
    fn barrier(&mut self) -> Result<(), TransportError>;

    // ── Fixed-size count collectives ────────────────────────────

    /// Root's `count` on every rank.
    fn broadcast_count(&mut self, count: u64, root: Rank) -> Result<u64, TransportError>;

    /// Root supplies one count per rank; each rank returns its own.
    fn scatter_counts(&mut self, counts: &[u64], root: Rank) -> Result<u64, TransportError>;

    /// Every rank's count at `root` in rank order; empty elsewhere.
    fn gather_counts(&mut self, count: u64, root: Rank) -> Result<Vec<u64>, TransportError>;

    /// Every rank's count on every rank, in rank order.
    fn all_gather_counts(&mut self, count: u64) -> Result<Vec<u64>, TransportError>;

    /// One count to each neighbour; one count from each, in neighbour
    /// order.
    fn neighbor_all_to_all_counts(&mut self, counts: &[u64]) -> Result<Vec<u64>, TransportError>;

    // ── Variable-length byte collectives ────────────────────────

    /// Root's `buf` copied into every rank's `buf` (same length on all).
    fn broadcast_bytes(&mut self, buf: &mut [u8], root: Rank) -> Result<(), TransportError>;

    /// Root's `send[displs[i]..][..counts[i]]` into rank `i`'s `recv`.
    fn scatterv(
        &mut self,
        send: &[u8],
        counts: &[u64],
        displs: &[u64],
        recv: &mut [u8],
        root: Rank,
    ) -> Result<(), TransportError>;

    /// Every rank's `send` into root's `recv[displs[i]..][..counts[i]]`.
    fn gatherv(
        &mut self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[u64],
        displs: &[u64],
        root: Rank,
    ) -> Result<(), TransportError>;

    /// Every rank's `send` into every rank's `recv[displs[i]..][..counts[i]]`.
    fn all_gatherv(
        &mut self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[u64],
        displs: &[u64],
    ) -> Result<(), TransportError>;

    /// Slice `k` of `send` to neighbour `k`; neighbour `k`'s slice into
    /// slice `k` of `recv`.
    #[allow(clippy::too_many_arguments)]
    fn neighbor_all_to_allv(
        &mut self,
        send: &[u8],
        send_counts: &[u64],
        send_displs: &[u64],
        recv: &mut [u8],
        recv_counts: &[u64],
        recv_displs: &[u64],
    ) -> Result<(), TransportError>;
}

/// Exclusive prefix sum of `counts`, as used for displacements.
pub fn displacements(counts: &[u64]) -> Vec<u64> {
    let mut at = 0;
    counts
        .iter()
        .map(|&c| {
            let d = at;
            at += c;
            d
        })
        .collect()
}
