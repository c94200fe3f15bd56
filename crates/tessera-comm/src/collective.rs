//! Typed collectives over a byte-oriented [`Transport`].
//!
//! Every operation follows the same four steps:
//!
//! 1. Encode each outgoing value as a length-prefixed frame.
//! 2. Exchange only the frame lengths with a fixed-size count collective.
//! 3. Compute byte displacements (exclusive prefix sum of the lengths)
//!    and move all frames with one variable-length collective.
//! 4. Decode each received slice on its own.
//!
//! The send and receive buffers belong to the [`CollectiveTransport`] and
//! are cleared and reused by every call.

use tessera_core::{Rank, Wire};
use tracing::{error, trace};

use crate::config::{CommConfig, FailurePolicy};
use crate::error::TransportError;
use crate::frame::{read_frame, write_frame};
use crate::transport::{displacements, Transport};

/// Framed collectives for one communication group.
///
/// Under the default [`FailurePolicy::Abort`], a failed collective is
/// logged at `error` level and the process aborts; the `Result` returned
/// by each operation only ever carries errors under
/// [`FailurePolicy::Propagate`].
///
/// # Example
///
/// ```
/// use tessera_comm::{CollectiveTransport, CommConfig, LocalTransport};
///
/// let handles: Vec<_> = LocalTransport::world(3)
///     .into_iter()
///     .map(|t| {
///         std::thread::spawn(move || {
///             let mut comm = CollectiveTransport::new(t, CommConfig::default()).unwrap();
///             let name = format!("rank-{}", comm.rank());
///             comm.all_gather(&name).unwrap()
///         })
///     })
///     .collect();
/// for h in handles {
///     assert_eq!(h.join().unwrap(), ["rank-0", "rank-1", "rank-2"]);
/// }
/// ```
#[derive(Debug)]
pub struct CollectiveTransport<T: Transport> {
    transport: T,
    config: CommConfig,
    send_buf: Vec<u8>,
    recv_buf: Vec<u8>,
}

impl<T: Transport> CollectiveTransport<T> {
    /// Wrap `transport`, validating `config`.
    pub fn new(transport: T, config: CommConfig) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self {
            transport,
            send_buf: Vec::with_capacity(config.buffer_capacity),
            recv_buf: Vec::with_capacity(config.buffer_capacity),
            config,
        })
    }

    /// This process's rank in the group.
    pub fn rank(&self) -> Rank {
        self.transport.rank()
    }

    /// Group size.
    pub fn size(&self) -> usize {
        self.transport.size()
    }

    /// World rank of this process.
    pub fn world_rank(&self) -> Rank {
        self.transport.world_rank()
    }

    /// World ranks of the group members, indexed by group rank.
    pub fn members(&self) -> &[Rank] {
        self.transport.members()
    }

    /// Topology neighbours, in the order used by
    /// [`neighbor_all_to_all`](Self::neighbor_all_to_all).
    pub fn neighbors(&self) -> &[Rank] {
        self.transport.neighbors()
    }

    /// Define the neighbour topology. Local operation.
    pub fn set_neighbors(&mut self, neighbors: Vec<Rank>) -> Result<(), TransportError> {
        self.transport.set_neighbors(neighbors)
    }

    /// The active configuration.
    pub fn config(&self) -> &CommConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Unwrap into the underlying transport, dropping the buffers.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Create a sub-group over `members` (world ranks) with the same
    /// configuration. Non-members get `Ok(None)` without communicating.
    pub fn create_group(&mut self, members: &[Rank]) -> Result<Option<Self>, TransportError> {
        let result = self.transport.create_group(members).map(|group| {
            group.map(|transport| Self {
                transport,
                send_buf: Vec::with_capacity(self.config.buffer_capacity),
                recv_buf: Vec::with_capacity(self.config.buffer_capacity),
                config: self.config.clone(),
            })
        });
        self.settle("create_group", result)
    }

    /// Block until every member has arrived.
    pub fn barrier(&mut self) -> Result<(), TransportError> {
        trace!(op = "barrier", rank = %self.rank());
        let result = self.transport.barrier();
        self.settle("barrier", result)
    }

    /// Root's value on every rank.
    ///
    /// Only the root's `value` is read; it must be `Some` there. Every
    /// rank, root included, returns the decoded value. A root without a
    /// value fails on every rank.
    pub fn broadcast<V: Wire>(&mut self, value: Option<&V>, root: Rank) -> Result<V, TransportError> {
        let result = self.try_broadcast(value, root);
        self.settle("broadcast", result)
    }

    /// Root supplies one value per rank; each rank returns its own.
    ///
    /// `values` is only read at the root, where its length must equal the
    /// group size. Otherwise the call fails on every rank.
    pub fn scatter<V: Wire>(&mut self, values: &[V], root: Rank) -> Result<V, TransportError> {
        let result = self.try_scatter(values, root);
        self.settle("scatter", result)
    }

    /// Every rank's value at `dst` in rank order; an empty list elsewhere.
    pub fn gather<V: Wire>(&mut self, value: &V, dst: Rank) -> Result<Vec<V>, TransportError> {
        let result = self.try_gather(value, dst);
        self.settle("gather", result)
    }

    /// Every rank's value on every rank, in rank order.
    pub fn all_gather<V: Wire>(&mut self, value: &V) -> Result<Vec<V>, TransportError> {
        let result = self.try_all_gather(value);
        self.settle("all_gather", result)
    }

    /// One value to each topology neighbour, one back from each, both in
    /// neighbour order.
    ///
    /// A wrong number of values fails before anything is sent, so under
    /// [`FailurePolicy::Propagate`] the neighbours are left waiting and the
    /// group must be torn down.
    pub fn neighbor_all_to_all<V: Wire>(&mut self, values: &[V]) -> Result<Vec<V>, TransportError> {
        let result = self.try_neighbor_all_to_all(values);
        self.settle("neighbor_all_to_all", result)
    }

    // ── Protocol bodies ─────────────────────────────────────────

    fn try_broadcast<V: Wire>(&mut self, value: Option<&V>, root: Rank) -> Result<V, TransportError> {
        self.send_buf.clear();
        let is_root = self.rank() == root;
        let mut len = 0;
        if is_root {
            let Some(value) = value else {
                // Release the other ranks before failing.
                self.transport.broadcast_count(ROOT_FAILED, root)?;
                return Err(TransportError::Protocol {
                    reason: "broadcast root supplied no value".into(),
                });
            };
            len = write_frame(value, &mut self.send_buf) as u64;
        }
        let len = self.transport.broadcast_count(len, root)?;
        if len == ROOT_FAILED {
            return Err(root_failed("broadcast", root));
        }
        trace!(op = "broadcast", rank = %self.rank(), %root, bytes = len);
        if is_root {
            self.transport.broadcast_bytes(&mut self.send_buf, root)?;
            return Ok(read_frame(&self.send_buf)?);
        }
        self.reset_recv(len as usize);
        self.transport.broadcast_bytes(&mut self.recv_buf, root)?;
        Ok(read_frame(&self.recv_buf)?)
    }

    fn try_scatter<V: Wire>(&mut self, values: &[V], root: Rank) -> Result<V, TransportError> {
        self.send_buf.clear();
        let mut counts = Vec::new();
        if self.rank() == root {
            if values.len() != self.size() {
                self.transport
                    .scatter_counts(&vec![ROOT_FAILED; self.size()], root)?;
                return Err(TransportError::CountMismatch {
                    expected: self.size(),
                    actual: values.len(),
                });
            }
            counts = values
                .iter()
                .map(|v| write_frame(v, &mut self.send_buf) as u64)
                .collect();
        }
        let own = self.transport.scatter_counts(&counts, root)?;
        if own == ROOT_FAILED {
            return Err(root_failed("scatter", root));
        }
        let displs = displacements(&counts);
        trace!(op = "scatter", rank = %self.rank(), %root, bytes = own);
        self.reset_recv(own as usize);
        self.transport
            .scatterv(&self.send_buf, &counts, &displs, &mut self.recv_buf, root)?;
        Ok(read_frame(&self.recv_buf)?)
    }

    fn try_gather<V: Wire>(&mut self, value: &V, dst: Rank) -> Result<Vec<V>, TransportError> {
        self.send_buf.clear();
        let len = write_frame(value, &mut self.send_buf) as u64;
        let counts = self.transport.gather_counts(len, dst)?;
        let displs = displacements(&counts);
        let total: u64 = counts.iter().sum();
        trace!(op = "gather", rank = %self.rank(), %dst, bytes = total);
        self.reset_recv(total as usize);
        self.transport
            .gatherv(&self.send_buf, &mut self.recv_buf, &counts, &displs, dst)?;
        decode_slices(&self.recv_buf, &counts)
    }

    fn try_all_gather<V: Wire>(&mut self, value: &V) -> Result<Vec<V>, TransportError> {
        self.send_buf.clear();
        let len = write_frame(value, &mut self.send_buf) as u64;
        let counts = self.transport.all_gather_counts(len)?;
        let displs = displacements(&counts);
        let total: u64 = counts.iter().sum();
        trace!(op = "all_gather", rank = %self.rank(), bytes = total);
        self.reset_recv(total as usize);
        self.transport
            .all_gatherv(&self.send_buf, &mut self.recv_buf, &counts, &displs)?;
        decode_slices(&self.recv_buf, &counts)
    }

    fn try_neighbor_all_to_all<V: Wire>(&mut self, values: &[V]) -> Result<Vec<V>, TransportError> {
        let k = self.neighbors().len();
        if values.len() != k {
            return Err(TransportError::CountMismatch {
                expected: k,
                actual: values.len(),
            });
        }
        self.send_buf.clear();
        let send_counts: Vec<u64> = values
            .iter()
            .map(|v| write_frame(v, &mut self.send_buf) as u64)
            .collect();
        let recv_counts = self.transport.neighbor_all_to_all_counts(&send_counts)?;
        let send_displs = displacements(&send_counts);
        let recv_displs = displacements(&recv_counts);
        let total: u64 = recv_counts.iter().sum();
        trace!(
            op = "neighbor_all_to_all",
            rank = %self.rank(),
            neighbors = k,
            sent = self.send_buf.len(),
            received = total
        );
        self.reset_recv(total as usize);
        self.transport.neighbor_all_to_allv(
            &self.send_buf,
            &send_counts,
            &send_displs,
            &mut self.recv_buf,
            &recv_counts,
            &recv_displs,
        )?;
        decode_slices(&self.recv_buf, &recv_counts)
    }

    fn reset_recv(&mut self, len: usize) {
        self.recv_buf.clear();
        self.recv_buf.resize(len, 0);
    }

    /// Apply the failure policy to a finished collective.
    fn settle<R>(&self, op: &'static str, result: Result<R, TransportError>) -> Result<R, TransportError> {
        match result {
            Ok(v) => Ok(v),
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Propagate => Err(e),
                FailurePolicy::Abort => {
                    error!(
                        op,
                        rank = %self.rank(),
                        world_rank = %self.world_rank(),
                        error = %e,
                        "collective failed, aborting"
                    );
                    std::process::abort()
                }
            },
        }
    }
}

/// Count sent in place of a frame length when the root cannot go ahead.
/// Every rank sees it in the count step and fails instead of waiting for
/// the bulk transfer.
const ROOT_FAILED: u64 = u64::MAX;

fn root_failed(op: &str, root: Rank) -> TransportError {
    TransportError::Protocol {
        reason: format!("{op} root {root} failed before sending"),
    }
}

fn decode_slices<V: Wire>(buf: &[u8], counts: &[u64]) -> Result<Vec<V>, TransportError> {
    let mut at = 0;
    counts
        .iter()
        .map(|&c| {
            let end = at + c as usize;
            let slice = buf.get(at..end).ok_or_else(|| TransportError::Protocol {
                reason: format!("slice [{at}, {end}) beyond {} received bytes", buf.len()),
            })?;
            at = end;
            Ok(read_frame(slice)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalTransport;
    use std::sync::Arc;
    use std::thread;

    fn propagate() -> CommConfig {
        CommConfig {
            failure_policy: FailurePolicy::Propagate,
            ..CommConfig::default()
        }
    }

    fn run<R: Send + 'static>(
        n: usize,
        f: impl Fn(CollectiveTransport<LocalTransport>) -> R + Send + Sync + 'static,
    ) -> Vec<R> {
        let f = Arc::new(f);
        let handles: Vec<_> = LocalTransport::world(n)
            .into_iter()
            .map(|t| {
                let f = Arc::clone(&f);
                thread::spawn(move || f(CollectiveTransport::new(t, propagate()).unwrap()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn zero_capacity_config_rejected() {
        let t = LocalTransport::world(1).pop().unwrap();
        let cfg = CommConfig {
            buffer_capacity: 0,
            ..propagate()
        };
        assert!(matches!(
            CollectiveTransport::new(t, cfg),
            Err(TransportError::Config(_))
        ));
    }

    #[test]
    fn broadcast_returns_roots_value_everywhere() {
        let out = run(3, |mut c| {
            let mine = format!("from-{}", c.rank());
            let v = (c.rank() == Rank(1)).then_some(&mine);
            c.broadcast(v, Rank(1)).unwrap()
        });
        assert_eq!(out, vec!["from-1"; 3]);
    }

    #[test]
    fn broadcast_root_without_value_fails() {
        let mut c = CollectiveTransport::new(LocalTransport::world(1).pop().unwrap(), propagate())
            .unwrap();
        assert!(matches!(
            c.broadcast::<u8>(None, Rank(0)),
            Err(TransportError::Protocol { .. })
        ));
    }

    #[test]
    fn failed_broadcast_root_releases_every_rank() {
        let out = run(3, |mut c| {
            let first = c.broadcast::<u32>(None, Rank(2));
            // The group is still in step afterwards.
            let second = c.broadcast((c.rank() == Rank(2)).then_some(&5u32), Rank(2));
            (first, second)
        });
        for (first, second) in out {
            assert!(matches!(first, Err(TransportError::Protocol { .. })));
            assert_eq!(second, Ok(5));
        }
    }

    #[test]
    fn scatter_hands_each_rank_its_value() {
        let out = run(3, |mut c| {
            let values: Vec<Vec<u32>> = (0..3).map(|i| vec![i; i as usize]).collect();
            let v: &[Vec<u32>] = if c.rank() == Rank(0) { &values } else { &[] };
            c.scatter(v, Rank(0)).unwrap()
        });
        assert_eq!(out, vec![vec![], vec![1], vec![2, 2]]);
    }

    #[test]
    fn scatter_requires_one_value_per_rank() {
        let mut c = CollectiveTransport::new(LocalTransport::world(1).pop().unwrap(), propagate())
            .unwrap();
        assert_eq!(
            c.scatter::<u8>(&[1, 2], Rank(0)),
            Err(TransportError::CountMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn short_scatter_fails_on_every_rank() {
        let out = run(3, |mut c| {
            let v: &[u8] = if c.rank() == Rank(0) { &[1, 2] } else { &[] };
            c.scatter(v, Rank(0))
        });
        assert_eq!(
            out[0],
            Err(TransportError::CountMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert!(out[1..]
            .iter()
            .all(|r| matches!(r, Err(TransportError::Protocol { .. }))));
    }

    #[test]
    fn gather_collects_at_destination_only() {
        let out = run(4, |mut c| {
            let v = String::from("x").repeat(c.rank().index());
            c.gather(&v, Rank(3)).unwrap()
        });
        assert!(out[..3].iter().all(Vec::is_empty));
        assert_eq!(out[3], vec!["", "x", "xx", "xxx"]);
    }

    #[test]
    fn neighbor_exchange_follows_topology_order() {
        let out = run(3, |mut c| {
            let me = c.rank().0;
            // Reverse rank order, self excluded.
            let ns: Vec<Rank> = (0..3u32).rev().filter(|&r| r != me).map(Rank).collect();
            c.set_neighbors(ns.clone()).unwrap();
            let outgoing: Vec<(u32, u32)> = ns.iter().map(|n| (me, n.0)).collect();
            c.neighbor_all_to_all(&outgoing).unwrap()
        });
        assert_eq!(out[0], vec![(2, 0), (1, 0)]);
        assert_eq!(out[1], vec![(2, 1), (0, 1)]);
    }

    #[test]
    fn neighbor_values_must_match_topology() {
        let mut c = CollectiveTransport::new(LocalTransport::world(1).pop().unwrap(), propagate())
            .unwrap();
        assert!(matches!(
            c.neighbor_all_to_all(&[1u8]),
            Err(TransportError::CountMismatch { .. })
        ));
    }

    #[test]
    fn buffers_are_reused_across_calls() {
        let out = run(2, |mut c| {
            let big = vec![7u8; 1000];
            c.all_gather(&big).unwrap();
            let small = c.all_gather(&c.rank()).unwrap();
            (small, c.recv_buf.len())
        });
        // Two 4-byte ranks, each in an 8-byte frame.
        assert_eq!(out[0], (vec![Rank(0), Rank(1)], 16));
    }

    #[test]
    fn sub_group_inherits_config() {
        let out = run(3, |mut c| {
            let g = c.create_group(&[Rank(0), Rank(2)]).unwrap();
            g.map(|mut g| (g.config().clone(), g.all_gather(&g.world_rank()).unwrap()))
        });
        assert!(out[1].is_none());
        let (cfg, ranks) = out[0].clone().unwrap();
        assert_eq!(cfg.failure_policy, FailurePolicy::Propagate);
        assert_eq!(ranks, vec![Rank(0), Rank(2)]);
    }
}
