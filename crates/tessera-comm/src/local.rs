//! In-process transport: one thread per rank, channels between them.
//!
//! [`LocalTransport::world`] builds a fully connected mesh of crossbeam
//! channels, one per ordered rank pair, and hands one endpoint set to
//! each rank. Collectives are built from point-to-point sends over that
//! mesh. Channels are FIFO per pair, so as long as every rank issues
//! the same collectives in the same order, messages pair up without
//! tags.
//!
//! Sub-groups get their own mesh. The first member to arrive creates it
//! in a shared rendezvous table; the others pick up their endpoints from
//! the same entry, which is dropped once every member has joined.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use tessera_core::wire::read_u64_le;
use tessera_core::Rank;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;

type Packet = Vec<u8>;

/// One rank's endpoints into a group mesh: senders indexed by
/// destination, receivers indexed by source.
type Endpoints = (Vec<Sender<Packet>>, Vec<Receiver<Packet>>);

fn mesh(n: usize) -> Vec<Endpoints> {
    let mut senders: Vec<Vec<Sender<Packet>>> = (0..n).map(|_| Vec::with_capacity(n)).collect();
    let mut receivers: Vec<Vec<Option<Receiver<Packet>>>> =
        (0..n).map(|_| (0..n).map(|_| None).collect()).collect();
    for (from, row) in senders.iter_mut().enumerate() {
        for to_receivers in receivers.iter_mut() {
            let (tx, rx) = unbounded();
            row.push(tx);
            to_receivers[from] = Some(rx);
        }
    }
    senders
        .into_iter()
        .zip(receivers)
        .map(|(tx, rx)| (tx, rx.into_iter().flatten().collect()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GroupKey {
    parent: u64,
    members: Vec<Rank>,
    seq: u64,
}

#[derive(Debug)]
struct PendingGroup {
    id: u64,
    slots: Vec<Option<Endpoints>>,
    joined: usize,
}

#[derive(Debug)]
struct RendezvousState {
    next_id: u64,
    pending: IndexMap<GroupKey, PendingGroup>,
}

/// Channel-backed [`Transport`] for ranks running as threads of one
/// process.
///
/// # Example
///
/// ```
/// use tessera_comm::{LocalTransport, Transport};
///
/// let ranks = LocalTransport::world(3);
/// let handles: Vec<_> = ranks
///     .into_iter()
///     .map(|mut t| std::thread::spawn(move || t.all_gather_counts(t.rank().0 as u64 * 10)))
///     .collect();
/// for h in handles {
///     assert_eq!(h.join().unwrap().unwrap(), vec![0, 10, 20]);
/// }
/// ```
#[derive(Debug)]
pub struct LocalTransport {
    group_id: u64,
    rank: Rank,
    members: Arc<[Rank]>,
    to: Vec<Sender<Packet>>,
    from: Vec<Receiver<Packet>>,
    neighbors: Vec<Rank>,
    rendezvous: Arc<Mutex<RendezvousState>>,
    group_seq: IndexMap<Vec<Rank>, u64>,
}

impl LocalTransport {
    /// Build the world group of `size` ranks; element `i` is rank `i`.
    pub fn world(size: usize) -> Vec<Self> {
        let members: Arc<[Rank]> = (0..size).map(Rank::from).collect();
        let rendezvous = Arc::new(Mutex::new(RendezvousState {
            next_id: 1,
            pending: IndexMap::new(),
        }));
        mesh(size)
            .into_iter()
            .enumerate()
            .map(|(i, (to, from))| Self {
                group_id: 0,
                rank: Rank::from(i),
                members: Arc::clone(&members),
                to,
                from,
                neighbors: Vec::new(),
                rendezvous: Arc::clone(&rendezvous),
                group_seq: IndexMap::new(),
            })
            .collect()
    }

    /// Identifier of this group, shared by all its members.
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    fn check_rank(&self, rank: Rank) -> Result<(), TransportError> {
        if rank.index() >= self.size() {
            return Err(TransportError::RankOutOfRange {
                rank,
                size: self.size(),
            });
        }
        Ok(())
    }

    fn check_len(expected: usize, actual: usize) -> Result<(), TransportError> {
        if expected != actual {
            return Err(TransportError::CountMismatch { expected, actual });
        }
        Ok(())
    }

    fn send(&self, to: Rank, packet: Packet) -> Result<(), TransportError> {
        self.to[to.index()]
            .send(packet)
            .map_err(|_| TransportError::Disconnected { peer: to })
    }

    fn recv(&self, from: Rank) -> Result<Packet, TransportError> {
        self.from[from.index()]
            .recv()
            .map_err(|_| TransportError::Disconnected { peer: from })
    }

    fn recv_count(&self, from: Rank) -> Result<u64, TransportError> {
        let packet = self.recv(from)?;
        let mut r = packet.as_slice();
        let count = read_u64_le(&mut r)?;
        if !r.is_empty() {
            return Err(TransportError::Protocol {
                reason: format!("count packet from {from} has {} extra bytes", r.len()),
            });
        }
        Ok(count)
    }

    fn recv_into(&self, from: Rank, dst: &mut [u8]) -> Result<(), TransportError> {
        let packet = self.recv(from)?;
        if packet.len() != dst.len() {
            return Err(TransportError::Protocol {
                reason: format!(
                    "rank {from} sent {} bytes, {} expected",
                    packet.len(),
                    dst.len()
                ),
            });
        }
        dst.copy_from_slice(&packet);
        Ok(())
    }

    fn others(&self) -> impl Iterator<Item = Rank> + '_ {
        let me = self.rank;
        (0..self.size()).map(Rank::from).filter(move |&r| r != me)
    }
}

/// Byte range of slice `i` given per-rank counts and displacements.
fn slice_range(
    counts: &[u64],
    displs: &[u64],
    i: usize,
    len: usize,
) -> Result<Range<usize>, TransportError> {
    let (Some(&count), Some(&displ)) = (counts.get(i), displs.get(i)) else {
        return Err(TransportError::CountMismatch {
            expected: i + 1,
            actual: counts.len().min(displs.len()),
        });
    };
    let start = displ as usize;
    let end = start + count as usize;
    if end > len {
        return Err(TransportError::Protocol {
            reason: format!("slice {i} ends at byte {end}, buffer holds {len}"),
        });
    }
    Ok(start..end)
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.members.len()
    }

    fn world_rank(&self) -> Rank {
        self.members[self.rank.index()]
    }

    fn members(&self) -> &[Rank] {
        &self.members
    }

    fn neighbors(&self) -> &[Rank] {
        &self.neighbors
    }

    fn set_neighbors(&mut self, neighbors: Vec<Rank>) -> Result<(), TransportError> {
        for &n in &neighbors {
            self.check_rank(n)?;
        }
        self.neighbors = neighbors;
        Ok(())
    }

    fn create_group(&mut self, members: &[Rank]) -> Result<Option<Self>, TransportError> {
        let mut members = members.to_vec();
        members.sort_unstable();
        members.dedup();
        for m in &members {
            if !self.members.contains(m) {
                return Err(TransportError::Protocol {
                    reason: format!("world rank {m} is not in group {}", self.group_id),
                });
            }
        }
        let me = self.world_rank();
        let Some(slot) = members.iter().position(|&m| m == me) else {
            return Ok(None);
        };

        let seq = self.group_seq.entry(members.clone()).or_insert(0);
        let key = GroupKey {
            parent: self.group_id,
            members: members.clone(),
            seq: *seq,
        };
        *seq += 1;

        let (id, endpoints) = {
            let mut state = self.rendezvous.lock().map_err(|_| TransportError::Protocol {
                reason: "group rendezvous poisoned".into(),
            })?;
            let state = &mut *state;
            let next_id = state.next_id;
            let pending = state
                .pending
                .entry(key.clone())
                .or_insert_with(|| PendingGroup {
                    id: next_id,
                    slots: mesh(members.len()).into_iter().map(Some).collect(),
                    joined: 0,
                });
            if pending.id == next_id {
                state.next_id += 1;
            }
            let endpoints = pending.slots[slot].take().ok_or_else(|| TransportError::Protocol {
                reason: format!("rank {me} joined group {} twice", pending.id),
            })?;
            pending.joined += 1;
            let id = pending.id;
            if pending.joined == members.len() {
                state.pending.shift_remove(&key);
            }
            (id, endpoints)
        };

        debug!(group = id, parent = self.group_id, rank = %me, members = ?members, "joined group");
        let (to, from) = endpoints;
        Ok(Some(Self {
            group_id: id,
            rank: Rank::from(slot),
            members: members.into(),
            to,
            from,
            neighbors: Vec::new(),
            rendezvous: Arc::clone(&self.rendezvous),
            group_seq: IndexMap::new(),
        }))
    }

    fn barrier(&mut self) -> Result<(), TransportError> {
        for r in self.others() {
            self.send(r, Vec::new())?;
        }
        for r in self.others() {
            self.recv(r)?;
        }
        Ok(())
    }

    fn broadcast_count(&mut self, count: u64, root: Rank) -> Result<u64, TransportError> {
        self.check_rank(root)?;
        if self.rank == root {
            for r in self.others() {
                self.send(r, count.to_le_bytes().to_vec())?;
            }
            Ok(count)
        } else {
            self.recv_count(root)
        }
    }

    fn scatter_counts(&mut self, counts: &[u64], root: Rank) -> Result<u64, TransportError> {
        self.check_rank(root)?;
        if self.rank == root {
            Self::check_len(self.size(), counts.len())?;
            for r in self.others() {
                self.send(r, counts[r.index()].to_le_bytes().to_vec())?;
            }
            Ok(counts[root.index()])
        } else {
            self.recv_count(root)
        }
    }

    fn gather_counts(&mut self, count: u64, root: Rank) -> Result<Vec<u64>, TransportError> {
        self.check_rank(root)?;
        if self.rank != root {
            self.send(root, count.to_le_bytes().to_vec())?;
            return Ok(Vec::new());
        }
        (0..self.size())
            .map(Rank::from)
            .map(|r| if r == root { Ok(count) } else { self.recv_count(r) })
            .collect()
    }

    fn all_gather_counts(&mut self, count: u64) -> Result<Vec<u64>, TransportError> {
        for r in self.others() {
            self.send(r, count.to_le_bytes().to_vec())?;
        }
        let me = self.rank;
        (0..self.size())
            .map(Rank::from)
            .map(|r| if r == me { Ok(count) } else { self.recv_count(r) })
            .collect()
    }

    fn neighbor_all_to_all_counts(&mut self, counts: &[u64]) -> Result<Vec<u64>, TransportError> {
        Self::check_len(self.neighbors.len(), counts.len())?;
        for (&n, &c) in self.neighbors.iter().zip(counts) {
            self.send(n, c.to_le_bytes().to_vec())?;
        }
        self.neighbors.iter().map(|&n| self.recv_count(n)).collect()
    }

    fn broadcast_bytes(&mut self, buf: &mut [u8], root: Rank) -> Result<(), TransportError> {
        self.check_rank(root)?;
        if self.rank == root {
            for r in self.others() {
                self.send(r, buf.to_vec())?;
            }
            Ok(())
        } else {
            self.recv_into(root, buf)
        }
    }

    fn scatterv(
        &mut self,
        send: &[u8],
        counts: &[u64],
        displs: &[u64],
        recv: &mut [u8],
        root: Rank,
    ) -> Result<(), TransportError> {
        self.check_rank(root)?;
        if self.rank != root {
            return self.recv_into(root, recv);
        }
        Self::check_len(self.size(), counts.len())?;
        for r in self.others() {
            let range = slice_range(counts, displs, r.index(), send.len())?;
            self.send(r, send[range].to_vec())?;
        }
        let own = slice_range(counts, displs, root.index(), send.len())?;
        Self::check_len(own.len(), recv.len())?;
        recv.copy_from_slice(&send[own]);
        Ok(())
    }

    fn gatherv(
        &mut self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[u64],
        displs: &[u64],
        root: Rank,
    ) -> Result<(), TransportError> {
        self.check_rank(root)?;
        if self.rank != root {
            return self.send(root, send.to_vec());
        }
        Self::check_len(self.size(), counts.len())?;
        for r in (0..self.size()).map(Rank::from) {
            let range = slice_range(counts, displs, r.index(), recv.len())?;
            if r == root {
                Self::check_len(range.len(), send.len())?;
                recv[range].copy_from_slice(send);
            } else {
                self.recv_into(r, &mut recv[range])?;
            }
        }
        Ok(())
    }

    fn all_gatherv(
        &mut self,
        send: &[u8],
        recv: &mut [u8],
        counts: &[u64],
        displs: &[u64],
    ) -> Result<(), TransportError> {
        Self::check_len(self.size(), counts.len())?;
        for r in self.others() {
            self.send(r, send.to_vec())?;
        }
        let me = self.rank;
        for r in (0..self.size()).map(Rank::from) {
            let range = slice_range(counts, displs, r.index(), recv.len())?;
            if r == me {
                Self::check_len(range.len(), send.len())?;
                recv[range].copy_from_slice(send);
            } else {
                self.recv_into(r, &mut recv[range])?;
            }
        }
        Ok(())
    }

    fn neighbor_all_to_allv(
        &mut self,
        send: &[u8],
        send_counts: &[u64],
        send_displs: &[u64],
        recv: &mut [u8],
        recv_counts: &[u64],
        recv_displs: &[u64],
    ) -> Result<(), TransportError> {
        let k = self.neighbors.len();
        Self::check_len(k, send_counts.len())?;
        Self::check_len(k, recv_counts.len())?;
        for (i, &n) in self.neighbors.iter().enumerate() {
            let range = slice_range(send_counts, send_displs, i, send.len())?;
            self.send(n, send[range].to_vec())?;
        }
        for (i, &n) in self.neighbors.iter().enumerate() {
            let range = slice_range(recv_counts, recv_displs, i, recv.len())?;
            self.recv_into(n, &mut recv[range])?;
        }
        Ok(())
    }
}
