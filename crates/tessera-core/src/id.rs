//! Strongly-typed identifiers for processes and decomposition regions.

use std::fmt;

/// Identifies a process within a communication group.
///
/// Ranks are dense and zero-based: a group of `n` processes uses ranks
/// `0..n`. A rank is only meaningful relative to the group that issued
/// it; sub-groups renumber their members from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl Rank {
    /// The rank as a `usize` index into per-rank tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Rank {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<usize> for Rank {
    fn from(v: usize) -> Self {
        Self(v as u32)
    }
}

/// Opaque identifier the load balancer attaches to a decomposition region.
///
/// The substrate never interprets the value; it only carries it alongside
/// the region so that merged-away regions can be released by id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RegionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
