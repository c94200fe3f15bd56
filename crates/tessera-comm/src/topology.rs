//! Communication groups derived from quadtree subtrees.
//!
//! A [`GroupTopology`] is computed purely from the decomposition, so every
//! rank holding the same tree derives the same membership and root
//! without communicating. [`GroupTopology::create`] then builds the group
//! itself, which is collective over the members.

use tessera_core::Rank;
use tessera_geom::Scalar;
use tessera_tree::{NodeId, Quadtree};
use tracing::debug;

use crate::collective::CollectiveTransport;
use crate::error::TransportError;
use crate::transport::Transport;

/// Membership and root of a group derived from the decomposition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupTopology {
    members: Vec<Rank>,
    root: Rank,
}

/// A live group built from a [`GroupTopology`].
#[derive(Debug)]
pub struct SubtreeGroup<T: Transport> {
    /// Collectives over the group's members.
    pub comm: CollectiveTransport<T>,
    /// The designated root, in the group's own numbering.
    pub root: Rank,
}

impl GroupTopology {
    /// The group over every process owning a leaf under `subtree`.
    ///
    /// The root is the owner of `subtree` itself, or the first leaf's
    /// owner when the subtree root is unassigned. An assigned owner that
    /// holds no leaf below `subtree` still joins the group. Every leaf
    /// must have an owner.
    pub fn for_subtree<C: Scalar>(tree: &Quadtree<C>, subtree: NodeId) -> Result<Self, TransportError> {
        let leaves = tree.leaves(subtree)?;
        let mut owners = Vec::with_capacity(leaves.len());
        for &leaf in &leaves {
            let owner = tree
                .region(leaf)?
                .owner()
                .ok_or(TransportError::Unowned { node: leaf })?;
            owners.push(owner);
        }
        let root = match tree.region(subtree)?.owner() {
            Some(owner) => owner,
            // Leaves are never empty: a subtree has at least itself.
            None => owners[0],
        };
        owners.push(root);
        Ok(Self::from_owners(owners, root))
    }

    /// The aggregation group over the owners of the internal nodes
    /// `subtrees` plus the owner of their lowest common ancestor, which is
    /// the root.
    ///
    /// Every listed node and the common ancestor must have an owner, and
    /// leaves are rejected with [`TransportError::NotInternal`].
    pub fn for_aggregation<C: Scalar>(
        tree: &Quadtree<C>,
        subtrees: &[NodeId],
    ) -> Result<Self, TransportError> {
        let ancestor = tree.common_ancestor(subtrees)?;
        let owner_of = |node: NodeId| -> Result<Rank, TransportError> {
            tree.region(node)?
                .owner()
                .ok_or(TransportError::Unowned { node })
        };
        let root = owner_of(ancestor)?;
        let mut owners = vec![root];
        for &node in subtrees {
            if tree.is_leaf(node)? {
                return Err(TransportError::NotInternal { node });
            }
            owners.push(owner_of(node)?);
        }
        Ok(Self::from_owners(owners, root))
    }

    fn from_owners(mut members: Vec<Rank>, root: Rank) -> Self {
        members.sort_unstable();
        members.dedup();
        Self { members, root }
    }

    /// Member world ranks, ascending.
    pub fn members(&self) -> &[Rank] {
        &self.members
    }

    /// The root's world rank.
    pub fn root(&self) -> Rank {
        self.root
    }

    /// The root's rank in the group's own numbering.
    pub fn local_root(&self) -> Rank {
        // Members are sorted and always contain the root.
        Rank::from(self.members.partition_point(|&m| m < self.root))
    }

    /// `true` if `rank` (a world rank) is a member.
    pub fn contains(&self, rank: Rank) -> bool {
        self.members.binary_search(&rank).is_ok()
    }

    /// Build the group. Collective over the members, who must all pass an
    /// identical topology; non-members get `Ok(None)` and take no part.
    pub fn create<T: Transport>(
        &self,
        comm: &mut CollectiveTransport<T>,
    ) -> Result<Option<SubtreeGroup<T>>, TransportError> {
        if !self.contains(comm.world_rank()) {
            return Ok(None);
        }
        let Some(group) = comm.create_group(&self.members)? else {
            return Ok(None);
        };
        debug!(members = ?self.members, root = %self.root, "created subtree group");
        Ok(Some(SubtreeGroup {
            comm: group,
            root: self.local_root(),
        }))
    }
}
