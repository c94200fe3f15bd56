//! Arena-backed 2^N-way spatial decomposition tree.
//!
//! Every node owns a [`Rectangle`]; an internal node additionally owns its
//! split origin and exactly 2^N children whose regions tile its own. Child
//! `i` lies below the origin on axis `a` when bit `a` of `i` is clear and
//! at or above it when the bit is set, so a point exactly on the split
//! plane belongs to the upper child, matching half-open containment.
//!
//! Nodes are stored in a slot arena. A [`NodeId`] carries the slot's
//! generation, so ids of merged-away nodes are detected as stale even
//! after their slot has been reused.

use std::fmt;

use smallvec::SmallVec;
use tessera_core::{Rank, RegionId};
use tessera_geom::{tiles, GeometryError, Point, Rectangle, Scalar};
use tracing::debug;

use crate::error::TreeError;
use crate::interval::{IntervalIndex, Segment};
use crate::snap::{SnapPolicy, SnapToCenter};

/// Handle to a node in a [`Quadtree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Arena slot of this node.
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this id was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// A node of the decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadtreeNode<T: Scalar> {
    id: NodeId,
    region: Rectangle<T>,
    origin: Option<Point<T>>,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
    level: u32,
}

impl<T: Scalar> QuadtreeNode<T> {
    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The region covered by this node, with its assigned id and owner.
    pub fn region(&self) -> &Rectangle<T> {
        &self.region
    }

    /// Split origin; `None` for a leaf.
    pub fn origin(&self) -> Option<&Point<T>> {
        self.origin.as_ref()
    }

    /// Parent node; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in child-index order; empty for a leaf.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Depth below the root (root = 0).
    pub fn level(&self) -> u32 {
        self.level
    }

    /// `true` if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Clone, Debug)]
struct Slot<T: Scalar> {
    generation: u32,
    node: Option<QuadtreeNode<T>>,
}

/// Recursive 2^N-way decomposition of a world region.
///
/// Created with a single leaf root. Mutated only through
/// [`split`](Self::split) / [`split_with`](Self::split_with) and
/// [`merge`](Self::merge); region ids and owners are attached with
/// [`assign`](Self::assign).
#[derive(Clone, Debug)]
pub struct Quadtree<T: Scalar> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
    dim: usize,
}

impl<T: Scalar> Quadtree<T> {
    /// Create a tree whose root leaf covers `world`.
    pub fn new(world: Rectangle<T>) -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        let dim = world.dim();
        let node = QuadtreeNode {
            id: root,
            region: world,
            origin: None,
            parent: None,
            children: SmallVec::new(),
            level: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(node),
            }],
            free: Vec::new(),
            root,
            live: 1,
            dim,
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, internal and leaf.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Always `false`: the root is never removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Dimension of the decomposed world.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of children of an internal node, 2^N.
    pub fn fan_out(&self) -> usize {
        1 << self.dim()
    }

    /// Look up a live node.
    pub fn node(&self, id: NodeId) -> Result<&QuadtreeNode<T>, TreeError> {
        self.slots
            .get(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
            .ok_or(TreeError::StaleNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut QuadtreeNode<T>, TreeError> {
        self.slots
            .get_mut(id.index())
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
            .ok_or(TreeError::StaleNode(id))
    }

    /// Region of a node.
    pub fn region(&self, id: NodeId) -> Result<&Rectangle<T>, TreeError> {
        Ok(&self.node(id)?.region)
    }

    /// Split origin of a node (`None` for leaves).
    pub fn origin(&self, id: NodeId) -> Result<Option<&Point<T>>, TreeError> {
        Ok(self.node(id)?.origin.as_ref())
    }

    /// Parent of a node (`None` for the root).
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a node in child-index order.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    /// Depth of a node below the root.
    pub fn level(&self, id: NodeId) -> Result<u32, TreeError> {
        Ok(self.node(id)?.level)
    }

    /// `true` if the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.node(id)?.is_leaf())
    }

    /// Deepest level of any live node.
    pub fn depth(&self) -> u32 {
        self.iter().map(|n| n.level).max().unwrap_or(0)
    }

    /// Iterate over all live nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &QuadtreeNode<T>> + '_ {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }

    /// Attach the load balancer's region id and owning rank to a node.
    pub fn assign(&mut self, id: NodeId, region_id: RegionId, owner: Rank) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        node.region = node.region.clone().with_id(region_id).with_owner(owner);
        Ok(())
    }

    /// The live node carrying `region_id`, if any.
    pub fn find_by_id(&self, region_id: RegionId) -> Option<NodeId> {
        self.iter()
            .find(|n| n.region.id() == Some(region_id))
            .map(|n| n.id)
    }

    fn alloc(&mut self, mut node: QuadtreeNode<T>) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        node.id = id;
        self.slots[id.index()].node = Some(node);
        self.live += 1;
        id
    }

    fn release(&mut self, id: NodeId) -> Option<QuadtreeNode<T>> {
        let node = self.slots.get_mut(id.index())?.node.take()?;
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Region of child `index` of a node split at `origin`.
    fn child_region(
        region: &Rectangle<T>,
        origin: &Point<T>,
        index: usize,
    ) -> Result<Rectangle<T>, GeometryError> {
        let n = region.dim();
        let mut ul = Vec::with_capacity(n);
        let mut br = Vec::with_capacity(n);
        for a in 0..n {
            if index & (1 << a) == 0 {
                ul.push(region.ul().coord(a));
                br.push(origin.coord(a));
            } else {
                ul.push(origin.coord(a));
                br.push(region.br().coord(a));
            }
        }
        Rectangle::new(Point::new(ul), Point::new(br))
    }

    /// Split a node around `origin`, re-centering stale grandchild origins.
    ///
    /// Equivalent to [`split_with`](Self::split_with) with [`SnapToCenter`].
    pub fn split(&mut self, id: NodeId, origin: &Point<T>) -> Result<(), TreeError> {
        self.split_with(id, origin, &SnapToCenter)
    }

    /// Split a node around `origin`.
    ///
    /// The node's region must contain `origin`. A leaf gains 2^N new leaf
    /// children. An internal node keeps its topology: its children are
    /// reshaped around the new origin, and any descendant whose origin no
    /// longer lies in its new region is re-seated by `snap`.
    pub fn split_with(
        &mut self,
        id: NodeId,
        origin: &Point<T>,
        snap: &dyn SnapPolicy<T>,
    ) -> Result<(), TreeError> {
        let node = self.node(id)?;
        if !node.region.contains(origin)? {
            return Err(GeometryError::NotContained {
                what: format!("split origin {origin}"),
                region: node.region.to_string(),
            }
            .into());
        }

        if !node.is_leaf() {
            debug!(node = %id, level = node.level, %origin, "reshaping internal node");
            // A failed snap must leave the tree as it was.
            let snapshot = self.slots.clone();
            if let Err(e) = self.reshape(id, origin.clone(), snap) {
                self.slots = snapshot;
                return Err(e);
            }
            return Ok(());
        }

        let region = node.region.clone();
        let level = node.level;
        let fan_out = self.fan_out();
        let mut children = SmallVec::with_capacity(fan_out);
        for i in 0..fan_out {
            let child = QuadtreeNode {
                id: self.root,
                region: Self::child_region(&region, origin, i)?,
                origin: None,
                parent: Some(id),
                children: SmallVec::new(),
                level: level + 1,
            };
            children.push(self.alloc(child));
        }
        let node = self.node_mut(id)?;
        node.origin = Some(origin.clone());
        node.children = children;
        debug!(node = %id, level, %origin, children = fan_out, "split leaf");
        Ok(())
    }

    /// Move the split plane of an internal node without changing topology.
    fn reshape(
        &mut self,
        id: NodeId,
        origin: Point<T>,
        snap: &dyn SnapPolicy<T>,
    ) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        let region = node.region.clone();
        let children = node.children.clone();
        node.origin = Some(origin.clone());

        for (i, child) in children.into_iter().enumerate() {
            let shape = Self::child_region(&region, &origin, i)?;
            let child_node = self.node_mut(child)?;
            child_node.region = child_node.region.resize(shape.ul().clone(), shape.br().clone())?;
            let Some(old) = child_node.origin.clone() else {
                continue;
            };
            let child_region = child_node.region.clone();
            let new_origin = if child_region.is_empty() {
                // Nothing is contained; keep the subtree degenerate but valid.
                old.max(child_region.ul())?.min(child_region.br())?
            } else if child_region.contains(&old)? {
                old
            } else {
                let snapped = snap.snap(&child_region, &old);
                if !child_region.contains(&snapped)? {
                    return Err(TreeError::SnapOutside {
                        origin: snapped.to_string(),
                        region: child_region.to_string(),
                    });
                }
                debug!(node = %child, from = %old, to = %snapped, "snapped origin");
                snapped
            };
            self.reshape(child, new_origin, snap)?;
        }
        Ok(())
    }

    /// Collapse the subtree under `id` into a single leaf.
    ///
    /// Returns every removed descendant (with its assigned id and owner)
    /// so the caller can release them. Merging a leaf removes nothing.
    pub fn merge(&mut self, id: NodeId) -> Result<Vec<QuadtreeNode<T>>, TreeError> {
        let node = self.node_mut(id)?;
        let mut stack: Vec<NodeId> = node.children.drain(..).collect();
        node.origin = None;
        let level = node.level;

        let mut removed = Vec::new();
        while let Some(next) = stack.pop() {
            let child = self.release(next).ok_or(TreeError::StaleNode(next))?;
            stack.extend(child.children.iter().copied());
            removed.push(child);
        }
        debug!(node = %id, level, removed = removed.len(), "merged subtree");
        Ok(removed)
    }

    /// The leaf containing `p`.
    ///
    /// Descends from the root choosing, per axis, the upper child when the
    /// coordinate is at or above the split origin.
    pub fn leaf_at(&self, p: &Point<T>) -> Result<NodeId, TreeError> {
        let root = self.node(self.root)?;
        if !root.region.contains(p)? {
            return Err(GeometryError::NotContained {
                what: format!("point {p}"),
                region: root.region.to_string(),
            }
            .into());
        }
        let mut node = root;
        while let Some(origin) = &node.origin {
            let index = (0..p.dim())
                .filter(|&a| p.coord(a) >= origin.coord(a))
                .fold(0usize, |acc, a| acc | (1 << a));
            node = self.node(node.children[index])?;
        }
        Ok(node.id)
    }

    /// Leaves of the subtree under `id`, depth first in child order.
    pub fn leaves(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.node(next)?;
            if node.is_leaf() {
                out.push(next);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Internal (non-leaf) nodes of the subtree under `id`, parents first.
    pub fn internal_nodes(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.node(next)?;
            if !node.is_leaf() {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// The other children of this node's parent; empty for the root.
    pub fn siblings(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(Vec::new());
        };
        Ok(self
            .node(parent)?
            .children
            .iter()
            .copied()
            .filter(|&c| c != id)
            .collect())
    }

    /// `true` if `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> Result<bool, TreeError> {
        self.node(ancestor)?;
        let mut current = self.node(descendant)?.parent;
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Deepest node that is an ancestor of (or equal to) every node in `ids`.
    pub fn common_ancestor(&self, ids: &[NodeId]) -> Result<NodeId, TreeError> {
        let Some((&first, rest)) = ids.split_first() else {
            return Ok(self.root);
        };
        let mut candidate = first;
        self.node(candidate)?;
        for &other in rest {
            while candidate != other && !self.is_ancestor_of(candidate, other)? {
                candidate = self.node(candidate)?.parent.unwrap_or(self.root);
            }
        }
        Ok(candidate)
    }

    /// Leaves whose region strictly overlaps `rect`.
    pub fn leaves_intersecting(&self, rect: &Rectangle<T>) -> Result<Vec<NodeId>, TreeError> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(next) = stack.pop() {
            let node = self.node(next)?;
            if !node.region.intersects(rect)? {
                continue;
            }
            if node.is_leaf() {
                out.push(next);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    /// Projections onto `axis` of the leaves crossed by the axis-parallel
    /// line through `through`.
    ///
    /// For a consistent decomposition the result
    /// [tiles](IntervalIndex::tiles_exactly) the world's extent on that
    /// axis.
    pub fn slice_intervals(&self, axis: usize, through: &Point<T>) -> Result<IntervalIndex<T>, TreeError> {
        let dim = self.dim();
        if axis >= dim {
            return Err(GeometryError::AxisOutOfRange { axis, dim }.into());
        }
        if through.dim() != dim {
            return Err(GeometryError::DimensionMismatch {
                expected: dim,
                found: through.dim(),
            }
            .into());
        }
        let mut index = IntervalIndex::new();
        for leaf in self.leaves(self.root)? {
            let r = &self.node(leaf)?.region;
            let crossed = (0..dim).filter(|&b| b != axis).all(|b| {
                let c = through.coord(b);
                r.ul().coord(b) <= c && c < r.br().coord(b)
            });
            if crossed {
                index.insert(Segment {
                    start: r.ul().coord(axis),
                    end: r.br().coord(axis),
                    owner: r.owner(),
                })?;
            }
        }
        Ok(index)
    }

    /// Verify the structural invariants of every live node.
    ///
    /// Leaves have no origin; internal nodes have an origin inside their
    /// region and exactly 2^N children that tile it; every child points
    /// back at its parent one level up.
    pub fn check_invariants(&self) -> Result<(), TreeError> {
        let fan_out = self.fan_out();
        for node in self.iter() {
            let violated = |reason: String| TreeError::InvariantViolated {
                node: node.id,
                reason,
            };
            if node.is_leaf() {
                if node.origin.is_some() {
                    return Err(violated("leaf has an origin".into()));
                }
                continue;
            }
            let Some(origin) = &node.origin else {
                return Err(violated("internal node without origin".into()));
            };
            if !node.region.contains(origin)? && !node.region.is_empty() {
                return Err(violated(format!("origin {origin} outside region")));
            }
            if node.children.len() != fan_out {
                return Err(violated(format!(
                    "{} children, expected {fan_out}",
                    node.children.len()
                )));
            }
            let mut regions = Vec::with_capacity(fan_out);
            for &c in &node.children {
                let child = self.node(c)?;
                if child.parent != Some(node.id) || child.level != node.level + 1 {
                    return Err(violated(format!("child {c} has a broken back-link")));
                }
                regions.push(child.region.clone());
            }
            if !tiles(&node.region, &regions)? {
                return Err(violated("children do not tile the region".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::SnapToNearest;
    use proptest::prelude::*;

    fn world(size: i64) -> Rectangle<i64> {
        Rectangle::new(Point::new([0i64, 0]), Point::new([size, size])).unwrap()
    }

    fn rect(ul: [i64; 2], br: [i64; 2]) -> Rectangle<i64> {
        Rectangle::new(Point::new(ul), Point::new(br)).unwrap()
    }

    #[test]
    fn new_tree_is_single_leaf() {
        let tree = Quadtree::new(world(16));
        assert_eq!(tree.len(), 1);
        assert!(tree.is_leaf(tree.root()).unwrap());
        assert_eq!(tree.level(tree.root()).unwrap(), 0);
        assert_eq!(tree.leaves(tree.root()).unwrap(), vec![tree.root()]);
    }

    #[test]
    fn split_creates_children_by_bit_pattern() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 4])).unwrap();
        let c = tree.children(root).unwrap().to_vec();
        assert_eq!(c.len(), 4);
        assert_eq!(tree.region(c[0]).unwrap(), &rect([0, 0], [8, 4]));
        assert_eq!(tree.region(c[1]).unwrap(), &rect([8, 0], [16, 4]));
        assert_eq!(tree.region(c[2]).unwrap(), &rect([0, 4], [8, 16]));
        assert_eq!(tree.region(c[3]).unwrap(), &rect([8, 4], [16, 16]));
        assert!(c.iter().all(|&id| tree.level(id).unwrap() == 1));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn split_rejects_origin_outside() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        let err = tree.split(root, &Point::new([16, 3])).unwrap_err();
        assert!(matches!(
            err,
            TreeError::Geometry(GeometryError::NotContained { .. })
        ));
    }

    #[test]
    fn leaf_at_descends_to_depth_two() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ll = tree.children(root).unwrap()[0];
        tree.split(ll, &Point::new([4, 4])).unwrap();
        let leaf = tree.leaf_at(&Point::new([1, 1])).unwrap();
        assert_eq!(tree.region(leaf).unwrap(), &rect([0, 0], [4, 4]));
        assert_eq!(tree.level(leaf).unwrap(), 2);
        assert!(tree.is_ancestor_of(root, leaf).unwrap());
        assert!(tree.is_ancestor_of(ll, leaf).unwrap());
        assert!(!tree.is_ancestor_of(leaf, ll).unwrap());
    }

    #[test]
    fn point_on_split_plane_goes_to_upper_child() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let leaf = tree.leaf_at(&Point::new([8, 7])).unwrap();
        assert_eq!(leaf, tree.children(root).unwrap()[1]);
        let leaf = tree.leaf_at(&Point::new([8, 8])).unwrap();
        assert_eq!(leaf, tree.children(root).unwrap()[3]);
    }

    #[test]
    fn leaf_at_outside_world_fails() {
        let tree = Quadtree::new(world(4));
        assert!(tree.leaf_at(&Point::new([4, 0])).is_err());
    }

    #[test]
    fn merge_returns_removed_nodes_and_stales_ids() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ll = tree.children(root).unwrap()[0];
        tree.assign(ll, RegionId(7), Rank(2)).unwrap();
        tree.split(ll, &Point::new([4, 4])).unwrap();
        assert_eq!(tree.len(), 9);

        let removed = tree.merge(root).unwrap();
        assert_eq!(removed.len(), 8);
        assert!(removed
            .iter()
            .any(|n| n.region().id() == Some(RegionId(7)) && n.region().owner() == Some(Rank(2))));
        assert_eq!(tree.len(), 1);
        assert!(tree.is_leaf(root).unwrap());
        assert!(tree.origin(root).unwrap().is_none());
        assert_eq!(tree.node(ll), Err(TreeError::StaleNode(ll)));

        // Reused slots get fresh generations.
        tree.split(root, &Point::new([2, 2])).unwrap();
        assert!(tree.node(ll).is_err());
        tree.check_invariants().unwrap();
    }

    #[test]
    fn merge_leaf_is_noop() {
        let mut tree = Quadtree::new(world(8));
        let root = tree.root();
        assert!(tree.merge(root).unwrap().is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn reshape_moves_split_plane_keeping_topology() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ur = tree.children(root).unwrap()[3];
        tree.split(ur, &Point::new([9, 9])).unwrap();
        let before = tree.len();

        // Moving the root plane to (10, 10) leaves (9, 9) outside the new
        // upper-right quadrant [10, 16)^2.
        tree.split_with(root, &Point::new([10, 10]), &SnapToNearest).unwrap();
        assert_eq!(tree.len(), before);
        assert_eq!(tree.region(ur).unwrap(), &rect([10, 10], [16, 16]));
        assert_eq!(tree.origin(ur).unwrap(), Some(&Point::new([10, 10])));
        tree.check_invariants().unwrap();

        tree.split(root, &Point::new([12, 12])).unwrap();
        // Default policy re-centers: [12, 16)^2 has center (14, 14).
        assert_eq!(tree.origin(ur).unwrap(), Some(&Point::new([14, 14])));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn reshape_keeps_contained_origins() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ll = tree.children(root).unwrap()[0];
        tree.split(ll, &Point::new([2, 2])).unwrap();
        tree.split(root, &Point::new([6, 6])).unwrap();
        assert_eq!(tree.origin(ll).unwrap(), Some(&Point::new([2, 2])));
        assert_eq!(
            tree.region(tree.children(ll).unwrap()[3]).unwrap(),
            &rect([2, 2], [6, 6])
        );
    }

    #[test]
    fn bad_snap_policy_is_reported() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ur = tree.children(root).unwrap()[3];
        tree.split(ur, &Point::new([9, 9])).unwrap();
        let outside = |_: &Rectangle<i64>, _: &Point<i64>| Point::new([0i64, 0]);
        let err = tree.split_with(root, &Point::new([12, 12]), &outside).unwrap_err();
        assert!(matches!(err, TreeError::SnapOutside { .. }));
        assert_eq!(tree.origin(root).unwrap(), Some(&Point::new([8, 8])));
        assert_eq!(tree.region(ur).unwrap(), &rect([8, 8], [16, 16]));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn siblings_and_common_ancestor() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let c = tree.children(root).unwrap().to_vec();
        tree.split(c[0], &Point::new([4, 4])).unwrap();
        let gc = tree.children(c[0]).unwrap().to_vec();

        let sib = tree.siblings(c[1]).unwrap();
        assert_eq!(sib, vec![c[0], c[2], c[3]]);
        assert!(tree.siblings(root).unwrap().is_empty());

        assert_eq!(tree.common_ancestor(&[gc[0], gc[3]]).unwrap(), c[0]);
        assert_eq!(tree.common_ancestor(&[gc[0], c[2]]).unwrap(), root);
        assert_eq!(tree.common_ancestor(&[gc[1]]).unwrap(), gc[1]);
    }

    #[test]
    fn leaves_intersecting_window() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let hits = tree.leaves_intersecting(&rect([6, 6], [10, 7])).unwrap();
        let c = tree.children(root).unwrap();
        assert_eq!(hits, vec![c[0], c[1]]);
    }

    #[test]
    fn find_by_id_after_assign() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let c2 = tree.children(root).unwrap()[2];
        tree.assign(c2, RegionId(42), Rank(5)).unwrap();
        assert_eq!(tree.find_by_id(RegionId(42)), Some(c2));
        assert_eq!(tree.find_by_id(RegionId(43)), None);
    }

    #[test]
    fn slice_intervals_tile_world_extent() {
        let mut tree = Quadtree::new(world(16));
        let root = tree.root();
        tree.split(root, &Point::new([8, 8])).unwrap();
        let ll = tree.children(root).unwrap()[0];
        tree.split(ll, &Point::new([4, 4])).unwrap();
        let slice = tree.slice_intervals(0, &Point::new([0, 1])).unwrap();
        assert_eq!(slice.len(), 3);
        assert!(slice.all());
        assert!(slice.tiles_exactly(0, 16));
    }

    #[test]
    fn three_dimensional_split_has_eight_children() {
        let w = Rectangle::new(Point::new([0i64, 0, 0]), Point::new([8, 8, 8])).unwrap();
        let mut tree = Quadtree::new(w);
        let root = tree.root();
        tree.split(root, &Point::new([4, 4, 4])).unwrap();
        assert_eq!(tree.children(root).unwrap().len(), 8);
        let leaf = tree.leaf_at(&Point::new([5, 1, 6])).unwrap();
        assert_eq!(leaf, tree.children(root).unwrap()[0b101]);
        tree.check_invariants().unwrap();
    }

    proptest! {
        #[test]
        fn random_splits_keep_tiling(
            ops in prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, any::<bool>()), 1..24),
        ) {
            let mut tree = Quadtree::new(world(64));
            for (u, v, merge) in ops {
                let p = Point::new([(u * 64.0) as i64, (v * 64.0) as i64]);
                let leaf = tree.leaf_at(&p).unwrap();
                if merge {
                    if let Some(parent) = tree.parent(leaf).unwrap() {
                        tree.merge(parent).unwrap();
                    }
                } else {
                    let r = tree.region(leaf).unwrap().clone();
                    if r.area() > 1 {
                        tree.split(leaf, &r.center()).unwrap();
                    }
                }
                tree.check_invariants().unwrap();
                let leaf_area: i64 = tree
                    .leaves(tree.root())
                    .unwrap()
                    .iter()
                    .map(|&l| tree.region(l).unwrap().area())
                    .sum();
                prop_assert_eq!(leaf_area, 64 * 64);
                prop_assert!(tree.leaf_at(&p).is_ok());
            }
        }
    }
}
