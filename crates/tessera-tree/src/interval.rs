//! One-dimensional interval index.
//!
//! Segments are kept in an unbalanced binary search tree ordered by
//! `(start, end)`. Each node caches the minimum start and maximum end of
//! its subtree, which is enough to decide gap-free coverage bottom-up
//! without materialising the union.
//!
//! Nodes are appended to a flat arena and never removed, so a child always
//! has a larger index than its parent. Bottom-up passes therefore walk the
//! arena in reverse instead of recursing.

use std::cmp::Ordering;

use tessera_core::Rank;
use tessera_geom::Scalar;

use crate::error::TreeError;

/// A half-open interval `[start, end)` with an optional owner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<T: Scalar> {
    /// Inclusive lower bound.
    pub start: T,
    /// Exclusive upper bound.
    pub end: T,
    /// Rank owning the region this segment was projected from.
    pub owner: Option<Rank>,
}

impl<T: Scalar> Segment<T> {
    /// An unowned segment.
    pub fn new(start: T, end: T) -> Self {
        Self {
            start,
            end,
            owner: None,
        }
    }

    /// `true` if `start == end`.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Strict half-open overlap, as for rectangles.
    pub fn overlaps(&self, start: T, end: T) -> bool {
        T::max_of(self.start, start) < T::min_of(self.end, end)
    }

    fn key_cmp(&self, other: &Self) -> Ordering {
        self.start
            .partial_cmp(&other.start)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.end.partial_cmp(&other.end).unwrap_or(Ordering::Equal))
    }
}

#[derive(Clone, Debug)]
struct Node<T: Scalar> {
    segment: Segment<T>,
    left: Option<usize>,
    right: Option<usize>,
    min: T,
    max: T,
}

/// Interval tree over [`Segment`]s.
///
/// # Examples
///
/// ```
/// use tessera_tree::{IntervalIndex, Segment};
///
/// let mut index = IntervalIndex::new();
/// index.insert(Segment::new(4i64, 8)).unwrap();
/// index.insert(Segment::new(0, 4)).unwrap();
/// assert!(index.all());
/// assert!(index.tiles_exactly(0, 8));
///
/// index.insert(Segment::new(10, 12)).unwrap();
/// assert!(!index.all());
/// ```
#[derive(Clone, Debug)]
pub struct IntervalIndex<T: Scalar> {
    nodes: Vec<Node<T>>,
}

impl<T: Scalar> Default for IntervalIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> IntervalIndex<T> {
    /// An empty index.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of stored segments.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no segment has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a segment. Equal keys are kept; the newer one sorts after.
    pub fn insert(&mut self, segment: Segment<T>) -> Result<(), TreeError> {
        if !(segment.start <= segment.end) {
            return Err(TreeError::InvalidSegment {
                start: segment.start.to_string(),
                end: segment.end.to_string(),
            });
        }
        let new = self.nodes.len();
        let mut link: Option<(usize, bool)> = None;
        let mut cursor = if self.nodes.is_empty() { None } else { Some(0) };
        while let Some(i) = cursor {
            let node = &mut self.nodes[i];
            node.min = T::min_of(node.min, segment.start);
            node.max = T::max_of(node.max, segment.end);
            let go_left = segment.key_cmp(&node.segment) == Ordering::Less;
            cursor = if go_left { node.left } else { node.right };
            link = Some((i, go_left));
        }
        if let Some((parent, go_left)) = link {
            let parent = &mut self.nodes[parent];
            if go_left {
                parent.left = Some(new);
            } else {
                parent.right = Some(new);
            }
        }
        self.nodes.push(Node {
            segment,
            left: None,
            right: None,
            min: segment.start,
            max: segment.end,
        });
        Ok(())
    }

    /// `(min start, max end)` over all segments; `None` when empty.
    pub fn span(&self) -> Option<(T, T)> {
        self.nodes.first().map(|root| (root.min, root.max))
    }

    /// Segments in `(start, end)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment<T>> + '_ {
        let mut stack = Vec::new();
        let mut cursor = if self.nodes.is_empty() { None } else { Some(0) };
        std::iter::from_fn(move || {
            while let Some(i) = cursor {
                stack.push(i);
                cursor = self.nodes[i].left;
            }
            let i = stack.pop()?;
            cursor = self.nodes[i].right;
            Some(&self.nodes[i].segment)
        })
    }

    /// Segments strictly overlapping `[start, end)`, in key order.
    pub fn overlapping(&self, start: T, end: T) -> Vec<Segment<T>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        if !self.nodes.is_empty() {
            stack.push(0);
        }
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            // Prune subtrees whose cached span misses the query.
            if !(T::max_of(node.min, start) < T::min_of(node.max, end)) {
                continue;
            }
            if node.segment.overlaps(start, end) {
                out.push(node.segment);
            }
            stack.extend(node.left);
            stack.extend(node.right);
        }
        out.sort_by(|a, b| a.key_cmp(b));
        out
    }

    /// `true` if the union of all segments is the single gap-free range
    /// [`span`](Self::span). Overlaps are allowed. An empty index is
    /// trivially covered.
    pub fn all(&self) -> bool {
        let mut covered = vec![false; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            let mut reach = node.segment.end;
            let mut ok = true;
            if let Some(l) = node.left {
                let left = &self.nodes[l];
                ok &= covered[l] && left.max >= node.segment.start;
                reach = T::max_of(reach, left.max);
            }
            if let Some(r) = node.right {
                let right = &self.nodes[r];
                ok &= covered[r] && right.min <= reach;
            }
            covered[i] = ok;
        }
        covered.first().copied().unwrap_or(true)
    }

    /// `true` if the non-empty segments, in order, are pairwise adjacent
    /// and together span exactly `[lo, hi)`: no holes, no overlaps.
    pub fn tiles_exactly(&self, lo: T, hi: T) -> bool {
        let mut cursor = lo;
        for segment in self.iter().filter(|s| !s.is_empty()) {
            if segment.start != cursor {
                return false;
            }
            cursor = segment.end;
        }
        cursor == hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index(segments: &[(i64, i64)]) -> IntervalIndex<i64> {
        let mut index = IntervalIndex::new();
        for &(s, e) in segments {
            index.insert(Segment::new(s, e)).unwrap();
        }
        index
    }

    #[test]
    fn empty_index_is_covered() {
        let index = IntervalIndex::<i64>::new();
        assert!(index.is_empty());
        assert!(index.all());
        assert_eq!(index.span(), None);
        assert!(index.tiles_exactly(3, 3));
        assert!(!index.tiles_exactly(0, 1));
    }

    #[test]
    fn iter_is_sorted_by_start_then_end() {
        let index = index(&[(5, 9), (0, 3), (5, 6), (2, 4)]);
        let keys: Vec<_> = index.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(keys, vec![(0, 3), (2, 4), (5, 6), (5, 9)]);
        assert_eq!(index.span(), Some((0, 9)));
    }

    #[test]
    fn gap_breaks_coverage() {
        assert!(index(&[(4, 8), (0, 4), (8, 12)]).all());
        assert!(!index(&[(4, 8), (0, 3), (8, 12)]).all());
        assert!(!index(&[(0, 4), (5, 8)]).all());
    }

    #[test]
    fn overlaps_keep_coverage_but_not_tiling() {
        let index = index(&[(0, 6), (4, 10)]);
        assert!(index.all());
        assert!(!index.tiles_exactly(0, 10));
    }

    #[test]
    fn tiling_ignores_empty_segments() {
        let index = index(&[(0, 4), (4, 4), (4, 10)]);
        assert!(index.tiles_exactly(0, 10));
        assert!(!index.tiles_exactly(0, 12));
        assert!(!index.tiles_exactly(-1, 10));
    }

    #[test]
    fn overlapping_query_is_half_open() {
        let index = index(&[(0, 4), (4, 8), (8, 12)]);
        let hits = index.overlapping(4, 8);
        assert_eq!(hits, vec![Segment::new(4, 8)]);
        let hits = index.overlapping(3, 9);
        assert_eq!(hits.len(), 3);
        assert!(index.overlapping(12, 20).is_empty());
    }

    #[test]
    fn inverted_segment_rejected() {
        let mut index = IntervalIndex::new();
        assert!(matches!(
            index.insert(Segment::new(3i64, 1)),
            Err(TreeError::InvalidSegment { .. })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn owners_travel_with_segments() {
        let mut index = IntervalIndex::new();
        index
            .insert(Segment {
                start: 0.0f64,
                end: 0.5,
                owner: Some(Rank(1)),
            })
            .unwrap();
        index
            .insert(Segment {
                start: 0.5,
                end: 1.0,
                owner: Some(Rank(0)),
            })
            .unwrap();
        let owners: Vec<_> = index.iter().map(|s| s.owner).collect();
        assert_eq!(owners, vec![Some(Rank(1)), Some(Rank(0))]);
        assert!(index.tiles_exactly(0.0, 1.0));
    }

    proptest! {
        #[test]
        fn shuffled_partition_tiles(
            widths in prop::collection::vec(1i64..20, 1..16),
            order in prop::collection::vec(any::<u32>(), 16),
        ) {
            let mut segments = Vec::new();
            let mut at = 0;
            for w in &widths {
                segments.push((at, at + w));
                at += w;
            }
            let mut keyed: Vec<_> = segments.iter().zip(&order).collect();
            keyed.sort_by_key(|(_, k)| **k);
            let mut index = IntervalIndex::new();
            for ((s, e), _) in keyed {
                index.insert(Segment::new(*s, *e)).unwrap();
            }
            prop_assert!(index.all());
            prop_assert!(index.tiles_exactly(0, at));
            prop_assert_eq!(index.span(), Some((0, at)));
        }

        #[test]
        fn removing_an_inner_piece_leaves_a_gap(
            widths in prop::collection::vec(1i64..20, 3..16),
            hole in 1usize..15,
        ) {
            let hole = hole % (widths.len() - 2) + 1;
            let mut index = IntervalIndex::new();
            let mut at = 0;
            for (i, w) in widths.iter().enumerate() {
                if i != hole {
                    index.insert(Segment::new(at, at + w)).unwrap();
                }
                at += w;
            }
            prop_assert!(!index.all());
            prop_assert!(!index.tiles_exactly(0, at));
        }
    }
}
