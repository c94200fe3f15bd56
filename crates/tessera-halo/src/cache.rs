//! Plan cache with bound-based invalidation.
//!
//! [`HaloPlanCache`] lazily builds a [`HaloPlan`] the first time a
//! `(neighbour, rectangle set)` pair is requested and returns the stored
//! plan on every later request with the same pair. Each neighbour holds
//! one plan per [`Direction`]; asking for a different rectangle set in
//! the same direction replaces the old plan.
//!
//! All plans in the cache refer to one bounding region and element size.
//! Rebinding the cache to a different bound or element size drops every
//! plan, since every offset would change. Plans depend only on geometry,
//! not on the data that moves through them, so nothing else invalidates
//! them.

use indexmap::map::Entry;
use indexmap::IndexMap;
use tessera_core::Rank;
use tessera_geom::Rectangle;
use tracing::debug;

use crate::error::HaloError;
use crate::plan::HaloPlan;

/// Which half of an exchange a plan describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Local cells packed for the neighbour.
    Send,
    /// Ghost cells unpacked from the neighbour.
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SlotKey {
    neighbor: Rank,
    direction: Direction,
}

/// A plan and the exact rectangle set it was built from.
#[derive(Debug)]
struct CachedPlan {
    rects: Vec<Rectangle<i64>>,
    plan: HaloPlan,
}

/// Fingerprint of the storage every cached plan refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BoundFingerprint {
    bound: Rectangle<i64>,
    elem_size: usize,
}

/// Cached halo plans for one local storage layout.
///
/// # Example
///
/// ```
/// use tessera_core::Rank;
/// use tessera_geom::{Point, Rectangle};
/// use tessera_halo::{Direction, HaloPlanCache};
///
/// let bound = Rectangle::new(Point::new([0i64, 0]), Point::new([8, 8])).unwrap();
/// let edge = Rectangle::new(Point::new([7i64, 0]), Point::new([8, 8])).unwrap();
/// let mut cache = HaloPlanCache::new(bound, 8).unwrap();
///
/// // First request builds the plan, the second reuses it.
/// let plan = cache.get_or_build(Rank(1), Direction::Send, &[edge.clone()]).unwrap();
/// assert_eq!(plan.element_count(), 8);
/// cache.get_or_build(Rank(1), Direction::Send, &[edge]).unwrap();
/// assert_eq!(cache.len(), 1);
/// ```
///
/// # Invalidation
///
/// Plans are dropped when:
/// - [`rebind`](Self::rebind) is called with a different bound or
///   element size (all plans).
/// - [`invalidate_neighbor`](Self::invalidate_neighbor) is called (that
///   neighbour's plans).
/// - [`invalidate`](Self::invalidate) is called (all plans).
///
/// A neighbour whose rectangle set changes has its plan for that
/// direction rebuilt in place, so the cache never holds more than two
/// plans per neighbour.
#[derive(Debug)]
pub struct HaloPlanCache {
    fingerprint: BoundFingerprint,
    plans: IndexMap<SlotKey, CachedPlan>,
}

impl HaloPlanCache {
    /// Create an empty cache for storage laid out as `bound` with
    /// `elem_size`-byte elements.
    pub fn new(bound: Rectangle<i64>, elem_size: usize) -> Result<Self, HaloError> {
        if elem_size == 0 {
            return Err(HaloError::ZeroElementSize);
        }
        Ok(Self {
            fingerprint: BoundFingerprint { bound, elem_size },
            plans: IndexMap::new(),
        })
    }

    /// The bound all cached plans refer to.
    pub fn bound(&self) -> &Rectangle<i64> {
        &self.fingerprint.bound
    }

    /// The element size all cached plans use.
    pub fn elem_size(&self) -> usize {
        self.fingerprint.elem_size
    }

    /// Point the cache at a new storage layout.
    ///
    /// Returns `true` if the layout changed and the cache was cleared.
    pub fn rebind(&mut self, bound: Rectangle<i64>, elem_size: usize) -> Result<bool, HaloError> {
        if elem_size == 0 {
            return Err(HaloError::ZeroElementSize);
        }
        let fingerprint = BoundFingerprint { bound, elem_size };
        if fingerprint == self.fingerprint {
            return Ok(false);
        }
        debug!(
            dropped = self.plans.len(),
            bound = %fingerprint.bound,
            elem_size,
            "halo storage layout changed"
        );
        self.fingerprint = fingerprint;
        self.plans.clear();
        Ok(true)
    }

    /// Get the `direction` plan for `(neighbor, rects)`, building it if
    /// needed.
    ///
    /// A cached plan for the same neighbour and direction but another
    /// rectangle set is replaced. If the build fails the cache is left
    /// unchanged.
    pub fn get_or_build(
        &mut self,
        neighbor: Rank,
        direction: Direction,
        rects: &[Rectangle<i64>],
    ) -> Result<&HaloPlan, HaloError> {
        let key = SlotKey {
            neighbor,
            direction,
        };
        let cached = match self.plans.entry(key) {
            Entry::Occupied(mut e) => {
                if e.get().rects != rects {
                    let plan = HaloPlan::build(
                        rects,
                        &self.fingerprint.bound,
                        self.fingerprint.elem_size,
                    )?;
                    debug!(
                        %neighbor,
                        ?direction,
                        rects = rects.len(),
                        elements = plan.element_count(),
                        "replaced halo plan"
                    );
                    *e.get_mut() = CachedPlan {
                        rects: rects.to_vec(),
                        plan,
                    };
                }
                e.into_mut()
            }
            Entry::Vacant(e) => {
                let plan = HaloPlan::build(
                    rects,
                    &self.fingerprint.bound,
                    self.fingerprint.elem_size,
                )?;
                debug!(
                    %neighbor,
                    ?direction,
                    rects = rects.len(),
                    elements = plan.element_count(),
                    "built halo plan"
                );
                e.insert(CachedPlan {
                    rects: rects.to_vec(),
                    plan,
                })
            }
        };
        Ok(&cached.plan)
    }

    /// `true` if the `direction` plan for `(neighbor, rects)` is cached.
    pub fn contains(&self, neighbor: Rank, direction: Direction, rects: &[Rectangle<i64>]) -> bool {
        self.plans
            .get(&SlotKey {
                neighbor,
                direction,
            })
            .is_some_and(|cached| cached.rects == rects)
    }

    /// Drop every plan for `neighbor`. Returns how many were dropped.
    pub fn invalidate_neighbor(&mut self, neighbor: Rank) -> usize {
        let before = self.plans.len();
        self.plans.retain(|k, _| k.neighbor != neighbor);
        before - self.plans.len()
    }

    /// Drop every cached plan.
    pub fn invalidate(&mut self) {
        self.plans.clear();
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the cache holds no plans.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
