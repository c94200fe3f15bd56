//! Policies for re-seating a split origin after a reshape.
//!
//! When an internal node is re-split around a new origin its children
//! change shape but keep their own subtrees. A grandchild's origin may no
//! longer fall inside its parent's new region; the load balancer decides
//! where it goes by passing a [`SnapPolicy`] to
//! [`Quadtree::split_with`](crate::Quadtree::split_with).

use tessera_geom::{Point, Rectangle, Scalar};

/// Chooses a replacement origin inside `region` for a stale `origin`.
///
/// Implementations must return a point that `region.contains()` whenever
/// the region is non-empty.
pub trait SnapPolicy<T: Scalar> {
    /// Produce the new origin.
    fn snap(&self, region: &Rectangle<T>, origin: &Point<T>) -> Point<T>;
}

/// Re-center the split: the new origin is the region's center.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapToCenter;

impl<T: Scalar> SnapPolicy<T> for SnapToCenter {
    fn snap(&self, region: &Rectangle<T>, _origin: &Point<T>) -> Point<T> {
        region.center()
    }
}

/// Clamp the old origin to the nearest contained point, per axis.
#[derive(Clone, Copy, Debug, Default)]
pub struct SnapToNearest;

impl<T: Scalar> SnapPolicy<T> for SnapToNearest {
    fn snap(&self, region: &Rectangle<T>, origin: &Point<T>) -> Point<T> {
        Point::new((0..region.dim()).map(|a| {
            let lo = region.ul().coord(a);
            let hi = region.br().coord(a);
            let c = origin.get(a).unwrap_or(lo);
            if lo == hi || c < lo {
                lo
            } else if c >= hi {
                hi.step_below()
            } else {
                c
            }
        }))
    }
}

impl<T: Scalar, F> SnapPolicy<T> for F
where
    F: Fn(&Rectangle<T>, &Point<T>) -> Point<T>,
{
    fn snap(&self, region: &Rectangle<T>, origin: &Point<T>) -> Point<T> {
        self(region, origin)
    }
}
