//! Half-open axis-aligned rectangles.

use std::fmt;

use tessera_core::{Rank, RegionId, Wire, WireError};

use crate::error::GeometryError;
use crate::point::{Coords, Point};
use crate::scalar::Scalar;

/// The half-open box `[ul, br)`.
///
/// `ul <= br` holds on every axis. A rectangle may additionally carry an
/// opaque [`RegionId`] and the [`Rank`] that owns it; both are assigned by
/// the load balancer and are inherited by pieces produced from
/// [`split`](Self::split), [`intersection`](Self::intersection) and
/// [`to_toroidal`](Self::to_toroidal).
///
/// # Examples
///
/// ```
/// use tessera_geom::{Point, Rectangle};
///
/// let r = Rectangle::new(Point::new([0i64, 0]), Point::new([10, 10])).unwrap();
/// assert!(r.contains(&Point::new([0, 9])).unwrap());
/// assert!(!r.contains(&Point::new([10, 0])).unwrap());
///
/// let quads = r.split(&[Point::new([5, 5])]).unwrap();
/// assert_eq!(quads.len(), 4);
/// assert!(quads.iter().all(|q| q.area() == 25));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Rectangle<T: Scalar> {
    ul: Point<T>,
    br: Point<T>,
    id: Option<RegionId>,
    owner: Option<Rank>,
}

impl<T: Scalar> Rectangle<T> {
    /// Create the box `[ul, br)`.
    ///
    /// Fails if the corners have different dimensions or `ul > br` on any
    /// axis.
    pub fn new(ul: Point<T>, br: Point<T>) -> Result<Self, GeometryError> {
        ul.check_dim(&br)?;
        for axis in 0..ul.dim() {
            // `!(a <= b)` also rejects NaN corners.
            if !(ul.coord(axis) <= br.coord(axis)) {
                return Err(GeometryError::InvalidRegion {
                    reason: format!("ul {ul} exceeds br {br} on axis {axis}"),
                });
            }
        }
        Ok(Self {
            ul,
            br,
            id: None,
            owner: None,
        })
    }

    /// Create the box starting at `ul` with the given per-axis extents.
    pub fn from_extent(ul: Point<T>, extent: Point<T>) -> Result<Self, GeometryError> {
        let br = ul.shift(&extent)?;
        Self::new(ul, br)
    }

    /// Same box, tagged with a region id.
    pub fn with_id(mut self, id: RegionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Same box, tagged with an owning rank.
    pub fn with_owner(mut self, owner: Rank) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Same box with id and owner copied from `other`.
    fn with_tags_of(mut self, other: &Self) -> Self {
        self.id = other.id;
        self.owner = other.owner;
        self
    }

    /// Inclusive lower corner.
    pub fn ul(&self) -> &Point<T> {
        &self.ul
    }

    /// Exclusive upper corner.
    pub fn br(&self) -> &Point<T> {
        &self.br
    }

    /// Region id, if assigned.
    pub fn id(&self) -> Option<RegionId> {
        self.id
    }

    /// Owning rank, if assigned.
    pub fn owner(&self) -> Option<Rank> {
        self.owner
    }

    /// Number of axes.
    pub fn dim(&self) -> usize {
        self.ul.dim()
    }

    /// Width along `axis`.
    pub fn extent(&self, axis: usize) -> T {
        self.br.coord(axis) - self.ul.coord(axis)
    }

    /// Widths along every axis, as a point.
    pub fn extents(&self) -> Point<T> {
        Point::new((0..self.dim()).map(|a| self.extent(a)))
    }

    /// Product of the extents.
    pub fn area(&self) -> T {
        (0..self.dim()).fold(T::ONE, |acc, a| acc * self.extent(a))
    }

    /// `true` if some axis has zero width.
    pub fn is_empty(&self) -> bool {
        (0..self.dim()).any(|a| self.extent(a) == T::ZERO)
    }

    /// Midpoint, rounded towards `ul` for integer coordinates.
    ///
    /// For a non-empty rectangle the center is always contained.
    pub fn center(&self) -> Point<T> {
        Point::new((0..self.dim()).map(|a| self.ul.coord(a) + self.extent(a).half()))
    }

    /// The 2^N corner points of the closed box, ordered so that bit `i`
    /// of the index selects `br` on axis `i`.
    pub fn corners(&self) -> Vec<Point<T>> {
        let n = self.dim();
        (0..1usize << n)
            .map(|mask| {
                Point::new((0..n).map(|a| {
                    if mask & (1 << a) == 0 {
                        self.ul.coord(a)
                    } else {
                        self.br.coord(a)
                    }
                }))
            })
            .collect()
    }

    /// Half-open containment: `ul <= p < br` on every axis.
    pub fn contains(&self, p: &Point<T>) -> Result<bool, GeometryError> {
        self.ul.check_dim(p)?;
        Ok((0..self.dim()).all(|a| {
            let c = p.coord(a);
            self.ul.coord(a) <= c && c < self.br.coord(a)
        }))
    }

    /// `true` if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Self) -> Result<bool, GeometryError> {
        self.ul.check_dim(&other.ul)?;
        Ok((0..self.dim()).all(|a| {
            self.ul.coord(a) <= other.ul.coord(a) && other.br.coord(a) <= self.br.coord(a)
        }))
    }

    /// Strict half-open overlap test.
    ///
    /// Rectangles that merely touch along a face do not intersect, and an
    /// empty rectangle intersects nothing.
    pub fn intersects(&self, other: &Self) -> Result<bool, GeometryError> {
        self.ul.check_dim(&other.ul)?;
        Ok((0..self.dim()).all(|a| {
            T::max_of(self.ul.coord(a), other.ul.coord(a))
                < T::min_of(self.br.coord(a), other.br.coord(a))
        }))
    }

    /// The overlap of two rectangles, carrying `self`'s id and owner.
    pub fn intersection(&self, other: &Self) -> Result<Self, GeometryError> {
        if !self.intersects(other)? {
            return Err(GeometryError::NoIntersection {
                a: self.to_string(),
                b: other.to_string(),
            });
        }
        let ul = self.ul.max(&other.ul)?;
        let br = self.br.min(&other.br)?;
        Ok(Self::new(ul, br)?.with_tags_of(self))
    }

    /// The smallest rectangle containing both.
    pub fn bounding(&self, other: &Self) -> Result<Self, GeometryError> {
        let ul = self.ul.min(&other.ul)?;
        let br = self.br.max(&other.br)?;
        Ok(Self::new(ul, br)?.with_tags_of(self))
    }

    /// Translate by `by`.
    pub fn shift(&self, by: &Point<T>) -> Result<Self, GeometryError> {
        Ok(Self::new(self.ul.shift(by)?, self.br.shift(by)?)?.with_tags_of(self))
    }

    /// Same tags, new corners.
    pub fn resize(&self, ul: Point<T>, br: Point<T>) -> Result<Self, GeometryError> {
        Ok(Self::new(ul, br)?.with_tags_of(self))
    }

    /// Expand by `border` on every side of every axis.
    ///
    /// A negative border shrinks the box and fails if it would invert it.
    pub fn grow(&self, border: T) -> Result<Self, GeometryError> {
        let d = Point::splat(self.dim(), border);
        self.resize(self.ul.offset_from(&d)?, self.br.shift(&d)?)
    }

    /// Euclidean distance from `p` to the closest point of the box; zero
    /// inside.
    pub fn distance_to(&self, p: &Point<T>) -> Result<f64, GeometryError> {
        self.ul.check_dim(p)?;
        Ok((0..self.dim())
            .map(|a| {
                let c = p.coord(a).to_f64();
                let lo = self.ul.coord(a).to_f64();
                let hi = self.br.coord(a).to_f64();
                let d = (lo - c).max(c - hi).max(0.0);
                d * d
            })
            .sum::<f64>()
            .sqrt())
    }

    /// Keep only the listed axes.
    pub fn project(&self, axes: &[usize]) -> Result<Self, GeometryError> {
        Ok(Self::new(self.ul.project(axes)?, self.br.project(axes)?)?.with_tags_of(self))
    }

    /// Partition into the grid cells implied by interior points.
    ///
    /// On each axis the distinct cut coordinates `ul, p₁ … p_k, br` define
    /// up to k+1 intervals; the result is every product cell, with axis 0
    /// varying fastest. Zero-width cells are discarded, so the pieces
    /// always tile `self` exactly. Every point must be contained.
    pub fn split(&self, points: &[Point<T>]) -> Result<Vec<Self>, GeometryError> {
        for p in points {
            if !self.contains(p)? {
                return Err(GeometryError::NotContained {
                    what: format!("split point {p}"),
                    region: self.to_string(),
                });
            }
        }
        let n = self.dim();
        let mut intervals: Vec<Vec<(T, T)>> = Vec::with_capacity(n);
        for a in 0..n {
            let mut cuts: Vec<T> = Vec::with_capacity(points.len() + 2);
            cuts.push(self.ul.coord(a));
            cuts.extend(points.iter().map(|p| p.coord(a)));
            cuts.push(self.br.coord(a));
            cuts.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
            cuts.dedup();
            intervals.push(cuts.windows(2).map(|w| (w[0], w[1])).collect());
        }
        self.cells(&intervals)
    }

    /// Cartesian product of per-axis intervals, axis 0 fastest.
    pub(crate) fn cells(&self, intervals: &[Vec<(T, T)>]) -> Result<Vec<Self>, GeometryError> {
        let mut cells: Vec<(Coords<T>, Coords<T>)> = vec![(Coords::new(), Coords::new())];
        for axis_intervals in intervals {
            let mut next = Vec::with_capacity(cells.len() * axis_intervals.len());
            for &(lo, hi) in axis_intervals {
                for (ul, br) in &cells {
                    let mut ul = ul.clone();
                    let mut br = br.clone();
                    ul.push(lo);
                    br.push(hi);
                    next.push((ul, br));
                }
            }
            cells = next;
        }
        // Each new axis is pushed as the slowest-varying one.
        cells
            .into_iter()
            .filter(|(ul, br)| ul.iter().zip(br.iter()).all(|(l, h)| l < h))
            .map(|(ul, br)| Ok(Self::new(Point::new(ul), Point::new(br))?.with_tags_of(self)))
            .collect()
    }
}

/// `true` if `pieces` exactly tile `parent`: every piece lies inside it,
/// no two pieces intersect, and the areas sum to the parent's.
pub fn tiles<T: Scalar>(parent: &Rectangle<T>, pieces: &[Rectangle<T>]) -> Result<bool, GeometryError> {
    let mut total = T::ZERO;
    for (i, p) in pieces.iter().enumerate() {
        if !parent.contains_rect(p)? {
            return Ok(false);
        }
        for q in &pieces[i + 1..] {
            if p.intersects(q)? {
                return Ok(false);
            }
        }
        total = total + p.area();
    }
    Ok(total == parent.area())
}

impl<T: Scalar> fmt::Debug for Rectangle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.ul, self.br)?;
        if let Some(id) = self.id {
            write!(f, "#{id}")?;
        }
        if let Some(owner) = self.owner {
            write!(f, "@{owner}")?;
        }
        Ok(())
    }
}

impl<T: Scalar> fmt::Display for Rectangle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T: Scalar> Wire for Rectangle<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.ul.encode(buf);
        self.br.encode(buf);
        self.id.encode(buf);
        self.owner.encode(buf);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        let ul = Point::decode(r)?;
        let br = Point::decode(r)?;
        let id = Option::<RegionId>::decode(r)?;
        let owner = Option::<Rank>::decode(r)?;
        let mut rect = Self::new(ul, br).map_err(|e| WireError::InvalidValue {
            reason: e.to_string(),
        })?;
        rect.id = id;
        rect.owner = owner;
        Ok(rect)
    }
}
