//! Periodic wraparound of rectangles against a world bound.

use crate::error::GeometryError;
use crate::point::Point;
use crate::rect::Rectangle;
use crate::scalar::Scalar;

impl<T: Scalar> Rectangle<T> {
    /// Fold a rectangle that overhangs a periodic `bound` back inside it.
    ///
    /// The rectangle is first cut at the bound's faces; every resulting
    /// piece lying below a lower face is shifted up by the bound's extent
    /// on that axis, and every piece at or beyond an upper face is shifted
    /// down. The result has between 1 and 2^N pieces, all inside `bound`,
    /// carrying `self`'s id and owner. A rectangle already inside the
    /// bound comes back unchanged as a single-element list.
    ///
    /// Fails with [`GeometryError::NotContained`] if a piece still lies
    /// outside after one period shift, i.e. the rectangle overhangs by more
    /// than the bound's own extent.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_geom::{Point, Rectangle};
    ///
    /// let bound = Rectangle::new(Point::new([0i64, 0]), Point::new([10, 10])).unwrap();
    /// let r = Rectangle::new(Point::new([8i64, 8]), Point::new([15, 12])).unwrap();
    /// let pieces = r.to_toroidal(&bound).unwrap();
    /// assert_eq!(pieces.iter().map(|p| p.area()).sum::<i64>(), 28);
    /// assert!(pieces.iter().all(|p| bound.contains_rect(p).unwrap()));
    /// ```
    pub fn to_toroidal(&self, bound: &Self) -> Result<Vec<Self>, GeometryError> {
        if bound.contains_rect(self)? {
            return Ok(vec![self.clone()]);
        }
        let n = self.dim();
        let mut intervals: Vec<Vec<(T, T)>> = Vec::with_capacity(n);
        for a in 0..n {
            let (lo, hi) = (self.ul().coord(a), self.br().coord(a));
            let (blo, bhi) = (bound.ul().coord(a), bound.br().coord(a));
            let period = bhi - blo;
            if hi - lo > period {
                return Err(GeometryError::NotContained {
                    what: format!("{self} (wider than one period along axis {a})"),
                    region: bound.to_string(),
                });
            }

            let mut cuts = vec![lo];
            if lo < blo && blo < hi {
                cuts.push(blo);
            }
            if lo < bhi && bhi < hi {
                cuts.push(bhi);
            }
            cuts.push(hi);

            let mut axis_intervals = Vec::with_capacity(cuts.len() - 1);
            for w in cuts.windows(2) {
                let (s, e) = (w[0], w[1]);
                if s == e {
                    continue;
                }
                let shift = if e <= blo {
                    period
                } else if s >= bhi {
                    T::ZERO - period
                } else {
                    T::ZERO
                };
                if s + shift < blo || e + shift > bhi {
                    return Err(GeometryError::NotContained {
                        what: format!("{self} wrapped once along axis {a}"),
                        region: bound.to_string(),
                    });
                }
                axis_intervals.push((s + shift, e + shift));
            }
            intervals.push(axis_intervals);
        }
        self.cells(&intervals)
    }

    /// The per-axis shifts that map each piece of
    /// [`to_toroidal`](Self::to_toroidal) back to its unwrapped position,
    /// in the same order as the pieces.
    ///
    /// `pieces[i].shift(&offsets[i])` lies inside `self`.
    pub fn toroidal_offsets(&self, bound: &Self) -> Result<Vec<Point<T>>, GeometryError> {
        let pieces = self.to_toroidal(bound)?;
        let mut offsets = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            let mut delta = Vec::with_capacity(self.dim());
            for a in 0..self.dim() {
                let (s, e) = (piece.ul().coord(a), piece.br().coord(a));
                let period = bound.extent(a);
                // A piece was moved by at most one period, so exactly one of
                // {0, +period, -period} puts it back inside `self`.
                let d = if self.ul().coord(a) <= s && e <= self.br().coord(a) {
                    T::ZERO
                } else if self.ul().coord(a) <= s + period && e + period <= self.br().coord(a) {
                    period
                } else {
                    T::ZERO - period
                };
                delta.push(d);
            }
            offsets.push(Point::new(delta));
        }
        Ok(offsets)
    }
}
