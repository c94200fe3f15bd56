//! N-dimensional points.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;
use tessera_core::wire::{read_u32_le, write_u32_le};
use tessera_core::{Wire, WireError};

use crate::error::GeometryError;
use crate::scalar::Scalar;

/// Component storage for a [`Point`].
///
/// Inline for up to 4 dimensions, which covers every decomposition the
/// substrate is used with (1D strips through 3D volumes plus time).
pub type Coords<T> = SmallVec<[T; 4]>;

/// An immutable N-tuple of coordinates.
///
/// Comparison is lexicographic over the components. Every operation
/// taking a second point fails with
/// [`GeometryError::DimensionMismatch`] when the dimensions differ.
///
/// # Examples
///
/// ```
/// use tessera_geom::Point;
///
/// let a = Point::new([1i64, 5]);
/// let b = Point::new([2i64, 0]);
/// assert!(a < b);
/// assert_eq!(Point::min(&a, &b).unwrap(), Point::new([1, 0]));
/// assert_eq!(a.shift(&b).unwrap(), Point::new([3, 5]));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point<T: Scalar> {
    coords: Coords<T>,
}

impl<T: Scalar> Point<T> {
    /// Create a point from its components.
    pub fn new(coords: impl IntoIterator<Item = T>) -> Self {
        Self {
            coords: coords.into_iter().collect(),
        }
    }

    /// A `dim`-dimensional point with every component equal to `value`.
    pub fn splat(dim: usize, value: T) -> Self {
        Self {
            coords: SmallVec::from_elem(value, dim),
        }
    }

    /// The origin of a `dim`-dimensional space.
    pub fn origin(dim: usize) -> Self {
        Self::splat(dim, T::ZERO)
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Component along `axis`.
    ///
    /// Panics if `axis >= self.dim()`; use [`get`](Self::get) for a
    /// checked lookup.
    pub fn coord(&self, axis: usize) -> T {
        self.coords[axis]
    }

    /// Checked component lookup.
    pub fn get(&self, axis: usize) -> Option<T> {
        self.coords.get(axis).copied()
    }

    /// All components in axis order.
    pub fn coords(&self) -> &[T] {
        &self.coords
    }

    /// Iterate over the components.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.coords.iter().copied()
    }

    pub(crate) fn check_dim(&self, other: &Self) -> Result<(), GeometryError> {
        if self.dim() != other.dim() {
            return Err(GeometryError::DimensionMismatch {
                expected: self.dim(),
                found: other.dim(),
            });
        }
        Ok(())
    }

    fn zip_with(&self, other: &Self, f: impl Fn(T, T) -> T) -> Result<Self, GeometryError> {
        self.check_dim(other)?;
        Ok(Self {
            coords: self
                .coords
                .iter()
                .zip(&other.coords)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Translate by `by`, componentwise.
    pub fn shift(&self, by: &Self) -> Result<Self, GeometryError> {
        self.zip_with(by, |a, b| a + b)
    }

    /// Componentwise difference `self - other`.
    pub fn offset_from(&self, other: &Self) -> Result<Self, GeometryError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// Componentwise minimum.
    pub fn min(&self, other: &Self) -> Result<Self, GeometryError> {
        self.zip_with(other, T::min_of)
    }

    /// Componentwise maximum.
    pub fn max(&self, other: &Self) -> Result<Self, GeometryError> {
        self.zip_with(other, T::max_of)
    }

    /// Replace the component along `axis`.
    pub fn with_coord(&self, axis: usize, value: T) -> Result<Self, GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        let mut coords = self.coords.clone();
        coords[axis] = value;
        Ok(Self { coords })
    }

    /// Keep only the listed axes, in the order given.
    ///
    /// `project(&[0, 2])` maps `(x, y, z)` to `(x, z)`.
    pub fn project(&self, axes: &[usize]) -> Result<Self, GeometryError> {
        let mut coords = Coords::with_capacity(axes.len());
        for &axis in axes {
            let v = self.get(axis).ok_or(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            })?;
            coords.push(v);
        }
        Ok(Self { coords })
    }

    /// Drop one axis, reducing the dimension by one.
    pub fn drop_axis(&self, axis: usize) -> Result<Self, GeometryError> {
        if axis >= self.dim() {
            return Err(GeometryError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        let mut coords = self.coords.clone();
        coords.remove(axis);
        Ok(Self { coords })
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Self) -> Result<f64, GeometryError> {
        self.check_dim(other)?;
        Ok(self
            .coords
            .iter()
            .zip(&other.coords)
            .map(|(&a, &b)| {
                let d = a.to_f64() - b.to_f64();
                d * d
            })
            .sum::<f64>()
            .sqrt())
    }

    /// `true` if every component of `self` is `<=` the matching one in `other`.
    ///
    /// This is the componentwise partial order, not the lexicographic
    /// one used by `Ord`.
    pub fn all_le(&self, other: &Self) -> Result<bool, GeometryError> {
        self.check_dim(other)?;
        Ok(self.coords.iter().zip(&other.coords).all(|(a, b)| a <= b))
    }

    /// Lexicographic comparison that also works for real coordinates.
    ///
    /// Returns `None` if a component comparison is undefined (NaN).
    pub fn lex_cmp(&self, other: &Self) -> Result<Option<Ordering>, GeometryError> {
        self.check_dim(other)?;
        Ok(self.partial_cmp(other))
    }
}

impl<T: Scalar> fmt::Debug for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, ")")
    }
}

impl<T: Scalar> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T: Scalar> From<Vec<T>> for Point<T> {
    fn from(v: Vec<T>) -> Self {
        Self::new(v)
    }
}

impl<T: Scalar, const N: usize> From<[T; N]> for Point<T> {
    fn from(v: [T; N]) -> Self {
        Self::new(v)
    }
}

impl<T: Scalar> Wire for Point<T> {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, self.dim() as u32);
        for c in &self.coords {
            c.encode(buf);
        }
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        let dim = read_u32_le(r)? as usize;
        let mut coords = Coords::with_capacity(dim.min(r.len()));
        for _ in 0..dim {
            coords.push(T::decode(r)?);
        }
        Ok(Self { coords })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{from_bytes, to_bytes};

    #[test]
    fn lexicographic_order() {
        let a = Point::new([0i64, 9]);
        let b = Point::new([1i64, 0]);
        let c = Point::new([1i64, 1]);
        assert!(a < b && b < c);
        let mut v = vec![c.clone(), a.clone(), b.clone()];
        v.sort();
        assert_eq!(v, vec![a, b, c]);
    }

    #[test]
    fn dimension_mismatch_fails() {
        let a = Point::new([0i64, 0]);
        let b = Point::new([0i64, 0, 0]);
        assert_eq!(
            a.shift(&b),
            Err(GeometryError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
        assert!(a.distance(&b).is_err());
        assert!(Point::min(&a, &b).is_err());
    }

    #[test]
    fn min_max_shift() {
        let a = Point::new([3i64, -1, 4]);
        let b = Point::new([1i64, 5, 4]);
        assert_eq!(Point::min(&a, &b).unwrap(), Point::new([1, -1, 4]));
        assert_eq!(Point::max(&a, &b).unwrap(), Point::new([3, 5, 4]));
        assert_eq!(a.offset_from(&b).unwrap(), Point::new([2, -6, 0]));
    }

    #[test]
    fn projection_reduces_dimension() {
        let p = Point::new([1.0f64, 2.0, 3.0]);
        assert_eq!(p.project(&[2, 0]).unwrap(), Point::new([3.0, 1.0]));
        assert_eq!(p.drop_axis(1).unwrap(), Point::new([1.0, 3.0]));
        assert_eq!(
            p.project(&[3]),
            Err(GeometryError::AxisOutOfRange { axis: 3, dim: 3 })
        );
    }

    #[test]
    fn euclidean_distance() {
        let a = Point::new([0i64, 0]);
        let b = Point::new([3i64, 4]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wire_preserves_dimension() {
        let p = Point::new([7i64, -2, 11]);
        let back: Point<i64> = from_bytes(&to_bytes(&p)).unwrap();
        assert_eq!(back, p);
        assert_eq!(back.dim(), 3);
    }

    #[test]
    fn display_format() {
        assert_eq!(Point::new([1i64, 2]).to_string(), "(1, 2)");
    }
}
