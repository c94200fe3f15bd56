//! Strided transfer plans over a bounding region's linearised storage.
//!
//! A [`HaloPlan`] describes where a set of rectangles lives inside the
//! flat storage of a bounding rectangle, without touching the data.
//! Storage is linearised with axis 0 varying fastest: the element at
//! `p` sits at
//!
//! ```text
//! sum_a (p[a] - bound.ul[a]) * stride[a],   stride[0] = 1,
//!                                           stride[a] = stride[a-1] * extent[a-1]
//! ```
//!
//! Each rectangle becomes one [`SubPlan`]: a start offset plus a nested
//! shape whose innermost level is a contiguous run of the rectangle's
//! width and whose outer levels step by the bound's strides. The plan is
//! the struct of those sub-plans, each with blocklength 1, which is the
//! layout a bulk strided copy consumes directly.

use std::ops::Range;

use smallvec::SmallVec;
use tessera_geom::{GeometryError, Point, Rectangle};

use crate::error::HaloError;

/// One level of a nested strided shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AxisStride {
    /// Number of repetitions along this axis.
    pub count: usize,
    /// Distance between repetitions, in elements.
    pub stride: usize,
}

/// The transfer shape of a single rectangle inside a bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubPlan {
    rect: Rectangle<i64>,
    offset: usize,
    shape: SmallVec<[AxisStride; 4]>,
    blocklength: usize,
}

impl SubPlan {
    /// The rectangle re-based to bound-local coordinates (bound `ul` at
    /// the origin), with the source rectangle's id and owner.
    pub fn local_rect(&self) -> &Rectangle<i64> {
        &self.rect
    }

    /// Element offset of the rectangle's first element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Nested shape, innermost (axis 0, stride 1) first.
    pub fn shape(&self) -> &[AxisStride] {
        &self.shape
    }

    /// Number of sub-plan instances in the enclosing struct; always 1.
    pub fn blocklength(&self) -> usize {
        self.blocklength
    }

    /// Number of elements covered.
    pub fn element_count(&self) -> usize {
        self.shape.iter().map(|s| s.count).product()
    }

    /// Element offsets in transfer order (axis 0 fastest).
    pub fn element_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let total = self.element_count();
        (0..total).map(move |mut i| {
            let mut at = self.offset;
            for s in &self.shape {
                at += (i % s.count) * s.stride;
                i /= s.count;
            }
            at
        })
    }

    /// Contiguous element runs: one per row along axis 0.
    fn runs(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let width = self.shape.first().map_or(0, |s| s.count);
        let rows: usize = self.shape.iter().skip(1).map(|s| s.count).product();
        let rows = if width == 0 { 0 } else { rows };
        (0..rows).map(move |mut r| {
            let mut at = self.offset;
            for s in self.shape.iter().skip(1) {
                at += (r % s.count) * s.stride;
                r /= s.count;
            }
            at..at + width
        })
    }
}

/// A compiled description of how to move a set of rectangles in or out
/// of a bounding region's storage.
///
/// # Examples
///
/// ```
/// use tessera_geom::{Point, Rectangle};
/// use tessera_halo::HaloPlan;
///
/// let bound = Rectangle::new(Point::new([0i64, 0]), Point::new([4, 3])).unwrap();
/// // The middle column, x = 1, all rows.
/// let column = Rectangle::new(Point::new([1i64, 0]), Point::new([2, 3])).unwrap();
/// let plan = HaloPlan::build(&[column], &bound, 8).unwrap();
/// assert_eq!(plan.element_count(), 3);
/// assert_eq!(plan.element_offsets().collect::<Vec<_>>(), vec![1, 5, 9]);
/// assert_eq!(plan.byte_ranges(), vec![8..16, 40..48, 72..80]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaloPlan {
    bound: Rectangle<i64>,
    elem_size: usize,
    subplans: Vec<SubPlan>,
}

impl HaloPlan {
    /// Build a plan for `rects` inside `bound`.
    ///
    /// Every rectangle must be contained in the bound and share its
    /// dimension. Empty rectangles produce empty sub-plans.
    pub fn build(
        rects: &[Rectangle<i64>],
        bound: &Rectangle<i64>,
        elem_size: usize,
    ) -> Result<Self, HaloError> {
        if elem_size == 0 {
            return Err(HaloError::ZeroElementSize);
        }
        let strides = bound_strides(bound);
        let origin = bound.ul();
        let mut subplans = Vec::with_capacity(rects.len());
        for rect in rects {
            if !bound.contains_rect(rect)? {
                return Err(GeometryError::NotContained {
                    what: format!("halo rectangle {rect}"),
                    region: bound.to_string(),
                }
                .into());
            }
            let local = rect.shift(&Point::origin(origin.dim()).offset_from(origin)?)?;
            let offset = linear_index(local.ul(), &strides);
            let shape = (0..rect.dim())
                .map(|a| AxisStride {
                    count: rect.extent(a) as usize,
                    stride: strides[a],
                })
                .collect();
            subplans.push(SubPlan {
                rect: local,
                offset,
                shape,
                blocklength: 1,
            });
        }
        Ok(Self {
            bound: bound.clone(),
            elem_size,
            subplans,
        })
    }

    /// A plan for a single rectangle.
    pub fn single(
        rect: &Rectangle<i64>,
        bound: &Rectangle<i64>,
        elem_size: usize,
    ) -> Result<Self, HaloError> {
        Self::build(std::slice::from_ref(rect), bound, elem_size)
    }

    /// The bounding region the offsets refer to.
    pub fn bound(&self) -> &Rectangle<i64> {
        &self.bound
    }

    /// Bytes per element.
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Per-rectangle sub-plans, in input order.
    pub fn subplans(&self) -> &[SubPlan] {
        &self.subplans
    }

    /// Total elements described; the sum of the rectangles' areas.
    pub fn element_count(&self) -> usize {
        self.subplans.iter().map(SubPlan::element_count).sum()
    }

    /// Total bytes described.
    pub fn byte_count(&self) -> usize {
        self.element_count() * self.elem_size
    }

    /// Bytes the bound's storage must hold.
    pub fn storage_bytes(&self) -> usize {
        (0..self.bound.dim())
            .map(|a| self.bound.extent(a) as usize)
            .product::<usize>()
            * self.elem_size
    }

    /// Element offsets in transfer order: sub-plans in order, axis 0
    /// fastest within each.
    pub fn element_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.subplans.iter().flat_map(SubPlan::element_offsets)
    }

    /// Contiguous byte ranges in transfer order, with adjacent runs
    /// coalesced.
    pub fn byte_ranges(&self) -> Vec<Range<usize>> {
        let mut out: Vec<Range<usize>> = Vec::new();
        for run in self.subplans.iter().flat_map(SubPlan::runs) {
            let bytes = run.start * self.elem_size..run.end * self.elem_size;
            match out.last_mut() {
                Some(last) if last.end == bytes.start => last.end = bytes.end,
                _ => out.push(bytes),
            }
        }
        out
    }
}

/// Per-axis element strides of a bound, axis 0 fastest.
fn bound_strides(bound: &Rectangle<i64>) -> SmallVec<[usize; 4]> {
    let mut strides = SmallVec::with_capacity(bound.dim());
    let mut step = 1usize;
    for a in 0..bound.dim() {
        strides.push(step);
        step *= bound.extent(a) as usize;
    }
    strides
}

fn linear_index(p: &Point<i64>, strides: &[usize]) -> usize {
    p.iter().zip(strides).map(|(c, s)| c as usize * s).sum()
}
