//! Geometry primitives for Tessera decompositions.
//!
//! This crate defines the two value types every other layer is built on:
//!
//! - [`Point`]: an immutable N-tuple over a [`Scalar`] (`i64` or `f64`).
//! - [`Rectangle`]: the half-open box `[ul, br)` between two points,
//!   optionally tagged with a [`RegionId`](tessera_core::RegionId) and an
//!   owning [`Rank`](tessera_core::Rank).
//!
//! Dimensions are fixed when a value is constructed. Every binary
//! operation checks that both operands agree and fails with
//! [`GeometryError::DimensionMismatch`] otherwise.
//!
//! # Periodic worlds
//!
//! [`Rectangle::to_toroidal`] folds a rectangle that overhangs a periodic
//! bound back into up to 2^N in-bound pieces, which is how halo regions
//! are computed for wrapped simulation spaces.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod point;
pub mod rect;
pub mod scalar;
mod toroidal;

#[cfg(test)]
pub(crate) mod compliance;

pub use error::GeometryError;
pub use point::{Coords, Point};
pub use rect::{tiles, Rectangle};
pub use scalar::Scalar;
