//! Halo transfer descriptors for Tessera partitions.
//!
//! A partition stores its cells in a ghost-inclusive bounding region.
//! Each step it sends the interior cells its neighbours' ghost layers
//! need and receives its own ghost cells. This crate describes those
//! transfers without copying anything:
//!
//! - [`HaloExchange`] computes which rectangles move between two
//!   partitions, including periodic images in a wrapped world.
//! - [`HaloPlan`] turns a rectangle set into a strided layout over the
//!   bound's linearised storage (axis 0 fastest).
//! - [`HaloPlanCache`] keeps one plan per neighbour and [`Direction`] until
//!   the storage layout changes.
//! - [`HaloStorage`] is implemented by whatever owns the bytes and does
//!   the actual packing.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod error;
pub mod exchange;
pub mod plan;
pub mod storage;

pub use cache::{Direction, HaloPlanCache};
pub use error::HaloError;
pub use exchange::HaloExchange;
pub use plan::{AxisStride, HaloPlan, SubPlan};
pub use storage::HaloStorage;
