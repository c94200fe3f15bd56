//! Spatial decomposition trees for Tessera.
//!
//! - [`Quadtree`]: recursive 2^N-way subdivision of a world region. Nodes
//!   live in an arena and refer to each other by [`NodeId`]; the load
//!   balancer drives [`split`](Quadtree::split) and
//!   [`merge`](Quadtree::merge) and assigns region ids and owning ranks.
//! - [`IntervalIndex`]: a 1-D interval tree that verifies a set of
//!   segments tiles an axis without gaps or overlaps, used to check leaf
//!   projections before a rebalance is committed.
//!
//! # Example
//!
//! ```
//! use tessera_geom::{Point, Rectangle};
//! use tessera_tree::Quadtree;
//!
//! let world = Rectangle::new(Point::new([0i64, 0]), Point::new([16, 16])).unwrap();
//! let mut tree = Quadtree::new(world);
//! let root = tree.root();
//! tree.split(root, &Point::new([8, 8])).unwrap();
//! let lower_left = tree.children(root).unwrap()[0];
//! tree.split(lower_left, &Point::new([4, 4])).unwrap();
//!
//! let leaf = tree.leaf_at(&Point::new([1, 1])).unwrap();
//! assert_eq!(tree.level(leaf).unwrap(), 2);
//! assert_eq!(tree.region(leaf).unwrap().br(), &Point::new([4, 4]));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod interval;
pub mod quadtree;
pub mod snap;

pub use error::TreeError;
pub use interval::{IntervalIndex, Segment};
pub use quadtree::{NodeId, Quadtree, QuadtreeNode};
pub use snap::{SnapPolicy, SnapToCenter, SnapToNearest};
