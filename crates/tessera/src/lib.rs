//! Tessera: distributed spatial partitioning and halo exchange for
//! spatially decomposed simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tessera sub-crates and adds [`ProcessContext`], the per-process
//! state a host builds once and threads through its step loop.
//!
//! # Quick start
//!
//! ```rust
//! use tessera::prelude::*;
//!
//! // Decompose a 16x16 world into quadrants owned by four ranks.
//! let world = Rectangle::new(Point::new([0i64, 0]), Point::new([16, 16])).unwrap();
//! let mut tree = Quadtree::new(world.clone());
//! let root = tree.root();
//! tree.split(root, &Point::new([8, 8])).unwrap();
//! for (i, leaf) in tree.leaves(root).unwrap().into_iter().enumerate() {
//!     tree.assign(leaf, RegionId(i as u64), Rank(i as u32)).unwrap();
//! }
//!
//! // What rank 0 trades with rank 3 in a periodic world, one ghost cell wide.
//! let mine = tree.region(tree.leaf_at(&Point::new([0, 0])).unwrap()).unwrap();
//! let theirs = tree.region(tree.leaf_at(&Point::new([15, 15])).unwrap()).unwrap();
//! let exchange = HaloExchange::between(mine, theirs, 1, Some(&world)).unwrap();
//! let (send, recv) = exchange.plans(std::mem::size_of::<f32>()).unwrap();
//!
//! // Diagonal neighbours share four corner cells across the seams.
//! assert_eq!(send.element_count(), 4);
//! assert_eq!(recv.element_count(), 4);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tessera-core` | ranks, region ids, the `Wire` codec |
//! | [`geom`] | `tessera-geom` | `Point`, `Rectangle`, periodic wrapping |
//! | [`tree`] | `tessera-tree` | `Quadtree`, `IntervalIndex`, snap policies |
//! | [`halo`] | `tessera-halo` | transfer plans, plan cache, exchange geometry |
//! | [`comm`] | `tessera-comm` | transports, collectives, group topology |
//! | [`registry`] | `tessera-registry` | name registry and remote handles |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod context;

pub use context::{ProcessContext, SubstrateConfig, SubstrateError};

/// Identifiers, shared errors and the payload codec (`tessera-core`).
pub use tessera_core as types;

/// Points and rectangles (`tessera-geom`).
///
/// [`geom::Rectangle::to_toroidal`] folds overhanging rectangles back
/// into a periodic world.
pub use tessera_geom as geom;

/// Decomposition trees (`tessera-tree`).
pub use tessera_tree as tree;

/// Halo transfer plans (`tessera-halo`).
///
/// Plans describe strided copies; the storage collaborator performs them
/// through [`halo::HaloStorage`].
pub use tessera_halo as halo;

/// Group communication (`tessera-comm`).
///
/// [`comm::CollectiveTransport`] moves any [`types::Wire`] payload over a
/// [`comm::Transport`]; [`comm::LocalTransport`] runs ranks as threads.
pub use tessera_comm as comm;

/// Distributed name registry (`tessera-registry`).
pub use tessera_registry as registry;

/// Common imports for typical Tessera usage.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use tessera_core::{Rank, RegionId, Wire};

    // Geometry
    pub use tessera_geom::{Point, Rectangle, Scalar};

    // Trees
    pub use tessera_tree::{IntervalIndex, NodeId, Quadtree, SnapPolicy, SnapToCenter};

    // Halo
    pub use tessera_halo::{Direction, HaloExchange, HaloPlan, HaloPlanCache, HaloStorage};

    // Communication
    pub use tessera_comm::{
        CollectiveTransport, CommConfig, FailurePolicy, GroupTopology, LocalTransport, Transport,
    };

    // Registry
    pub use tessera_registry::{DistributedRegistry, Fabric, Handle, RegistryConfig, RemoteObject};

    // Errors
    pub use tessera_comm::TransportError;
    pub use tessera_geom::GeometryError;
    pub use tessera_halo::HaloError;
    pub use tessera_registry::RegistryError;
    pub use tessera_tree::TreeError;

    // Context
    pub use crate::{ProcessContext, SubstrateConfig};
}
