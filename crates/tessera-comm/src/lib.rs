//! Group communication for Tessera.
//!
//! - [`Transport`]: the raw byte-and-count collective layer a host
//!   supplies. [`LocalTransport`] implements it for ranks running as
//!   threads of one process.
//! - [`CollectiveTransport`]: typed collectives that move any
//!   [`Wire`](tessera_core::Wire) payload as length-prefixed frames over a
//!   [`Transport`].
//! - [`GroupTopology`]: sub-groups derived from quadtree subtrees, for
//!   aggregating up the decomposition.
//!
//! Every collective must be called by every group member, in the same
//! order. A rank that skips a call blocks the others indefinitely.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collective;
pub mod config;
pub mod error;
mod frame;
pub mod local;
pub mod topology;
pub mod transport;

pub use collective::CollectiveTransport;
pub use config::{CommConfig, FailurePolicy};
pub use error::TransportError;
pub use local::LocalTransport;
pub use topology::{GroupTopology, SubtreeGroup};
pub use transport::{displacements, Transport};
