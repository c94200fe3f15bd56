//! Core types for the Tessera spatial-decomposition substrate.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the process and region identifiers shared by every other crate,
//! the configuration error type, and the [`Wire`] trait through which
//! application payloads are marshalled for collective transfers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod wire;

pub use error::{ConfigError, WireError};
pub use id::{Rank, RegionId};
pub use wire::{from_bytes, to_bytes, Wire};
