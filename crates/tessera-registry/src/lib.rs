//! Distributed name registry for Tessera.
//!
//! Objects that migrate between partitions stay reachable by name. Each
//! process registers the objects it currently owns with its
//! [`DistributedRegistry`]; any process can [`lookup`] a name and call the
//! object through a [`Handle`], wherever it lives.
//!
//! Three kinds of service cooperate:
//!
//! - one [`NameServer`] thread on the host rank holds the global name
//!   table;
//! - one [`ObjectDaemon`] thread per process serves calls on the objects
//!   that process exported;
//! - a shared [`Fabric`] maps service [`Address`]es to their request
//!   channels.
//!
//! [`lookup`]: DistributedRegistry::lookup

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod fabric;
pub mod handle;
pub mod name_server;
pub mod object;
pub mod registry;

pub use config::RegistryConfig;
pub use daemon::ObjectDaemon;
pub use error::{InvokeError, RegistryError};
pub use fabric::{Address, Fabric, Location};
pub use handle::{Handle, HandleKind};
pub use name_server::NameServer;
pub use object::{ObjectId, RemoteObject};
pub use registry::DistributedRegistry;
