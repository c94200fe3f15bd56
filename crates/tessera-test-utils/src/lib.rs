//! Test utilities and mock types for Tessera development.
//!
//! - [`run_world`] / [`run_world_with_fabric`]: run one closure per rank
//!   on its own thread over a [`LocalTransport`] world and collect the
//!   results in rank order.
//! - [`fixtures`]: mock [`RemoteObject`](tessera_registry::RemoteObject)
//!   implementations for registry tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::thread;

use tessera_comm::{CollectiveTransport, CommConfig, FailurePolicy, LocalTransport};
use tessera_registry::Fabric;

pub use fixtures::{FailingObject, MockObject};

/// Collective configuration used by the harness: errors are returned to
/// the test instead of aborting the test binary.
pub fn test_config() -> CommConfig {
    CommConfig {
        failure_policy: FailurePolicy::Propagate,
        ..CommConfig::default()
    }
}

/// Run `f` once per rank of an `n`-rank world, each on its own thread.
///
/// Results come back indexed by rank. A panic on any rank is re-raised
/// on the calling thread once every rank has finished.
pub fn run_world<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(CollectiveTransport<LocalTransport>) -> R + Sync,
{
    run_world_with_fabric(n, |comm, _| f(comm))
}

/// Like [`run_world`], with a [`Fabric`] shared by every rank for
/// registry tests.
pub fn run_world_with_fabric<R, F>(n: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(CollectiveTransport<LocalTransport>, Fabric) -> R + Sync,
{
    let fabric = Fabric::new();
    let f = &f;
    thread::scope(|s| {
        let handles: Vec<_> = LocalTransport::world(n)
            .into_iter()
            .map(|t| {
                let fabric = fabric.clone();
                s.spawn(move || {
                    let comm = CollectiveTransport::new(t, test_config())
                        .unwrap_or_else(|e| panic!("harness config rejected: {e}"));
                    f(comm, fabric)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}
