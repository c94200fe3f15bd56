//! Per-process substrate state.

use tessera_comm::{CollectiveTransport, CommConfig, Transport, TransportError};
use tessera_core::{ConfigError, Rank};
use tessera_registry::{DistributedRegistry, Fabric, RegistryConfig, RegistryError};
use thiserror::Error;
use tracing::debug;

/// Configuration for [`ProcessContext::init`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstrateConfig {
    /// Collective layer settings.
    pub comm: CommConfig,
    /// Registry settings.
    pub registry: RegistryConfig,
}

impl SubstrateConfig {
    /// Check every section against a world of `world_size` ranks.
    pub fn validate(&self, world_size: usize) -> Result<(), ConfigError> {
        self.comm.validate()?;
        self.registry.validate(world_size)?;
        Ok(())
    }
}

/// Errors raised while bringing a process up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstrateError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The collective layer failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    /// The registry handshake failed.
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Everything one process needs to take part in a run: its collectives
/// (with their reusable buffers) and its view of the registry.
///
/// Built once per process by [`init`](Self::init) and passed by
/// reference to whatever needs it.
#[derive(Debug)]
pub struct ProcessContext<T: Transport> {
    comm: CollectiveTransport<T>,
    registry: DistributedRegistry,
    config: SubstrateConfig,
}

impl<T: Transport> ProcessContext<T> {
    /// Bring this process up. Collective over `transport`'s group.
    ///
    /// Validates `config`, wraps the transport and runs the registry
    /// handshake. Every rank must call this with the same configuration
    /// and a clone of the same `fabric`.
    pub fn init(transport: T, fabric: Fabric, config: SubstrateConfig) -> Result<Self, SubstrateError> {
        config.validate(transport.size())?;
        let mut comm = CollectiveTransport::new(transport, config.comm.clone())?;
        let registry = DistributedRegistry::connect(&mut comm, fabric, config.registry.clone())?;
        debug!(rank = %comm.rank(), size = comm.size(), "process context ready");
        Ok(Self {
            comm,
            registry,
            config,
        })
    }

    /// This process's world rank.
    pub fn rank(&self) -> Rank {
        self.comm.world_rank()
    }

    /// Number of processes in the run.
    pub fn size(&self) -> usize {
        self.comm.size()
    }

    /// The configuration the context was built with.
    pub fn config(&self) -> &SubstrateConfig {
        &self.config
    }

    /// World-group collectives.
    pub fn comm(&mut self) -> &mut CollectiveTransport<T> {
        &mut self.comm
    }

    /// The registry.
    pub fn registry(&mut self) -> &mut DistributedRegistry {
        &mut self.registry
    }

    /// Collectives and registry together, for code that needs both.
    pub fn split(&mut self) -> (&mut CollectiveTransport<T>, &mut DistributedRegistry) {
        (&mut self.comm, &mut self.registry)
    }

    /// Stop the registry services and return the transport.
    ///
    /// Ranks should pass a barrier first: the host's name server stops
    /// here.
    pub fn shutdown(mut self) -> T {
        self.registry.shutdown();
        self.comm.into_inner()
    }
}
