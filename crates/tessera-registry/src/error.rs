//! Error types for the registry and remote invocation.

use tessera_comm::TransportError;
use tessera_core::{ConfigError, WireError};
use thiserror::Error;

use crate::fabric::Address;

/// Errors a [`RemoteObject`](crate::RemoteObject) reports from a call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The object has no method by this name.
    #[error("unknown method '{method}'")]
    UnknownMethod {
        /// The requested method.
        method: String,
    },
    /// The argument bytes could not be interpreted.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// What was wrong with them.
        reason: String,
    },
    /// The method ran and failed.
    #[error("invocation failed: {reason}")]
    Failed {
        /// Object-supplied description.
        reason: String,
    },
    /// The object was unregistered after the handle was looked up.
    #[error("object is no longer exported")]
    Withdrawn,
}

/// Errors raised by [`DistributedRegistry`](crate::DistributedRegistry)
/// and [`Handle`](crate::Handle) operations.
///
/// A name conflict on registration is not an error: `register` returns
/// `false`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No object is registered under the name.
    #[error("no object registered as '{name}'")]
    NotFound {
        /// The name looked up.
        name: String,
    },
    /// A service thread did not answer: it exited, or the request timed
    /// out.
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable {
        /// Which service (name server, object daemon).
        service: &'static str,
        /// Why the request failed.
        reason: String,
    },
    /// No endpoint of the expected kind is bound at the address.
    #[error("nothing bound at {address}")]
    Unresolved {
        /// The address that failed to resolve.
        address: Address,
    },
    /// A service thread could not be started.
    #[error("failed to spawn {service}: {reason}")]
    Spawn {
        /// Which service.
        service: &'static str,
        /// OS error text.
        reason: String,
    },
    /// The remote object rejected or failed the call.
    #[error("call on '{name}' failed: {source}")]
    Invocation {
        /// Registered name of the target.
        name: String,
        /// The object's error.
        #[source]
        source: InvokeError,
    },
    /// A typed argument or result could not be decoded.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// The startup handshake failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A configuration value was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
