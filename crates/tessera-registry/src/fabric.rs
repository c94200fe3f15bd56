//! Address resolution for service endpoints.
//!
//! Every service thread binds its request channel in the [`Fabric`] and
//! gets an [`Address`] back. Addresses are plain integers, so they can be
//! broadcast over a collective like any other payload and resolved to a
//! channel on the receiving side. All ranks of one run share a fabric.

use std::fmt;
use std::sync::{Arc, RwLock};

use crossbeam_channel::Sender;
use indexmap::IndexMap;
use tessera_core::wire::{read_u64_le, write_u64_le};
use tessera_core::{Wire, WireError};

use crate::daemon::DaemonRequest;
use crate::error::RegistryError;
use crate::name_server::NameRequest;
use crate::object::ObjectId;

/// Where a service endpoint can be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fabric:{}", self.0)
    }
}

impl Wire for Address {
    fn encode(&self, buf: &mut Vec<u8>) {
        write_u64_le(buf, self.0);
    }

    fn decode(r: &mut &[u8]) -> Result<Self, WireError> {
        Ok(Self(read_u64_le(r)?))
    }
}

/// Where an exported object lives: its daemon and its id there.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// Address of the owning process's object daemon.
    pub daemon: Address,
    /// The object's id within that daemon.
    pub object: ObjectId,
}

#[derive(Clone, Debug)]
enum Endpoint {
    NameServer(Sender<NameRequest>),
    Daemon(Sender<DaemonRequest>),
}

#[derive(Debug, Default)]
struct FabricTable {
    next: u64,
    endpoints: IndexMap<Address, Endpoint>,
}

/// Shared table of bound service endpoints.
///
/// Cloning is cheap; clones see the same table.
#[derive(Clone, Debug, Default)]
pub struct Fabric {
    table: Arc<RwLock<FabricTable>>,
}

fn poisoned() -> RegistryError {
    RegistryError::ServiceUnavailable {
        service: "fabric",
        reason: "endpoint table poisoned".into(),
    }
}

impl Fabric {
    /// Create an empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&self, endpoint: Endpoint) -> Result<Address, RegistryError> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        let address = Address(table.next);
        table.next += 1;
        table.endpoints.insert(address, endpoint);
        Ok(address)
    }

    pub(crate) fn bind_name_server(&self, tx: Sender<NameRequest>) -> Result<Address, RegistryError> {
        self.bind(Endpoint::NameServer(tx))
    }

    pub(crate) fn bind_daemon(&self, tx: Sender<DaemonRequest>) -> Result<Address, RegistryError> {
        self.bind(Endpoint::Daemon(tx))
    }

    fn resolve(&self, address: Address) -> Result<Endpoint, RegistryError> {
        let table = self.table.read().map_err(|_| poisoned())?;
        table
            .endpoints
            .get(&address)
            .cloned()
            .ok_or(RegistryError::Unresolved { address })
    }

    pub(crate) fn resolve_name_server(
        &self,
        address: Address,
    ) -> Result<Sender<NameRequest>, RegistryError> {
        match self.resolve(address)? {
            Endpoint::NameServer(tx) => Ok(tx),
            Endpoint::Daemon(_) => Err(RegistryError::Unresolved { address }),
        }
    }

    pub(crate) fn resolve_daemon(
        &self,
        address: Address,
    ) -> Result<Sender<DaemonRequest>, RegistryError> {
        match self.resolve(address)? {
            Endpoint::Daemon(tx) => Ok(tx),
            Endpoint::NameServer(_) => Err(RegistryError::Unresolved { address }),
        }
    }

    /// Remove the endpoint at `address`. Returns `true` if one was bound.
    pub fn unbind(&self, address: Address) -> bool {
        match self.table.write() {
            Ok(mut table) => table.endpoints.shift_remove(&address).is_some(),
            Err(_) => false,
        }
    }

    /// `true` if an endpoint is bound at `address`.
    pub fn is_bound(&self, address: Address) -> bool {
        self.table
            .read()
            .map(|t| t.endpoints.contains_key(&address))
            .unwrap_or(false)
    }

    /// Number of bound endpoints.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.endpoints.len()).unwrap_or(0)
    }

    /// Whether no endpoints are bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use tessera_core::{from_bytes, to_bytes};

    #[test]
    fn addresses_are_unique_and_kind_checked() {
        let fabric = Fabric::new();
        let (ns_tx, _ns_rx) = unbounded();
        let (d_tx, _d_rx) = unbounded();
        let ns = fabric.bind_name_server(ns_tx).unwrap();
        let d = fabric.bind_daemon(d_tx).unwrap();
        assert_ne!(ns, d);
        assert!(fabric.resolve_name_server(ns).is_ok());
        assert!(fabric.resolve_daemon(d).is_ok());
        assert_eq!(
            fabric.resolve_daemon(ns).err(),
            Some(RegistryError::Unresolved { address: ns })
        );
    }

    #[test]
    fn clones_share_the_table() {
        let fabric = Fabric::new();
        let other = fabric.clone();
        let (tx, _rx) = unbounded();
        let addr = fabric.bind_daemon(tx).unwrap();
        assert!(other.is_bound(addr));
        assert!(other.unbind(addr));
        assert!(fabric.is_empty());
        assert!(!fabric.unbind(addr));
    }

    #[test]
    fn address_travels_as_wire_payload() {
        let back: Address = from_bytes(&to_bytes(&Address(42))).unwrap();
        assert_eq!(back, Address(42));
        assert_eq!(back.to_string(), "fabric:42");
    }
}
