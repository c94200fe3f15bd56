//! The per-process view of the distributed name registry.

use std::sync::Arc;

use indexmap::IndexMap;
use tessera_comm::{CollectiveTransport, Transport};
use tessera_core::Rank;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::daemon::ObjectDaemon;
use crate::error::RegistryError;
use crate::fabric::{Fabric, Location};
use crate::handle::{Handle, HandleKind};
use crate::name_server::{NameClient, NameServer};
use crate::object::{ObjectId, ObjectKey, RemoteObject};

struct Export {
    id: ObjectId,
    object: Arc<dyn RemoteObject>,
}

/// Bidirectional name ↔ object map that is global across a run.
///
/// Each process registers the objects it owns; any process can look a
/// name up and call the object through the returned [`Handle`]. Names
/// are claimed at the host's [`NameServer`], so a name is unique across
/// the run. Locally, an object is exported under at most one name.
///
/// Built with [`connect`](Self::connect), which every rank must call
/// before any other operation.
pub struct DistributedRegistry {
    config: RegistryConfig,
    rank: Rank,
    fabric: Fabric,
    name_server: Option<NameServer>,
    names: NameClient,
    daemon: ObjectDaemon,
    exported: IndexMap<String, Export>,
    by_object: IndexMap<ObjectKey, String>,
    next_object: u64,
    migrated: Vec<String>,
}

impl std::fmt::Debug for DistributedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedRegistry")
            .field("rank", &self.rank)
            .field("host", &self.name_server.is_some())
            .field("daemon", &self.daemon.address())
            .field("exported", &self.exported.keys().collect::<Vec<_>>())
            .field("migrated", &self.migrated)
            .finish()
    }
}

impl DistributedRegistry {
    /// Join the registry. Collective over `comm`'s group.
    ///
    /// The host rank starts the name server and broadcasts its address;
    /// every rank resolves it through `fabric`, starts its object daemon,
    /// and waits at a barrier so that every daemon is bound before anyone
    /// registers.
    pub fn connect<T: Transport>(
        comm: &mut CollectiveTransport<T>,
        fabric: Fabric,
        config: RegistryConfig,
    ) -> Result<Self, RegistryError> {
        config.validate(comm.size())?;
        let rank = comm.world_rank();
        let is_host = comm.rank() == config.host_rank;

        let name_server = if is_host {
            Some(NameServer::spawn(&fabric)?)
        } else {
            None
        };
        let advertised = name_server.as_ref().map(NameServer::address);
        let address = comm.broadcast(advertised.as_ref(), config.host_rank)?;
        let names = NameClient::new(fabric.resolve_name_server(address)?, config.request_timeout);

        let daemon = ObjectDaemon::spawn(&fabric, rank)?;
        comm.barrier()?;
        debug!(%rank, name_server = %address, daemon = %daemon.address(), "registry connected");

        Ok(Self {
            config,
            rank,
            fabric,
            name_server,
            names,
            daemon,
            exported: IndexMap::new(),
            by_object: IndexMap::new(),
            next_object: 0,
            migrated: Vec::new(),
        })
    }

    /// World rank of this process.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// `true` if this process hosts the name server.
    pub fn is_host(&self) -> bool {
        self.name_server.is_some()
    }

    /// The active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn location(&self, id: ObjectId) -> Location {
        Location {
            daemon: self.daemon.address(),
            object: id,
        }
    }

    /// Export `object` under `name`.
    ///
    /// Returns `false` without side effects if the name is taken here or
    /// at the name server, or if `object` is already exported under
    /// another name.
    pub fn register(
        &mut self,
        name: &str,
        object: Arc<dyn RemoteObject>,
    ) -> Result<bool, RegistryError> {
        if self.exported.contains_key(name) {
            warn!(name = %name, rank = %self.rank, "name already registered here");
            return Ok(false);
        }
        let key = ObjectKey::of(&object);
        if let Some(existing) = self.by_object.get(&key) {
            warn!(name = %name, existing = %existing, rank = %self.rank, "object already exported");
            return Ok(false);
        }

        let id = ObjectId(self.next_object);
        self.next_object += 1;
        // The object must be callable before its name becomes visible.
        self.daemon.export(id, Arc::clone(&object))?;
        match self.names.register(name, self.location(id)) {
            Ok(true) => {}
            Ok(false) => {
                self.daemon.withdraw(id)?;
                warn!(name = %name, rank = %self.rank, "name taken at name server");
                return Ok(false);
            }
            Err(e) => {
                // Report the claim's error, not the withdrawal's.
                let _ = self.daemon.withdraw(id);
                return Err(e);
            }
        }

        self.exported.insert(name.to_owned(), Export { id, object });
        self.by_object.insert(key, name.to_owned());
        debug!(name = %name, rank = %self.rank, object = id.0, "registered");
        Ok(true)
    }

    /// Remove the binding for `name`. Returns `false` if this process
    /// does not hold it.
    pub fn unregister(&mut self, name: &str) -> Result<bool, RegistryError> {
        let Some(export) = self.exported.get(name) else {
            warn!(name = %name, rank = %self.rank, "unregister of unknown name");
            return Ok(false);
        };
        let id = export.id;
        self.names.unregister(name, self.location(id))?;
        self.daemon.withdraw(id)?;
        if let Some(export) = self.exported.shift_remove(name) {
            self.by_object.shift_remove(&ObjectKey::of(&export.object));
        }
        debug!(name = %name, rank = %self.rank, "unregistered");
        Ok(true)
    }

    /// Resolve `name` to a callable handle.
    ///
    /// Names this process exported resolve to a [`HandleKind::Local`]
    /// handle without asking the name server.
    pub fn lookup(&self, name: &str) -> Result<Handle, RegistryError> {
        if let Some(export) = self.exported.get(name) {
            return Ok(Handle::new(name, HandleKind::Local(Arc::clone(&export.object))));
        }
        let location = self
            .names
            .lookup(name)?
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })?;
        let daemon = self.fabric.resolve_daemon(location.daemon)?;
        Ok(Handle::new(
            name,
            HandleKind::Remote {
                location,
                daemon,
                timeout: self.config.request_timeout,
            },
        ))
    }

    /// `true` if `object` is exported by this process.
    pub fn is_exported(&self, object: &Arc<dyn RemoteObject>) -> bool {
        self.by_object.contains_key(&ObjectKey::of(object))
    }

    /// The name `object` is exported under, if any.
    pub fn exported_name_of(&self, object: &Arc<dyn RemoteObject>) -> Option<&str> {
        self.by_object
            .get(&ObjectKey::of(object))
            .map(String::as_str)
    }

    /// Names exported by this process, in registration order.
    pub fn exported_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.exported.keys().map(String::as_str)
    }

    // ── Migration bookkeeping ───────────────────────────────────

    /// Record that `object` moved this step. Only exported objects are
    /// recorded; returns whether it was.
    pub fn add_migrated_name(&mut self, object: &Arc<dyn RemoteObject>) -> bool {
        let Some(name) = self.by_object.get(&ObjectKey::of(object)) else {
            return false;
        };
        debug!(name = %name, rank = %self.rank, "migrated");
        self.migrated.push(name.clone());
        true
    }

    /// Names recorded since the last clear, in recording order.
    pub fn migrated_names(&self) -> &[String] {
        &self.migrated
    }

    /// Forget the migration list. Called once per step.
    pub fn clear_migrated_names(&mut self) {
        self.migrated.clear();
    }

    /// Stop this process's daemon and, on the host, the name server.
    ///
    /// Local only. Once the host shuts down, every other rank's name
    /// requests fail with [`RegistryError::ServiceUnavailable`].
    pub fn shutdown(&mut self) {
        self.daemon.shutdown();
        if let Some(server) = self.name_server.as_mut() {
            server.shutdown();
        }
        debug!(rank = %self.rank, "registry shut down");
    }
}
