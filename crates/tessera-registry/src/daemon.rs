//! Per-process object daemon.
//!
//! Each rank runs one [`ObjectDaemon`] thread holding the objects it has
//! exported. Remote handles send [`DaemonRequest::Invoke`] to it and wait
//! on a `bounded(1)` reply. Export and withdrawal travel on the same
//! channel, so a call that causally follows an export always finds the
//! object.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use tessera_core::Rank;
use tracing::debug;

use crate::error::{InvokeError, RegistryError};
use crate::fabric::{Address, Fabric};
use crate::object::{ObjectId, RemoteObject};

/// A request to an object daemon.
pub enum DaemonRequest {
    /// Make `object` callable as `id`.
    Export {
        /// Daemon-local id.
        id: ObjectId,
        /// The object.
        object: Arc<dyn RemoteObject>,
    },
    /// Stop serving `id`.
    Withdraw {
        /// The id to drop.
        id: ObjectId,
    },
    /// Call `method` on object `id`.
    Invoke {
        /// Target object.
        id: ObjectId,
        /// Method name.
        method: String,
        /// Encoded arguments.
        args: Vec<u8>,
        /// Reply channel.
        reply: Sender<Result<Vec<u8>, InvokeError>>,
    },
    /// Stop serving.
    Shutdown,
}

impl std::fmt::Debug for DaemonRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Export { id, .. } => f.debug_struct("Export").field("id", id).finish(),
            Self::Withdraw { id } => f.debug_struct("Withdraw").field("id", id).finish(),
            Self::Invoke { id, method, .. } => f
                .debug_struct("Invoke")
                .field("id", id)
                .field("method", method)
                .finish(),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

fn serve(rx: Receiver<DaemonRequest>) {
    let mut objects: IndexMap<ObjectId, Arc<dyn RemoteObject>> = IndexMap::new();
    while let Ok(request) = rx.recv() {
        match request {
            DaemonRequest::Export { id, object } => {
                objects.insert(id, object);
            }
            DaemonRequest::Withdraw { id } => {
                objects.shift_remove(&id);
            }
            DaemonRequest::Invoke {
                id,
                method,
                args,
                reply,
            } => {
                let result = match objects.get(&id) {
                    Some(object) => object.invoke(&method, &args),
                    None => Err(InvokeError::Withdrawn),
                };
                let _ = reply.send(result);
            }
            DaemonRequest::Shutdown => break,
        }
    }
}

/// Handle to this process's object daemon thread.
#[derive(Debug)]
pub struct ObjectDaemon {
    address: Address,
    tx: Sender<DaemonRequest>,
    thread: Option<JoinHandle<()>>,
    fabric: Fabric,
}

impl ObjectDaemon {
    /// Start the daemon for world rank `rank` and bind it in `fabric`.
    pub fn spawn(fabric: &Fabric, rank: Rank) -> Result<Self, RegistryError> {
        let (tx, rx) = unbounded();
        let thread = thread::Builder::new()
            .name(format!("tessera-daemon-{rank}"))
            .spawn(move || serve(rx))
            .map_err(|e| RegistryError::Spawn {
                service: "object daemon",
                reason: e.to_string(),
            })?;
        let address = fabric.bind_daemon(tx.clone())?;
        debug!(%rank, %address, "object daemon started");
        Ok(Self {
            address,
            tx,
            thread: Some(thread),
            fabric: fabric.clone(),
        })
    }

    /// The address remote handles use to reach this daemon.
    pub fn address(&self) -> Address {
        self.address
    }

    fn send(&self, request: DaemonRequest) -> Result<(), RegistryError> {
        self.tx
            .send(request)
            .map_err(|_| RegistryError::ServiceUnavailable {
                service: "object daemon",
                reason: "daemon stopped".into(),
            })
    }

    pub(crate) fn export(&self, id: ObjectId, object: Arc<dyn RemoteObject>) -> Result<(), RegistryError> {
        self.send(DaemonRequest::Export { id, object })
    }

    pub(crate) fn withdraw(&self, id: ObjectId) -> Result<(), RegistryError> {
        self.send(DaemonRequest::Withdraw { id })
    }

    /// Unbind, stop the thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.fabric.unbind(self.address);
        let _ = self.tx.send(DaemonRequest::Shutdown);
        let _ = thread.join();
    }
}

impl Drop for ObjectDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
