//! The run-wide name service.
//!
//! One [`NameServer`] runs on the host rank. It owns the global
//! name → [`Location`] table and serves requests arriving on its channel,
//! one at a time, replying on a per-request `bounded(1)` channel. It runs
//! until it receives [`NameRequest::Shutdown`].

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::RegistryError;
use crate::fabric::{Address, Fabric, Location};

/// A request to the name server.
#[derive(Debug)]
pub enum NameRequest {
    /// Claim `name` for `location`; replies `false` if taken.
    Register {
        /// Name to claim.
        name: String,
        /// Where the object lives.
        location: Location,
        /// Reply channel.
        reply: Sender<bool>,
    },
    /// Release `name` if it is bound to `location`; replies whether it was.
    Unregister {
        /// Name to release.
        name: String,
        /// Location the caller believes it holds.
        location: Location,
        /// Reply channel.
        reply: Sender<bool>,
    },
    /// Resolve `name`.
    Lookup {
        /// Name to resolve.
        name: String,
        /// Reply channel.
        reply: Sender<Option<Location>>,
    },
    /// Stop serving.
    Shutdown,
}

fn serve(rx: Receiver<NameRequest>) {
    let mut names: IndexMap<String, Location> = IndexMap::new();
    while let Ok(request) = rx.recv() {
        match request {
            NameRequest::Register {
                name,
                location,
                reply,
            } => {
                let claimed = !names.contains_key(&name);
                if claimed {
                    names.insert(name, location);
                }
                let _ = reply.send(claimed);
            }
            NameRequest::Unregister {
                name,
                location,
                reply,
            } => {
                let owned = names.get(&name) == Some(&location);
                if owned {
                    names.shift_remove(&name);
                }
                let _ = reply.send(owned);
            }
            NameRequest::Lookup { name, reply } => {
                let _ = reply.send(names.get(&name).copied());
            }
            NameRequest::Shutdown => break,
        }
    }
    debug!(names = names.len(), "name server stopped");
}

/// Handle to the host's name server thread.
#[derive(Debug)]
pub struct NameServer {
    address: Address,
    tx: Sender<NameRequest>,
    thread: Option<JoinHandle<()>>,
    fabric: Fabric,
}

impl NameServer {
    /// Start the service thread and bind it in `fabric`.
    pub fn spawn(fabric: &Fabric) -> Result<Self, RegistryError> {
        let (tx, rx) = unbounded();
        let thread = thread::Builder::new()
            .name("tessera-name-server".into())
            .spawn(move || serve(rx))
            .map_err(|e| RegistryError::Spawn {
                service: "name server",
                reason: e.to_string(),
            })?;
        let address = fabric.bind_name_server(tx.clone())?;
        debug!(%address, "name server started");
        Ok(Self {
            address,
            tx,
            thread: Some(thread),
            fabric: fabric.clone(),
        })
    }

    /// The address other ranks resolve to reach this server.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Unbind, stop the thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.fabric.unbind(self.address);
        let _ = self.tx.send(NameRequest::Shutdown);
        let _ = thread.join();
    }
}

impl Drop for NameServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Client side of the name service, used by every rank.
#[derive(Clone, Debug)]
pub(crate) struct NameClient {
    tx: Sender<NameRequest>,
    timeout: Duration,
}

impl NameClient {
    pub(crate) fn new(tx: Sender<NameRequest>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    fn request<R>(&self, make: impl FnOnce(Sender<R>) -> NameRequest) -> Result<R, RegistryError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(make(reply_tx))
            .map_err(|_| RegistryError::ServiceUnavailable {
                service: "name server",
                reason: "request channel closed".into(),
            })?;
        reply_rx
            .recv_timeout(self.timeout)
            .map_err(|e| RegistryError::ServiceUnavailable {
                service: "name server",
                reason: e.to_string(),
            })
    }

    pub(crate) fn register(&self, name: &str, location: Location) -> Result<bool, RegistryError> {
        self.request(|reply| NameRequest::Register {
            name: name.to_owned(),
            location,
            reply,
        })
    }

    pub(crate) fn unregister(&self, name: &str, location: Location) -> Result<bool, RegistryError> {
        self.request(|reply| NameRequest::Unregister {
            name: name.to_owned(),
            location,
            reply,
        })
    }

    pub(crate) fn lookup(&self, name: &str) -> Result<Option<Location>, RegistryError> {
        self.request(|reply| NameRequest::Lookup {
            name: name.to_owned(),
            reply,
        })
    }
}
