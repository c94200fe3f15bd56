//! Invocable references to registered objects.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};
use tessera_core::{from_bytes, to_bytes, Wire};

use crate::daemon::DaemonRequest;
use crate::error::RegistryError;
use crate::fabric::Location;
use crate::object::RemoteObject;

/// How a [`Handle`] reaches its object, decided when the handle is made.
#[derive(Clone)]
pub enum HandleKind {
    /// The object lives in this process; calls are direct.
    Local(Arc<dyn RemoteObject>),
    /// The object lives in another process; calls go through its daemon.
    Remote {
        /// Where the object lives.
        location: Location,
        /// Request channel of the owning daemon.
        daemon: Sender<DaemonRequest>,
        /// Longest wait for the daemon's reply.
        timeout: Duration,
    },
}

impl fmt::Debug for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("Local"),
            Self::Remote { location, .. } => f.debug_tuple("Remote").field(location).finish(),
        }
    }
}

/// A callable reference to a registered object, usable from any thread.
///
/// Handles do not keep a remote object exported: if its owner
/// unregisters it, later calls fail with
/// [`InvokeError::Withdrawn`](crate::InvokeError::Withdrawn).
#[derive(Clone, Debug)]
pub struct Handle {
    name: String,
    kind: HandleKind,
}

impl Handle {
    pub(crate) fn new(name: impl Into<String>, kind: HandleKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The name the handle was looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How calls reach the object.
    pub fn kind(&self) -> &HandleKind {
        &self.kind
    }

    /// `true` if the object lives in this process.
    pub fn is_local(&self) -> bool {
        matches!(self.kind, HandleKind::Local(_))
    }

    /// Call `method` with raw argument bytes.
    pub fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, RegistryError> {
        let result = match &self.kind {
            HandleKind::Local(object) => object.invoke(method, args),
            HandleKind::Remote {
                location,
                daemon,
                timeout,
            } => {
                let (reply, reply_rx) = bounded(1);
                daemon
                    .send(DaemonRequest::Invoke {
                        id: location.object,
                        method: method.to_owned(),
                        args: args.to_vec(),
                        reply,
                    })
                    .map_err(|_| RegistryError::ServiceUnavailable {
                        service: "object daemon",
                        reason: format!("daemon at {} stopped", location.daemon),
                    })?;
                reply_rx
                    .recv_timeout(*timeout)
                    .map_err(|e| RegistryError::ServiceUnavailable {
                        service: "object daemon",
                        reason: e.to_string(),
                    })?
            }
        };
        result.map_err(|source| RegistryError::Invocation {
            name: self.name.clone(),
            source,
        })
    }

    /// Call `method` with a typed argument and decode a typed result.
    pub fn call<A: Wire, R: Wire>(&self, method: &str, args: &A) -> Result<R, RegistryError> {
        let bytes = self.invoke(method, &to_bytes(args))?;
        Ok(from_bytes(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvokeError;

    struct Adder;

    impl RemoteObject for Adder {
        fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, InvokeError> {
            match method {
                "add" => {
                    let (a, b): (u32, u32) = from_bytes(args).map_err(|e| {
                        InvokeError::InvalidArguments {
                            reason: e.to_string(),
                        }
                    })?;
                    Ok(to_bytes(&(a + b)))
                }
                _ => Err(InvokeError::UnknownMethod {
                    method: method.into(),
                }),
            }
        }
    }

    #[test]
    fn local_handle_calls_directly() {
        let h = Handle::new("adder", HandleKind::Local(Arc::new(Adder)));
        assert!(h.is_local());
        let sum: u32 = h.call("add", &(2u32, 3u32)).unwrap();
        assert_eq!(sum, 5);
    }

    #[test]
    fn object_errors_carry_the_name() {
        let h = Handle::new("adder", HandleKind::Local(Arc::new(Adder)));
        assert_eq!(
            h.invoke("sub", &[]),
            Err(RegistryError::Invocation {
                name: "adder".into(),
                source: InvokeError::UnknownMethod {
                    method: "sub".into()
                },
            })
        );
        assert!(matches!(
            h.invoke("add", &[1]),
            Err(RegistryError::Invocation {
                source: InvokeError::InvalidArguments { .. },
                ..
            })
        ));
    }

    #[test]
    fn dead_daemon_is_unavailable() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let h = Handle::new(
            "gone",
            HandleKind::Remote {
                location: Location {
                    daemon: crate::fabric::Address(9),
                    object: crate::object::ObjectId(0),
                },
                daemon: tx,
                timeout: Duration::from_millis(50),
            },
        );
        assert!(!h.is_local());
        assert!(matches!(
            h.invoke("x", &[]),
            Err(RegistryError::ServiceUnavailable { .. })
        ));
    }
}
