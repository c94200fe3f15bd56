//! Objects reachable through the registry.

use std::sync::Arc;

use crate::error::InvokeError;

/// An object that can be invoked by name from any process.
///
/// Arguments and results are opaque bytes; callers usually encode them
/// with [`Wire`](tessera_core::Wire) and go through
/// [`Handle::call`](crate::Handle::call). Calls from remote processes run
/// on the owning process's object daemon thread, so implementations must
/// be `Send + Sync`.
pub trait RemoteObject: Send + Sync {
    /// Run `method` with `args` and return the encoded result.
    fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, InvokeError>;
}

/// Daemon-local identifier of an exported object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Identity of an object instance, independent of its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ObjectKey(usize);

impl ObjectKey {
    pub(crate) fn of(object: &Arc<dyn RemoteObject>) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl RemoteObject for Nop {
        fn invoke(&self, _: &str, _: &[u8]) -> Result<Vec<u8>, InvokeError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn key_follows_instance_not_value() {
        let a: Arc<dyn RemoteObject> = Arc::new(Nop);
        let b: Arc<dyn RemoteObject> = Arc::new(Nop);
        assert_eq!(ObjectKey::of(&a), ObjectKey::of(&Arc::clone(&a)));
        assert_ne!(ObjectKey::of(&a), ObjectKey::of(&b));
    }
}
