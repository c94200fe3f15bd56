//! Reusable remote-object fixtures.
//!
//! - [`MockObject`]: answers a few fixed methods and records every call.
//! - [`FailingObject`]: fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tessera_core::to_bytes;
use tessera_registry::{InvokeError, RemoteObject};

/// Records calls and answers:
///
/// - `"label"`: the object's label, [`Wire`](tessera_core::Wire)-encoded.
/// - `"echo"`: the argument bytes unchanged.
/// - `"calls"`: the number of calls so far (this one included) as `u64`.
///
/// Any other method fails with [`InvokeError::UnknownMethod`].
pub struct MockObject {
    pub label: String,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockObject {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every `(method, args)` pair received, in arrival order.
    pub fn calls(&self) -> Vec<(String, Vec<u8>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl RemoteObject for MockObject {
    fn invoke(&self, method: &str, args: &[u8]) -> Result<Vec<u8>, InvokeError> {
        let count = {
            let mut calls = self.calls.lock().map_err(|_| InvokeError::Failed {
                reason: "call log poisoned".into(),
            })?;
            calls.push((method.to_owned(), args.to_vec()));
            calls.len() as u64
        };
        match method {
            "label" => Ok(to_bytes(&self.label)),
            "echo" => Ok(args.to_vec()),
            "calls" => Ok(to_bytes(&count)),
            _ => Err(InvokeError::UnknownMethod {
                method: method.to_owned(),
            }),
        }
    }
}

/// Succeeds `succeed_count` times, echoing its arguments, then fails
/// every call.
pub struct FailingObject {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingObject {
    pub fn new(succeed_count: usize) -> Arc<Self> {
        Arc::new(Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        })
    }

    /// How many times `invoke()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl RemoteObject for FailingObject {
    fn invoke(&self, _method: &str, args: &[u8]) -> Result<Vec<u8>, InvokeError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(InvokeError::Failed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        Ok(args.to_vec())
    }
}
