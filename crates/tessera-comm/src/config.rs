//! Collective layer configuration.

use tessera_core::ConfigError;

/// What a [`CollectiveTransport`](crate::CollectiveTransport) does when a
/// collective fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log at `error` level and abort the process.
    ///
    /// A half-completed collective leaves every other participant blocked,
    /// so there is no local recovery.
    #[default]
    Abort,
    /// Return the error to the caller. For tests and embedders that tear
    /// down the whole world on failure themselves.
    Propagate,
}

/// Configuration for a [`CollectiveTransport`](crate::CollectiveTransport).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommConfig {
    /// Failure handling for every collective.
    pub failure_policy: FailurePolicy,
    /// Initial capacity of the send and receive buffers, in bytes.
    ///
    /// Buffers grow on demand and are reused across calls.
    pub buffer_capacity: usize,
}

impl Default for CommConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            buffer_capacity: 64 * 1024,
        }
    }
}

impl CommConfig {
    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "buffer_capacity",
                reason: "must be at least 1 byte".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_aborts() {
        let cfg = CommConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn zero_buffer_rejected() {
        let cfg = CommConfig {
            buffer_capacity: 0,
            ..CommConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSetting {
                name: "buffer_capacity",
                ..
            })
        ));
    }
}
