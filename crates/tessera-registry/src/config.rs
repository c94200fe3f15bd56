//! Registry configuration.

use std::time::Duration;

use tessera_core::{ConfigError, Rank};

/// Configuration for [`DistributedRegistry`](crate::DistributedRegistry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// World rank that hosts the name server.
    pub host_rank: Rank,
    /// Longest wait for a reply from the name server or an object daemon.
    pub request_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host_rank: Rank(0),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Check the configuration against a world of `world_size` ranks.
    pub fn validate(&self, world_size: usize) -> Result<(), ConfigError> {
        if self.host_rank.index() >= world_size {
            return Err(ConfigError::RankOutOfRange {
                rank: self.host_rank.0,
                size: world_size,
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting {
                name: "request_timeout",
                reason: "must be non-zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_valid_for_any_world() {
        assert!(RegistryConfig::default().validate(1).is_ok());
    }

    #[test]
    fn host_outside_world_rejected() {
        let cfg = RegistryConfig {
            host_rank: Rank(4),
            ..RegistryConfig::default()
        };
        assert_eq!(
            cfg.validate(4),
            Err(ConfigError::RankOutOfRange { rank: 4, size: 4 })
        );
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = RegistryConfig {
            request_timeout: Duration::ZERO,
            ..RegistryConfig::default()
        };
        assert!(cfg.validate(1).is_err());
    }
}
