use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::projection::RegistrationPrefixClassifier;
use crate::store::UpdateOrdering;
use crate::transport::TransportSettings;

/// Default number of points kept per trajectory.
pub const DEFAULT_TRAJECTORY_CAPACITY: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Settings for the synchronization engine and its transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fixed delay between a lost connection and the next attempt.
    pub reconnect_delay_secs: u64,
    /// Seconds a connection attempt may take before it counts as failed.
    pub connect_timeout_secs: u64,
    /// Maximum number of points retained per drone trajectory.
    pub trajectory_capacity: NonZeroUsize,
    /// How entity updates are ordered against each other.
    pub ordering: UpdateOrdering,
    /// Registration prefixes classified as allowed.
    pub allowed_prefixes: Vec<String>,
    /// Capacity of the transport event channel.
    pub event_buffer: usize,
}

impl SyncConfig {
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            event_buffer: self.event_buffer.max(1),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn classifier(&self) -> RegistrationPrefixClassifier {
        RegistrationPrefixClassifier::new(self.allowed_prefixes.iter().cloned())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 3,
            connect_timeout_secs: 10,
            trajectory_capacity: DEFAULT_TRAJECTORY_CAPACITY,
            ordering: UpdateOrdering::Arrival,
            allowed_prefixes: vec!["B".to_string()],
            event_buffer: 100,
        }
    }
}
