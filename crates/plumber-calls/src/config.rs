//! Endpoint configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FaultPolicy
// ---------------------------------------------------------------------------

/// What happens when a listener panics during fan-out.
///
/// Listeners are integrator code running inside the transport's receive
/// path. Either way the panic is logged with the operation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaultPolicy {
    /// Catch the panic and keep running the remaining listeners.
    #[default]
    Continue,

    /// Resume the panic once it's logged. Later listeners don't run.
    Propagate,
}

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Listener panic handling.
    pub fault_policy: FaultPolicy,

    /// How many idle envelope buffers the pool keeps around.
    pub pool_max_idle: usize,

    /// Initial capacity of a freshly allocated envelope buffer, in bytes.
    pub pool_buffer_capacity: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::Continue,
            pool_max_idle: 16,
            pool_buffer_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_config_default() {
        let config = EndpointConfig::default();
        assert_eq!(config.fault_policy, FaultPolicy::Continue);
        assert_eq!(config.pool_max_idle, 16);
        assert_eq!(config.pool_buffer_capacity, 256);
    }

    #[test]
    fn test_endpoint_config_partial_json_keeps_defaults() {
        let config: EndpointConfig =
            serde_json::from_str(r#"{ "fault_policy": "Propagate" }"#).unwrap();
        assert_eq!(config.fault_policy, FaultPolicy::Propagate);
        assert_eq!(config.pool_max_idle, 16);
    }
}
