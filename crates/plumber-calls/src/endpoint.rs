//! The per-peer bundle every handle is bound to.

use std::fmt;
use std::sync::Arc;

use plumber_protocol::{BufferPool, Codec, JsonCodec};
use plumber_registry::Registry;
use plumber_transport::{RoleOracle, Transport};

use crate::EndpointConfig;

/// Everything a handle needs to send and receive on one peer: the registry
/// inbound calls are dispatched through, the transport outbound calls leave
/// through, the codec for argument values, and a pool of envelope buffers.
///
/// Endpoints are shared behind `Arc`; every handle created on a peer keeps
/// a reference to the same one.
pub struct Endpoint<C: Codec = JsonCodec> {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    codec: C,
    pool: BufferPool,
    config: EndpointConfig,
}

impl<C: Codec> Endpoint<C> {
    pub fn new(
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        codec: C,
        config: EndpointConfig,
    ) -> Self {
        let pool = BufferPool::new(config.pool_max_idle, config.pool_buffer_capacity);
        Self {
            registry,
            transport,
            codec,
            pool,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The role oracle of the endpoint's registry.
    pub fn roles(&self) -> &Arc<dyn RoleOracle> {
        self.registry.roles()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }
}

impl Endpoint<JsonCodec> {
    /// An endpoint with the JSON codec and default configuration.
    pub fn json(registry: Arc<Registry>, transport: Arc<dyn Transport>) -> Self {
        Self::new(registry, transport, JsonCodec, EndpointConfig::default())
    }
}

impl<C: Codec> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
