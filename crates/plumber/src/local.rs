//! An in-process network of one server and any number of clients.
//!
//! Every peer gets its own [`Registry`], [`Endpoint`] and role oracle, just
//! as separate processes would. Their transports all feed one queue, and
//! [`LocalNetwork::pump`] delivers the queued packets according to their
//! [`Route`]:
//!
//! ```text
//! ToAuthority            → server
//! Broadcast { owner? }   → every participant, minus the entity's owner
//!                          unless include_owner is set
//! ToPeer(p)              → p
//! ```
//!
//! Entities and their owners live in a world shared by every peer's
//! oracle, so "is entity 3 spawned?" has the same answer everywhere.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use plumber_calls::{Endpoint, EndpointConfig};
use plumber_protocol::{Codec, EntityId, JsonCodec, PeerId, Route};
use plumber_registry::{Registry, RegistryConfig, SenderContext};
use plumber_transport::{ChannelTransport, Packet, RoleOracle};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// The server's peer id.
pub const SERVER: PeerId = PeerId(0);

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`LocalNetwork`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Registry settings, shared by every peer.
    pub registry: RegistryConfig,

    /// Endpoint settings, shared by every peer.
    pub endpoint: EndpointConfig,

    /// Whether the server also plays as a participant (a listen server /
    /// host). A dedicated server only runs the authoritative side.
    pub host_mode: bool,

    /// Upper bound on packets delivered by one `pump` call. Listeners that
    /// answer every call with another call would otherwise never drain.
    pub max_packets_per_pump: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            endpoint: EndpointConfig::default(),
            host_mode: false,
            max_packets_per_pump: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// World + roles
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct WorldState {
    /// Spawned entities and their owning peer.
    owners: HashMap<EntityId, Option<PeerId>>,
    next_entity: u64,
}

/// Entity bookkeeping shared by every peer of the network.
#[derive(Debug, Default)]
struct World {
    state: Mutex<WorldState>,
}

impl World {
    fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The role oracle of one peer of a [`LocalNetwork`].
#[derive(Debug)]
struct LocalRoles {
    authoritative: bool,
    participant: bool,
    world: Arc<World>,
}

impl RoleOracle for LocalRoles {
    fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    fn is_participant(&self) -> bool {
        self.participant
    }

    fn is_spawned(&self, entity: EntityId) -> bool {
        self.world.lock().owners.contains_key(&entity)
    }

    fn has_authority_over(&self, sender: PeerId, entity: EntityId) -> bool {
        self.world.lock().owners.get(&entity).copied().flatten() == Some(sender)
    }
}

// ---------------------------------------------------------------------------
// LocalNetwork
// ---------------------------------------------------------------------------

struct LocalPeer<C: Codec> {
    endpoint: Arc<Endpoint<C>>,
    participant: bool,
}

/// Outcome of one [`LocalNetwork::pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Deliveries the receiving registry accepted.
    pub delivered: usize,
    /// Deliveries the receiving registry rejected (already logged there).
    pub rejected: usize,
    /// Packets addressed to a peer that doesn't exist.
    pub undeliverable: usize,
    /// Listener invocations across all accepted deliveries.
    pub listeners: usize,
}

/// An in-process network for tests and demos.
pub struct LocalNetwork<C: Codec = JsonCodec> {
    config: NetworkConfig,
    codec: C,
    world: Arc<World>,
    peers: BTreeMap<PeerId, LocalPeer<C>>,
    tx: UnboundedSender<Packet>,
    rx: UnboundedReceiver<Packet>,
    next_peer: u64,
}

impl LocalNetwork<JsonCodec> {
    /// A network with the JSON codec and only the server peer.
    pub fn new(config: NetworkConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> LocalNetwork<C> {
    pub fn with_codec(config: NetworkConfig, codec: C) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut network = Self {
            config,
            codec,
            world: Arc::new(World::default()),
            peers: BTreeMap::new(),
            tx,
            rx,
            next_peer: 1,
        };
        let host_mode = network.config.host_mode;
        network.insert_peer(SERVER, true, host_mode);
        tracing::info!(host_mode, "local network started");
        network
    }

    /// Connects a new client and returns its peer id.
    pub fn add_client(&mut self) -> PeerId {
        let peer = PeerId(self.next_peer);
        self.next_peer += 1;
        self.insert_peer(peer, false, true);
        tracing::info!(%peer, "client connected");
        peer
    }

    fn insert_peer(&mut self, peer: PeerId, authoritative: bool, participant: bool) {
        let roles = Arc::new(LocalRoles {
            authoritative,
            participant,
            world: Arc::clone(&self.world),
        });
        let registry = Arc::new(Registry::new(self.config.registry.clone(), roles));
        let transport = ChannelTransport::with_sender(peer, self.tx.clone());
        let endpoint = Endpoint::new(
            registry,
            Arc::new(transport),
            self.codec.clone(),
            self.config.endpoint.clone(),
        );
        self.peers.insert(
            peer,
            LocalPeer {
                endpoint: Arc::new(endpoint),
                participant,
            },
        );
    }

    /// The server's endpoint.
    pub fn server(&self) -> &Arc<Endpoint<C>> {
        &self.peers[&SERVER].endpoint
    }

    /// The endpoint of `peer`, if it's connected.
    pub fn endpoint(&self, peer: PeerId) -> Option<&Arc<Endpoint<C>>> {
        self.peers.get(&peer).map(|p| &p.endpoint)
    }

    /// Every connected peer, server first.
    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.keys().copied()
    }

    /// Spawns an entity, optionally owned by `owner`, and returns its id.
    pub fn spawn(&self, owner: Option<PeerId>) -> EntityId {
        let mut world = self.world.lock();
        world.next_entity += 1;
        let entity = EntityId(world.next_entity);
        world.owners.insert(entity, owner);
        tracing::debug!(%entity, ?owner, "entity spawned");
        entity
    }

    /// Removes an entity. Returns `false` if it wasn't spawned.
    pub fn despawn(&self, entity: EntityId) -> bool {
        let removed = self.world.lock().owners.remove(&entity).is_some();
        if removed {
            tracing::debug!(%entity, "entity despawned");
        }
        removed
    }

    /// The owner of a spawned entity.
    pub fn owner(&self, entity: EntityId) -> Option<PeerId> {
        self.world.lock().owners.get(&entity).copied().flatten()
    }

    /// Delivers queued packets until the queue is empty, including packets
    /// that listeners send while being delivered to.
    pub fn pump(&mut self) -> PumpStats {
        let mut stats = PumpStats::default();
        let limit = self.config.max_packets_per_pump;

        for _ in 0..limit {
            let Ok(packet) = self.rx.try_recv() else {
                return stats;
            };
            self.route(&packet, &mut stats);
        }

        if !self.rx.is_empty() {
            tracing::warn!(limit, "pump limit reached, leaving remaining packets queued");
        }
        stats
    }

    fn route(&self, packet: &Packet, stats: &mut PumpStats) {
        match packet.route {
            Route::ToAuthority { .. } => self.deliver(SERVER, packet, stats),
            Route::ToPeer(peer) => self.deliver(peer, packet, stats),
            Route::Broadcast { include_owner } => {
                let owner = self.owner(packet.entity);
                let recipients: Vec<PeerId> = self
                    .peers
                    .iter()
                    .filter(|(_, p)| p.participant)
                    .map(|(id, _)| *id)
                    .filter(|id| include_owner || Some(*id) != owner)
                    .collect();
                for peer in recipients {
                    self.deliver(peer, packet, stats);
                }
            }
        }
    }

    fn deliver(&self, peer: PeerId, packet: &Packet, stats: &mut PumpStats) {
        let Some(target) = self.peers.get(&peer) else {
            tracing::warn!(
                %peer,
                operation = %packet.operation,
                "packet addressed to unknown peer dropped"
            );
            stats.undeliverable += 1;
            return;
        };

        let context = SenderContext {
            sender: Some(packet.from),
            entity: packet.entity,
        };
        match target
            .endpoint
            .registry()
            .on_envelope_received(packet.operation, &packet.payload, context)
        {
            Ok(listeners) => {
                stats.delivered += 1;
                stats.listeners += listeners;
            }
            Err(_) => stats.rejected += 1,
        }
    }
}

impl<C: Codec> std::fmt::Debug for LocalNetwork<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalNetwork")
            .field("peers", &self.peers.len())
            .field("entities", &self.world.lock().owners.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_only_server() {
        let network = LocalNetwork::new(NetworkConfig::default());
        assert_eq!(network.peers().collect::<Vec<_>>(), vec![SERVER]);
        assert!(network.server().roles().is_authoritative());
        assert!(!network.server().roles().is_participant());
    }

    #[test]
    fn test_network_config_partial_json_keeps_defaults() {
        let config: NetworkConfig = serde_json::from_str(r#"{ "host_mode": true }"#).unwrap();

        assert!(config.host_mode);
        assert_eq!(config.max_packets_per_pump, 10_000);
        assert_eq!(config.registry, RegistryConfig::default());
        assert_eq!(config.endpoint, EndpointConfig::default());
    }

    #[test]
    fn test_host_mode_server_is_participant() {
        let network = LocalNetwork::new(NetworkConfig {
            host_mode: true,
            ..NetworkConfig::default()
        });
        assert!(network.server().roles().is_participant());
    }

    #[test]
    fn test_add_client_assigns_sequential_ids() {
        let mut network = LocalNetwork::new(NetworkConfig::default());
        assert_eq!(network.add_client(), PeerId(1));
        assert_eq!(network.add_client(), PeerId(2));

        let client = network.endpoint(PeerId(2)).unwrap();
        assert!(client.roles().is_participant());
        assert!(!client.roles().is_authoritative());
    }

    #[test]
    fn test_spawn_is_visible_to_every_peer() {
        let mut network = LocalNetwork::new(NetworkConfig::default());
        let client = network.add_client();
        let entity = network.spawn(Some(client));

        for peer in network.peers() {
            let roles = network.endpoint(peer).unwrap().roles();
            assert!(roles.is_spawned(entity));
            assert!(roles.has_authority_over(client, entity));
            assert!(!roles.has_authority_over(SERVER, entity));
        }
        assert_eq!(network.owner(entity), Some(client));
    }

    #[test]
    fn test_despawn_removes_entity() {
        let network = LocalNetwork::new(NetworkConfig::default());
        let entity = network.spawn(None);

        assert!(network.despawn(entity));
        assert!(!network.despawn(entity));
        assert!(!network.server().roles().is_spawned(entity));
    }

    #[test]
    fn test_pump_on_empty_queue_does_nothing() {
        let mut network = LocalNetwork::new(NetworkConfig::default());
        assert_eq!(network.pump(), PumpStats::default());
    }
}
