//! Transport and role contracts for Plumber.
//!
//! Plumber doesn't open sockets. It hands encoded envelopes to whatever
//! implements [`Transport`] and asks a [`RoleOracle`] which side of the
//! network the local process is on. The same handles run on top of a real
//! game network or on the in-process loopback used in tests.
//!
//! [`ChannelTransport`] is the one concrete transport shipped here: it turns
//! every call into a [`Packet`] on a Tokio channel for some pump to drain.

mod channel;
mod error;

pub use channel::{ChannelTransport, Packet};
pub use error::TransportError;

use plumber_protocol::{EntityId, OperationId, PeerId};

/// One outbound call, borrowed for the duration of the hand-off.
///
/// The payload usually lives in a pooled buffer; transports that need to
/// keep it must copy it.
#[derive(Debug, Clone, Copy)]
pub struct OutboundCall<'a> {
    /// Which operation is being called.
    pub operation: OperationId,
    /// The entity the call is made on.
    pub entity: EntityId,
    /// The encoded argument envelope.
    pub payload: &'a [u8],
}

/// Sends encoded calls across the network.
///
/// All methods are synchronous and must not block: a transport either
/// writes the bytes out immediately or queues them.
pub trait Transport: Send + Sync + 'static {
    /// Sends an origin-initiated call to the authoritative side.
    fn send_to_authority(
        &self,
        call: OutboundCall<'_>,
        requires_authority: bool,
    ) -> Result<(), TransportError>;

    /// Sends a call from the authoritative side to every observer of the
    /// entity, skipping the entity's owner unless `include_owner` is set.
    fn broadcast(
        &self,
        call: OutboundCall<'_>,
        include_owner: bool,
    ) -> Result<(), TransportError>;

    /// Sends a call from the authoritative side to exactly one peer.
    fn send_to_target(
        &self,
        target: PeerId,
        call: OutboundCall<'_>,
    ) -> Result<(), TransportError>;
}

/// Answers "which role am I playing?" and "who owns what?".
///
/// A process may be authoritative, a participant, or both (a listen
/// server / host).
pub trait RoleOracle: Send + Sync + 'static {
    /// `true` if the local process runs the authoritative side.
    fn is_authoritative(&self) -> bool;

    /// `true` if the local process runs an active participant (client).
    fn is_participant(&self) -> bool;

    /// `true` if `entity` is currently live on the network.
    fn is_spawned(&self, entity: EntityId) -> bool;

    /// `true` if `sender` has authority over `entity` (usually: owns it).
    fn has_authority_over(&self, sender: PeerId, entity: EntityId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A transport that refuses everything, to check the trait is object
    /// safe and usable behind `Arc<dyn Transport>`.
    struct ClosedTransport;

    impl Transport for ClosedTransport {
        fn send_to_authority(
            &self,
            _call: OutboundCall<'_>,
            _requires_authority: bool,
        ) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }

        fn broadcast(
            &self,
            _call: OutboundCall<'_>,
            _include_owner: bool,
        ) -> Result<(), TransportError> {
            Err(TransportError::Closed)
        }

        fn send_to_target(
            &self,
            target: PeerId,
            _call: OutboundCall<'_>,
        ) -> Result<(), TransportError> {
            Err(TransportError::UnknownPeer(target))
        }
    }

    #[test]
    fn test_transport_is_object_safe() {
        let transport: std::sync::Arc<dyn Transport> =
            std::sync::Arc::new(ClosedTransport);
        let call = OutboundCall {
            operation: OperationId(1),
            entity: EntityId(1),
            payload: &[],
        };

        assert!(matches!(
            transport.send_to_target(PeerId(9), call),
            Err(TransportError::UnknownPeer(PeerId(9)))
        ));
        assert!(matches!(
            transport.broadcast(call, true),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Closed.to_string(), "transport closed");
        assert_eq!(
            TransportError::UnknownPeer(PeerId(2)).to_string(),
            "unknown peer peer-2"
        );
    }
}
