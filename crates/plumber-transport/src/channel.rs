//! A [`Transport`] that queues packets on a Tokio unbounded channel.
//!
//! `UnboundedSender::send` neither blocks nor awaits, so it can back the
//! synchronous `Transport` contract directly. Whoever owns the
//! receiver decides when (and how) packets actually travel: an async task
//! writing to a socket, or a loopback pump delivering them in-process.

use plumber_protocol::{EntityId, OperationId, PeerId, Route};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{OutboundCall, Transport, TransportError};

/// An owned outbound call plus its routing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// The peer that sent the call.
    pub from: PeerId,
    /// Which operation is being called.
    pub operation: OperationId,
    /// The entity the call is made on.
    pub entity: EntityId,
    /// Where the call should be delivered.
    pub route: Route,
    /// The encoded argument envelope (copied out of the pooled buffer).
    pub payload: Vec<u8>,
}

/// A transport for one peer that pushes [`Packet`]s into a channel.
///
/// Several peers may share one queue by cloning the sender.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    peer: PeerId,
    tx: UnboundedSender<Packet>,
}

impl ChannelTransport {
    /// Creates a transport and the receiving end of its queue.
    pub fn new(peer: PeerId) -> (Self, UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { peer, tx }, rx)
    }

    /// Creates a transport that feeds an existing queue.
    pub fn with_sender(peer: PeerId, tx: UnboundedSender<Packet>) -> Self {
        Self { peer, tx }
    }

    /// The peer this transport sends as.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    fn push(
        &self,
        call: OutboundCall<'_>,
        route: Route,
    ) -> Result<(), TransportError> {
        let packet = Packet {
            from: self.peer,
            operation: call.operation,
            entity: call.entity,
            route,
            payload: call.payload.to_vec(),
        };
        tracing::trace!(
            from = %self.peer,
            operation = %call.operation,
            entity = %call.entity,
            bytes = call.payload.len(),
            ?route,
            "packet queued"
        );
        // `send` only fails when the receiver has been dropped.
        self.tx.send(packet).map_err(|_| TransportError::Closed)
    }
}

impl Transport for ChannelTransport {
    fn send_to_authority(
        &self,
        call: OutboundCall<'_>,
        requires_authority: bool,
    ) -> Result<(), TransportError> {
        self.push(call, Route::ToAuthority { requires_authority })
    }

    fn broadcast(
        &self,
        call: OutboundCall<'_>,
        include_owner: bool,
    ) -> Result<(), TransportError> {
        self.push(call, Route::Broadcast { include_owner })
    }

    fn send_to_target(
        &self,
        target: PeerId,
        call: OutboundCall<'_>,
    ) -> Result<(), TransportError> {
        self.push(call, Route::ToPeer(target))
    }
}
