use plumber_protocol::PeerId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The other end of the transport is gone; nothing can be sent.
    #[error("transport closed")]
    Closed,

    /// A targeted send named a peer the transport doesn't know.
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}
