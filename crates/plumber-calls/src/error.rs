//! Error types for the handle layer.

use plumber_protocol::{Direction, EntityId, OperationId, ProtocolError};
use plumber_registry::RegistryError;
use plumber_transport::TransportError;

/// Errors that can occur when creating or invoking a remote call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// `invoke` was called before `create`.
    #[error("remote call invoked before it was created")]
    NotRegistered,

    /// The entity isn't live on the network, so there's nothing to call on.
    #[error("{operation} invoked on {entity}, which is not spawned")]
    MissingInstance {
        operation: OperationId,
        entity: EntityId,
    },

    /// A targeted call was invoked without a target peer.
    #[error("{operation} is a targeted call but no target was given")]
    MissingTarget { operation: OperationId },

    /// The local process can't originate calls in this direction.
    #[error("{operation} ({direction}) invoked while the {required} role is inactive")]
    InactiveRole {
        operation: OperationId,
        direction: Direction,
        required: &'static str,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
