//! Error types for the registry layer.

use plumber_protocol::{Direction, EntityId, OperationId, PeerId, ProtocolError};

/// Errors that can occur while registering or dispatching operations.
///
/// Apart from [`Decode`](Self::Decode), every variant describes expected
/// misuse or hostile input: the registry logs it and drops the call.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The owner type doesn't declare an operation with this name.
    #[error("{owner} declares no operation named {name:?}")]
    InvalidOperation { owner: &'static str, name: String },

    /// Another operation already holds this identifier.
    #[error("{operation} is already registered to {existing:?}; refusing {rejected:?}")]
    DuplicateRegistration {
        operation: OperationId,
        existing: String,
        rejected: String,
    },

    /// No descriptor is registered for an inbound identifier.
    #[error("no operation registered for {0}")]
    UnknownOperation(OperationId),

    /// The inbound call targets an entity the local process doesn't know.
    #[error("{operation} called on unknown entity {entity}")]
    UnknownEntity {
        operation: OperationId,
        entity: EntityId,
    },

    /// An origin-initiated call came from a peer without authority over the
    /// entity.
    #[error("{operation} on {entity} denied: sender {sender:?} lacks authority")]
    AuthorityDenied {
        operation: OperationId,
        entity: EntityId,
        sender: Option<PeerId>,
    },

    /// The local process isn't in the role this direction is delivered to.
    #[error("{operation} ({direction}) dispatched while the {required} role is inactive")]
    InactiveRole {
        operation: OperationId,
        direction: Direction,
        required: &'static str,
    },

    /// The envelope doesn't match the operation's declared arguments.
    #[error("{operation} envelope is corrupt: {source}")]
    Decode {
        operation: OperationId,
        #[source]
        source: ProtocolError,
    },
}
