//! Unified error type for Plumber.

use plumber_calls::CallError;
use plumber_protocol::ProtocolError;
use plumber_registry::RegistryError;
use plumber_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `plumber` facade you deal with this single error type
/// instead of importing errors from each sub-crate. `#[from]` generates the
/// `From` impls, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlumberError {
    /// Encoding or decoding an argument envelope failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport refused a packet.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Registration or inbound dispatch failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Creating or invoking a handle failed.
    #[error(transparent)]
    Call(#[from] CallError),
}

#[cfg(test)]
mod tests {
    use plumber_protocol::{OperationId, PeerId};

    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::TrailingBytes { count: 3 };
        let plumber_err: PlumberError = err.into();
        assert!(matches!(plumber_err, PlumberError::Protocol(_)));
        assert!(plumber_err.to_string().contains('3'));
    }

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::UnknownPeer(PeerId(4));
        let plumber_err: PlumberError = err.into();
        assert!(matches!(plumber_err, PlumberError::Transport(_)));
        assert!(plumber_err.to_string().contains("peer-4"));
    }

    #[test]
    fn test_from_registry_error() {
        let err = RegistryError::UnknownOperation(OperationId(0x2a));
        let plumber_err: PlumberError = err.into();
        assert!(matches!(plumber_err, PlumberError::Registry(_)));
        assert!(plumber_err.to_string().contains("op#002a"));
    }

    #[test]
    fn test_from_call_error() {
        let plumber_err: PlumberError = CallError::NotRegistered.into();
        assert!(matches!(plumber_err, PlumberError::Call(_)));
    }
}
