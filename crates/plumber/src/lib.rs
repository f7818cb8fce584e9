//! # Plumber
//!
//! Typed remote calls for server-authoritative game networks.
//!
//! Plumber turns "call `CmdSendHello` on entity 7" into a stable 16-bit
//! operation id plus an argument envelope, hands that to a transport, and on
//! the other side decodes it back and runs the listeners registered for it,
//! checking on the way who is allowed to call what.
//!
//! ## Layers
//!
//! ```text
//! plumber-calls      RemoteCall handles, SyncedValue
//! plumber-registry   operation ids, descriptors, inbound dispatch
//! plumber-transport  Transport + RoleOracle contracts, ChannelTransport
//! plumber-protocol   ids, envelopes, codecs, buffer pool
//! ```
//!
//! This crate re-exports all of them through [`prelude`], adds the unified
//! [`PlumberError`], and provides [`LocalNetwork`], an in-process network
//! for tests and demos.
//!
//! ## Quick Start
//!
//! ```rust
//! use plumber::prelude::*;
//!
//! struct Greeter;
//!
//! impl NetworkBehaviour for Greeter {
//!     const NAMESPACE: &'static str = "MyMod";
//!     const TYPE_NAME: &'static str = "Greeter";
//!     const OPERATIONS: &'static [OperationSig] = &[OperationSig::void("CmdSendHello")];
//! }
//!
//! let mut network = LocalNetwork::new(NetworkConfig::default());
//! let client = network.add_client();
//! let entity = network.spawn(Some(client));
//!
//! let on_server: RemoteCall0 = RemoteCall0::new();
//! let on_client: RemoteCall0 = RemoteCall0::new();
//! on_server.create::<Greeter>(network.server(), "CmdSendHello", Direction::OriginToOwner, false)?;
//! on_client.create::<Greeter>(
//!     network.endpoint(client).unwrap(),
//!     "CmdSendHello",
//!     Direction::OriginToOwner,
//!     false,
//! )?;
//! on_server.set_listener(|info, _| println!("hello from {:?}", info.sender));
//!
//! on_client.invoke(entity, (), None)?;
//! assert_eq!(network.pump().listeners, 1);
//! # Ok::<(), PlumberError>(())
//! ```

mod error;
mod local;

pub use error::PlumberError;
pub use local::{LocalNetwork, NetworkConfig, PumpStats, SERVER};

pub mod prelude {
    //! Everything needed to declare owner types, create handles and run a
    //! local network.

    pub use crate::{LocalNetwork, NetworkConfig, PlumberError, PumpStats, SERVER};
    pub use plumber_calls::{
        ArgList, CallError, Endpoint, EndpointConfig, FaultPolicy, RemoteCall, RemoteCall0,
        RemoteCall1, RemoteCall2, SyncedField, SyncedValue,
    };
    #[cfg(feature = "msgpack")]
    pub use plumber_protocol::MsgPackCodec;
    pub use plumber_protocol::{
        Codec, Direction, EntityId, JsonCodec, OperationId, PeerId, ProtocolError, Route,
    };
    pub use plumber_registry::{
        CallInfo, DuplicatePolicy, NetworkBehaviour, OperationSig, Registry, RegistryConfig,
        RegistryError, SenderContext,
    };
    pub use plumber_transport::{
        ChannelTransport, OutboundCall, Packet, RoleOracle, Transport, TransportError,
    };
}
