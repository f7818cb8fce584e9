//! Wire-level building blocks for Plumber.
//!
//! This crate defines everything that is shared between the two ends of a
//! remote call, without knowing anything about connections or registries:
//!
//! - **Types** ([`OperationId`], [`PeerId`], [`EntityId`], [`Direction`],
//!   [`Route`]): the identities and routing metadata of a call.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`MsgPackCodec`]): how a
//!   single argument value becomes bytes and back.
//! - **Envelope** ([`EnvelopeWriter`], [`EnvelopeReader`]): how the
//!   arguments of one call are laid out, in declaration order.
//! - **Pool** ([`BufferPool`], [`PooledBuffer`]): reusable envelope buffers.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Handle (typed args) → Protocol (Envelope bytes) → Transport (Packet)
//! ```

mod codec;
mod envelope;
mod error;
mod pool;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
#[cfg(feature = "msgpack")]
pub use codec::MsgPackCodec;
pub use envelope::{EnvelopeReader, EnvelopeWriter, LENGTH_PREFIX};
pub use error::ProtocolError;
pub use pool::{BufferPool, PooledBuffer};
pub use types::{Direction, EntityId, OperationId, PeerId, Route};
