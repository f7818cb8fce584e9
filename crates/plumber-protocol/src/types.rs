//! Core identity and routing types for remote calls.
//!
//! These are the small values that travel next to every envelope: which
//! operation, which entity, which peer, and how the call should be routed.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The wire identifier of a remote operation.
///
/// Carried on the wire instead of the operation's name. It is derived from
/// the canonical operation name and truncated to 16 bits, so two different
/// names *can* collide; the registry refuses the second one by default.
///
/// `#[serde(transparent)]` serializes `OperationId(42)` as plain `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OperationId(pub u16);

/// Prints the identifier as fixed-width hex (`op#1a2b`).
impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{:04x}", self.0)
    }
}

/// A process on the network: the authoritative server or one client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// A networked entity instance. Remote calls are always made "on" one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Direction: who may send, who receives
// ---------------------------------------------------------------------------

/// The direction of a remote operation.
///
/// ```text
///              OriginToOwner
///   client ───────────────────→ server   (a "command")
///
///              OwnerToAll
///   server ───────────────────→ every observing client   (a "broadcast RPC")
///
///              OwnerToOne
///   server ───────────────────→ one chosen client   (a "targeted RPC")
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Sent by a participant on behalf of an entity, executed by the
    /// authoritative side.
    OriginToOwner,

    /// Sent by the authoritative side to every observer of the entity.
    OwnerToAll,

    /// Sent by the authoritative side to exactly one recipient.
    OwnerToOne,
}

impl Direction {
    /// Returns `true` if calls in this direction are executed on the
    /// authoritative side (and therefore sent from a participant).
    pub fn is_inbound_to_authority(self) -> bool {
        matches!(self, Self::OriginToOwner)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OriginToOwner => write!(f, "OriginToOwner"),
            Self::OwnerToAll => write!(f, "OwnerToAll"),
            Self::OwnerToOne => write!(f, "OwnerToOne"),
        }
    }
}

// ---------------------------------------------------------------------------
// Route: where should this envelope go?
// ---------------------------------------------------------------------------

/// Delivery metadata a transport attaches to an outbound envelope.
///
/// Each variant maps onto one [`Direction`] and carries the flags that
/// direction needs on the far side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// To the authoritative side. `requires_authority` tells the receiver
    /// whether to check that the sender owns the entity.
    ToAuthority { requires_authority: bool },

    /// To every observer of the entity. When `include_owner` is `false`,
    /// the entity's owning peer is skipped.
    Broadcast { include_owner: bool },

    /// To one specific peer.
    ToPeer(PeerId),
}
