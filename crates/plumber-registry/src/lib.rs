//! Operation identity and inbound dispatch for Plumber.
//!
//! This crate answers two questions:
//!
//! 1. **What is this operation called on the wire?**: [`OperationKey`]
//!    turns an owner type ([`NetworkBehaviour`]) and an operation name into
//!    a stable 16-bit [`OperationId`](plumber_protocol::OperationId).
//! 2. **Who handles this inbound call?**: the [`Registry`] maps ids to
//!    [`Descriptor`]s, enforces role and authority rules, and runs the
//!    descriptor's decode hook.
//!
//! # How it fits in the stack
//!
//! ```text
//! Calls layer (above)     ← creates descriptors, owns listeners
//!     ↕
//! Registry (this crate)   ← id → descriptor, role/authority gates
//!     ↕
//! Protocol + Transport    ← ids, envelopes, RoleOracle
//! ```

mod behaviour;
mod config;
mod descriptor;
mod error;
mod ident;
mod registry;

pub use behaviour::{NetworkBehaviour, OperationSig, VOID};
pub use config::{DuplicatePolicy, RegistryConfig};
pub use descriptor::{CallInfo, Descriptor, DispatchHook};
pub use error::RegistryError;
pub use ident::{OperationKey, full_name, operation_id, stable_hash};
pub use registry::{Registry, SenderContext};
