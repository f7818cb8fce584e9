//! Typed remote-call handles for Plumber.
//!
//! A [`RemoteCall`] is the integrator-facing side of one remote operation.
//! It's created once per operation, registers a descriptor with the
//! endpoint's registry, and from then on:
//!
//! - **outbound**, [`RemoteCall::invoke`] checks the local role, encodes
//!   the argument tuple into a pooled envelope, and hands it to the
//!   transport with the right routing;
//! - **inbound**, the descriptor's hook decodes the envelope back into the
//!   same tuple and runs every listener in insertion order.
//!
//! # Key types
//!
//! - [`RemoteCall`] (and the [`RemoteCall0`], [`RemoteCall1`],
//!   [`RemoteCall2`] aliases): one handle type over an argument tuple
//! - [`ArgList`]: positional encode/decode for `()`, `(T,)`, `(T1, T2)`
//! - [`Endpoint`]: registry + transport + codec + buffer pool, shared by
//!   every handle on one peer
//! - [`SyncedField`] / [`SyncedValue`]: a value kept in step across peers
//!   through a command/broadcast pair
//! - [`EndpointConfig`], [`FaultPolicy`]: listener panic handling and pool
//!   sizing

mod args;
mod config;
mod endpoint;
mod error;
mod handle;
mod listeners;
mod synced;

pub use args::{ArgList, from_envelope, to_envelope};
pub use config::{EndpointConfig, FaultPolicy};
pub use endpoint::Endpoint;
pub use error::CallError;
pub use handle::{Listener, RemoteCall, RemoteCall0, RemoteCall1, RemoteCall2};
pub use synced::{SyncedField, SyncedValue};
