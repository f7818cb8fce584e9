//! Owner types declare the operations they expose.
//!
//! There's no runtime reflection to ask "does this type have a method called
//! `CmdSendHello`?", so owner types answer it themselves through the
//! [`NetworkBehaviour`] trait. Resolving a name that isn't in the list is an
//! `InvalidOperation` error.
//!
//! # Example
//!
//! ```rust
//! use plumber_registry::{NetworkBehaviour, OperationSig};
//!
//! struct Lobby;
//!
//! impl NetworkBehaviour for Lobby {
//!     const NAMESPACE: &'static str = "MyMod";
//!     const TYPE_NAME: &'static str = "Lobby";
//!     const OPERATIONS: &'static [OperationSig] = &[
//!         OperationSig::void("CmdReady"),
//!         OperationSig::returning("RpcCountdown", "int"),
//!     ];
//! }
//!
//! assert!(Lobby::operation("CmdReady").is_some());
//! assert!(Lobby::operation("CmdJump").is_none());
//! ```

/// Return-type label used for operations that return nothing.
pub const VOID: &str = "void";

/// The signature of one declared operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSig {
    /// The operation's declared name.
    pub name: &'static str,
    /// The operation's return type label, part of its canonical name.
    pub returns: &'static str,
}

impl OperationSig {
    /// An operation returning nothing.
    pub const fn void(name: &'static str) -> Self {
        Self {
            name,
            returns: VOID,
        }
    }

    /// An operation with an explicit return type label.
    pub const fn returning(name: &'static str, returns: &'static str) -> Self {
        Self { name, returns }
    }
}

/// A type that owns remote operations (a networked component).
///
/// All three items are `const`, so declaring an owner type costs nothing at
/// runtime and the declarations can't change after compilation.
pub trait NetworkBehaviour: 'static {
    /// Namespace segment of the canonical operation name.
    const NAMESPACE: &'static str;

    /// Short type name, used for synthetic operation names.
    const TYPE_NAME: &'static str;

    /// Every operation this type declares.
    const OPERATIONS: &'static [OperationSig];

    /// Looks up a declared operation by name.
    fn operation(name: &str) -> Option<&'static OperationSig> {
        Self::OPERATIONS.iter().find(|op| op.name == name)
    }
}
