//! Remote operation descriptors.
//!
//! A descriptor is everything the registry needs to know about one
//! operation: its key, its direction, its authority rule, and the hook that
//! turns an envelope into listener calls. Descriptors are built by the
//! handle that owns the operation and never change afterwards, except for
//! the include-owner flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use plumber_protocol::{Direction, EntityId, OperationId, PeerId, ProtocolError};

use crate::OperationKey;

/// Context of one inbound call, handed to the hook and on to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallInfo {
    /// The operation being called.
    pub operation: OperationId,
    /// The entity the call is made on.
    pub entity: EntityId,
    /// The peer that sent the call, when the transport knows it.
    pub sender: Option<PeerId>,
}

/// Decodes an envelope and fans it out. Returns how many listeners ran.
///
/// `Box<dyn Fn ...>` erases the handle's argument types: the registry
/// stores hooks for `()`, `(String,)`, `(String, i32)`... side by side.
pub type DispatchHook =
    Box<dyn Fn(&CallInfo, &[u8]) -> Result<usize, ProtocolError> + Send + Sync>;

/// Immutable metadata for one registered operation.
pub struct Descriptor {
    key: OperationKey,
    direction: Direction,
    requires_authority: bool,
    include_owner: AtomicBool,
    hook: DispatchHook,
}

impl Descriptor {
    /// Creates a descriptor. `include_owner` starts out `false`.
    pub fn new<F>(
        key: OperationKey,
        direction: Direction,
        requires_authority: bool,
        hook: F,
    ) -> Self
    where
        F: Fn(&CallInfo, &[u8]) -> Result<usize, ProtocolError> + Send + Sync + 'static,
    {
        Self {
            key,
            direction,
            requires_authority,
            include_owner: AtomicBool::new(false),
            hook: Box::new(hook),
        }
    }

    /// Builder-style setter for the initial include-owner flag.
    pub fn with_include_owner(self, include_owner: bool) -> Self {
        self.include_owner.store(include_owner, Ordering::Relaxed);
        self
    }

    pub fn id(&self) -> OperationId {
        self.key.id()
    }

    pub fn full_name(&self) -> &str {
        self.key.full_name()
    }

    pub fn key(&self) -> &OperationKey {
        &self.key
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn requires_authority(&self) -> bool {
        self.requires_authority
    }

    /// Whether an `OwnerToAll` broadcast also reaches the entity's owner.
    pub fn include_owner(&self) -> bool {
        self.include_owner.load(Ordering::Relaxed)
    }

    /// Adjusts the include-owner flag. Takes `&self`: descriptors are
    /// shared through `Arc`, and this is their one mutable setting.
    pub fn set_include_owner(&self, include_owner: bool) {
        self.include_owner.store(include_owner, Ordering::Relaxed);
    }

    /// Runs the decode-and-dispatch hook.
    pub(crate) fn run(&self, info: &CallInfo, payload: &[u8]) -> Result<usize, ProtocolError> {
        (self.hook)(info, payload)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id())
            .field("full_name", &self.full_name())
            .field("direction", &self.direction)
            .field("requires_authority", &self.requires_authority)
            .field("include_owner", &self.include_owner())
            .finish_non_exhaustive()
    }
}
