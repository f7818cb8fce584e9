//! The dispatch registry: operation id → descriptor.
//!
//! Handles register their descriptors here when they're created, and the
//! transport calls [`Registry::dispatch_inbound`] for every envelope it
//! receives. The registry owns the checks that don't depend on argument
//! types:
//!
//! 1. Is the id known? ([`RegistryError::UnknownOperation`])
//! 2. Is the local process in the role this direction is delivered to?
//!    ([`RegistryError::InactiveRole`])
//! 3. Does the entity exist? ([`RegistryError::UnknownEntity`])
//! 4. For authority-checked commands: does the sender own the entity?
//!    ([`RegistryError::AuthorityDenied`])
//!
//! Only then does it run the descriptor's hook, which decodes the envelope
//! and calls listeners. Every rejection is logged where it happens, so a
//! transport can drop the `Err` without losing the diagnosis.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use plumber_protocol::{Direction, EntityId, OperationId, PeerId};
use plumber_transport::RoleOracle;

use crate::{CallInfo, Descriptor, DuplicatePolicy, RegistryConfig, RegistryError};

/// Who sent an inbound call and which entity it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderContext {
    /// The sending peer, if the transport knows it.
    pub sender: Option<PeerId>,
    /// The entity the call is made on.
    pub entity: EntityId,
}

/// Maps operation ids to descriptors and routes inbound envelopes.
///
/// The map sits behind an `RwLock`: registration takes the write lock and
/// happens a handful of times at startup, dispatch takes the read lock on
/// every packet. Hooks run after the lock is released, so a listener may
/// create new handles (and register) without deadlocking.
pub struct Registry {
    operations: RwLock<HashMap<OperationId, Arc<Descriptor>>>,
    roles: Arc<dyn RoleOracle>,
    config: RegistryConfig,
}

impl Registry {
    /// Creates an empty registry that asks `roles` about the local process.
    pub fn new(config: RegistryConfig, roles: Arc<dyn RoleOracle>) -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            roles,
            config,
        }
    }

    /// Registers a descriptor under its id.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateRegistration`] if the id is taken and the
    /// policy is [`DuplicatePolicy::Reject`].
    pub fn register(&self, descriptor: Descriptor) -> Result<Arc<Descriptor>, RegistryError> {
        let id = descriptor.id();
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = operations.get(&id) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    tracing::error!(
                        operation = %id,
                        existing = existing.full_name(),
                        rejected = descriptor.full_name(),
                        "duplicate operation id, registration rejected"
                    );
                    return Err(RegistryError::DuplicateRegistration {
                        operation: id,
                        existing: existing.full_name().to_string(),
                        rejected: descriptor.full_name().to_string(),
                    });
                }
                DuplicatePolicy::Replace => {
                    tracing::warn!(
                        operation = %id,
                        existing = existing.full_name(),
                        replacement = descriptor.full_name(),
                        "duplicate operation id, replacing descriptor"
                    );
                }
            }
        }

        let descriptor = Arc::new(descriptor);
        operations.insert(id, Arc::clone(&descriptor));
        tracing::debug!(
            operation = %id,
            name = descriptor.full_name(),
            direction = %descriptor.direction(),
            "operation registered"
        );
        Ok(descriptor)
    }

    /// Routes one inbound envelope to its descriptor's hook.
    ///
    /// Returns the number of listeners that ran.
    pub fn dispatch_inbound(
        &self,
        operation: OperationId,
        payload: &[u8],
        context: SenderContext,
    ) -> Result<usize, RegistryError> {
        let Some(descriptor) = self.get(operation) else {
            tracing::error!(
                %operation,
                entity = %context.entity,
                "no operation registered for inbound id"
            );
            return Err(RegistryError::UnknownOperation(operation));
        };

        self.check_role(&descriptor)?;

        let entity = context.entity;
        if !self.roles.is_spawned(entity) {
            tracing::warn!(%operation, %entity, "inbound call for unknown entity dropped");
            return Err(RegistryError::UnknownEntity { operation, entity });
        }

        if descriptor.direction() == Direction::OriginToOwner && descriptor.requires_authority() {
            let permitted = context
                .sender
                .is_some_and(|sender| self.roles.has_authority_over(sender, entity));
            if !permitted {
                tracing::error!(
                    %operation,
                    %entity,
                    sender = ?context.sender,
                    name = descriptor.full_name(),
                    "command rejected: sender lacks authority over entity"
                );
                return Err(RegistryError::AuthorityDenied {
                    operation,
                    entity,
                    sender: context.sender,
                });
            }
        }

        let info = CallInfo {
            operation,
            entity,
            sender: context.sender,
        };
        descriptor.run(&info, payload).map_err(|source| {
            tracing::error!(
                %operation,
                %entity,
                name = descriptor.full_name(),
                error = %source,
                "envelope decode failed"
            );
            RegistryError::Decode { operation, source }
        })
    }

    /// Entry point for transports; same as [`dispatch_inbound`](Self::dispatch_inbound).
    pub fn on_envelope_received(
        &self,
        operation: OperationId,
        payload: &[u8],
        context: SenderContext,
    ) -> Result<usize, RegistryError> {
        self.dispatch_inbound(operation, payload, context)
    }

    /// Removes a descriptor and returns it.
    ///
    /// Handles bound to the removed id stay bound; inbound traffic for it
    /// reports [`RegistryError::UnknownOperation`] from then on.
    pub fn unregister(&self, operation: OperationId) -> Option<Arc<Descriptor>> {
        let removed = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&operation);
        if let Some(descriptor) = &removed {
            tracing::debug!(
                operation = %operation,
                name = descriptor.full_name(),
                "operation unregistered"
            );
        }
        removed
    }

    /// Looks up a descriptor by id.
    pub fn get(&self, operation: OperationId) -> Option<Arc<Descriptor>> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&operation)
            .cloned()
    }

    pub fn contains(&self, operation: OperationId) -> bool {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&operation)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The role oracle this registry consults.
    pub fn roles(&self) -> &Arc<dyn RoleOracle> {
        &self.roles
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Commands are delivered to the authoritative side, RPCs to
    /// participants.
    fn check_role(&self, descriptor: &Descriptor) -> Result<(), RegistryError> {
        let direction = descriptor.direction();
        let (active, required) = if direction.is_inbound_to_authority() {
            (self.roles.is_authoritative(), "authoritative")
        } else {
            (self.roles.is_participant(), "participant")
        };

        if active {
            return Ok(());
        }
        tracing::error!(
            operation = %descriptor.id(),
            %direction,
            required,
            name = descriptor.full_name(),
            "inbound call dropped: local role inactive"
        );
        Err(RegistryError::InactiveRole {
            operation: descriptor.id(),
            direction,
            required,
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("operations", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
