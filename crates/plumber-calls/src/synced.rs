//! Values kept in step across peers.
//!
//! A [`SyncedField`] is declared once per (owner type, field) and owns two
//! operations:
//!
//! ```text
//! "<Type> <field> PlumbVar Command"    OriginToOwner   participant → authority
//! "<Type> <field> PlumbVar ClientRpc"  OwnerToAll      authority → observers
//! ```
//!
//! Each entity gets its own [`SyncedValue`] from [`SyncedField::bind`].
//! Setting it stores the value locally and sends it on: through the
//! broadcast when the local process is authoritative, through the command
//! otherwise. An inbound update on either operation overwrites the bound
//! value of that entity and notifies its subscribers.
//!
//! The authoritative side doesn't relay a received command to observers;
//! it only stores it. Authoritative code that wants everyone to see the
//! value sets it again.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Serialize, de::DeserializeOwned};

use plumber_protocol::{Codec, Direction, EntityId, JsonCodec, OperationId, ProtocolError};
use plumber_registry::{CallInfo, NetworkBehaviour};

use crate::listeners::ListenerList;
use crate::{CallError, Endpoint, FaultPolicy, RemoteCall1};

type Subscriber<T> = dyn Fn(&T) + Send + Sync;

/// One entity's copy of the value plus its subscribers.
struct Slot<T> {
    value: Mutex<T>,
    subscribers: ListenerList<Subscriber<T>>,
}

impl<T> Slot<T> {
    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Slots<T> = Mutex<HashMap<EntityId, Weak<Slot<T>>>>;

struct FieldInner<T, C: Codec>
where
    T: Serialize + DeserializeOwned + 'static,
{
    endpoint: Arc<Endpoint<C>>,
    command: RemoteCall1<T, C>,
    broadcast: RemoteCall1<T, C>,
    slots: Arc<Slots<T>>,
}

/// A synced field of owner type `B`, holding values of type `T`.
pub struct SyncedField<B, T, C: Codec = JsonCodec>
where
    T: Serialize + DeserializeOwned + 'static,
{
    inner: Arc<FieldInner<T, C>>,
    _owner: PhantomData<fn() -> B>,
}

impl<B, T, C> SyncedField<B, T, C>
where
    B: NetworkBehaviour,
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    C: Codec,
{
    /// Registers the field's command and broadcast operations.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateRegistration`](plumber_registry::RegistryError::DuplicateRegistration)
    /// if either operation id is already taken on this endpoint's registry.
    /// Nothing stays registered on failure.
    pub fn create(endpoint: &Arc<Endpoint<C>>, field: &str) -> Result<Self, CallError> {
        let command = RemoteCall1::new();
        let broadcast = RemoteCall1::new();
        let command_id = command.create_synthetic::<B>(
            endpoint,
            &format!("{} {field} PlumbVar Command", B::TYPE_NAME),
            Direction::OriginToOwner,
        )?;
        if let Err(err) = broadcast.create_synthetic::<B>(
            endpoint,
            &format!("{} {field} PlumbVar ClientRpc", B::TYPE_NAME),
            Direction::OwnerToAll,
        ) {
            endpoint.registry().unregister(command_id);
            return Err(err);
        }

        let slots: Arc<Slots<T>> = Arc::new(Mutex::new(HashMap::new()));
        let policy = endpoint.config().fault_policy;
        for handle in [&command, &broadcast] {
            let slots = Arc::clone(&slots);
            handle.set_listener(move |info: &CallInfo, (value,): &(T,)| {
                apply(&slots, info, value, policy);
            });
        }

        tracing::debug!(owner = B::TYPE_NAME, field, "synced field created");
        Ok(Self {
            inner: Arc::new(FieldInner {
                endpoint: Arc::clone(endpoint),
                command,
                broadcast,
                slots,
            }),
            _owner: PhantomData,
        })
    }

    /// Binds the field to one entity.
    ///
    /// Inbound updates for `entity` go to the returned value until it's
    /// dropped. Binding the same entity again takes over its updates.
    pub fn bind(&self, entity: EntityId, initial: T) -> SyncedValue<T, C> {
        let slot = Arc::new(Slot {
            value: Mutex::new(initial),
            subscribers: ListenerList::new(),
        });
        let mut slots = self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.strong_count() > 0);
        slots.insert(entity, Arc::downgrade(&slot));
        drop(slots);

        SyncedValue {
            entity,
            slot,
            field: Arc::clone(&self.inner),
        }
    }

    pub fn command_id(&self) -> Option<OperationId> {
        self.inner.command.id()
    }

    pub fn broadcast_id(&self) -> Option<OperationId> {
        self.inner.broadcast.id()
    }
}

/// Writes an inbound value into the bound slot of its entity.
fn apply<T: Clone>(slots: &Slots<T>, info: &CallInfo, value: &T, policy: FaultPolicy) {
    let slot = slots
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&info.entity)
        .and_then(Weak::upgrade);
    let Some(slot) = slot else {
        tracing::debug!(
            operation = %info.operation,
            entity = %info.entity,
            "synced update for an unbound entity ignored"
        );
        return;
    };

    *slot.lock() = value.clone();
    slot.subscribers
        .fan_out(policy, info.operation, |subscriber| subscriber(value));
}

impl<B, T, C: Codec> fmt::Debug for SyncedField<B, T, C>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedField")
            .field("command", &self.inner.command.id())
            .field("broadcast", &self.inner.broadcast.id())
            .finish_non_exhaustive()
    }
}

/// One entity's synced value.
pub struct SyncedValue<T, C: Codec = JsonCodec>
where
    T: Serialize + DeserializeOwned + 'static,
{
    entity: EntityId,
    slot: Arc<Slot<T>>,
    field: Arc<FieldInner<T, C>>,
}

impl<T, C> SyncedValue<T, C>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    C: Codec,
{
    /// The current local value. Never touches the network.
    pub fn get(&self) -> T {
        self.slot.lock().clone()
    }

    /// Stores `value` and sends it to the other side.
    ///
    /// A value that encodes as null is refused with
    /// [`ProtocolError::NullArgument`] and not stored. Any other send
    /// failure is returned after the value has been stored locally.
    pub fn set(&self, value: T) -> Result<(), CallError> {
        let field = &self.field;
        let handle = if field.endpoint.roles().is_authoritative() {
            &field.broadcast
        } else {
            &field.command
        };

        let sent = handle.invoke(self.entity, (value.clone(),), None);
        if let Err(CallError::Protocol(ProtocolError::NullArgument { .. })) = sent {
            return sent;
        }
        *self.slot.lock() = value;
        sent
    }

    /// Registers a callback for values that arrive from the network.
    ///
    /// Local [`set`](Self::set) calls don't notify.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.slot.subscribers.push(Arc::new(callback));
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

impl<T, C: Codec> fmt::Debug for SyncedValue<T, C>
where
    T: Serialize + DeserializeOwned + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedValue")
            .field("entity", &self.entity)
            .field("value", &*self.slot.lock())
            .finish()
    }
}
