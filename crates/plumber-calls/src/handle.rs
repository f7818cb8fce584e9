//! The typed remote-call handle.
//!
//! # Lifecycle
//!
//! ```text
//! RemoteCall::new()          unbound: listeners can be added, invoke fails
//!     │
//!     ▼ create::<B>(...)     derives the id, registers a descriptor
//! bound                      invoke sends, inbound envelopes reach listeners
//! ```
//!
//! `create` is idempotent: calling it again on a bound handle does nothing
//! and returns the id from the first call. Listeners live on the handle, not
//! the descriptor, so they can be added before or after `create`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use plumber_protocol::{Codec, Direction, EntityId, JsonCodec, OperationId, PeerId, ProtocolError};
use plumber_registry::{CallInfo, Descriptor, NetworkBehaviour, OperationKey, RegistryError};
use plumber_transport::OutboundCall;

use crate::listeners::ListenerList;
use crate::{ArgList, CallError, Endpoint, from_envelope, to_envelope};

/// A callback run for every inbound call of a handle.
pub type Listener<A> = dyn Fn(&CallInfo, &A) + Send + Sync;

/// A handle for a remote operation with no arguments.
pub type RemoteCall0<C = JsonCodec> = RemoteCall<(), C>;

/// A handle for a remote operation with one argument.
pub type RemoteCall1<T, C = JsonCodec> = RemoteCall<(T,), C>;

/// A handle for a remote operation with two arguments.
pub type RemoteCall2<T1, T2, C = JsonCodec> = RemoteCall<(T1, T2), C>;

/// What a handle is bound to once created.
struct Bound<C: Codec> {
    endpoint: Arc<Endpoint<C>>,
    descriptor: Arc<Descriptor>,
}

impl<C: Codec> Clone for Bound<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

/// A typed handle for one remote operation.
///
/// Once created, the handle keeps its endpoint alive, and the endpoint's
/// registry keeps the handle's listeners alive. A listener that captures an
/// `Arc` of a handle on the same endpoint therefore forms a cycle, and the
/// peer is never dropped. Capture a `Weak` instead when the peer must be
/// torn down before the process exits.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use plumber_calls::{Endpoint, RemoteCall2};
/// use plumber_protocol::{Direction, EntityId, PeerId};
/// use plumber_registry::{NetworkBehaviour, OperationSig, Registry, RegistryConfig};
/// use plumber_transport::{ChannelTransport, RoleOracle};
///
/// struct Greeter;
///
/// impl NetworkBehaviour for Greeter {
///     const NAMESPACE: &'static str = "MyMod";
///     const TYPE_NAME: &'static str = "Greeter";
///     const OPERATIONS: &'static [OperationSig] = &[OperationSig::void("TargetHello")];
/// }
///
/// struct Server;
///
/// impl RoleOracle for Server {
///     fn is_authoritative(&self) -> bool { true }
///     fn is_participant(&self) -> bool { false }
///     fn is_spawned(&self, _: EntityId) -> bool { true }
///     fn has_authority_over(&self, _: PeerId, _: EntityId) -> bool { false }
/// }
///
/// let registry = Arc::new(Registry::new(RegistryConfig::default(), Arc::new(Server)));
/// let (transport, mut outbox) = ChannelTransport::new(PeerId(0));
/// let endpoint = Arc::new(Endpoint::json(registry, Arc::new(transport)));
///
/// let hello: RemoteCall2<String, i32> = RemoteCall2::new();
/// hello.create::<Greeter>(&endpoint, "TargetHello", Direction::OwnerToOne, false).unwrap();
/// hello
///     .invoke(EntityId(1), ("Hello".to_string(), 42), Some(PeerId(1)))
///     .unwrap();
///
/// assert!(outbox.try_recv().is_ok());
/// ```
pub struct RemoteCall<A: ArgList, C: Codec = JsonCodec> {
    listeners: Arc<ListenerList<Listener<A>>>,
    include_owner: AtomicBool,
    bound: Mutex<Option<Bound<C>>>,
    _args: PhantomData<fn(A)>,
}

impl<A: ArgList, C: Codec> RemoteCall<A, C> {
    /// Creates an unbound handle with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(ListenerList::new()),
            include_owner: AtomicBool::new(false),
            bound: Mutex::new(None),
            _args: PhantomData,
        }
    }

    /// Registers the handle for `B`'s declared operation `name`.
    ///
    /// Only the first call has any effect. Later calls return the id that
    /// was derived the first time, whatever arguments they pass.
    ///
    /// # Errors
    /// - [`RegistryError::InvalidOperation`](plumber_registry::RegistryError::InvalidOperation)
    ///   if `B` doesn't declare `name`.
    /// - [`RegistryError::DuplicateRegistration`](plumber_registry::RegistryError::DuplicateRegistration)
    ///   if another operation holds the same id. The handle stays unbound.
    pub fn create<B: NetworkBehaviour>(
        &self,
        endpoint: &Arc<Endpoint<C>>,
        name: &str,
        direction: Direction,
        requires_authority: bool,
    ) -> Result<OperationId, CallError> {
        self.bind_with(endpoint, direction, requires_authority, || {
            OperationKey::resolve::<B>(name)
        })
    }

    /// Like [`create`](Self::create), for an operation with no declared
    /// signature on `B`.
    pub(crate) fn create_synthetic<B: NetworkBehaviour>(
        &self,
        endpoint: &Arc<Endpoint<C>>,
        name: &str,
        direction: Direction,
    ) -> Result<OperationId, CallError> {
        self.bind_with(endpoint, direction, false, || {
            Ok(OperationKey::synthetic::<B>(name))
        })
    }

    fn bind_with(
        &self,
        endpoint: &Arc<Endpoint<C>>,
        direction: Direction,
        requires_authority: bool,
        key: impl FnOnce() -> Result<OperationKey, RegistryError>,
    ) -> Result<OperationId, CallError> {
        let mut bound = self.bound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = bound.as_ref() {
            tracing::debug!(
                operation = %existing.descriptor.id(),
                name = existing.descriptor.full_name(),
                "create called on a bound handle, ignoring"
            );
            return Ok(existing.descriptor.id());
        }

        let key = key()?;
        let listeners = Arc::clone(&self.listeners);
        let codec = endpoint.codec().clone();
        let policy = endpoint.config().fault_policy;
        let hook = move |info: &CallInfo, payload: &[u8]| -> Result<usize, ProtocolError> {
            let args: A = from_envelope(&codec, payload)?;
            Ok(listeners.fan_out(policy, info.operation, |listener| listener(info, &args)))
        };

        let descriptor = Descriptor::new(key, direction, requires_authority, hook)
            .with_include_owner(self.include_owner.load(Ordering::Relaxed));
        let descriptor = endpoint.registry().register(descriptor)?;
        let id = descriptor.id();

        tracing::debug!(
            operation = %id,
            name = descriptor.full_name(),
            %direction,
            arity = A::ARITY,
            "remote call created"
        );
        *bound = Some(Bound {
            endpoint: Arc::clone(endpoint),
            descriptor,
        });
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Appends a listener. Adding the same callback twice makes it run
    /// twice.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&CallInfo, &A) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Clears every listener, then adds `listener`.
    ///
    /// Use this for the first listener of a handle that outlives the
    /// objects that subscribe to it, so stale subscriptions don't pile up.
    pub fn set_listener<F>(&self, listener: F)
    where
        F: Fn(&CallInfo, &A) + Send + Sync + 'static,
    {
        self.listeners.replace(Arc::new(listener));
    }

    pub fn clear_listeners(&self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// Whether an `OwnerToAll` broadcast also reaches the entity's owner.
    /// Can be changed before or after `create`.
    pub fn set_include_owner(&self, include_owner: bool) {
        self.include_owner.store(include_owner, Ordering::Relaxed);
        if let Some(bound) = self.bound() {
            bound.descriptor.set_include_owner(include_owner);
        }
    }

    pub fn include_owner(&self) -> bool {
        self.include_owner.load(Ordering::Relaxed)
    }

    /// The operation id, once created.
    pub fn id(&self) -> Option<OperationId> {
        self.bound().map(|bound| bound.descriptor.id())
    }

    pub fn is_created(&self) -> bool {
        self.bound().is_some()
    }

    /// The registered descriptor, once created.
    pub fn descriptor(&self) -> Option<Arc<Descriptor>> {
        self.bound().map(|bound| bound.descriptor)
    }

    /// Sends one call on `entity`.
    ///
    /// `target` names the receiving peer of an `OwnerToOne` call and is
    /// ignored for the other directions. Checks run in this order, and none
    /// of them sends anything when it fails:
    ///
    /// 1. the handle is created ([`CallError::NotRegistered`]);
    /// 2. the entity is spawned ([`CallError::MissingInstance`]);
    /// 3. the local role can originate this direction
    ///    ([`CallError::InactiveRole`]);
    /// 4. a targeted call has a target ([`CallError::MissingTarget`]);
    /// 5. every argument encodes to something non-null
    ///    ([`ProtocolError::NullArgument`](plumber_protocol::ProtocolError::NullArgument)).
    pub fn invoke(&self, entity: EntityId, args: A, target: Option<PeerId>) -> Result<(), CallError> {
        let Some(Bound {
            endpoint,
            descriptor,
        }) = self.bound()
        else {
            tracing::warn!(%entity, "invoke on a remote call that was never created");
            return Err(CallError::NotRegistered);
        };

        let operation = descriptor.id();
        let direction = descriptor.direction();
        let roles = endpoint.roles();

        if !roles.is_spawned(entity) {
            tracing::error!(
                %operation,
                %entity,
                name = descriptor.full_name(),
                "invoke on an entity that is not spawned"
            );
            return Err(CallError::MissingInstance { operation, entity });
        }

        let (active, required) = if direction.is_inbound_to_authority() {
            (roles.is_participant(), "participant")
        } else {
            (roles.is_authoritative(), "authoritative")
        };
        if !active {
            tracing::error!(
                %operation,
                %direction,
                required,
                name = descriptor.full_name(),
                "invoke while local role is inactive"
            );
            return Err(CallError::InactiveRole {
                operation,
                direction,
                required,
            });
        }

        if direction == Direction::OwnerToOne && target.is_none() {
            tracing::warn!(
                %operation,
                %entity,
                name = descriptor.full_name(),
                "targeted call invoked without a target"
            );
            return Err(CallError::MissingTarget { operation });
        }

        // Returned to the pool on drop, whichever way this function exits.
        let mut buf = endpoint.pool().acquire();
        if let Err(e) = to_envelope(&args, endpoint.codec(), &mut buf) {
            tracing::error!(
                %operation,
                name = descriptor.full_name(),
                error = %e,
                "failed to encode arguments"
            );
            return Err(e.into());
        }

        let call = OutboundCall {
            operation,
            entity,
            payload: &buf,
        };
        let transport = endpoint.transport();
        let sent = match (direction, target) {
            (Direction::OriginToOwner, _) => {
                transport.send_to_authority(call, descriptor.requires_authority())
            }
            (Direction::OwnerToAll, _) => transport.broadcast(call, descriptor.include_owner()),
            (Direction::OwnerToOne, Some(peer)) => transport.send_to_target(peer, call),
            (Direction::OwnerToOne, None) => return Err(CallError::MissingTarget { operation }),
        };

        sent.map_err(|e| {
            tracing::warn!(%operation, %entity, error = %e, "transport refused call");
            CallError::from(e)
        })?;
        tracing::trace!(%operation, %entity, %direction, bytes = buf.len(), "call sent");
        Ok(())
    }

    fn bound(&self) -> Option<Bound<C>> {
        self.bound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<A: ArgList, C: Codec> Default for RemoteCall<A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ArgList, C: Codec> fmt::Debug for RemoteCall<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCall")
            .field("descriptor", &self.descriptor())
            .field("listeners", &self.listener_count())
            .field("include_owner", &self.include_owner())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use plumber_protocol::Route;
    use plumber_registry::{OperationSig, Registry, RegistryConfig, SenderContext, VOID};
    use plumber_transport::{ChannelTransport, Packet, RoleOracle};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::EndpointConfig;

    struct Chat;

    impl NetworkBehaviour for Chat {
        const NAMESPACE: &'static str = "Tests";
        const TYPE_NAME: &'static str = "Chat";
        const OPERATIONS: &'static [OperationSig] = &[
            OperationSig::void("CmdSay"),
            OperationSig::void("RpcSaid"),
            OperationSig::void("TargetWhisper"),
        ];
    }

    /// A listen server: both roles active, entities 1..=3 spawned.
    struct Host;

    impl RoleOracle for Host {
        fn is_authoritative(&self) -> bool {
            true
        }

        fn is_participant(&self) -> bool {
            true
        }

        fn is_spawned(&self, entity: EntityId) -> bool {
            (1..=3).contains(&entity.0)
        }

        fn has_authority_over(&self, _sender: PeerId, _entity: EntityId) -> bool {
            true
        }
    }

    fn endpoint() -> (Arc<Endpoint>, UnboundedReceiver<Packet>) {
        let registry = Arc::new(Registry::new(RegistryConfig::default(), Arc::new(Host)));
        let (transport, rx) = ChannelTransport::new(PeerId(0));
        let endpoint =
            Endpoint::new(registry, Arc::new(transport), JsonCodec, EndpointConfig::default());
        (Arc::new(endpoint), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Packet>) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = rx.try_recv() {
            packets.push(packet);
        }
        packets
    }

    #[test]
    fn test_create_is_idempotent() {
        let (endpoint, _outbox) = endpoint();
        let say: RemoteCall1<String> = RemoteCall1::new();

        let first = say
            .create::<Chat>(&endpoint, "CmdSay", Direction::OriginToOwner, false)
            .unwrap();
        say.add_listener(|_, _| {});
        let second = say
            .create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, true)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(say.listener_count(), 1);
        let descriptor = say.descriptor().unwrap();
        assert!(Arc::ptr_eq(&descriptor, &endpoint.registry().get(first).unwrap()));
        assert_eq!(descriptor.full_name(), format!("{VOID} Tests::CmdSay"));
        assert_eq!(descriptor.direction(), Direction::OriginToOwner);
        assert!(!descriptor.requires_authority());
        assert_eq!(endpoint.registry().len(), 1);
    }

    #[test]
    fn test_create_undeclared_name_leaves_handle_unbound() {
        let (endpoint, _outbox) = endpoint();
        let call: RemoteCall0 = RemoteCall0::new();

        let result = call.create::<Chat>(&endpoint, "CmdShout", Direction::OriginToOwner, false);

        assert!(matches!(
            result,
            Err(CallError::Registry(RegistryError::InvalidOperation { .. }))
        ));
        assert!(!call.is_created());
        assert!(endpoint.registry().is_empty());
    }

    #[test]
    fn test_create_second_handle_same_operation_rejected() {
        let (endpoint, _outbox) = endpoint();
        let a: RemoteCall0 = RemoteCall0::new();
        let b: RemoteCall0 = RemoteCall0::new();
        a.create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false)
            .unwrap();

        let result = b.create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false);

        assert!(matches!(
            result,
            Err(CallError::Registry(RegistryError::DuplicateRegistration { .. }))
        ));
        assert!(!b.is_created());
    }

    #[test]
    fn test_invoke_before_create_returns_not_registered() {
        let (_endpoint, mut outbox) = endpoint();
        let call: RemoteCall0 = RemoteCall0::new();

        let result = call.invoke(EntityId(1), (), None);

        assert!(matches!(result, Err(CallError::NotRegistered)));
        assert!(drain(&mut outbox).is_empty());
    }

    #[test]
    fn test_invoke_unspawned_entity_returns_missing_instance() {
        let (endpoint, mut outbox) = endpoint();
        let call: RemoteCall0 = RemoteCall0::new();
        call.create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false)
            .unwrap();

        let result = call.invoke(EntityId(99), (), None);

        assert!(matches!(
            result,
            Err(CallError::MissingInstance { entity: EntityId(99), .. })
        ));
        assert!(drain(&mut outbox).is_empty());
    }

    #[test]
    fn test_invoke_targeted_without_target_returns_missing_target() {
        let (endpoint, mut outbox) = endpoint();
        let whisper: RemoteCall1<String> = RemoteCall1::new();
        whisper
            .create::<Chat>(&endpoint, "TargetWhisper", Direction::OwnerToOne, false)
            .unwrap();

        let result = whisper.invoke(EntityId(1), ("psst".to_string(),), None);

        assert!(matches!(result, Err(CallError::MissingTarget { .. })));
        assert!(drain(&mut outbox).is_empty());
    }

    #[test]
    fn test_invoke_null_argument_sends_nothing_and_recycles_buffer() {
        let (endpoint, mut outbox) = endpoint();
        let say: RemoteCall1<Option<String>> = RemoteCall1::new();
        say.create::<Chat>(&endpoint, "CmdSay", Direction::OriginToOwner, false)
            .unwrap();

        let result = say.invoke(EntityId(1), (None,), None);

        assert!(matches!(
            result,
            Err(CallError::Protocol(ProtocolError::NullArgument { index: 0 }))
        ));
        assert!(drain(&mut outbox).is_empty());
        assert_eq!(endpoint.pool().idle(), 1);
    }

    #[test]
    fn test_invoke_routes_by_direction() {
        let (endpoint, mut outbox) = endpoint();
        let say: RemoteCall1<String> = RemoteCall1::new();
        let said: RemoteCall0 = RemoteCall0::new();
        let whisper: RemoteCall1<String> = RemoteCall1::new();
        say.create::<Chat>(&endpoint, "CmdSay", Direction::OriginToOwner, true)
            .unwrap();
        said.create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false)
            .unwrap();
        said.set_include_owner(true);
        whisper
            .create::<Chat>(&endpoint, "TargetWhisper", Direction::OwnerToOne, false)
            .unwrap();

        say.invoke(EntityId(1), ("hi".to_string(),), None).unwrap();
        said.invoke(EntityId(2), (), None).unwrap();
        whisper
            .invoke(EntityId(3), ("psst".to_string(),), Some(PeerId(7)))
            .unwrap();

        let routes: Vec<Route> = drain(&mut outbox).into_iter().map(|p| p.route).collect();
        assert_eq!(
            routes,
            vec![
                Route::ToAuthority {
                    requires_authority: true
                },
                Route::Broadcast {
                    include_owner: true
                },
                Route::ToPeer(PeerId(7)),
            ]
        );
        // One buffer served all three sends.
        assert_eq!(endpoint.pool().idle(), 1);
    }

    #[test]
    fn test_set_include_owner_before_create_applies_to_descriptor() {
        let (endpoint, _outbox) = endpoint();
        let said: RemoteCall0 = RemoteCall0::new();
        said.set_include_owner(true);
        said.create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false)
            .unwrap();

        assert!(said.descriptor().unwrap().include_owner());
    }

    #[test]
    fn test_inbound_envelope_reaches_listeners_in_order() {
        let (endpoint, mut outbox) = endpoint();
        let say: RemoteCall2<String, i32> = RemoteCall2::new();
        let id = say
            .create::<Chat>(&endpoint, "CmdSay", Direction::OriginToOwner, false)
            .unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        say.add_listener(move |_, (text, n): &(String, i32)| {
            first.lock().unwrap().push(format!("a:{text}:{n}"));
        });
        let second = Arc::clone(&order);
        say.add_listener(move |info, _| {
            second.lock().unwrap().push(format!("b:{}", info.entity));
        });

        say.invoke(EntityId(2), ("hey".to_string(), 5), None).unwrap();
        let packet = drain(&mut outbox).remove(0);

        let ran = endpoint
            .registry()
            .dispatch_inbound(
                id,
                &packet.payload,
                SenderContext {
                    sender: Some(packet.from),
                    entity: packet.entity,
                },
            )
            .unwrap();

        assert_eq!(ran, 2);
        assert_eq!(*order.lock().unwrap(), vec!["a:hey:5", "b:E-2"]);
    }

    #[test]
    fn test_set_listener_clears_previous_listeners() {
        let call: RemoteCall0 = RemoteCall0::new();
        let hits = Arc::new(AtomicUsize::new(0));
        call.add_listener(|_, _| {});
        call.add_listener(|_, _| {});
        let counter = Arc::clone(&hits);
        call.set_listener(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call.listener_count(), 1);
        call.clear_listeners();
        assert_eq!(call.listener_count(), 0);
    }

    #[test]
    fn test_listener_added_after_create_still_runs() {
        let (endpoint, _outbox) = endpoint();
        let said: RemoteCall0 = RemoteCall0::new();
        let id = said
            .create::<Chat>(&endpoint, "RpcSaid", Direction::OwnerToAll, false)
            .unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        said.add_listener(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let context = SenderContext {
            sender: Some(PeerId(0)),
            entity: EntityId(1),
        };
        endpoint.registry().dispatch_inbound(id, &[], context).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
