use std::sync::Arc;
use std::time::Duration;

use plumber::prelude::*;
use rand::Rng;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Owner type
// ---------------------------------------------------------------------------

struct HelloBehaviour;

impl NetworkBehaviour for HelloBehaviour {
    const NAMESPACE: &'static str = "HelloPlumbing";
    const TYPE_NAME: &'static str = "HelloBehaviour";
    const OPERATIONS: &'static [OperationSig] = &[
        OperationSig::void("CmdSendHello"),
        OperationSig::void("TargetRpcMessage"),
    ];
}

const GREETING: &str = "Hello World from the network!";

/// The calls and the synced score one peer holds for the behaviour.
struct HelloCalls {
    send_hello: Arc<RemoteCall0>,
    message: Arc<RemoteCall2<String, i32>>,
    score: SyncedField<HelloBehaviour, i32>,
}

impl HelloCalls {
    fn create(endpoint: &Arc<Endpoint>) -> Result<Self, PlumberError> {
        let send_hello: Arc<RemoteCall0> = Arc::new(RemoteCall0::new());
        send_hello.create::<HelloBehaviour>(
            endpoint,
            "CmdSendHello",
            Direction::OriginToOwner,
            false,
        )?;

        let message: Arc<RemoteCall2<String, i32>> = Arc::new(RemoteCall2::new());
        message.create::<HelloBehaviour>(
            endpoint,
            "TargetRpcMessage",
            Direction::OwnerToOne,
            false,
        )?;

        let score = SyncedField::create(endpoint, "score")?;
        Ok(Self {
            send_hello,
            message,
            score,
        })
    }
}

/// Server side: answer every hello with a targeted message to its sender.
fn wire_server(calls: &HelloCalls) {
    let reply = Arc::downgrade(&calls.message);
    calls.send_hello.set_listener(move |info, _| {
        let Some(reply) = reply.upgrade() else {
            return;
        };
        let value = rand::rng().random_range(0..1337);
        tracing::info!(sender = ?info.sender, entity = %info.entity, "hello received");
        if let Err(err) = reply.invoke(info.entity, (GREETING.to_string(), value), info.sender) {
            tracing::warn!(%err, "reply not sent");
        }
    });
}

/// Client side: log whatever the server says.
fn wire_client(calls: &HelloCalls, peer: PeerId) {
    calls
        .message
        .set_listener(move |_, (message, value): &(String, i32)| {
            tracing::info!(%peer, %message, value, "message from the network");
        });
}

#[tokio::main]
async fn main() -> Result<(), PlumberError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut network = LocalNetwork::new(NetworkConfig::default());
    let client = network.add_client();
    let watcher = network.add_client();
    let entity = network.spawn(Some(client));

    let server_calls = HelloCalls::create(network.server())?;
    wire_server(&server_calls);

    let mut client_calls = Vec::new();
    for peer in [client, watcher] {
        let Some(endpoint) = network.endpoint(peer) else {
            continue;
        };
        let calls = HelloCalls::create(endpoint)?;
        wire_client(&calls, peer);
        client_calls.push((peer, calls));
    }

    let server_score = server_calls.score.bind(entity, 0);
    let watcher_score = client_calls
        .iter()
        .find(|(peer, _)| *peer == watcher)
        .map(|(_, calls)| calls.score.bind(entity, 0));
    if let Some(score) = &watcher_score {
        score.subscribe(move |points| tracing::info!(%watcher, points, "score changed"));
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    for tick in 1..=3 {
        ticker.tick().await;

        if let Some((_, calls)) = client_calls.iter().find(|(peer, _)| *peer == client) {
            calls.send_hello.invoke(entity, (), None)?;
        }
        server_score.set(tick * 10)?;

        let stats = network.pump();
        tracing::debug!(tick, ?stats, "pumped");
    }

    tracing::info!(score = server_score.get(), "done");
    Ok(())
}
