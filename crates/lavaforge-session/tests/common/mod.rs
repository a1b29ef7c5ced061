//! An in-memory node for session tests.
//!
//! [`MockConnector`] hands out [`MockConnection`]s backed by channels. For
//! every accepted connection the test receives the node's end
//! ([`NodeSide`]) through [`Incoming`]; dropping it is how a test pulls
//! the plug.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lavaforge_protocol::{GuildId, Track, TrackInfo};
use lavaforge_session::{NodeConfig, NodeEvent};
use lavaforge_transport::{ConnectRequest, Connection, ConnectionId, Connector, TransportError};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};

// =========================================================================
// Fixtures
// =========================================================================

pub const GUILD: GuildId = GuildId(614_000_000_000_000_001);
pub const INTERVAL: Duration = Duration::from_secs(5);

/// Generous, but paused time makes it free.
const WAIT: Duration = Duration::from_secs(600);

pub fn config(attempts: u32) -> NodeConfig {
    NodeConfig::new("node.test", 2333)
        .password("youshallnotpass")
        .user_id(42)
        .client_name("lavaforge-tests/0")
        .reconnect_attempts(attempts)
        .reconnect_interval(INTERVAL)
        .resuming(false)
}

pub fn track(title: &str) -> Track {
    Track::from_info(TrackInfo {
        identifier: format!("id-{title}"),
        title: title.into(),
        author: "The Band".into(),
        length: 180_000,
        source_name: "youtube".into(),
        ..TrackInfo::default()
    })
    .unwrap()
}

/// Receives the next session event, failing the test if none arrives.
pub async fn next_event(events: &mut broadcast::Receiver<NodeEvent>) -> NodeEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a node event")
        .expect("event channel should stay open")
}

/// Skips events until one matches.
pub async fn wait_for_event(
    events: &mut broadcast::Receiver<NodeEvent>,
    matches: impl Fn(&NodeEvent) -> bool,
) -> NodeEvent {
    loop {
        let event = next_event(events).await;
        if matches(&event) {
            return event;
        }
    }
}

// =========================================================================
// Connector
// =========================================================================

#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

struct MockState {
    refuse: AtomicBool,
    fail_sends: Arc<AtomicBool>,
    next_id: AtomicU64,
    requests: Mutex<Vec<ConnectRequest>>,
    accepted: mpsc::UnboundedSender<NodeSide>,
}

impl MockConnector {
    pub fn new() -> (Self, Incoming) {
        let (accepted, incoming) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(MockState {
                refuse: AtomicBool::new(false),
                fail_sends: Arc::new(AtomicBool::new(false)),
                next_id: AtomicU64::new(0),
                requests: Mutex::new(Vec::new()),
                accepted,
            }),
        };
        (connector, Incoming(incoming))
    }

    /// While set, every handshake is refused.
    pub fn refuse(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    /// While set, every write on every connection fails.
    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Handshakes attempted so far, refused ones included.
    pub fn connects(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ConnectRequest> {
        self.state.requests.lock().unwrap().last().cloned()
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self, request: &ConnectRequest) -> Result<MockConnection, TransportError> {
        self.state.requests.lock().unwrap().push(request.clone());
        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "node is down",
            )));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let id = ConnectionId::new(self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let _ = self.state.accepted.send(NodeSide {
            to_client,
            from_client,
        });

        Ok(MockConnection {
            id,
            inbound: tokio::sync::Mutex::new(inbound),
            outbound,
            fail_sends: Arc::clone(&self.state.fail_sends),
        })
    }
}

pub struct MockConnection {
    id: ConnectionId,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    fail_sends: Arc<AtomicBool>,
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        self.outbound.send(data.to_vec()).map_err(|_| {
            TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, "node went away"))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// =========================================================================
// Node side
// =========================================================================

/// Connections the connector accepted, in order.
pub struct Incoming(mpsc::UnboundedReceiver<NodeSide>);

impl Incoming {
    pub async fn accept(&mut self) -> NodeSide {
        tokio::time::timeout(WAIT, self.0.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector should stay alive")
    }
}

/// The node's end of one connection.
pub struct NodeSide {
    to_client: mpsc::UnboundedSender<Vec<u8>>,
    from_client: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl NodeSide {
    pub fn push(&self, message: Value) {
        let _ = self.to_client.send(message.to_string().into_bytes());
    }

    pub fn push_raw(&self, data: &[u8]) {
        let _ = self.to_client.send(data.to_vec());
    }

    /// Next command the client sent.
    pub async fn next_json(&mut self) -> Value {
        let data = tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a command")
            .expect("client should keep the connection open");
        serde_json::from_slice(&data).expect("commands are JSON")
    }

    /// Skips commands until one with the given `op`.
    pub async fn next_op(&mut self, op: &str) -> Value {
        loop {
            let json = self.next_json().await;
            if json["op"] == op {
                return json;
            }
        }
    }

    /// Returns `true` if a command is waiting, without blocking.
    pub fn has_pending(&mut self) -> bool {
        !self.from_client.is_empty()
    }
}
