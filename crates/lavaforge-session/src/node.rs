//! The node session: one connection to one node, kept alive.
//!
//! A [`NodeSession`] owns the connection, the guild → player registry,
//! and a supervisor task that runs for as long as the session does:
//!
//! ```text
//!            ┌────────────── receive loop ──────────────┐
//! connect ──→│ recv → EventDecoder → player → listeners │
//!            └───────────────────┬──────────────────────┘
//!                                │ read failure / close
//!                                ▼
//!            ┌──────────── reconnect loop ──────────────┐
//!            │ wait interval → connect → (fail: again)  │──→ Exhausted
//!            └───────────────────┬──────────────────────┘
//!                                │ success
//!                                └──→ back to the receive loop
//! ```
//!
//! The supervisor is the only task that reads from the connection, so
//! events for one guild are applied in the order the node sent them.
//! Application calls ([`send`](NodeSession::send) and every
//! [`PlayerHandle`] action) write concurrently through the same
//! connection; a failed write is returned to the caller and never
//! triggers a reconnect. Only the receive loop decides that the
//! connection is gone.

use std::sync::Arc;

use lavaforge_player::{PlayerRegistry, SharedPlayer};
use lavaforge_protocol::{
    Codec, EventDecoder, GuildId, InboundEvent, JsonCodec, Payload, ProtocolError,
};
use lavaforge_transport::{Connection, Connector};
use rand::Rng;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::{
    NoRest, NodeConfig, NodeEvent, NodeRest, NodeState, PlayerHandle, ReconnectPolicy,
    SessionError, SessionUpdate,
};

/// A client session with one audio node.
///
/// Cheap to clone; clones share the same connection and players.
///
/// # Example
///
/// ```rust,no_run
/// use lavaforge_session::{NodeConfig, NodeEvent, NodeSession};
/// use lavaforge_transport::WebSocketConnector;
///
/// # async fn run() -> Result<(), lavaforge_session::SessionError> {
/// let session = NodeSession::new(NodeConfig::default(), WebSocketConnector)?;
/// let mut events = session.subscribe();
/// session.connect().await?;
///
/// while let Ok(event) = events.recv().await {
///     if let NodeEvent::Exhausted { attempts } = event {
///         eprintln!("node gone after {attempts} attempts");
///         break;
///     }
/// }
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct NodeSession<C: Connector, R: NodeRest = NoRest> {
    inner: Arc<Inner<C, R>>,
}

impl<C: Connector, R: NodeRest> Clone for NodeSession<C, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// State shared between the session handles and the supervisor task.
struct Inner<C: Connector, R: NodeRest> {
    config: NodeConfig,
    connector: C,
    rest: R,
    codec: JsonCodec,
    decoder: EventDecoder,
    /// Presented as `Resume-Key` on every handshake of this session.
    resume_key: String,
    connection: Mutex<Option<Arc<C::Connection>>>,
    registry: PlayerRegistry,
    events: broadcast::Sender<NodeEvent>,
    state: watch::Sender<NodeState>,
    policy: Mutex<ReconnectPolicy>,
    /// The node's id for this session, from the last `ready`.
    session_id: Mutex<Option<String>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

/// Why the receive loop stopped.
enum LoopExit {
    /// The connection failed or the node closed it.
    Lost,
    /// The application closed the session.
    Closed,
}

impl<C: Connector> NodeSession<C, NoRest> {
    /// Creates a session without a REST collaborator.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: NodeConfig, connector: C) -> Result<Self, SessionError> {
        Self::with_rest(config, connector, NoRest)
    }
}

impl<C: Connector, R: NodeRest> NodeSession<C, R> {
    /// Creates a session that calls `rest` to keep node sessions alive
    /// across reconnects.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `config` fails validation.
    pub fn with_rest(config: NodeConfig, connector: C, rest: R) -> Result<Self, SessionError> {
        let config = config.validated()?;
        let (events, _) = broadcast::channel(config.receive_buffer);
        let (state, _) = watch::channel(NodeState::Disconnected);
        let policy = ReconnectPolicy::from_config(&config);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                connector,
                rest,
                codec: JsonCodec,
                decoder: EventDecoder,
                resume_key: generate_resume_key(),
                connection: Mutex::new(None),
                registry: PlayerRegistry::new(),
                events,
                state,
                policy: Mutex::new(policy),
                session_id: Mutex::new(None),
                supervisor: Mutex::new(None),
            }),
        })
    }

    /// Connects to the node and starts the supervisor.
    ///
    /// On a failed handshake the session still enters `Reconnecting` and
    /// keeps trying in the background; the error is returned so the caller
    /// knows the first attempt didn't work. That first failure doesn't
    /// count against the reconnect attempts.
    ///
    /// Calling `connect` again after attempts were exhausted starts over
    /// with a fresh attempt counter.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyRunning`] unless the session is `Disconnected`.
    /// - [`SessionError::Closed`] after [`close`](Self::close).
    /// - [`SessionError::Transport`] if the handshake failed.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        if !inner.transition(&[NodeState::Disconnected], NodeState::Connecting) {
            return Err(match inner.current_state() {
                NodeState::Closed => SessionError::Closed,
                _ => SessionError::AlreadyRunning,
            });
        }
        inner.policy.lock().await.reset();

        let (conn, outcome) = match inner.open().await {
            Ok(conn) => (Some(conn), Ok(())),
            Err(SessionError::Closed) => return Err(SessionError::Closed),
            Err(e) => {
                tracing::warn!(error = %e, "initial connect failed");
                if !inner.transition(&[NodeState::Connecting], NodeState::Reconnecting) {
                    return Err(e);
                }
                (None, Err(e))
            }
        };

        let mut supervisor = inner.supervisor.lock().await;
        *supervisor = Some(tokio::spawn(Arc::clone(inner).supervise(conn)));
        outcome
    }

    /// Shuts the session down for good.
    ///
    /// Cancels a pending reconnect wait, stops the supervisor, closes the
    /// connection and drops every player. Calling it twice is harmless.
    pub async fn close(&self) {
        let inner = &self.inner;
        let previous = inner.state.send_replace(NodeState::Closed);
        if previous == NodeState::Closed {
            return;
        }
        tracing::info!(from = %previous, "closing node session");

        let supervisor = inner.supervisor.lock().await.take();
        if let Some(handle) = supervisor {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "supervisor task failed");
                }
            }
        }

        let conn = inner.connection.lock().await.take();
        if let Some(conn) = conn {
            if let Err(e) = conn.close().await {
                tracing::debug!(error = %e, "error while closing connection");
            }
        }

        let players = inner.registry.clear().await;
        tracing::info!(players, "node session closed");
        inner.emit(NodeEvent::Closed);
    }

    /// Serializes and sends one command.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] unless the session is `Connected`.
    /// - [`SessionError::Closed`] after [`close`](Self::close).
    /// - [`SessionError::Transport`] if the write failed. The session
    ///   doesn't reconnect because of it.
    pub async fn send(&self, payload: &Payload) -> Result<(), SessionError> {
        self.inner.send(payload).await
    }

    /// Returns a handle to the player for `guild_id`, creating the player
    /// on first use.
    pub async fn player(&self, guild_id: GuildId) -> PlayerHandle<C, R> {
        let player = self.inner.registry.get_or_create(guild_id).await;
        PlayerHandle::new(guild_id, player, self.clone())
    }

    /// Destroys the player for `guild_id` on the node and forgets it.
    ///
    /// Returns `false` if there was no such player. The local entry is
    /// removed even when the session is not connected.
    ///
    /// # Errors
    /// [`SessionError::Transport`] if the `destroy` command could not be
    /// written.
    pub async fn remove_player(&self, guild_id: GuildId) -> Result<bool, SessionError> {
        let Some(player) = self.inner.registry.remove(guild_id).await else {
            return Ok(false);
        };
        let payload = player.lock().await.disconnect();
        match self.inner.send(&payload).await {
            Ok(()) | Err(SessionError::NotConnected) | Err(SessionError::Closed) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Subscribes to session notifications.
    ///
    /// Each receiver buffers up to `receive_buffer` events; a receiver
    /// that falls further behind skips the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> NodeState {
        self.inner.current_state()
    }

    /// Waits until the session reaches `target`.
    ///
    /// Returns at once if it's already there.
    pub async fn wait_for_state(&self, target: NodeState) -> Result<(), SessionError> {
        let mut state = self.inner.state.subscribe();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }

    /// The node's session id from the last `ready` message.
    pub async fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().await.clone()
    }

    /// The key this session presents to resume players after a reconnect.
    pub fn resume_key(&self) -> &str {
        &self.inner.resume_key
    }

    /// Reconnect attempts made since the last successful connect.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.policy.lock().await.attempts()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// Every player of this session.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.inner.registry
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

impl<C: Connector, R: NodeRest> Inner<C, R> {
    fn current_state(&self) -> NodeState {
        *self.state.borrow()
    }

    /// Moves to `to` if the current state is one of `from`.
    ///
    /// Check and update happen under the watch lock, so a concurrent
    /// `close()` can never be overwritten.
    fn transition(&self, from: &[NodeState], to: NodeState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if from.contains(state) {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::debug!(state = %to, "node state changed");
        }
        changed
    }

    fn emit(&self, event: NodeEvent) {
        // No listeners is fine.
        let _ = self.events.send(event);
    }

    async fn send(&self, payload: &Payload) -> Result<(), SessionError> {
        match self.current_state() {
            NodeState::Connected => {}
            NodeState::Closed => return Err(SessionError::Closed),
            _ => return Err(SessionError::NotConnected),
        }
        let conn = self
            .connection
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotConnected)?;
        let bytes = self.codec.encode(payload)?;
        conn.send(&bytes).await?;
        tracing::debug!(op = payload.op(), guild_id = ?payload.guild_id(), "command sent");
        Ok(())
    }

    /// Opens a connection and moves `Connecting → Connected`.
    async fn open(&self) -> Result<Arc<C::Connection>, SessionError> {
        let request = self.config.connect_request(&self.resume_key);
        tracing::debug!(url = %request.url, "opening node connection");
        let conn = Arc::new(self.connector.connect(&request).await?);
        *self.connection.lock().await = Some(Arc::clone(&conn));

        if !self.transition(&[NodeState::Connecting], NodeState::Connected) {
            // Closed while the handshake was in flight.
            self.connection.lock().await.take();
            let _ = conn.close().await;
            return Err(SessionError::Closed);
        }
        tracing::info!(conn_id = %conn.id(), url = %request.url, "connected to node");

        if self.config.resuming {
            let payload = Payload::configure_resuming(
                self.resume_key.as_str(),
                self.config.resume_timeout.as_secs(),
            );
            if let Err(e) = self.send(&payload).await {
                tracing::warn!(error = %e, "failed to configure resuming");
            }
        }
        Ok(conn)
    }

    /// Runs until the session is closed or reconnecting gives up.
    async fn supervise(self: Arc<Self>, mut conn: Option<Arc<C::Connection>>) {
        loop {
            if let Some(active) = conn.take() {
                let exit = self.receive_loop(&active).await;
                if let LoopExit::Closed = exit {
                    return;
                }
                self.connection.lock().await.take();
                let _ = active.close().await;
                if !self.transition(&[NodeState::Connected], NodeState::Reconnecting) {
                    return;
                }
            }
            match self.reconnect().await {
                Some(next) => conn = Some(next),
                None => return,
            }
        }
    }

    async fn receive_loop(&self, conn: &C::Connection) -> LoopExit {
        let mut state = self.state.subscribe();
        let conn_id = conn.id();

        loop {
            let received = tokio::select! {
                received = conn.recv() => received,
                _ = closed(&mut state) => return LoopExit::Closed,
            };
            let data = match received {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::warn!(%conn_id, "node closed the connection");
                    return LoopExit::Lost;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "receive failed");
                    return LoopExit::Lost;
                }
            };

            match self.decoder.decode(&data) {
                Ok(event) => {
                    tracing::debug!(%conn_id, kind = event.kind(), "event received");
                    self.dispatch(event).await;
                }
                Err(ProtocolError::UnknownEventType(kind)) => {
                    tracing::warn!(%conn_id, %kind, "dropping message of unknown type");
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "dropping undecodable message");
                }
            }
        }
    }

    /// Applies an event to its player, then hands it to listeners.
    async fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::Ready(ready) => {
                tracing::info!(
                    session_id = %ready.session_id,
                    resumed = ready.resumed,
                    "node ready"
                );
                *self.session_id.lock().await = Some(ready.session_id.clone());
                self.emit(NodeEvent::Ready(ready));
            }
            InboundEvent::Stats(stats) => {
                tracing::debug!(
                    players = stats.players,
                    playing = stats.playing_players,
                    "node stats"
                );
                self.emit(NodeEvent::Stats(stats));
            }
            event => {
                let Some(guild_id) = event.guild_id() else {
                    return;
                };
                if let Some(player) = self.registry.get(guild_id).await {
                    self.reconcile(&player, &event).await;
                }
                self.emit(NodeEvent::Player { guild_id, event });
            }
        }
    }

    /// Applies `event` to `player`, sending any follow-up command.
    ///
    /// The player lock is held throughout, so transitions for one guild
    /// never interleave.
    async fn reconcile(&self, player: &SharedPlayer, event: &InboundEvent) {
        let mut player = player.lock().await;
        let mut staged = player.clone();
        let Some(follow_up) = staged.apply_event(event) else {
            *player = staged;
            return;
        };
        match self.send(&follow_up).await {
            Ok(()) => *player = staged,
            Err(e) => {
                tracing::warn!(
                    guild_id = %player.guild_id(),
                    error = %e,
                    "could not start next track"
                );
                player.end_current();
            }
        }
    }

    /// Waits and retries until a connection is up, the policy gives up, or
    /// the session is closed.
    async fn reconnect(self: &Arc<Self>) -> Option<Arc<C::Connection>> {
        let mut state = self.state.subscribe();
        let interval = self.config.reconnect_interval;

        loop {
            let next = self.policy.lock().await.next_attempt();
            let Some(attempt) = next else {
                let attempts = self.policy.lock().await.attempts();
                if self.transition(&[NodeState::Reconnecting], NodeState::Disconnected) {
                    tracing::error!(attempts, "reconnect attempts exhausted, giving up");
                    self.emit(NodeEvent::Exhausted { attempts });
                }
                return None;
            };

            tracing::warn!(
                attempt = attempt.number,
                is_final = attempt.is_final,
                interval_ms = interval.as_millis() as u64,
                "connection lost, reconnecting"
            );
            self.emit(NodeEvent::Reconnecting {
                attempt: attempt.number,
                is_final: attempt.is_final,
            });

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = closed(&mut state) => return None,
            }
            if !self.transition(&[NodeState::Reconnecting], NodeState::Connecting) {
                return None;
            }

            match self.open().await {
                Ok(conn) => {
                    self.policy.lock().await.reset();
                    tracing::info!(attempt = attempt.number, "reconnected to node");
                    self.resume_session().await;
                    self.emit(NodeEvent::Reconnected);
                    return Some(conn);
                }
                Err(SessionError::Closed) => return None,
                Err(e) => {
                    tracing::warn!(attempt = attempt.number, error = %e, "reconnect attempt failed");
                    if !self.transition(&[NodeState::Connecting], NodeState::Reconnecting) {
                        return None;
                    }
                }
            }
        }
    }

    /// Asks the node, over REST, to keep this session's players.
    ///
    /// Fire-and-forget: the socket stays authoritative for player state.
    async fn resume_session(self: &Arc<Self>) {
        if !self.config.resuming {
            return;
        }
        let Some(session_id) = self.session_id.lock().await.clone() else {
            tracing::debug!("no node session id yet, skipping session update");
            return;
        };
        let update = SessionUpdate {
            resuming: true,
            timeout: self.config.resume_timeout.as_secs(),
        };

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = inner.rest.update_session(&session_id, update).await {
                tracing::warn!(%session_id, error = %e, "session update failed");
            }
        });
    }
}

/// Resolves once the session is `Closed`.
async fn closed(state: &mut watch::Receiver<NodeState>) {
    // A dropped sender means the session is gone as well.
    let _ = state.wait_for(|s| *s == NodeState::Closed).await;
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_resume_key() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
