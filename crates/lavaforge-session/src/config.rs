//! Node configuration: where the node is and how to behave when it drops.
//!
//! [`NodeConfig`] is an explicit value handed to
//! [`NodeSession`](crate::NodeSession). There is no global configuration;
//! two sessions can talk to two nodes with different settings.

use std::time::Duration;

use lavaforge_transport::ConnectRequest;
use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// NodeConfig
// ---------------------------------------------------------------------------

/// Largest event backlog a session keeps per subscriber.
pub const MAX_RECEIVE_BUFFER: usize = 1 << 16;

/// Connection and reconnection settings for one node.
///
/// Start from `NodeConfig::default()` (a node on localhost with the stock
/// password) or [`NodeConfig::new`], then override with the builder
/// methods:
///
/// ```rust
/// use std::time::Duration;
/// use lavaforge_session::NodeConfig;
///
/// let config = NodeConfig::new("lavalink.internal", 2333)
///     .password("hunter2")
///     .user_id(1_234_567)
///     .reconnect_attempts(5)
///     .reconnect_interval(Duration::from_secs(3));
/// assert_eq!(config.url(), "ws://lavalink.internal:2333");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node host name or address.
    pub host: String,

    /// Node port.
    pub port: u16,

    /// Sent as the `Authorization` handshake header.
    pub password: String,

    /// Use `wss://` instead of `ws://`.
    pub secure: bool,

    /// The bot's user id, sent as `User-Id`.
    pub user_id: u64,

    /// Sent as `Client-Name`.
    pub client_name: String,

    /// How many decoded messages the event stream buffers for each
    /// listener before the slowest one starts losing them.
    pub receive_buffer: usize,

    /// Reconnect attempts after a connection loss before giving up.
    pub reconnect_attempts: u32,

    /// Wait before each reconnect attempt.
    pub reconnect_interval: Duration,

    /// Ask the node to keep players alive across reconnects.
    pub resuming: bool,

    /// How long the node keeps players alive for a resume.
    pub resume_timeout: Duration,

    /// Log verbosity used when `RUST_LOG` is unset
    /// (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 2333,
            password: "youshallnotpass".into(),
            secure: false,
            user_id: 0,
            client_name: concat!("lavaforge/", env!("CARGO_PKG_VERSION")).into(),
            receive_buffer: 512,
            reconnect_attempts: 10,
            reconnect_interval: Duration::from_secs(10),
            resuming: true,
            resume_timeout: Duration::from_secs(60),
            log_level: "info".into(),
        }
    }
}

impl NodeConfig {
    /// Creates a config for `host:port` with every other field defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn user_id(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn receive_buffer(mut self, size: usize) -> Self {
        self.receive_buffer = size;
        self
    }

    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn resuming(mut self, enabled: bool) -> Self {
        self.resuming = enabled;
        self
    }

    pub fn resume_timeout(mut self, timeout: Duration) -> Self {
        self.resume_timeout = timeout;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Checks the config and fixes what can be fixed.
    ///
    /// Called automatically by [`NodeSession`](crate::NodeSession)
    /// constructors. Rules:
    /// - empty `host` or `port` 0 are rejected.
    /// - `receive_buffer` is clamped to `1..=`[`MAX_RECEIVE_BUFFER`].
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] naming the offending field.
    pub fn validated(mut self) -> Result<Self, SessionError> {
        if self.host.trim().is_empty() {
            return Err(SessionError::InvalidConfig("host is empty".into()));
        }
        if self.port == 0 {
            return Err(SessionError::InvalidConfig("port must not be 0".into()));
        }
        if self.receive_buffer == 0 {
            tracing::warn!("receive_buffer is 0, raising to 1");
            self.receive_buffer = 1;
        }
        if self.receive_buffer > MAX_RECEIVE_BUFFER {
            tracing::warn!(
                receive_buffer = self.receive_buffer,
                max = MAX_RECEIVE_BUFFER,
                "receive_buffer too large, clamping"
            );
            self.receive_buffer = MAX_RECEIVE_BUFFER;
        }
        Ok(self)
    }

    /// Reads overrides from `LAVALINK_*` environment variables on top of
    /// the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `LAVALINK_HOST` | `host` |
    /// | `LAVALINK_PORT` | `port` |
    /// | `LAVALINK_PASSWORD` | `password` |
    /// | `LAVALINK_SECURE` | `secure` |
    /// | `LAVALINK_USER_ID` | `user_id` |
    /// | `LAVALINK_RECONNECT_ATTEMPTS` | `reconnect_attempts` |
    /// | `LAVALINK_RECONNECT_INTERVAL_SECS` | `reconnect_interval` |
    /// | `LAVALINK_LOG` | `log_level` |
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if a numeric variable doesn't parse.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SessionError> {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T, SessionError> {
            value
                .trim()
                .parse()
                .map_err(|_| SessionError::InvalidConfig(format!("{key}: cannot parse `{value}`")))
        }

        let mut config = Self::default();
        if let Some(v) = lookup("LAVALINK_HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("LAVALINK_PORT") {
            config.port = parse("LAVALINK_PORT", v)?;
        }
        if let Some(v) = lookup("LAVALINK_PASSWORD") {
            config.password = v;
        }
        if let Some(v) = lookup("LAVALINK_SECURE") {
            config.secure = parse("LAVALINK_SECURE", v)?;
        }
        if let Some(v) = lookup("LAVALINK_USER_ID") {
            config.user_id = parse("LAVALINK_USER_ID", v)?;
        }
        if let Some(v) = lookup("LAVALINK_RECONNECT_ATTEMPTS") {
            config.reconnect_attempts = parse("LAVALINK_RECONNECT_ATTEMPTS", v)?;
        }
        if let Some(v) = lookup("LAVALINK_RECONNECT_INTERVAL_SECS") {
            let secs: u64 = parse("LAVALINK_RECONNECT_INTERVAL_SECS", v)?;
            config.reconnect_interval = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("LAVALINK_LOG") {
            config.log_level = v;
        }
        Ok(config)
    }

    /// The WebSocket URL of the node.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Builds the handshake request. `Resume-Key` is only sent when
    /// resuming is enabled.
    pub fn connect_request(&self, resume_key: &str) -> ConnectRequest {
        let request = ConnectRequest::new(self.url())
            .header("Authorization", &self.password)
            .header("User-Id", self.user_id.to_string())
            .header("Client-Name", &self.client_name);
        if self.resuming {
            request.header("Resume-Key", resume_key)
        } else {
            request
        }
    }
}
