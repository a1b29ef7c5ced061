//! Node sessions for Lavaforge.
//!
//! This crate keeps a connection to an audio node alive and routes
//! traffic between it and the players:
//!
//! 1. **Connecting**: the handshake with credentials and a resume key
//!    ([`NodeConfig`], [`NodeSession::connect`])
//! 2. **Dispatch**: decoding inbound events, applying them to the guild's
//!    player and publishing them to listeners ([`NodeEvent`])
//! 3. **Reconnection**: a bounded number of attempts at a fixed interval
//!    after the connection drops ([`ReconnectPolicy`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← subscribes to NodeEvents, drives PlayerHandles
//!     ↕
//! Session Layer (this crate)  ← connection lifecycle, dispatch, reconnect
//!     ↕
//! Player Layer  ← per-guild state machines
//!     ↕
//! Protocol Layer  ← payloads, events, track codec
//!     ↕
//! Transport Layer (below)  ← WebSocket connections
//! ```

mod config;
mod error;
mod event;
mod handle;
mod node;
mod policy;
mod rest;

pub use config::{MAX_RECEIVE_BUFFER, NodeConfig};
pub use error::SessionError;
pub use event::{NodeEvent, NodeState};
pub use handle::PlayerHandle;
pub use node::NodeSession;
pub use policy::{Attempt, ReconnectPolicy};
pub use rest::{NoRest, NodeRest, RestError, SessionUpdate};
