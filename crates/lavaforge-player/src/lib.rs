//! Per-guild player state for Lavaforge.
//!
//! Each guild the bot plays audio in has one [`Player`]: the current
//! track, a FIFO queue, volume and filters, and a lifecycle
//! [`PlayerState`]. Players are plain values; the session layer owns them
//! through a [`PlayerRegistry`] and delivers the commands they produce.
//!
//! # Key types
//!
//! - [`Player`]: the state machine, actions return the command to send
//! - [`PlayerState`]: `Disconnected`, `Connected`, `Playing`, `Paused`, `Stopped`
//! - [`PlayerRegistry`]: guild → [`SharedPlayer`] map, one per session
//! - [`PlayerError`]: rejected transitions and invalid arguments

mod error;
mod player;
mod registry;
mod state;

pub use error::PlayerError;
pub use player::{DEFAULT_VOLUME, Player, PlayerSnapshot};
pub use registry::{PlayerRegistry, SharedPlayer};
pub use state::PlayerState;
