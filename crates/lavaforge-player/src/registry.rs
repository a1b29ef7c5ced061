//! Player registry: the session-wide map from guild to player.

use std::collections::HashMap;
use std::sync::Arc;

use lavaforge_protocol::GuildId;
use tokio::sync::Mutex;

use crate::Player;

/// A player shared between the receive loop and application callers.
///
/// The mutex serializes transitions for one guild. Two guilds never
/// contend.
pub type SharedPlayer = Arc<Mutex<Player>>;

/// Tracks every guild's player for one node session.
///
/// The registry lock is held only while inserting, removing or looking up
/// an entry, never while a player transitions: callers clone the
/// [`SharedPlayer`] out and lock it separately.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: Mutex<HashMap<GuildId, SharedPlayer>>,
}

impl PlayerRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the player for `guild_id`, creating a disconnected one on
    /// first use.
    pub async fn get_or_create(&self, guild_id: GuildId) -> SharedPlayer {
        let mut players = self.players.lock().await;
        players
            .entry(guild_id)
            .or_insert_with(|| {
                tracing::info!(%guild_id, "player created");
                Arc::new(Mutex::new(Player::new(guild_id)))
            })
            .clone()
    }

    /// Returns the player for `guild_id` if one exists.
    pub async fn get(&self, guild_id: GuildId) -> Option<SharedPlayer> {
        self.players.lock().await.get(&guild_id).cloned()
    }

    /// Removes and returns the player for `guild_id`.
    pub async fn remove(&self, guild_id: GuildId) -> Option<SharedPlayer> {
        let removed = self.players.lock().await.remove(&guild_id);
        if removed.is_some() {
            tracing::info!(%guild_id, "player removed");
        }
        removed
    }

    /// Removes every player and returns how many there were.
    pub async fn clear(&self) -> usize {
        let mut players = self.players.lock().await;
        let count = players.len();
        players.clear();
        count
    }

    /// Returns cloned handles to all players.
    ///
    /// Useful when callers need to touch every player without holding the
    /// registry lock.
    pub async fn players(&self) -> Vec<SharedPlayer> {
        self.players.lock().await.values().cloned().collect()
    }

    /// Lists the guilds that have a player.
    pub async fn guild_ids(&self) -> Vec<GuildId> {
        self.players.lock().await.keys().copied().collect()
    }

    /// Returns the number of players.
    pub async fn len(&self) -> usize {
        self.players.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.lock().await.is_empty()
    }
}
