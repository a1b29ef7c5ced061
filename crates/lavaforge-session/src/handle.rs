//! Application-side handle to one guild's player.

use lavaforge_player::{Player, PlayerError, PlayerSnapshot, PlayerState, SharedPlayer};
use lavaforge_protocol::{EqualizerBand, Filters, GuildId, Payload, Track};
use lavaforge_transport::Connector;

use crate::{NoRest, NodeRest, NodeSession, SessionError};

/// Drives one guild's player through its session.
///
/// Every action is transactional: it runs against a copy of the player,
/// the resulting command is sent, and only then is the copy committed.
/// If the transition is illegal or the send fails, the player is exactly
/// as it was before the call.
///
/// Obtained from [`NodeSession::player`].
pub struct PlayerHandle<C: Connector, R: NodeRest = NoRest> {
    guild_id: GuildId,
    player: SharedPlayer,
    session: NodeSession<C, R>,
}

impl<C: Connector, R: NodeRest> Clone for PlayerHandle<C, R> {
    fn clone(&self) -> Self {
        Self {
            guild_id: self.guild_id,
            player: SharedPlayer::clone(&self.player),
            session: self.session.clone(),
        }
    }
}

impl<C: Connector, R: NodeRest> PlayerHandle<C, R> {
    pub(crate) fn new(guild_id: GuildId, player: SharedPlayer, session: NodeSession<C, R>) -> Self {
        Self {
            guild_id,
            player,
            session,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub async fn state(&self) -> PlayerState {
        self.player.lock().await.state()
    }

    /// A copy of the player's observable state.
    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.player.lock().await.snapshot()
    }

    /// The shared player, for reads the handle doesn't cover.
    pub fn player(&self) -> &SharedPlayer {
        &self.player
    }

    /// Relays voice credentials from the gateway to the node.
    pub async fn connect(
        &self,
        session_id: impl Into<String>,
        token: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<(), SessionError> {
        let (session_id, token, endpoint) = (session_id.into(), token.into(), endpoint.into());
        self.apply(|player| Ok(player.connect(session_id, token, endpoint)))
            .await
    }

    pub async fn play(&self, track: Track) -> Result<(), SessionError> {
        self.apply(|player| player.play(track)).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.apply(Player::pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.apply(Player::resume).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.apply(Player::stop).await
    }

    pub async fn skip(&self) -> Result<(), SessionError> {
        self.apply(Player::skip).await
    }

    /// Jumps to `position` milliseconds.
    pub async fn seek(&self, position: u64) -> Result<(), SessionError> {
        self.apply(|player| player.seek(position)).await
    }

    pub async fn set_volume(&self, volume: i32) -> Result<(), SessionError> {
        self.apply(|player| player.set_volume(volume)).await
    }

    pub async fn set_equalizer(
        &self,
        bands: impl IntoIterator<Item = EqualizerBand>,
    ) -> Result<(), SessionError> {
        self.apply(|player| player.set_equalizer(bands)).await
    }

    pub async fn set_filters(&self, filters: Filters) -> Result<(), SessionError> {
        self.apply(|player| player.set_filters(filters)).await
    }

    /// Destroys the player on the node. The player stays registered and
    /// keeps its queue.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.apply(|player| Ok(player.disconnect())).await
    }

    /// Queues `track` locally. Nothing is sent.
    pub async fn enqueue(&self, track: Track) {
        self.player.lock().await.enqueue(track);
    }

    /// Stage, send, commit.
    async fn apply<F>(&self, action: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut Player) -> Result<Payload, PlayerError>,
    {
        let mut player = self.player.lock().await;
        let mut staged = player.clone();
        let payload = action(&mut staged)?;
        self.session.send(&payload).await?;
        *player = staged;
        Ok(())
    }
}
