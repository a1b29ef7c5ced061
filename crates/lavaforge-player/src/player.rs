//! The per-guild player: now-playing, queue, and the rules for moving
//! between lifecycle states.
//!
//! A [`Player`] is a plain value. Every action validates against the
//! current [`PlayerState`], mutates the player, and returns the
//! [`Payload`] the node must receive for the change to be real. It never
//! talks to the network itself; the session decides when (and whether)
//! the returned command goes out.
//!
//! Because a failed action returns before touching anything, a caller
//! that wants all-or-nothing semantics clones the player, applies the
//! action to the clone, sends the payload, and keeps the clone only if
//! the send succeeded.

use std::collections::VecDeque;

use lavaforge_protocol::filters::EQUALIZER_BANDS;
use lavaforge_protocol::{
    EqualizerBand, Filters, GuildId, InboundEvent, Payload, Track, TrackEndReason,
};
use tokio::time::Instant;

use crate::{PlayerError, PlayerState};

/// Volume a fresh player starts with (percent).
pub const DEFAULT_VOLUME: u16 = 100;

/// A snapshot of player metadata, cheap to hand to the application.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub guild_id: GuildId,
    pub state: PlayerState,
    pub current: Option<Track>,
    pub queue_len: usize,
    pub volume: u16,
    /// Interpolated playback position in milliseconds.
    pub position: u64,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One guild's player state machine.
#[derive(Debug, Clone)]
pub struct Player {
    guild_id: GuildId,
    state: PlayerState,
    current: Option<Track>,
    queue: VecDeque<Track>,
    volume: u16,
    equalizer: [f32; EQUALIZER_BANDS as usize],
    filters: Filters,
    /// Last reported position, and when it was observed.
    position: u64,
    observed_at: Instant,
}

impl Player {
    /// Creates a disconnected player with an empty queue.
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            state: PlayerState::default(),
            current: None,
            queue: VecDeque::new(),
            volume: DEFAULT_VOLUME,
            equalizer: [0.0; EQUALIZER_BANDS as usize],
            filters: Filters::default(),
            position: 0,
            observed_at: Instant::now(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// The track that is playing or paused, if any.
    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Tracks waiting to play, front first.
    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    /// Direct access to the queue for reordering, removal or shuffling.
    ///
    /// Changing the queue never changes the lifecycle state.
    pub fn queue_mut(&mut self) -> &mut VecDeque<Track> {
        &mut self.queue
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    /// Current gain of each equalizer band, indexed by band.
    pub fn equalizer(&self) -> &[f32] {
        &self.equalizer
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Position from the last node report, without interpolation.
    pub fn last_position(&self) -> u64 {
        self.position
    }

    /// Best estimate of the playback position in milliseconds.
    ///
    /// While playing, the time elapsed since the last report is added to
    /// it. The result never exceeds the length of a non-stream track.
    pub fn current_position(&self) -> u64 {
        if self.state != PlayerState::Playing {
            return self.position;
        }
        let elapsed = u64::try_from(self.observed_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let position = self.position.saturating_add(elapsed);
        match &self.current {
            Some(track) if !track.info().is_stream => position.min(track.length()),
            _ => position,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            guild_id: self.guild_id,
            state: self.state,
            current: self.current.clone(),
            queue_len: self.queue.len(),
            volume: self.volume,
            position: self.current_position(),
        }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Relays voice credentials to the node.
    ///
    /// Moves a disconnected player to `Connected`. Any other state is kept:
    /// the voice server moved, playback carries on.
    pub fn connect(
        &mut self,
        session_id: impl Into<String>,
        token: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Payload {
        let payload = Payload::voice_update(self.guild_id, session_id, token, endpoint);
        if self.state == PlayerState::Disconnected {
            self.set_state(PlayerState::Connected);
        }
        payload
    }

    /// Plays `track` now.
    ///
    /// If nothing is current and `track` is waiting in the queue, its first
    /// occurrence is taken out. If a track is already playing it is
    /// replaced and the queue is left untouched; the node later reports it
    /// as ended with [`TrackEndReason::Replaced`].
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] while `Disconnected`.
    pub fn play(&mut self, track: Track) -> Result<Payload, PlayerError> {
        self.require("play", self.state.is_connected())?;
        if self.current.is_none() {
            if let Some(index) = self.queue.iter().position(|queued| *queued == track) {
                self.queue.remove(index);
            }
        }
        Ok(self.start(track))
    }

    /// Pauses the current track.
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] unless `Playing`.
    pub fn pause(&mut self) -> Result<Payload, PlayerError> {
        self.require("pause", self.state == PlayerState::Playing)?;
        // Freeze the interpolated position.
        self.position = self.current_position();
        self.set_state(PlayerState::Paused);
        Ok(Payload::pause(self.guild_id, true))
    }

    /// Resumes a paused track.
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] unless `Paused`.
    pub fn resume(&mut self) -> Result<Payload, PlayerError> {
        self.require("resume", self.state == PlayerState::Paused)?;
        self.observed_at = Instant::now();
        self.set_state(PlayerState::Playing);
        Ok(Payload::pause(self.guild_id, false))
    }

    /// Stops playback and clears the current track. The queue is kept.
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] unless `Playing` or `Paused`.
    pub fn stop(&mut self) -> Result<Payload, PlayerError> {
        self.require("stop", self.state.is_active())?;
        self.clear_current();
        self.set_state(PlayerState::Stopped);
        Ok(Payload::stop(self.guild_id))
    }

    /// Appends `track` to the queue. Legal in every state.
    pub fn enqueue(&mut self, track: Track) {
        self.queue.push_back(track);
    }

    /// Plays the next queued track, or stops if the queue is empty.
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] while `Disconnected`, or when
    /// there is neither a next track nor anything to stop.
    pub fn skip(&mut self) -> Result<Payload, PlayerError> {
        self.require("skip", self.state.is_connected())?;
        match self.queue.pop_front() {
            Some(next) => Ok(self.start(next)),
            None if self.state.is_active() => self.stop(),
            None => Err(PlayerError::InvalidTransition {
                from: self.state,
                action: "skip",
            }),
        }
    }

    /// Jumps to `position` milliseconds in the current track.
    ///
    /// # Errors
    /// [`PlayerError::InvalidTransition`] unless `Playing` or `Paused`.
    pub fn seek(&mut self, position: u64) -> Result<Payload, PlayerError> {
        self.require("seek", self.state.is_active())?;
        self.record_position(position);
        Ok(Payload::seek(self.guild_id, position))
    }

    /// Sets the volume, `0..=1000`.
    ///
    /// # Errors
    /// [`PlayerError::Protocol`] wrapping `InvalidVolume`; the stored
    /// volume is unchanged.
    pub fn set_volume(&mut self, volume: i32) -> Result<Payload, PlayerError> {
        let payload = Payload::set_volume(self.guild_id, volume)?;
        if let Payload::SetVolume { volume, .. } = payload {
            self.volume = volume.get();
        }
        Ok(payload)
    }

    /// Adjusts equalizer bands. Bands not listed keep their gain.
    ///
    /// # Errors
    /// [`PlayerError::Protocol`] wrapping `InvalidBand`; no band changes.
    pub fn set_equalizer(
        &mut self,
        bands: impl IntoIterator<Item = EqualizerBand>,
    ) -> Result<Payload, PlayerError> {
        let payload = Payload::set_equalizer(self.guild_id, bands)?;
        if let Payload::SetEqualizer { bands, .. } = &payload {
            for band in bands {
                self.equalizer[usize::from(band.band)] = band.gain;
            }
        }
        Ok(payload)
    }

    /// Replaces the filter set.
    ///
    /// # Errors
    /// [`PlayerError::Protocol`] if a filter is out of range.
    pub fn set_filters(&mut self, filters: Filters) -> Result<Payload, PlayerError> {
        let payload = Payload::set_filters(self.guild_id, filters.clone())?;
        self.filters = filters;
        Ok(payload)
    }

    /// Tears the player down on the node. Legal in every state.
    ///
    /// The queue survives so a later `connect` can pick it up again.
    pub fn disconnect(&mut self) -> Payload {
        self.clear_current();
        self.set_state(PlayerState::Disconnected);
        Payload::destroy(self.guild_id)
    }

    /// Drops the current track without advancing the queue.
    ///
    /// Used when the follow-up `play` from [`apply_event`](Self::apply_event)
    /// could not be delivered.
    pub fn end_current(&mut self) {
        self.clear_current();
        if self.state.is_connected() {
            self.set_state(PlayerState::Stopped);
        }
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Applies an inbound event from the node.
    ///
    /// Returns the follow-up command if the event calls for one: a `play`
    /// for the next queued track when the current one ended. Events for
    /// other guilds, and node-wide events, are ignored.
    pub fn apply_event(&mut self, event: &InboundEvent) -> Option<Payload> {
        if event.guild_id() != Some(self.guild_id) {
            return None;
        }

        match event {
            InboundEvent::PlayerUpdate(update) => {
                self.record_position(update.state.position);
                None
            }
            InboundEvent::TrackStarted(_) => {
                // Audio starts after loading; re-anchor interpolation here.
                if self.state == PlayerState::Playing {
                    self.observed_at = Instant::now();
                }
                None
            }
            InboundEvent::TrackEnded(ended) => {
                self.on_track_end(ended.track.as_deref(), ended.reason)
            }
            InboundEvent::TrackException(e) => {
                tracing::warn!(
                    guild_id = %self.guild_id,
                    severity = ?e.exception.severity,
                    reason = e.exception.message.as_deref().unwrap_or(""),
                    "track exception"
                );
                None
            }
            InboundEvent::TrackStuck(stuck) => {
                tracing::warn!(
                    guild_id = %self.guild_id,
                    threshold_ms = stuck.threshold_ms,
                    "track stuck"
                );
                None
            }
            InboundEvent::SocketClosed(closed) => {
                tracing::info!(
                    guild_id = %self.guild_id,
                    code = closed.code,
                    by_remote = closed.by_remote,
                    "voice socket closed"
                );
                self.clear_current();
                self.set_state(PlayerState::Disconnected);
                None
            }
            InboundEvent::Ready(_) | InboundEvent::Stats(_) => None,
        }
    }

    fn on_track_end(&mut self, track: Option<&str>, reason: TrackEndReason) -> Option<Payload> {
        if let Some(signature) = track {
            if self.current.as_ref().map(Track::signature) != Some(signature) {
                // Late report for a track this player already moved past.
                tracing::debug!(guild_id = %self.guild_id, ?reason, "ignoring stale track end");
                return None;
            }
        }
        if !reason.may_start_next() {
            return None;
        }
        if !self.state.is_connected() {
            self.clear_current();
            return None;
        }
        match self.queue.pop_front() {
            Some(next) => Some(self.start(next)),
            None => {
                self.clear_current();
                if self.state.can_transition_to(PlayerState::Stopped) {
                    self.set_state(PlayerState::Stopped);
                }
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Makes `track` current and returns the `play` that starts it.
    fn start(&mut self, track: Track) -> Payload {
        let mut payload = Payload::play(self.guild_id, &track);
        if self.state == PlayerState::Paused {
            // The node keeps its pause flag across plays.
            payload = payload.with_pause(false);
        }
        let start = track.position();
        self.current = Some(track);
        self.record_position(start);
        self.set_state(PlayerState::Playing);
        payload
    }

    fn record_position(&mut self, position: u64) {
        self.position = position;
        self.observed_at = Instant::now();
        if let Some(track) = &mut self.current {
            track.set_position(position);
        }
    }

    fn clear_current(&mut self) {
        self.current = None;
        self.position = 0;
    }

    fn require(&self, action: &'static str, allowed: bool) -> Result<(), PlayerError> {
        if allowed {
            Ok(())
        } else {
            Err(PlayerError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn set_state(&mut self, next: PlayerState) {
        if self.state != next {
            tracing::debug!(
                guild_id = %self.guild_id,
                from = %self.state,
                to = %next,
                "player state changed"
            );
            self.state = next;
        }
    }
}
