use lavaforge::prelude::*;
use tokio::sync::broadcast::error::RecvError;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// What to play, from `JUKEBOX_*` variables. The voice credentials normally
/// come from the chat platform's gateway; here they're passed in by hand.
struct Playlist {
    guild_id: GuildId,
    voice_session: String,
    voice_token: String,
    voice_endpoint: String,
    tracks: Vec<Track>,
}

impl Playlist {
    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, LavaforgeError> {
        let Some(guild) = lookup("JUKEBOX_GUILD") else {
            return Ok(None);
        };
        let var = |key: &str| {
            lookup(key).ok_or_else(|| {
                SessionError::InvalidConfig(format!("{key} is required with JUKEBOX_GUILD"))
            })
        };

        Ok(Some(Self {
            guild_id: guild.parse()?,
            voice_session: var("JUKEBOX_VOICE_SESSION")?,
            voice_token: var("JUKEBOX_VOICE_TOKEN")?,
            voice_endpoint: var("JUKEBOX_VOICE_ENDPOINT")?,
            tracks: parse_tracks(&var("JUKEBOX_TRACKS")?)?,
        }))
    }
}

/// Comma-separated track signatures.
fn parse_tracks(list: &str) -> Result<Vec<Track>, LavaforgeError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Track::from_signature(s).map_err(LavaforgeError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::from_env()?;
    lavaforge::logging::init(&config.log_level);
    let playlist = Playlist::from_lookup(|key| std::env::var(key).ok())?;

    let session = LavaforgeBuilder::new().config(config).build()?;
    let mut events = session.subscribe();
    session.connect().await?;

    if let Some(playlist) = playlist {
        let player = session.player(playlist.guild_id).await;
        player
            .connect(
                playlist.voice_session,
                playlist.voice_token,
                playlist.voice_endpoint,
            )
            .await?;
        let mut tracks = playlist.tracks.into_iter();
        if let Some(first) = tracks.next() {
            for track in tracks {
                player.enqueue(track).await;
            }
            player.play(first).await?;
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(NodeEvent::Player { guild_id, event: InboundEvent::TrackStarted(_) }) => {
                    tracing::info!(%guild_id, "now playing");
                }
                Ok(NodeEvent::Stats(stats)) => {
                    tracing::info!(players = stats.players, playing = stats.playing_players, "node stats");
                }
                Ok(NodeEvent::Exhausted { attempts }) => {
                    tracing::error!(attempts, "node unreachable, exiting");
                    break;
                }
                Ok(event) => tracing::debug!(?event, "node event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    session.close().await;
    Ok(())
}
