//! Hook for the node's REST control plane.
//!
//! Lavaforge doesn't ship an HTTP client. The WebSocket is authoritative
//! for player state; the only REST call the session itself needs is the
//! session update that keeps players alive across a reconnect. Instead of
//! picking an HTTP stack for you, the session calls the [`NodeRest`]
//! trait, and you implement it with whatever client your bot already uses.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Whatever error the application's HTTP client produces.
pub type RestError = Box<dyn std::error::Error + Send + Sync>;

/// Body of the node's `PATCH /sessions/{id}` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    /// Keep players alive after the WebSocket drops.
    pub resuming: bool,
    /// Seconds the node waits for a resume before destroying players.
    pub timeout: u64,
}

/// REST calls the session makes on the application's behalf.
///
/// Calls are spawned fire-and-forget: the session never waits for them,
/// and a failure is logged, not propagated.
///
/// # Example
///
/// ```rust
/// use lavaforge_session::{NodeRest, RestError, SessionUpdate};
///
/// /// Logs instead of calling the node. Handy in development.
/// struct LoggingRest;
///
/// impl NodeRest for LoggingRest {
///     async fn update_session(
///         &self,
///         session_id: &str,
///         update: SessionUpdate,
///     ) -> Result<(), RestError> {
///         println!("PATCH /v4/sessions/{session_id} {update:?}");
///         Ok(())
///     }
/// }
/// ```
pub trait NodeRest: Send + Sync + 'static {
    /// Updates the node-side session identified by `session_id`.
    fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> impl Future<Output = Result<(), RestError>> + Send;
}

/// A [`NodeRest`] that does nothing. The default when no REST client is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRest;

impl NodeRest for NoRest {
    async fn update_session(
        &self,
        _session_id: &str,
        _update: SessionUpdate,
    ) -> Result<(), RestError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_update_json_format() {
        let json = serde_json::to_value(SessionUpdate {
            resuming: true,
            timeout: 60,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"resuming": true, "timeout": 60}));
    }

    #[tokio::test]
    async fn test_no_rest_always_succeeds() {
        let update = SessionUpdate {
            resuming: false,
            timeout: 0,
        };
        assert!(NoRest.update_session("abc", update).await.is_ok());
    }
}
