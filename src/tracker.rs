use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TrackerConfig;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("tracker rejected event ({0})")]
    Rejected(reqwest::StatusCode),

    #[error("tracker did not answer within {0:?}")]
    Timeout(Duration),
}

/// Records that a user invoked a command. Best-effort only.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    async fn track(&self, requester_id: &str, event: &str, raw: &str) -> Result<(), TrackerError>;
}

/// Used when no `[tracker]` section is configured
pub struct NoopTracker;

#[async_trait]
impl UsageTracker for NoopTracker {
    async fn track(&self, requester_id: &str, event: &str, _raw: &str) -> Result<(), TrackerError> {
        debug!("Usage event (not forwarded): {} by {}", event, requester_id);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TrackEvent<'a> {
    event_id: String,
    user_id: &'a str,
    event: &'a str,
    payload: &'a str,
    timestamp: String,
}

/// Posts usage events as JSON to an analytics endpoint
pub struct HttpTracker {
    client: reqwest::Client,
    url: String,
}

impl HttpTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl UsageTracker for HttpTracker {
    async fn track(&self, requester_id: &str, event: &str, raw: &str) -> Result<(), TrackerError> {
        let body = TrackEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            user_id: requester_id,
            event,
            payload: raw,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Rejected(status));
        }
        Ok(())
    }
}

/// Fire a tracking event on a background task bounded by `timeout`.
/// Failures are logged and never reach the caller.
pub fn spawn_track(
    tracker: Arc<dyn UsageTracker>,
    timeout: Duration,
    requester_id: String,
    event: String,
    raw: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = match tokio::time::timeout(timeout, tracker.track(&requester_id, &event, &raw)).await
        {
            Ok(result) => result,
            Err(_) => Err(TrackerError::Timeout(timeout)),
        };
        if let Err(e) = result {
            warn!(
                "Usage tracking failed for '{}' by {}: {}",
                event, requester_id, e
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTracker {
        events: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl UsageTracker for RecordingTracker {
        async fn track(&self, requester_id: &str, event: &str, raw: &str) -> Result<(), TrackerError> {
            self.events.lock().unwrap().push((
                requester_id.to_string(),
                event.to_string(),
                raw.to_string(),
            ));
            Ok(())
        }
    }

    struct HangingTracker;

    #[async_trait]
    impl UsageTracker for HangingTracker {
        async fn track(&self, _: &str, _: &str, _: &str) -> Result<(), TrackerError> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_spawn_track_forwards_event() {
        let tracker = Arc::new(RecordingTracker::default());
        spawn_track(
            tracker.clone(),
            Duration::from_secs(1),
            "42".to_string(),
            "top".to_string(),
            "/top".to_string(),
        )
        .await
        .unwrap();

        let events = tracker.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![("42".to_string(), "top".to_string(), "/top".to_string())]
        );
    }

    #[tokio::test]
    async fn test_spawn_track_gives_up_after_timeout() {
        let handle = spawn_track(
            Arc::new(HangingTracker),
            Duration::from_millis(20),
            "42".to_string(),
            "top".to_string(),
            "/top".to_string(),
        );
        // Completes (without panicking) once the timeout fires
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_noop_tracker_succeeds() {
        assert!(NoopTracker.track("1", "help", "/help").await.is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let event = TrackEvent {
            event_id: "id".to_string(),
            user_id: "42",
            event: "top",
            payload: "/top",
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["user_id"], "42");
        assert_eq!(json["event"], "top");
        assert_eq!(json["payload"], "/top");
    }
}
