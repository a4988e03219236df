use std::sync::Arc;
use std::time::Duration;

use launchpad_core::SessionStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodically drops sessions that have been idle longer than the store's TTL.
pub fn spawn(sessions: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    info!(
        event_name = "system.sweeper.start",
        correlation_id = "bootstrap",
        interval_secs = interval.as_secs(),
        "session sweeper started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(sessions.as_ref()).await;
        }
    })
}

pub async fn sweep_once(sessions: &dyn SessionStore) -> usize {
    match sessions.evict_expired().await {
        Ok(0) => {
            debug!(event_name = "system.sweeper.idle", correlation_id = "sweeper", "no idle sessions");
            0
        }
        Ok(evicted) => {
            info!(
                event_name = "session.evicted",
                correlation_id = "sweeper",
                evicted,
                "expired sessions removed"
            );
            evicted
        }
        Err(error) => {
            warn!(
                event_name = "system.sweeper.failed",
                correlation_id = "sweeper",
                error = %error,
                "session sweep failed"
            );
            0
        }
    }
}
