//! Background sign-out of peers that stopped polling.

use signal_relay::Switchboard;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::metrics::ServerMetrics;

/// Every `interval`, sign out peers idle for longer than `idle`.
pub fn spawn_reaper(
    switchboard: Arc<Switchboard>,
    metrics: Arc<ServerMetrics>,
    idle: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let reaped = switchboard.reap_idle(idle);
            if !reaped.is_empty() {
                metrics.peers_reaped(reaped.len());
                info!("Reaped {} idle peers: {:?}", reaped.len(), reaped);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_signs_out_idle_peers() {
        let switchboard = Arc::new(Switchboard::new());
        let metrics = Arc::new(ServerMetrics::new());
        let alice = switchboard.sign_in("alice").id;

        // last_seen is wall-clock time; let some of it pass
        std::thread::sleep(Duration::from_millis(5));

        let handle = spawn_reaper(
            switchboard.clone(),
            metrics.clone(),
            Duration::from_millis(1),
            Duration::from_secs(10),
        );
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!switchboard.is_registered(alice));
        assert_eq!(metrics.snapshot().peers.reaped, 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_keeps_active_peers() {
        let switchboard = Arc::new(Switchboard::new());
        let metrics = Arc::new(ServerMetrics::new());
        let alice = switchboard.sign_in("alice").id;

        let handle = spawn_reaper(
            switchboard.clone(),
            metrics.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(10),
        );
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert!(switchboard.is_registered(alice));
        assert_eq!(metrics.snapshot().peers.reaped, 0);
        handle.abort();
    }
}
