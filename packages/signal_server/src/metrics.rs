//! Server metrics for observability
//!
//! Counters for the signaling endpoints, exposed as JSON on `/metrics`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use signal_relay::{Delivery, NotificationCause, RelayError};

/// Server-wide metrics
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Presence
    pub sign_ins: AtomicU64,
    /// Sign-outs that removed a registered peer
    pub sign_outs: AtomicU64,
    pub peers_reaped: AtomicU64,

    // Relay
    pub messages_relayed: AtomicU64,
    /// Sends refused for an unknown sender or recipient
    pub messages_rejected: AtomicU64,
    pub bytes_relayed: AtomicU64,

    // Long-poll
    pub waits_started: AtomicU64,
    pub waits_message: AtomicU64,
    pub waits_roster: AtomicU64,
    pub waits_timed_out: AtomicU64,
    pub waits_superseded: AtomicU64,
    pub waits_failed: AtomicU64,

    /// Requests rejected before reaching the switchboard
    pub malformed_requests: AtomicU64,

    /// Server start time (for uptime calculation)
    start_time: Option<Instant>,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn peer_signed_in(&self) {
        self.sign_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn peer_signed_out(&self) {
        self.sign_outs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn peers_reaped(&self, count: usize) {
        self.peers_reaped.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn message_relayed(&self, bytes: usize) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.bytes_relayed.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_request(&self) {
        self.malformed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn wait_started(&self) {
        self.waits_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a wait finished.
    pub fn wait_finished(&self, result: &Result<Delivery, RelayError>) {
        let counter = match result {
            Ok(Delivery::Message(_)) => &self.waits_message,
            Ok(Delivery::Notification {
                cause: NotificationCause::RosterChanged,
                ..
            }) => &self.waits_roster,
            Ok(Delivery::Notification {
                cause: NotificationCause::TimedOut,
                ..
            }) => &self.waits_timed_out,
            Err(RelayError::WaitSuperseded(_)) => &self.waits_superseded,
            Err(_) => &self.waits_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    /// Create a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            peers: PeerMetrics {
                sign_ins: self.sign_ins.load(Ordering::Relaxed),
                sign_outs: self.sign_outs.load(Ordering::Relaxed),
                reaped: self.peers_reaped.load(Ordering::Relaxed),
            },
            messages: MessageMetrics {
                relayed: self.messages_relayed.load(Ordering::Relaxed),
                rejected: self.messages_rejected.load(Ordering::Relaxed),
                bytes: self.bytes_relayed.load(Ordering::Relaxed),
            },
            waits: WaitMetrics {
                started: self.waits_started.load(Ordering::Relaxed),
                message: self.waits_message.load(Ordering::Relaxed),
                roster: self.waits_roster.load(Ordering::Relaxed),
                timed_out: self.waits_timed_out.load(Ordering::Relaxed),
                superseded: self.waits_superseded.load(Ordering::Relaxed),
                failed: self.waits_failed.load(Ordering::Relaxed),
            },
            malformed_requests: self.malformed_requests.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub peers: PeerMetrics,
    pub messages: MessageMetrics,
    pub waits: WaitMetrics,
    pub malformed_requests: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMetrics {
    pub sign_ins: u64,
    pub sign_outs: u64,
    pub reaped: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetrics {
    pub relayed: u64,
    pub rejected: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitMetrics {
    pub started: u64,
    pub message: u64,
    pub roster: u64,
    pub timed_out: u64,
    pub superseded: u64,
    pub failed: u64,
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub peers: u64,
    pub waiting: u64,
    pub queued_messages: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_relay::PeerId;

    #[test]
    fn test_message_tracking() {
        let metrics = ServerMetrics::new();

        metrics.message_relayed(10);
        metrics.message_relayed(5);
        metrics.message_rejected();
        assert_eq!(metrics.messages_relayed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.bytes_relayed.load(Ordering::Relaxed), 15);
        assert_eq!(metrics.messages_rejected.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_wait_outcomes() {
        let metrics = ServerMetrics::new();

        metrics.wait_finished(&Ok(Delivery::Notification {
            roster: Vec::new(),
            cause: NotificationCause::TimedOut,
        }));
        metrics.wait_finished(&Ok(Delivery::Notification {
            roster: Vec::new(),
            cause: NotificationCause::RosterChanged,
        }));
        metrics.wait_finished(&Err(RelayError::WaitSuperseded(PeerId(1))));
        metrics.wait_finished(&Err(RelayError::PeerNotFound(PeerId(1))));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.waits.timed_out, 1);
        assert_eq!(snapshot.waits.roster, 1);
        assert_eq!(snapshot.waits.superseded, 1);
        assert_eq!(snapshot.waits.failed, 1);
        assert_eq!(snapshot.waits.message, 0);
    }

    #[test]
    fn test_snapshot() {
        let metrics = ServerMetrics::new();
        metrics.peer_signed_in();
        metrics.peer_signed_in();
        metrics.peer_signed_out();
        metrics.peers_reaped(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.peers.sign_ins, 2);
        assert_eq!(snapshot.peers.sign_outs, 1);
        assert_eq!(snapshot.peers.reaped, 3);
    }
}
