use signal_relay::Switchboard;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::config::{SignalingConfig, SignalingFileConfig};
use crate::metrics::ServerMetrics;

/// Build a fresh `AppState` with default signaling settings.
pub fn test_app_state() -> AppState {
    AppState {
        switchboard: Arc::new(Switchboard::new()),
        signaling: Arc::new(SignalingConfig::from_file(&SignalingFileConfig::default())),
        metrics: Arc::new(ServerMetrics::new()),
    }
}

/// Like `test_app_state`, but parked waits give up after `timeout`.
pub fn test_app_state_with_timeout(timeout: Duration) -> AppState {
    let mut state = test_app_state();
    state.signaling = Arc::new(SignalingConfig {
        wait_timeout: Some(timeout),
        reap_after: None,
        reap_interval: Duration::from_secs(60),
    });
    state
}
