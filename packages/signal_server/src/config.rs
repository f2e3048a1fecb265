use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   signal-server.toml:  [signaling]
//                        wait_timeout_secs = 60
//
//   env var:             SIGNAL_SIGNALING__WAIT_TIMEOUT_SECS=60   (double underscore = nesting)
//
//   CLI flags:           --port / --host override [server]

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "signal-server.toml";

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub signaling: SignalingFileConfig,
}

/// Listener settings (lives under `[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Long-poll and presence tunables (lives under `[signaling]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignalingFileConfig {
    /// How long a wait may stay parked before it answers with the roster.
    /// 0 = park until something happens.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    /// Sign out peers not seen for this long. 0 = never.
    #[serde(default)]
    pub reap_after_secs: u64,
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

impl Default for SignalingFileConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
            reap_after_secs: 0,
            reap_interval_secs: default_reap_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_wait_timeout_secs() -> u64 {
    30
}
fn default_reap_interval_secs() -> u64 {
    60
}

/// Build a figment that layers: defaults → config file → SIGNAL_* env vars.
///
/// Env vars use double-underscore for nesting into sections:
///   `SIGNAL_SERVER__PORT=9000`  →  `server.port = 9000`
///   `SIGNAL_SIGNALING__REAP_AFTER_SECS=300`  →  `signaling.reap_after_secs = 300`
pub fn load_config(config_path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("SIGNAL_").split("__"))
}

// =============================================================================
// Runtime config (derived from FileConfig, used throughout the server)
// =============================================================================

/// Signaling behaviour (runtime view).
#[derive(Clone, Debug)]
pub struct SignalingConfig {
    /// Upper bound on a parked wait (None = unbounded)
    pub wait_timeout: Option<Duration>,
    /// Idle time after which a peer is reaped (None = reaping disabled)
    pub reap_after: Option<Duration>,
    /// How often the reaper runs
    pub reap_interval: Duration,
}

impl SignalingConfig {
    pub fn from_file(fc: &SignalingFileConfig) -> Self {
        Self {
            wait_timeout: non_zero_secs(fc.wait_timeout_secs),
            reap_after: non_zero_secs(fc.reap_after_secs),
            reap_interval: Duration::from_secs(fc.reap_interval_secs.max(1)),
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Resolve the listen address, letting CLI values win over the file.
pub fn listen_addr(
    fc: &ServerFileConfig,
    cli_host: Option<&str>,
    cli_port: Option<u16>,
) -> anyhow::Result<SocketAddr> {
    let host = cli_host.unwrap_or(&fc.host);
    let port = cli_port.unwrap_or(fc.port);
    Ok(format!("{}:{}", host, port).parse::<SocketAddr>()?)
}
