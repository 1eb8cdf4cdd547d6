//! Centralized configuration for ghostseed.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all ghostseed components.
///
/// Groups related settings into logical sections. Supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct SpoofConfig {
    pub client: ClientConfig,
    pub network: NetworkConfig,
}

/// Identity presented to trackers.
///
/// The fixed signature of the impersonated client: peer id prefix,
/// User-Agent, listen port, and how many peers each announce asks for.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client-signature prefix of generated peer ids
    pub peer_id_prefix: &'static str,
    /// User agent sent on every tracker request
    pub user_agent: &'static str,
    /// Listen port reported to trackers
    pub port: u16,
    /// Peers requested per announce while the download appears incomplete
    pub numwant: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            peer_id_prefix: "-qB4030-",
            user_agent: "qBittorrent/4.0.3",
            port: 8999,
            numwant: 200,
        }
    }
}

/// Tracker communication configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// HTTP request timeout for tracker communication
    pub tracker_timeout: Duration,
    /// Announce interval used when the tracker reports a non-positive one
    pub default_announce_interval: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tracker_timeout: Duration::from_secs(30),
            default_announce_interval: Duration::from_secs(1800), // 30 minutes
        }
    }
}

impl SpoofConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime tweaks via environment variables while keeping
    /// sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("GHOSTSEED_TRACKER_TIMEOUT") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.network.tracker_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(port) = std::env::var("GHOSTSEED_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                config.client.port = port;
            }
        }

        config
    }
}
