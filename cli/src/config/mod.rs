use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use gsignin::SignInConfig;
use gsignin_utils::logger::LoggerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub signin: SignInConfig,

    pub loopback: LoopbackConfig,

    /// Timeout for each request to Google.
    ///
    /// Default: `30s`
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,

    pub logger: LoggerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            signin: SignInConfig::default(),
            loopback: LoopbackConfig::default(),
            http_timeout: Duration::from_secs(30),
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Local address the browser is redirected to. Port `0` picks a free one.
    ///
    /// Default: `127.0.0.1:8765`
    pub listen_addr: SocketAddr,

    /// Path of the redirect URI.
    ///
    /// Default: `/oauth2callback`
    pub path: String,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            listen_addr: (Ipv4Addr::LOCALHOST, 8765).into(),
            path: "/oauth2callback".to_owned(),
        }
    }
}
