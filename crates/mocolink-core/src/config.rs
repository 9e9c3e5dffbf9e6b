// Session configuration.

use std::time::Duration;

/// Configuration for a [`Session`](crate::Session).
///
/// The three poll intervals mirror the cadences the link adapter
/// service is designed around: a fast pairing-status poll while a
/// bundle is forming, a medium scan poll while discovering systems,
/// and a relaxed status poll once the bundle is live.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host running the link adapter service.
    pub host: String,
    /// Service port (default 8080).
    pub port: u16,
    /// Pairing scan results poll interval.
    pub scan_interval: Duration,
    /// Pairing status poll interval while a bundle is forming.
    pub pairing_interval: Duration,
    /// Periodic bundle status poll interval.
    pub status_interval: Duration,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 8080,
            scan_interval: Duration::from_millis(100),
            pairing_interval: Duration::from_millis(20),
            status_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    /// Config for a service at `host:port` with default intervals.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}
