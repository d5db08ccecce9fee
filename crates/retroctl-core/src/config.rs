//! Client connection configuration.

use std::time::Duration;

/// Default engine OSC control port.
pub const DEFAULT_ENGINE_PORT: u16 = 7770;

/// Interval between re-subscription heartbeats.
///
/// The engine drops listeners it believes are gone (engine restart,
/// message loss, NAT timeout); re-subscribing periodically recovers the
/// registration without user action.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Delay after the first subscribe, giving the engine time to push the
/// initial full state before presentation starts.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Connection and subscription tunables for a [`crate::LooperClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Engine hostname or IP.
    pub host: String,
    /// Engine OSC control port.
    pub port: u16,
    /// Local port for receiving state pushes. 0 = auto-assign.
    pub listen_port: u16,
    /// Host name sent in subscribe messages, i.e. how the engine should
    /// reach this client.
    pub advertise_host: String,
    /// Re-subscription interval.
    pub heartbeat_interval: Duration,
    /// Wait after the initial subscribe before `start()` returns.
    pub settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_ENGINE_PORT,
            listen_port: 0,
            advertise_host: "localhost".to_string(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ClientConfig {
    /// Config targeting `host:port` with all other fields defaulted.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the local listen port (0 = auto-assign).
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the host advertised in subscribe messages.
    pub fn with_advertise_host(mut self, host: impl Into<String>) -> Self {
        self.advertise_host = host.into();
        self
    }

    /// Set the re-subscription interval.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the post-subscribe settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// The engine's control address in "host:port" form.
    pub fn engine_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 7770);
        assert_eq!(config.listen_port, 0);
        assert_eq!(config.advertise_host, "localhost");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("10.0.0.5", 7780)
            .with_listen_port(9000)
            .with_advertise_host("10.0.0.9")
            .with_heartbeat_interval(Duration::from_secs(5));
        assert_eq!(config.engine_addr(), "10.0.0.5:7780");
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.advertise_host, "10.0.0.9");
    }
}
