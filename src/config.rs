/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server listen port.
    pub port: u16,
    /// Server bind host.
    pub host: String,
    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full when an event is broadcast gets disconnected.
    pub send_queue_capacity: usize,
    /// Close connections that send nothing for this many seconds (0 = never).
    pub idle_timeout_secs: u64,
    /// Deliver relayed events back to the connection that sent them.
    pub echo_to_sender: bool,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = AppConfig::default();
        AppConfig {
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            host: lookup("HOST").unwrap_or(defaults.host),
            send_queue_capacity: lookup("RELAY_SEND_QUEUE_CAPACITY")
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.send_queue_capacity),
            idle_timeout_secs: lookup("RELAY_IDLE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.idle_timeout_secs),
            echo_to_sender: lookup("RELAY_ECHO_TO_SENDER")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.echo_to_sender),
        }
    }

    /// Socket address string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout as a duration, `None` when disabled.
    pub fn idle_timeout(&self) -> Option<std::time::Duration> {
        (self.idle_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: 80,
            host: "0.0.0.0".to_string(),
            send_queue_capacity: 256,
            idle_timeout_secs: 0,
            echo_to_sender: false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
