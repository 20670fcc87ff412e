//! Environment-driven server configuration

use crate::error::ServerError;
use crate::state::BrokerOptions;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub addr: SocketAddr,
    /// Per-connection outbound queue; overflow is dropped
    pub outbound_buffer: usize,
    /// Broker inbound queue
    pub event_buffer: usize,
    /// Pair waiting users when a counselor registers
    pub match_on_counselor_arrival: bool,
    /// CORS origin allow-list (None = permissive)
    pub cors_origins: Option<Vec<String>>,
    /// Serve static files from here when set
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
            match_on_counselor_arrival: false,
            cors_origins: None,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load config from environment variables
    pub fn from_env() -> Result<Self, ServerError> {
        let raw_addr = std::env::var("CARELINE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = raw_addr
            .parse()
            .map_err(|e| ServerError::Config(format!("CARELINE_ADDR '{}': {}", raw_addr, e)))?;

        let outbound_buffer = parse_size("CARELINE_OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER);
        let event_buffer = parse_size("CARELINE_EVENT_BUFFER", DEFAULT_EVENT_BUFFER);

        let match_on_counselor_arrival = std::env::var("CARELINE_MATCH_ON_COUNSELOR_ARRIVAL")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let cors_origins = std::env::var("CARELINE_CORS_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        let static_dir = std::env::var("CARELINE_STATIC_DIR")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        tracing::info!(
            %addr,
            outbound_buffer,
            event_buffer,
            match_on_counselor_arrival,
            cors_restricted = cors_origins.is_some(),
            "Config loaded"
        );

        Ok(Self {
            addr,
            outbound_buffer,
            event_buffer,
            match_on_counselor_arrival,
            cors_origins,
            static_dir,
        })
    }

    pub fn broker_options(&self) -> BrokerOptions {
        BrokerOptions {
            match_on_counselor_arrival: self.match_on_counselor_arrival,
        }
    }
}

fn parse_size(var: &str, default: usize) -> usize {
    match std::env::var(var) {
        Ok(v) => match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!("{}='{}' is not a positive integer, using {}", var, v, default);
                default
            }
        },
        Err(_) => default,
    }
}
