use std::env;
use std::time::Duration;

/// Connect/read timeouts for one HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl HttpTimeouts {
    pub fn from_millis(connect_ms: u64, read_ms: u64) -> Self {
        Self {
            connect: Duration::from_millis(connect_ms),
            read: Duration::from_millis(read_ms),
        }
    }
}

/// Knobs for a single room-join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub room_timeouts: HttpTimeouts,
    pub turn_timeouts: HttpTimeouts,
    /// Ask `turn_url` for TURN servers when the room ships none.
    pub request_turn_servers: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            room_timeouts: HttpTimeouts::from_millis(10_000, 10_000),
            turn_timeouts: HttpTimeouts::from_millis(5000, 5000),
            request_turn_servers: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub room_join_url: String,
    pub room_message: String,
    pub room_timeout_ms: u64,
    pub turn_connect_timeout_ms: u64,
    pub turn_read_timeout_ms: u64,
    pub turn_server_request: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            room_join_url: env::var("ROOM_JOIN_URL").map_err(|_| ConfigError::MissingRoomUrl)?,
            room_message: env::var("ROOM_MESSAGE").unwrap_or_default(),
            room_timeout_ms: parse_var("ROOM_TIMEOUT_MS", 10_000)?,
            turn_connect_timeout_ms: parse_var("TURN_CONNECT_TIMEOUT_MS", 5000)?,
            turn_read_timeout_ms: parse_var("TURN_READ_TIMEOUT_MS", 5000)?,
            turn_server_request: parse_var("TURN_SERVER_REQUEST", false)?,
        })
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            room_timeouts: HttpTimeouts::from_millis(self.room_timeout_ms, self.room_timeout_ms),
            turn_timeouts: HttpTimeouts::from_millis(
                self.turn_connect_timeout_ms,
                self.turn_read_timeout_ms,
            ),
            request_turn_servers: self.turn_server_request,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ROOM_JOIN_URL environment variable is required")]
    MissingRoomUrl,
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
}
