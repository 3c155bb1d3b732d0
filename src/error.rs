/// Terminal failure of a room-join attempt.
///
/// Every variant ends the current attempt. Nothing here is retried; the
/// `Display` text is what the caller receives as the error description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The room server answered with a non-SUCCESS result.
    #[error("Room response error: {0}")]
    Protocol(String),

    #[error("Room JSON parsing error: {0}")]
    Parse(String),

    /// Connection failure, timeout, undecodable body or unexpected status.
    #[error("Room IO error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    pub fn missing_field(field: &str) -> Self {
        FetchError::Parse(format!("missing or invalid field '{}'", field))
    }

    pub fn unexpected_status(status: u16, url: &str) -> Self {
        FetchError::Network(format!("Non-200 response ({}) from {}", status, url))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() {
            FetchError::Network(format!("connection failed: {}", err))
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
