//! Time-limited TURN credentials.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::HttpTimeouts;
use crate::error::{FetchError, Result};
use crate::http::{HttpRequest, HttpTransport, CONTENT_TYPE_JSON};
use crate::models::IceServer;

#[derive(Debug, Serialize)]
struct TurnCredentialsRequest {
    /// Only used to authenticate against the TURN server.
    #[serde(rename = "loginName")]
    login_name: String,
}

/// Short-lived credentials handed out by the TURN credential endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnCredentials {
    pub username: String,
    pub credential: String,
}

#[derive(Debug, Deserialize)]
struct TurnServersResponse {
    username: String,
    password: String,
    uris: Vec<String>,
}

/// `"user"` followed by the current Unix time in milliseconds
pub fn login_name() -> String {
    format!("user{}", Utc::now().timestamp_millis())
}

/// POST to the room's time-limited credential URL.
pub async fn fetch_turn_credentials<T>(
    transport: &T,
    url: &str,
    timeouts: HttpTimeouts,
) -> Result<TurnCredentials>
where
    T: HttpTransport + ?Sized,
{
    tracing::debug!(url = %url, "Request TURN credentials");

    let body = serde_json::to_string(&TurnCredentialsRequest {
        login_name: login_name(),
    })?;
    let request = HttpRequest::post(url, body, timeouts).with_content_type(CONTENT_TYPE_JSON);

    let res = transport.send(request).await?;
    if !res.is_ok() {
        return Err(FetchError::unexpected_status(res.status, url));
    }

    tracing::debug!(response = %res.body, "TURN credentials response");
    Ok(serde_json::from_str(&res.body)?)
}

/// New list with every `turn:` entry carrying the given credentials.
/// Order, length and non-TURN entries are preserved.
pub fn apply_turn_credentials(
    servers: &[IceServer],
    credentials: &TurnCredentials,
) -> Vec<IceServer> {
    servers
        .iter()
        .map(|server| {
            if server.is_turn() {
                server.with_credentials(&credentials.username, &credentials.credential)
            } else {
                server.clone()
            }
        })
        .collect()
}

/// Fetch credentials and rewrite the TURN entries of `servers`.
pub async fn credentials_for_turn_servers<T>(
    transport: &T,
    url: &str,
    servers: &[IceServer],
    timeouts: HttpTimeouts,
) -> Result<Vec<IceServer>>
where
    T: HttpTransport + ?Sized,
{
    let credentials = fetch_turn_credentials(transport, url, timeouts).await?;
    Ok(apply_turn_credentials(servers, &credentials))
}

/// GET a TURN server list from the legacy `turn_url` endpoint.
pub async fn request_turn_servers<T>(
    transport: &T,
    url: &str,
    timeouts: HttpTimeouts,
) -> Result<Vec<IceServer>>
where
    T: HttpTransport + ?Sized,
{
    tracing::debug!(url = %url, "Request TURN servers");

    let res = transport.send(HttpRequest::get(url, timeouts)).await?;
    if !res.is_ok() {
        return Err(FetchError::unexpected_status(res.status, url));
    }

    tracing::debug!(response = %res.body, "TURN response");
    let turn: TurnServersResponse = serde_json::from_str(&res.body)?;

    Ok(turn
        .uris
        .into_iter()
        .map(|uri| IceServer::new(uri, turn.username.as_str(), turn.password.as_str()))
        .collect())
}
