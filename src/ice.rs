use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::models::IceServer;
use crate::signaling::parser::decode_nested;

#[derive(Debug, Deserialize)]
struct PcConfig {
    #[serde(rename = "iceServers")]
    ice_servers: Vec<IceServerConfig>,
}

#[derive(Debug, Deserialize)]
struct IceServerConfig {
    urls: Urls,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credential: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Urls {
    One(String),
    Many(Vec<String>),
}

/// Extract the ICE server list from a peer connection config.
///
/// Missing credentials become empty strings. A server listing several urls
/// expands into one entry per url.
pub fn ice_servers_from_pc_config(pc_config: &Value) -> Result<Vec<IceServer>> {
    let config: PcConfig = serde_json::from_value(decode_nested(pc_config.clone(), "pc_config")?)?;

    let mut servers = Vec::with_capacity(config.ice_servers.len());
    for entry in config.ice_servers {
        let username = entry.username.unwrap_or_default();
        let credential = entry.credential.unwrap_or_default();
        let urls = match entry.urls {
            Urls::One(url) => vec![url],
            Urls::Many(urls) => urls,
        };
        for url in urls {
            tracing::debug!(uri = %url, "IceServer");
            servers.push(IceServer::new(url, username.as_str(), credential.as_str()));
        }
    }

    Ok(servers)
}

/// True when at least one `turn:` server already carries a username and
/// a password.
pub fn has_usable_turn_credentials(servers: &[IceServer]) -> bool {
    servers
        .iter()
        .any(|server| server.is_turn() && server.has_credentials())
}

/// True when the list holds any `turn:` server at all.
pub fn has_turn_server(servers: &[IceServer]) -> bool {
    servers.iter().any(IceServer::is_turn)
}
