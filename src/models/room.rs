use serde::Deserialize;
use serde_json::Value;

use super::lenient;

pub const ROOM_RESULT_SUCCESS: &str = "SUCCESS";

/// Top-level body of the room-join response
#[derive(Debug, Clone, Deserialize)]
pub struct RoomJoinResponse {
    pub result: String,
    /// Room parameters, usually a JSON document serialized into a string
    #[serde(default)]
    pub params: Option<Value>,
}

impl RoomJoinResponse {
    pub fn is_success(&self) -> bool {
        self.result == ROOM_RESULT_SUCCESS
    }
}

/// Decoded `params` document of a successful room join
#[derive(Debug, Clone, Deserialize)]
pub struct RoomParams {
    pub room_id: String,
    pub client_id: String,
    pub wss_url: String,
    pub wss_post_url: String,
    #[serde(deserialize_with = "lenient::bool")]
    pub is_initiator: bool,
    pub pc_config: Value,
    #[serde(default)]
    pub turn_time_limited_ltc_url: Option<String>,
    /// Legacy TURN server endpoint
    #[serde(default)]
    pub turn_url: Option<String>,
    /// Only sent to the non-initiating peer
    #[serde(default)]
    pub messages: Option<Value>,
}
