use serde_json::Value;

use crate::error::{FetchError, Result};
use crate::models::{IceCandidate, RoomJoinResponse, RoomParams, SessionDescription};
use crate::repair::{repair_candidate_line, repair_offer_sdp};
use crate::signaling::SignalingMessage;

/// Decoded room-join response, before ICE server resolution
#[derive(Debug, Clone)]
pub struct ParsedRoom {
    pub room_id: String,
    pub client_id: String,
    pub wss_url: String,
    pub wss_post_url: String,
    pub initiator: bool,
    pub pc_config: Value,
    pub turn_time_limited_ltc_url: Option<String>,
    pub turn_url: Option<String>,
    pub offer_sdp: Option<SessionDescription>,
    pub ice_candidates: Option<Vec<IceCandidate>>,
}

/// Decode a room-join response body.
///
/// A non-SUCCESS result short-circuits before `params` is looked at.
/// Queued messages are only read for the non-initiating peer.
pub fn parse_room_response(body: &str) -> Result<ParsedRoom> {
    let response: RoomJoinResponse = serde_json::from_str(body)?;
    if !response.is_success() {
        return Err(FetchError::Protocol(response.result));
    }

    let params = response
        .params
        .ok_or_else(|| FetchError::missing_field("params"))?;
    let params: RoomParams = serde_json::from_value(decode_nested(params, "params")?)?;

    let mut offer_sdp = None;
    let mut ice_candidates = None;

    if !params.is_initiator {
        let messages = params
            .messages
            .ok_or_else(|| FetchError::missing_field("messages"))?;
        let mut candidates = Vec::new();

        for (index, message) in decode_messages(messages)?.into_iter().enumerate() {
            tracing::debug!(index, kind = message.kind(), "GAE->C message");
            match message {
                SignalingMessage::Offer { sdp } => {
                    if offer_sdp.is_some() {
                        tracing::debug!(index, "Replacing earlier offer");
                    }
                    offer_sdp = Some(SessionDescription::offer(repair_offer_sdp(&sdp)));
                }
                SignalingMessage::Candidate {
                    id,
                    label,
                    candidate,
                } => {
                    candidates.push(IceCandidate {
                        sdp_mid: id,
                        sdp_mline_index: label,
                        sdp: repair_candidate_line(&candidate),
                    });
                }
                other => {
                    tracing::warn!(index, msg_type = other.kind(), "Unknown message type, skipping");
                }
            }
        }

        ice_candidates = Some(candidates);
    }

    tracing::debug!(
        room_id = %params.room_id,
        client_id = %params.client_id,
        initiator = params.is_initiator,
        wss_url = %params.wss_url,
        wss_post_url = %params.wss_post_url,
        "Room parameters decoded"
    );

    Ok(ParsedRoom {
        room_id: params.room_id,
        client_id: params.client_id,
        wss_url: params.wss_url,
        wss_post_url: params.wss_post_url,
        initiator: params.is_initiator,
        pc_config: params.pc_config,
        turn_time_limited_ltc_url: params.turn_time_limited_ltc_url,
        turn_url: params.turn_url,
        offer_sdp,
        ice_candidates,
    })
}

/// Fields holding a nested document arrive either inline or serialized
/// into a JSON string.
pub(crate) fn decode_nested(value: Value, field: &str) -> Result<Value> {
    match value {
        Value::String(text) => Ok(serde_json::from_str(&text)?),
        Value::Null => Err(FetchError::missing_field(field)),
        other => Ok(other),
    }
}

fn decode_messages(messages: Value) -> Result<Vec<SignalingMessage>> {
    let entries = match decode_nested(messages, "messages")? {
        Value::Array(entries) => entries,
        _ => return Err(FetchError::missing_field("messages")),
    };

    entries
        .into_iter()
        .map(|entry| -> Result<SignalingMessage> {
            match entry {
                Value::String(text) => Ok(serde_json::from_str(&text)?),
                other => Ok(serde_json::from_value(other)?),
            }
        })
        .collect()
}
