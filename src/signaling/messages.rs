use serde::Deserialize;

use crate::models::lenient;

/// Message queued in the room by the other peer, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalingMessage {
    Offer {
        sdp: String,
    },
    /// Decoded by type only; a peer joining a room never consumes an answer.
    Answer,
    Candidate {
        id: String,
        #[serde(deserialize_with = "lenient::int")]
        label: i32,
        candidate: String,
    },
    Bye,
    #[serde(other)]
    Other,
}

impl SignalingMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Offer { .. } => msg_types::OFFER,
            SignalingMessage::Answer => msg_types::ANSWER,
            SignalingMessage::Candidate { .. } => msg_types::CANDIDATE,
            SignalingMessage::Bye => msg_types::BYE,
            SignalingMessage::Other => "other",
        }
    }
}

/// Message types enum for matching
pub mod msg_types {
    pub const OFFER: &str = "offer";
    pub const ANSWER: &str = "answer";
    pub const CANDIDATE: &str = "candidate";
    pub const BYE: &str = "bye";
}
