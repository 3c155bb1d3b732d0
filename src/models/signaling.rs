use serde::Serialize;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::error::{FetchError, Result};

/// One relay/STUN server with the credentials to use against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IceServer {
    pub uri: String,
    pub username: String,
    pub password: String,
}

impl IceServer {
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Text before the first `:` of the uri
    pub fn scheme(&self) -> &str {
        self.uri.split(':').next().unwrap_or_default()
    }

    pub fn is_turn(&self) -> bool {
        self.scheme() == "turn"
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Same uri, new credentials
    pub fn with_credentials(&self, username: &str, password: &str) -> Self {
        Self::new(self.uri.clone(), username, password)
    }

    pub fn to_rtc(&self) -> RTCIceServer {
        RTCIceServer {
            urls: vec![self.uri.clone()],
            username: self.username.clone(),
            credential: self.password.clone(),
            ..Default::default()
        }
    }
}

/// Offer queued in the room by the initiating peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDescription {
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: String) -> Self {
        Self { sdp }
    }

    pub fn to_rtc(&self) -> Result<RTCSessionDescription> {
        RTCSessionDescription::offer(self.sdp.clone())
            .map_err(|e| FetchError::Parse(format!("invalid SDP: {}", e)))
    }
}

/// Remote ICE candidate queued in the room before this peer joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IceCandidate {
    pub sdp_mid: String,
    pub sdp_mline_index: i32,
    pub sdp: String,
}

impl IceCandidate {
    pub fn to_rtc_init(&self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: self.sdp.clone(),
            sdp_mid: Some(self.sdp_mid.clone()),
            sdp_mline_index: u16::try_from(self.sdp_mline_index).ok(),
            ..Default::default()
        }
    }
}

/// Everything a peer needs to join the room's signaling session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalingParameters {
    pub ice_servers: Vec<IceServer>,
    pub initiator: bool,
    pub client_id: String,
    pub wss_url: String,
    pub wss_post_url: String,
    pub offer_sdp: Option<SessionDescription>,
    /// `None` for the initiator, who never receives queued candidates
    pub ice_candidates: Option<Vec<IceCandidate>>,
}

impl SignalingParameters {
    /// Peer connection configuration for the ICE engine
    pub fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self.ice_servers.iter().map(IceServer::to_rtc).collect(),
            ..Default::default()
        }
    }
}
