pub mod room;
pub mod signaling;

pub(crate) mod lenient;

// -----------------------------
// Room wire shapes
// -----------------------------
pub use room::{RoomJoinResponse, RoomParams, ROOM_RESULT_SUCCESS};

// -----------------------------
// Resolved signaling structures
// -----------------------------
pub use signaling::{IceCandidate, IceServer, SessionDescription, SignalingParameters};
