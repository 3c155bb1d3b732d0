pub mod messages;
pub mod parser;

pub use messages::*;
pub use parser::{parse_room_response, ParsedRoom};
