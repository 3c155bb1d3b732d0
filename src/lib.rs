pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod ice;
pub mod models;
pub mod repair;
pub mod signaling;
pub mod turn;

pub use config::{Config, FetchOptions, HttpTimeouts};
pub use error::{FetchError, Result};
pub use fetcher::{FetchHandle, RoomParametersEvents, RoomParametersFetcher};
pub use models::SignalingParameters;
