pub use error::Error;
pub use player::Player;
pub use state::{PlaybackState, PlayerUiState, RepeatMode, ShuffleMode};

pub mod artist;
pub mod controls;
pub mod database;
pub mod duration;
pub mod engine;
pub mod error;
pub mod facade;
pub mod history;
pub mod models;
pub mod player;
pub mod queue;
pub mod sink;
pub mod state;

pub type Result<T, E = Error> = std::result::Result<T, E>;
