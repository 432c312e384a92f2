use crate::{duration::format_duration, models::Track};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    #[default]
    Paused,
    Error,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    #[default]
    Off,
    On,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Off -> All -> One -> Off.
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Snapshot of everything a front end needs to draw the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerUiState {
    pub track: Option<Track>,
    pub playing_track_index: usize,
    /// Tracks in the order they will be played.
    pub queue: Vec<Track>,
    /// Fraction of the current track already played, within `0.0..=1.0`.
    pub seek_position: f32,
    pub is_buffering: bool,
    pub playback_state: PlaybackState,
    pub shuffle_mode: ShuffleMode,
    pub repeat_mode: RepeatMode,
    pub playback_duration: String,
    pub track_duration: String,
}

impl Default for PlayerUiState {
    fn default() -> Self {
        Self {
            track: None,
            playing_track_index: 0,
            queue: Vec::new(),
            seek_position: 0.0,
            is_buffering: false,
            playback_state: PlaybackState::default(),
            shuffle_mode: ShuffleMode::default(),
            repeat_mode: RepeatMode::default(),
            playback_duration: format_duration(0),
            track_duration: format_duration(0),
        }
    }
}
