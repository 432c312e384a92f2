use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::{Result, state::RepeatMode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Notifications an engine posts back to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PlaybackStateChanged(EngineState),
    Error { message: String },
    IsPlayingChanged(bool),
    MediaItemTransition { media_id: usize },
    /// A source queued by the engine ran out. Only meaningful to the engine
    /// that emitted it, which receives it back through `source_finished`.
    SourceFinished { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Position of the item in the queue at load time.
    pub media_id: usize,
    pub uri: String,
    pub artwork_uri: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub duration: Duration,
}

pub trait Engine {
    /// Hands the engine the channel it reports on. Called once, when bound.
    fn attach(&mut self, events: UnboundedSender<EngineEvent>);

    fn load(&mut self, items: Vec<MediaItem>, start_index: usize, play_when_ready: bool)
    -> Result<()>;
    fn insert(&mut self, index: usize, item: MediaItem) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    fn prepare(&mut self) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()>;
    fn seek(&mut self, position: Duration) -> Result<()>;
    fn seek_to_item(&mut self, index: usize, position: Duration) -> Result<()>;
    fn seek_to_next(&mut self) -> Result<()>;
    fn seek_to_previous(&mut self) -> Result<()>;
    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<()>;
    fn set_speed(&mut self, speed: f32) -> Result<()>;

    fn source_finished(&mut self, _generation: u64) -> Result<()> {
        Ok(())
    }

    fn state(&self) -> EngineState;
    fn is_playing(&self) -> bool;
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    fn item_count(&self) -> usize;
}
