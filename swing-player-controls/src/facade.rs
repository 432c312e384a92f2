use std::time::Duration;

use swing_player_client::client::Client;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    Result,
    engine::{Engine, EngineEvent, EngineState, MediaItem},
    models::Track,
    state::RepeatMode,
};

/// Builds the engine item for the track at `index` of the queue.
pub fn media_item(client: &Client, index: usize, track: &Track) -> Result<MediaItem> {
    Ok(MediaItem {
        media_id: index,
        uri: client
            .track_uri(&track.track_hash, &track.filepath)?
            .to_string(),
        artwork_uri: client.artwork_uri(&track.image)?.to_string(),
        title: track.title.clone(),
        artist: track.artists.join(", "),
        genre: track.genres.join(", "),
        duration: Duration::from_secs(track.duration_seconds.into()),
    })
}

/// Commands for an engine that may not have been bound yet. Every command is
/// a no-op until `bind` succeeds.
#[derive(Debug)]
pub struct Playback<E> {
    engine: Option<E>,
}

impl<E> Default for Playback<E> {
    fn default() -> Self {
        Self { engine: None }
    }
}

impl<E: Engine> Playback<E> {
    /// Binds `engine` and hands it `events`. Returns false if an engine was
    /// already bound, in which case the new one is dropped.
    pub fn bind(&mut self, mut engine: E, events: UnboundedSender<EngineEvent>) -> bool {
        if self.engine.is_some() {
            tracing::debug!("Engine already bound");
            return false;
        }

        engine.attach(events);
        self.engine = Some(engine);
        true
    }

    pub fn is_bound(&self) -> bool {
        self.engine.is_some()
    }

    fn run(&mut self, command: &str, f: impl FnOnce(&mut E) -> Result<()>) {
        if let Some(engine) = self.engine.as_mut()
            && let Err(err) = f(engine)
        {
            tracing::warn!("Engine command {command} failed: {err}");
        }
    }

    pub fn load(&mut self, items: Vec<MediaItem>, start_index: usize, play_when_ready: bool) {
        self.run("load", |e| e.load(items, start_index, play_when_ready));
    }

    pub fn insert(&mut self, index: usize, item: MediaItem) {
        self.run("insert", |e| e.insert(index, item));
    }

    pub fn clear(&mut self) {
        self.run("clear", |e| e.clear());
    }

    pub fn prepare(&mut self) {
        self.run("prepare", |e| e.prepare());
    }

    pub fn play(&mut self) {
        self.run("play", |e| e.play());
    }

    pub fn pause(&mut self) {
        self.run("pause", |e| e.pause());
    }

    pub fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.run("set_play_when_ready", |e| {
            e.set_play_when_ready(play_when_ready)
        });
    }

    pub fn seek(&mut self, position: Duration) {
        self.run("seek", |e| e.seek(position));
    }

    pub fn seek_to_item(&mut self, index: usize, position: Duration) {
        self.run("seek_to_item", |e| e.seek_to_item(index, position));
    }

    pub fn seek_to_next(&mut self) {
        self.run("seek_to_next", |e| e.seek_to_next());
    }

    pub fn seek_to_previous(&mut self) {
        self.run("seek_to_previous", |e| e.seek_to_previous());
    }

    pub fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) {
        self.run("set_repeat_mode", |e| e.set_repeat_mode(repeat_mode));
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.run("set_speed", |e| e.set_speed(speed));
    }

    pub fn source_finished(&mut self, generation: u64) {
        self.run("source_finished", |e| e.source_finished(generation));
    }

    pub fn state(&self) -> EngineState {
        self.engine.as_ref().map(E::state).unwrap_or_default()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.as_ref().is_some_and(E::is_playing)
    }

    pub fn position(&self) -> Duration {
        self.engine.as_ref().map(E::position).unwrap_or_default()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.engine.as_ref().and_then(E::duration)
    }

    pub fn item_count(&self) -> usize {
        self.engine.as_ref().map(E::item_count).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use swing_player_client::client;

    #[derive(Default)]
    struct CountingEngine {
        attached: bool,
        loads: usize,
        items: usize,
    }

    impl Engine for CountingEngine {
        fn attach(&mut self, _events: UnboundedSender<EngineEvent>) {
            self.attached = true;
        }
        fn load(&mut self, items: Vec<MediaItem>, _: usize, _: bool) -> Result<()> {
            self.loads += 1;
            self.items = items.len();
            Ok(())
        }
        fn insert(&mut self, _: usize, _: MediaItem) -> Result<()> {
            self.items += 1;
            Ok(())
        }
        fn clear(&mut self) -> Result<()> {
            self.items = 0;
            Ok(())
        }
        fn prepare(&mut self) -> Result<()> {
            Ok(())
        }
        fn play(&mut self) -> Result<()> {
            crate::error::SeekSnafu.fail()
        }
        fn pause(&mut self) -> Result<()> {
            Ok(())
        }
        fn set_play_when_ready(&mut self, _: bool) -> Result<()> {
            Ok(())
        }
        fn seek(&mut self, _: Duration) -> Result<()> {
            Ok(())
        }
        fn seek_to_item(&mut self, _: usize, _: Duration) -> Result<()> {
            Ok(())
        }
        fn seek_to_next(&mut self) -> Result<()> {
            Ok(())
        }
        fn seek_to_previous(&mut self) -> Result<()> {
            Ok(())
        }
        fn set_repeat_mode(&mut self, _: RepeatMode) -> Result<()> {
            Ok(())
        }
        fn set_speed(&mut self, _: f32) -> Result<()> {
            Ok(())
        }
        fn state(&self) -> EngineState {
            EngineState::Ready
        }
        fn is_playing(&self) -> bool {
            true
        }
        fn position(&self) -> Duration {
            Duration::from_secs(3)
        }
        fn duration(&self) -> Option<Duration> {
            None
        }
        fn item_count(&self) -> usize {
            self.items
        }
    }

    fn item(media_id: usize) -> MediaItem {
        MediaItem {
            media_id,
            uri: String::new(),
            artwork_uri: String::new(),
            title: String::new(),
            artist: String::new(),
            genre: String::new(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn commands_are_ignored_while_unbound() {
        let mut playback = Playback::<CountingEngine>::default();
        playback.load(vec![item(0), item(1)], 0, true);
        playback.play();

        assert!(!playback.is_bound());
        assert_eq!(playback.state(), EngineState::Idle);
        assert!(!playback.is_playing());
        assert_eq!(playback.position(), Duration::ZERO);
        assert_eq!(playback.item_count(), 0);
    }

    #[test]
    fn binds_only_once() {
        let (tx, _rx) = unbounded_channel();
        let mut playback = Playback::default();

        assert!(playback.bind(CountingEngine::default(), tx.clone()));
        playback.load(vec![item(0), item(1)], 0, true);
        assert!(!playback.bind(CountingEngine::default(), tx));

        let engine = playback.engine.as_ref().unwrap();
        assert!(engine.attached);
        assert_eq!(engine.loads, 1);
        assert_eq!(playback.item_count(), 2);
    }

    #[test]
    fn failing_command_is_swallowed() {
        let (tx, _rx) = unbounded_channel();
        let mut playback = Playback::default();
        playback.bind(CountingEngine::default(), tx);

        playback.play();
        playback.insert(2, item(2));

        assert_eq!(playback.item_count(), 1);
        assert_eq!(playback.state(), EngineState::Ready);
    }

    #[test]
    fn media_item_from_track() {
        let client = client::new("http://localhost:1980", None).unwrap();
        let track = Track {
            track_hash: "abc".into(),
            title: "Song".into(),
            duration_seconds: 61,
            filepath: "/music/a b.mp3".into(),
            image: "abc.webp".into(),
            artists: vec!["One".into(), "Two".into()],
            genres: vec!["rock".into(), "pop".into()],
            folder: "/music".into(),
        };

        let item = media_item(&client, 4, &track).unwrap();

        assert_eq!(item.media_id, 4);
        assert_eq!(
            item.uri,
            "http://localhost:1980/file/abc?filepath=%2Fmusic%2Fa+b.mp3"
        );
        assert_eq!(item.artwork_uri, "http://localhost:1980/img/t/abc.webp");
        assert_eq!(item.artist, "One, Two");
        assert_eq!(item.genre, "rock, pop");
        assert_eq!(item.duration, Duration::from_secs(61));
    }
}
