use std::{path::Path, sync::Arc, time::Duration};

use swing_player_client::client::Client;
use tokio::{
    select,
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
        watch,
    },
};

use crate::{
    Result,
    controls::{ControlCommand, Controls},
    database::Database,
    duration::format_duration,
    engine::{Engine, EngineEvent, EngineState},
    facade::{Playback, media_item},
    history::{ListenRecord, LogReason},
    models::Track,
    queue::Queue,
    state::{PlaybackState, PlayerUiState, ShuffleMode},
};

/// Owns the queue and the UI state. Everything that changes either goes
/// through `player_loop`, one message at a time.
pub struct Player<E> {
    client: Arc<Client>,
    playback: Playback<E>,
    queue: Queue,
    state: watch::Sender<PlayerUiState>,
    controls: Controls,
    commands: Option<UnboundedReceiver<ControlCommand>>,
    engine_tx: UnboundedSender<EngineEvent>,
    engine_events: Option<UnboundedReceiver<EngineEvent>>,
    history: Option<UnboundedSender<ListenRecord>>,
    database: Option<Arc<Database>>,
    track_to_log: Option<(Track, usize)>,
    listened_seconds: u64,
    last_position_ms: u64,
}

impl<E: Engine> Player<E> {
    pub fn new(
        client: Arc<Client>,
        history: Option<UnboundedSender<ListenRecord>>,
        database: Option<Arc<Database>>,
    ) -> Self {
        let (state, _) = watch::channel(PlayerUiState::default());
        let (controls_tx, commands) = unbounded_channel();
        let (engine_tx, engine_events) = unbounded_channel();

        Self {
            client,
            playback: Playback::default(),
            queue: Queue::default(),
            state,
            controls: Controls::new(controls_tx),
            commands: Some(commands),
            engine_tx,
            engine_events: Some(engine_events),
            history,
            database,
            track_to_log: None,
            listened_seconds: 0,
            last_position_ms: 0,
        }
    }

    pub fn controls(&self) -> Controls {
        self.controls.clone()
    }

    pub fn state(&self) -> watch::Receiver<PlayerUiState> {
        self.state.subscribe()
    }

    /// Attaches the engine. Only the first call has any effect.
    pub fn bind(&mut self, engine: E) -> bool {
        self.playback.bind(engine, self.engine_tx.clone())
    }

    fn update_state(&self, f: impl FnOnce(&mut PlayerUiState)) {
        let mut state = self.state.borrow().clone();
        f(&mut state);
        self.state.send_replace(state);
    }

    fn current_track(&self) -> Option<Track> {
        self.state.borrow().track.clone()
    }

    fn playback_state(&self) -> PlaybackState {
        self.state.borrow().playback_state
    }

    fn track_duration_ms(&self) -> u64 {
        match self.playback.duration() {
            Some(duration) if !duration.is_zero() => duration.as_millis() as u64,
            _ => self
                .current_track()
                .map(|track| u64::from(track.duration_seconds) * 1000)
                .unwrap_or_default(),
        }
    }

    /// Reloads the whole active order into the engine, starting at
    /// `start_index`.
    fn reload(&mut self, start_index: usize, play_when_ready: bool) {
        let items = self
            .queue
            .iter()
            .enumerate()
            .map(|(index, track)| media_item(&self.client, index, track))
            .collect::<Result<Vec<_>>>();

        let items = match items {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!("Unable to build media items: {err}");
                return;
            }
        };

        self.log_listen(LogReason::Transition);
        self.playback.load(items, start_index, play_when_ready);
        self.check_engine_items();

        let track = self.queue.get(start_index).cloned();
        self.track_to_log = track.clone().map(|track| (track, start_index));
        self.listened_seconds = 0;
        self.last_position_ms = 0;

        let queue = self.queue.active_tracks();
        self.update_state(|state| {
            state.track_duration = format_duration(
                track
                    .as_ref()
                    .map(|track| track.duration_seconds.into())
                    .unwrap_or_default(),
            );
            state.track = track;
            state.playing_track_index = start_index;
            state.queue = queue;
            state.seek_position = 0.0;
            state.playback_duration = format_duration(0);
        });
    }

    /// The engine holds one item per queue position.
    fn check_engine_items(&self) {
        let engine_items = self.playback.item_count();
        if self.playback.is_bound() && engine_items != self.queue.active_len() {
            tracing::warn!(
                engine_items,
                queue = self.queue.active_len(),
                "Engine items out of sync with queue"
            );
        }
    }

    fn save_queue(&self) {
        let Some(database) = self.database.clone() else {
            return;
        };
        let tracks = self.queue.natural().to_vec();

        tokio::spawn(async move {
            if let Err(err) = database.set_queue(&tracks).await {
                tracing::warn!("Unable to save queue: {err}");
            }
        });
    }

    fn log_listen(&mut self, reason: LogReason) {
        let seconds_played = std::mem::take(&mut self.listened_seconds);

        let Some((track, index_in_queue)) = &self.track_to_log else {
            return;
        };

        if !ListenRecord::should_report(seconds_played) {
            return;
        }

        let Some(history) = &self.history else {
            return;
        };

        let record = ListenRecord {
            track: track.clone(),
            index_in_queue: *index_in_queue,
            seconds_played,
            last_position_ms: self.last_position_ms,
            reason,
        };

        if history.send(record).is_err() {
            tracing::warn!("History logger is gone");
        }
    }

    #[tracing::instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub fn create_new_queue(&mut self, tracks: Vec<Track>, start_index: usize, auto_play: bool) {
        if tracks.is_empty() {
            self.clear_queue();
            return;
        }

        let start_index = start_index.min(tracks.len() - 1);
        self.queue = Queue::new(tracks);
        self.reload(start_index, auto_play);

        self.update_state(|state| {
            state.shuffle_mode = ShuffleMode::Off;
            state.playback_state = if auto_play {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
        });

        self.save_queue();
    }

    #[tracing::instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub fn create_queue_from_folder(
        &mut self,
        tracks: Vec<Track>,
        clicked_index: usize,
        folder_path: &str,
    ) {
        let same_folder = self
            .current_track()
            .is_some_and(|track| same_folder(&track.folder, folder_path));

        // A shuffled engine queue does not line up with folder order, so only
        // an unshuffled queue can be reused as is.
        if same_folder
            && self.playback_state() != PlaybackState::Error
            && !self.queue.is_shuffled()
        {
            tracing::debug!("Folder already queued, jumping to {clicked_index}");
            self.playback.seek_to_item(clicked_index, Duration::ZERO);
            self.playback.set_play_when_ready(true);
            self.update_state(|state| {
                state.shuffle_mode = ShuffleMode::Off;
                state.seek_position = 0.0;
            });
        } else {
            self.create_new_queue(tracks, clicked_index, true);
        }
    }

    pub fn insert_track_at_index(&mut self, track: Track, index: usize) {
        let had_track = self.current_track().is_some();
        let index = self.queue.insert(index, track.clone());

        match media_item(&self.client, index, &track) {
            Ok(item) => self.playback.insert(index, item),
            Err(err) => tracing::warn!("Unable to build media item: {err}"),
        }
        self.check_engine_items();

        if let Some((_, logged_index)) = &mut self.track_to_log
            && index <= *logged_index
        {
            *logged_index += 1;
        }

        let queue = self.queue.active_tracks();
        self.update_state(|state| {
            state.queue = queue;
            if had_track && index <= state.playing_track_index {
                state.playing_track_index += 1;
            }
        });

        self.save_queue();
    }

    pub fn seek_to_queue_item(&mut self, index: usize) {
        self.playback.seek_to_item(index, Duration::ZERO);
        self.playback.set_play_when_ready(true);
    }

    pub fn play_next_queued_item(&mut self) {
        self.playback.seek_to_next();
        self.playback.set_play_when_ready(true);
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.playback.clear();
        self.check_engine_items();
        self.track_to_log = None;
        self.listened_seconds = 0;
        self.last_position_ms = 0;

        self.update_state(|state| {
            state.queue.clear();
            state.track = None;
            state.playing_track_index = 0;
            state.seek_position = 0.0;
            state.is_buffering = false;
            state.playback_duration = format_duration(0);
            state.track_duration = format_duration(0);
            if state.playback_state != PlaybackState::Error {
                state.playback_state = PlaybackState::Paused;
            }
        });

        if let Some(database) = self.database.clone() {
            tokio::spawn(async move {
                if let Err(err) = database.clear_queue().await {
                    tracing::warn!("Unable to clear saved queue: {err}");
                }
            });
        }
    }

    pub fn toggle_shuffle(&mut self) {
        let shuffle = !self.queue.is_shuffled();

        if shuffle {
            self.queue.shuffle(&mut rand::rng());
        } else {
            self.queue.unshuffle();
        }

        self.update_state(|state| {
            state.shuffle_mode = if shuffle {
                ShuffleMode::On
            } else {
                ShuffleMode::Off
            };
            state.seek_position = 0.0;
        });

        if self.queue.is_empty() {
            return;
        }

        self.reload(0, true);
        self.update_state(|state| state.playback_state = PlaybackState::Playing);
    }

    fn seek(&mut self, value: f32) {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };

        let duration_seconds = self
            .current_track()
            .map(|track| track.duration_seconds)
            .filter(|duration| *duration > 0)
            .unwrap_or(1);
        let elapsed = (value * duration_seconds as f32) as u64;

        self.update_state(|state| {
            state.seek_position = value;
            state.playback_duration = format_duration(elapsed);
        });

        let duration_ms = self.track_duration_ms();
        let position_ms = ((duration_ms as f64 * f64::from(value)) as u64).min(duration_ms);
        let position = Duration::from_millis(position_ms);
        self.last_position_ms = position_ms;

        if self.playback.state() == EngineState::Ready {
            self.playback.seek(position);
        } else {
            self.playback.prepare();
            self.playback.seek(position);
            self.playback.pause();
        }
    }

    fn toggle_play(&mut self) {
        match self.playback_state() {
            PlaybackState::Playing => {
                self.playback.pause();
                self.update_state(|state| state.playback_state = PlaybackState::Paused);
            }
            PlaybackState::Paused => {
                if self.playback.state() == EngineState::Ended {
                    self.playback.prepare();
                    self.playback.seek(Duration::ZERO);
                }
                self.playback.set_speed(1.0);
                self.playback.play();
                self.update_state(|state| state.playback_state = PlaybackState::Playing);
            }
            PlaybackState::Error => {
                tracing::debug!("Not toggling playback while in error");
            }
        }
    }

    fn toggle_repeat(&mut self) {
        let repeat_mode = self.state.borrow().repeat_mode.next();
        self.playback.set_repeat_mode(repeat_mode);
        self.update_state(|state| state.repeat_mode = repeat_mode);
    }

    fn load(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        self.reload(0, false);
        self.update_state(|state| state.playback_state = PlaybackState::Paused);
    }

    /// Applies one command. Returns false when the player should stop.
    pub fn handle_command(&mut self, command: ControlCommand) -> bool {
        let needs_engine = matches!(
            command,
            ControlCommand::Seek { .. }
                | ControlCommand::Next
                | ControlCommand::Previous
                | ControlCommand::TogglePlay
                | ControlCommand::ToggleShuffle
                | ControlCommand::ToggleRepeat
        );

        if needs_engine && !self.playback.is_bound() {
            tracing::debug!("No engine bound, ignoring {command:?}");
            return true;
        }

        match command {
            ControlCommand::Load => self.load(),
            ControlCommand::Seek { value } => self.seek(value),
            ControlCommand::Next => {
                self.playback.seek_to_next();
                self.playback.set_play_when_ready(true);
            }
            ControlCommand::Previous => self.playback.seek_to_previous(),
            ControlCommand::TogglePlay => self.toggle_play(),
            ControlCommand::ToggleShuffle => self.toggle_shuffle(),
            ControlCommand::ToggleRepeat => self.toggle_repeat(),
            ControlCommand::CreateNewQueue {
                tracks,
                start_index,
                auto_play,
            } => self.create_new_queue(tracks, start_index, auto_play),
            ControlCommand::CreateQueueFromFolder {
                tracks,
                clicked_index,
                folder_path,
            } => self.create_queue_from_folder(tracks, clicked_index, &folder_path),
            ControlCommand::InsertTrackAtIndex { track, index } => {
                self.insert_track_at_index(track, index)
            }
            ControlCommand::ClearQueue => self.clear_queue(),
            ControlCommand::SeekToQueueItem { index } => self.seek_to_queue_item(index),
            ControlCommand::PlayUpNext => self.play_next_queued_item(),
            ControlCommand::Quit => return false,
        }

        true
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::PlaybackStateChanged(EngineState::Buffering) => {
                self.update_state(|state| state.is_buffering = true);
            }
            EngineEvent::PlaybackStateChanged(EngineState::Ready) => {
                let is_playing = self.playback.is_playing();
                let duration = self.playback.duration().map(|duration| duration.as_secs());

                self.update_state(|state| {
                    state.is_buffering = false;
                    if state.playback_state != PlaybackState::Error {
                        state.playback_state = if is_playing {
                            PlaybackState::Playing
                        } else {
                            PlaybackState::Paused
                        };
                    }
                    let seconds = duration.unwrap_or_else(|| {
                        state
                            .track
                            .as_ref()
                            .map(|track| track.duration_seconds.into())
                            .unwrap_or_default()
                    });
                    state.track_duration = format_duration(seconds);
                });
            }
            EngineEvent::PlaybackStateChanged(EngineState::Ended) => {
                self.log_listen(LogReason::Ended);

                self.update_state(|state| {
                    state.seek_position = 1.0;
                    state.playback_duration = state.track_duration.clone();
                    state.is_buffering = false;
                    if state.playback_state != PlaybackState::Error {
                        state.playback_state = PlaybackState::Paused;
                    }
                });
            }
            EngineEvent::PlaybackStateChanged(EngineState::Idle) => {}
            EngineEvent::Error { message } => {
                tracing::warn!("Playback error: {message}");
                self.update_state(|state| {
                    state.playback_state = PlaybackState::Error;
                    state.is_buffering = false;
                });
            }
            EngineEvent::IsPlayingChanged(is_playing) => {
                if self.playback.state() == EngineState::Buffering
                    || self.playback_state() == PlaybackState::Error
                {
                    return;
                }

                self.update_state(|state| {
                    state.playback_state = if is_playing {
                        PlaybackState::Playing
                    } else {
                        PlaybackState::Paused
                    };
                });
            }
            EngineEvent::MediaItemTransition { media_id } => {
                let Some(track) = self.queue.get(media_id).cloned() else {
                    tracing::warn!("No track in queue for media item {media_id}");
                    return;
                };

                self.log_listen(LogReason::Transition);
                self.track_to_log = Some((track.clone(), media_id));
                self.last_position_ms = 0;

                self.update_state(|state| {
                    state.track_duration = format_duration(track.duration_seconds.into());
                    state.track = Some(track);
                    state.playing_track_index = media_id;
                    state.seek_position = 0.0;
                    state.playback_duration = format_duration(0);
                });
            }
            EngineEvent::SourceFinished { generation } => {
                self.playback.source_finished(generation);
            }
        }
    }

    /// Polls the engine position. Runs once a second.
    pub fn tick(&mut self) {
        if self.playback.state() != EngineState::Ready {
            return;
        }

        let position = self.playback.position();
        let duration_seconds = self
            .current_track()
            .map(|track| track.duration_seconds)
            .filter(|duration| *duration > 0)
            .unwrap_or(1);

        let seek_position = (position.as_secs_f32() / duration_seconds as f32).clamp(0.0, 1.0);
        self.last_position_ms = position.as_millis() as u64;

        if self.playback.is_playing() {
            self.listened_seconds += 1;
        }

        self.update_state(|state| {
            state.seek_position = seek_position;
            state.playback_duration = format_duration(position.as_secs());
        });
    }

    pub async fn player_loop(&mut self) -> Result<()> {
        let (Some(mut commands), Some(mut engine_events)) =
            (self.commands.take(), self.engine_events.take())
        else {
            tracing::warn!("Player loop already ran");
            return Ok(());
        };

        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            select! {
                _ = interval.tick() => {
                    self.tick();
                }

                Some(command) = commands.recv() => {
                    if !self.handle_command(command) {
                        break;
                    }
                }

                Some(event) = engine_events.recv() => {
                    self.handle_engine_event(event);
                }
            }
        }

        tracing::debug!("Player loop stopped");
        Ok(())
    }
}

fn same_folder(a: &str, b: &str) -> bool {
    let trim = |path: &str| Path::new(path.trim_end_matches('/')).to_path_buf();
    trim(a) == trim(b)
}
