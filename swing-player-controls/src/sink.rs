use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rodio::{Source, decoder::DecoderBuilder, queue::queue};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::{
    Result,
    engine::{Engine, EngineEvent, EngineState, MediaItem},
    state::RepeatMode,
};

/// Going back within this much of a track restarts it instead.
const RESTART_THRESHOLD: Duration = Duration::from_secs(3);

/// State shared with the download task of the current item.
#[derive(Default)]
struct Shared {
    state: Mutex<EngineState>,
    /// Bumped every time a new item starts. Work for older items is dropped.
    generation: AtomicU64,
    play_when_ready: AtomicBool,
    pending_seek: Mutex<Option<Duration>>,
    /// Where the decoded source starts, when it was seeked before playing.
    start_offset: Mutex<Duration>,
}

/// Engine playing the queue through the default audio device.
pub struct Sink {
    stream_handle: Option<rodio::OutputStream>,
    sink: Option<rodio::Sink>,
    current_download: Option<JoinHandle<()>>,
    http: reqwest::Client,
    events: Option<UnboundedSender<EngineEvent>>,
    items: Vec<MediaItem>,
    current: usize,
    shared: Arc<Shared>,
    repeat_mode: RepeatMode,
    speed: f32,
}

impl Sink {
    pub fn new(access_token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = access_token {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("access token contains invalid header characters"),
            }
        }

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            stream_handle: Default::default(),
            sink: Default::default(),
            current_download: Default::default(),
            http,
            events: Default::default(),
            items: Default::default(),
            current: 0,
            shared: Default::default(),
            repeat_mode: Default::default(),
            speed: 1.0,
        })
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn set_state(&self, state: EngineState) -> Result<()> {
        *self.shared.state.lock()? = state;
        self.emit(EngineEvent::PlaybackStateChanged(state));
        Ok(())
    }

    fn stop_download(&mut self) {
        if let Some(handle) = self.current_download.take() {
            handle.abort();
        }
    }

    /// Drops whatever is playing and starts downloading the item at `index`.
    fn start_item(&mut self, index: usize, position: Duration) -> Result<()> {
        let Some(item) = self.items.get(index).cloned() else {
            return Ok(());
        };

        self.stop_download();
        self.sink = None;

        if self.stream_handle.is_none() {
            let mut stream_handle =
                rodio::OutputStreamBuilder::from_default_device()?.open_stream()?;
            stream_handle.log_on_drop(false);
            self.stream_handle = Some(stream_handle);
        }

        let Some(stream_handle) = &self.stream_handle else {
            return Ok(());
        };

        let (sender, receiver) = queue(true);
        let sink = rodio::Sink::connect_new(stream_handle.mixer());
        sink.append(receiver);
        sink.set_speed(self.speed);
        if !self.shared.play_when_ready.load(Ordering::SeqCst) {
            sink.pause();
        }
        self.sink = Some(sink);

        let generation = {
            let mut state = self.shared.state.lock()?;
            *state = EngineState::Buffering;
            self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        *self.shared.pending_seek.lock()? = (!position.is_zero()).then_some(position);
        *self.shared.start_offset.lock()? = Duration::ZERO;

        self.current = index;
        self.emit(EngineEvent::MediaItemTransition {
            media_id: item.media_id,
        });
        self.emit(EngineEvent::PlaybackStateChanged(EngineState::Buffering));

        tracing::debug!("Buffering {}", item.title);

        let http = self.http.clone();
        let shared = self.shared.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let send = |event: EngineEvent| {
                if let Some(events) = &events {
                    let _ = events.send(event);
                }
            };

            let fail = |message: String| {
                tracing::warn!("{message}");
                if let Ok(mut state) = shared.state.lock()
                    && shared.generation.load(Ordering::SeqCst) == generation
                {
                    *state = EngineState::Idle;
                    send(EngineEvent::Error { message });
                }
            };

            let bytes = match download(&http, &item.uri).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    fail(format!("Unable to get track audio file: {err}"));
                    return;
                }
            };

            let Ok(mut source) = DecoderBuilder::new()
                .with_data(Cursor::new(bytes))
                .with_seekable(true)
                .build()
            else {
                fail("Unable to decode audio file".to_string());
                return;
            };

            let pending_seek = shared.pending_seek.lock().ok().and_then(|mut p| p.take());
            if let Some(position) = pending_seek {
                match source.try_seek(position) {
                    Ok(()) => {
                        if let Ok(mut offset) = shared.start_offset.lock() {
                            *offset = position;
                        }
                    }
                    Err(err) => tracing::warn!("Unable to seek before playing: {err}"),
                }
            }

            let playing = {
                let Ok(mut state) = shared.state.lock() else {
                    return;
                };
                if shared.generation.load(Ordering::SeqCst) != generation {
                    return;
                }

                let signal = sender.append_with_signal(source);
                *state = EngineState::Ready;

                tokio::task::spawn_blocking({
                    let events = events.clone();
                    move || {
                        if signal.recv().is_ok()
                            && let Some(events) = events
                        {
                            let _ = events.send(EngineEvent::SourceFinished { generation });
                        }
                    }
                });

                shared.play_when_ready.load(Ordering::SeqCst)
            };

            send(EngineEvent::PlaybackStateChanged(EngineState::Ready));
            if playing {
                send(EngineEvent::IsPlayingChanged(true));
            }
        });

        self.current_download = Some(handle);

        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let was_playing = self.is_playing();
        self.set_state(EngineState::Ended)?;
        if was_playing {
            self.emit(EngineEvent::IsPlayingChanged(false));
        }
        Ok(())
    }
}

async fn download(http: &reqwest::Client, uri: &str) -> Result<Vec<u8>> {
    let response = http.get(uri).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

impl Engine for Sink {
    fn attach(&mut self, events: UnboundedSender<EngineEvent>) {
        self.events = Some(events);
    }

    fn load(
        &mut self,
        items: Vec<MediaItem>,
        start_index: usize,
        play_when_ready: bool,
    ) -> Result<()> {
        self.clear()?;

        if items.is_empty() {
            return Ok(());
        }

        let start_index = start_index.min(items.len() - 1);
        self.items = items;
        self.shared
            .play_when_ready
            .store(play_when_ready, Ordering::SeqCst);

        self.start_item(start_index, Duration::ZERO)
    }

    fn insert(&mut self, index: usize, item: MediaItem) -> Result<()> {
        let index = index.min(self.items.len());
        let had_items = !self.items.is_empty();

        self.items.insert(index, item);
        for (media_id, item) in self.items.iter_mut().enumerate() {
            item.media_id = media_id;
        }

        if had_items && index <= self.current {
            self.current += 1;
        }

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let was_playing = self.is_playing();

        self.stop_download();
        self.sink = None;
        self.stream_handle = None;
        self.items.clear();
        self.current = 0;

        {
            let mut state = self.shared.state.lock()?;
            *state = EngineState::Idle;
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
        }
        *self.shared.pending_seek.lock()? = None;

        if was_playing {
            self.emit(EngineEvent::IsPlayingChanged(false));
        }

        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        match self.state() {
            EngineState::Idle | EngineState::Ended => self.start_item(self.current, Duration::ZERO),
            EngineState::Buffering | EngineState::Ready => Ok(()),
        }
    }

    fn play(&mut self) -> Result<()> {
        let was_playing = self.is_playing();
        self.shared.play_when_ready.store(true, Ordering::SeqCst);

        if let Some(sink) = &self.sink {
            sink.play();
        }

        if !was_playing && self.is_playing() {
            self.emit(EngineEvent::IsPlayingChanged(true));
        }

        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let was_playing = self.is_playing();
        self.shared.play_when_ready.store(false, Ordering::SeqCst);

        if let Some(sink) = &self.sink {
            sink.pause();
        }

        if was_playing {
            self.emit(EngineEvent::IsPlayingChanged(false));
        }

        Ok(())
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        if play_when_ready {
            self.play()
        } else {
            self.pause()
        }
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        match (self.state(), &self.sink) {
            (EngineState::Ready, Some(sink)) => {
                sink.try_seek(position)?;
                *self.shared.start_offset.lock()? = Duration::ZERO;
            }
            _ => *self.shared.pending_seek.lock()? = Some(position),
        }

        Ok(())
    }

    fn seek_to_item(&mut self, index: usize, position: Duration) -> Result<()> {
        if index >= self.items.len() {
            tracing::debug!("No item at {index}");
            return Ok(());
        }

        self.start_item(index, position)
    }

    fn seek_to_next(&mut self) -> Result<()> {
        if self.current + 1 < self.items.len() {
            self.start_item(self.current + 1, Duration::ZERO)
        } else if self.repeat_mode == RepeatMode::All && !self.items.is_empty() {
            self.start_item(0, Duration::ZERO)
        } else {
            Ok(())
        }
    }

    fn seek_to_previous(&mut self) -> Result<()> {
        if self.position() > RESTART_THRESHOLD {
            return self.seek(Duration::ZERO);
        }

        if self.current > 0 {
            self.start_item(self.current - 1, Duration::ZERO)
        } else if self.repeat_mode == RepeatMode::All && !self.items.is_empty() {
            self.start_item(self.items.len() - 1, Duration::ZERO)
        } else {
            self.seek(Duration::ZERO)
        }
    }

    fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<()> {
        self.repeat_mode = repeat_mode;
        Ok(())
    }

    fn set_speed(&mut self, speed: f32) -> Result<()> {
        self.speed = speed;
        if let Some(sink) = &self.sink {
            sink.set_speed(speed);
        }
        Ok(())
    }

    fn source_finished(&mut self, generation: u64) -> Result<()> {
        if generation != self.shared.generation.load(Ordering::SeqCst) {
            return Ok(());
        }

        match self.repeat_mode {
            RepeatMode::One => self.start_item(self.current, Duration::ZERO),
            _ if self.current + 1 < self.items.len() => {
                self.start_item(self.current + 1, Duration::ZERO)
            }
            RepeatMode::All => self.start_item(0, Duration::ZERO),
            RepeatMode::Off => self.end(),
        }
    }

    fn state(&self) -> EngineState {
        self.shared
            .state
            .lock()
            .map(|state| *state)
            .unwrap_or_default()
    }

    fn is_playing(&self) -> bool {
        self.state() == EngineState::Ready
            && self.shared.play_when_ready.load(Ordering::SeqCst)
            && self.sink.as_ref().is_some_and(|sink| !sink.is_paused())
    }

    fn position(&self) -> Duration {
        match (self.state(), &self.sink) {
            (EngineState::Ready, Some(sink)) => {
                let offset = self
                    .shared
                    .start_offset
                    .lock()
                    .map(|offset| *offset)
                    .unwrap_or_default();
                offset + sink.get_pos()
            }
            _ => self
                .shared
                .pending_seek
                .lock()
                .ok()
                .and_then(|pending| *pending)
                .unwrap_or_default(),
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.items
            .get(self.current)
            .map(|item| item.duration)
            .filter(|duration| !duration.is_zero())
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }
}
