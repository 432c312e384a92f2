use tokio::sync::mpsc::UnboundedSender;

use crate::models::Track;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Load,
    Seek {
        value: f32,
    },
    Next,
    Previous,
    TogglePlay,
    ToggleShuffle,
    ToggleRepeat,
    CreateNewQueue {
        tracks: Vec<Track>,
        start_index: usize,
        auto_play: bool,
    },
    CreateQueueFromFolder {
        tracks: Vec<Track>,
        clicked_index: usize,
        folder_path: String,
    },
    InsertTrackAtIndex {
        track: Track,
        index: usize,
    },
    ClearQueue,
    SeekToQueueItem {
        index: usize,
    },
    PlayUpNext,
    Quit,
}

#[derive(Debug, Clone)]
pub struct Controls {
    tx: UnboundedSender<ControlCommand>,
}

impl Controls {
    pub fn new(tx: UnboundedSender<ControlCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: ControlCommand) {
        if let Err(err) = self.tx.send(command) {
            tracing::warn!("Player is gone, dropping {:?}", err.0);
        }
    }

    /// Reloads the current queue into the engine, paused at the first item.
    pub fn load(&self) {
        self.send(ControlCommand::Load);
    }

    /// Seeks to a fraction of the current track.
    pub fn seek(&self, value: f32) {
        self.send(ControlCommand::Seek { value });
    }

    pub fn next(&self) {
        self.send(ControlCommand::Next);
    }

    pub fn previous(&self) {
        self.send(ControlCommand::Previous);
    }

    pub fn toggle_play(&self) {
        self.send(ControlCommand::TogglePlay);
    }

    pub fn toggle_shuffle(&self) {
        self.send(ControlCommand::ToggleShuffle);
    }

    pub fn toggle_repeat(&self) {
        self.send(ControlCommand::ToggleRepeat);
    }

    pub fn create_new_queue(&self, tracks: Vec<Track>, start_index: usize, auto_play: bool) {
        self.send(ControlCommand::CreateNewQueue {
            tracks,
            start_index,
            auto_play,
        });
    }

    pub fn create_queue_from_folder(
        &self,
        tracks: Vec<Track>,
        clicked_index: usize,
        folder_path: &str,
    ) {
        self.send(ControlCommand::CreateQueueFromFolder {
            tracks,
            clicked_index,
            folder_path: folder_path.to_string(),
        });
    }

    pub fn insert_track_at_index(&self, track: Track, index: usize) {
        self.send(ControlCommand::InsertTrackAtIndex { track, index });
    }

    pub fn clear_queue(&self) {
        self.send(ControlCommand::ClearQueue);
    }

    pub fn seek_to_queue_item(&self, index: usize) {
        self.send(ControlCommand::SeekToQueueItem { index });
    }

    pub fn play_up_next(&self) {
        self.send(ControlCommand::PlayUpNext);
    }

    pub fn quit(&self) {
        self.send(ControlCommand::Quit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn commands_arrive_in_order() {
        let (tx, mut rx) = unbounded_channel();
        let controls = Controls::new(tx);

        controls.seek(0.5);
        controls.create_queue_from_folder(vec![], 2, "/music");
        controls.quit();

        assert_eq!(rx.try_recv().unwrap(), ControlCommand::Seek { value: 0.5 });
        assert_eq!(
            rx.try_recv().unwrap(),
            ControlCommand::CreateQueueFromFolder {
                tracks: vec![],
                clicked_index: 2,
                folder_path: "/music".into(),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ControlCommand::Quit);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sending_after_player_is_gone_does_not_panic() {
        let (tx, rx) = unbounded_channel();
        let controls = Controls::new(tx);
        drop(rx);

        controls.next();
        controls.toggle_play();
    }
}
