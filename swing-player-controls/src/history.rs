use std::sync::Arc;

use swing_player_client::client::Client;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{
    database::Database,
    models::{LastPlayedTrack, Track},
};

/// A listen shorter than this is not reported.
pub const MIN_LISTEN_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogReason {
    Ended,
    Transition,
}

impl LogReason {
    /// Source code the server expects in the log request.
    pub fn code(self) -> &'static str {
        match self {
            LogReason::Ended => "E",
            LogReason::Transition => "T",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenRecord {
    pub track: Track,
    pub index_in_queue: usize,
    pub seconds_played: u64,
    pub last_position_ms: u64,
    pub reason: LogReason,
}

impl ListenRecord {
    pub fn should_report(seconds_played: u64) -> bool {
        seconds_played > MIN_LISTEN_SECONDS
    }
}

/// Reports finished listens to the server and remembers the last one locally.
pub struct HistoryLogger {
    client: Arc<Client>,
    database: Option<Arc<Database>>,
}

impl HistoryLogger {
    pub fn new(client: Arc<Client>, database: Option<Arc<Database>>) -> Self {
        Self { client, database }
    }

    /// Starts the logger on a background task and returns the channel the
    /// player posts records to.
    pub fn spawn(self) -> UnboundedSender<ListenRecord> {
        let (tx, rx) = unbounded_channel();
        tokio::spawn(self.run(rx));
        tx
    }

    pub async fn run(self, mut receiver: UnboundedReceiver<ListenRecord>) {
        while let Some(record) = receiver.recv().await {
            self.report(&record).await;
        }

        tracing::debug!("History logger stopped");
    }

    #[tracing::instrument(skip(self, record), fields(track = %record.track.track_hash))]
    pub async fn report(&self, record: &ListenRecord) {
        let log = async {
            if let Err(err) = self
                .client
                .log_track(
                    &record.track.track_hash,
                    record.seconds_played,
                    record.reason.code(),
                )
                .await
            {
                tracing::warn!("Unable to log track: {err}");
            }
        };

        let remember = async {
            let Some(database) = &self.database else {
                return;
            };

            let last_played = LastPlayedTrack {
                track_hash: record.track.track_hash.clone(),
                index_in_queue: record.index_in_queue,
                last_play_position_ms: record.last_position_ms,
            };

            if let Err(err) = database.set_last_played(&last_played).await {
                tracing::warn!("Unable to save last played track: {err}");
            }
        };

        tokio::join!(log, remember);
    }
}
